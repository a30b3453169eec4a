//! Loads the ingredient catalog from a CSV file of `name,measurement_unit` rows.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use foodgram_api::db::{catalog, connection};

#[derive(Parser, Debug)]
#[command(name = "import_ingredients")]
#[command(about = "Imports ingredients into the catalog, skipping known ones", long_about = None)]
struct Args {
    /// CSV file without a header line
    #[arg(value_name = "CSV")]
    path: PathBuf,

    /// Apply pending migrations before importing
    #[arg(long)]
    migrate: bool,
}

#[tokio::main(flavor = "current_thread")]
#[cfg(not(tarpaulin_include))]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    foodgram_api::utils::logging::setup_console_log();

    let file = File::open(&args.path)
        .with_context(|| format!("failed to open {}", args.path.display()))?;
    let items = catalog::parse_ingredients(file)
        .with_context(|| format!("failed to read {}", args.path.display()))?;

    if args.migrate {
        connection::run_migrations().await?;
    }
    let mut conn = connection::establish().await?;
    let inserted = catalog::import_ingredients(&mut conn, &items).await?;

    info!(total = items.len(), inserted, "ingredients imported");
    println!("{} of {} ingredients were new", inserted, items.len());
    Ok(())
}
