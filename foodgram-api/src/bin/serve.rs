#[rocket::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> anyhow::Result<()> {
    let _rocket = foodgram_api::rocket().await?.launch().await?;
    Ok(())
}
