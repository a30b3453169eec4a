use diesel::ConnectionResult;
use diesel_async::AsyncPgConnection;

use crate::api::configs;

pub async fn establish() -> ConnectionResult<AsyncPgConnection> {
    use diesel_async::AsyncConnection;

    let url = configs::get_database_url()
        .map_err(|e| diesel::ConnectionError::InvalidConnectionUrl(e.to_string()))?;

    let mut conn = AsyncPgConnection::establish(&url).await?;

    if cfg!(debug_assertions) {
        use diesel::connection::InstrumentationEvent;
        conn.set_instrumentation(|event: InstrumentationEvent<'_>| match event {
            InstrumentationEvent::StartQuery { query, .. } => {
                tracing::info!("Executing query: {}", query);
            }
            InstrumentationEvent::FinishQuery { query, error, .. } => match error {
                Some(e) => tracing::error!("Query failed: {}\nError: {:?}", query, e),
                None => tracing::debug!("Executing query succeeded: {}", query),
            },
            _ => {}
        });
    }

    Ok(conn)
}

pub async fn run_migrations() -> anyhow::Result<()> {
    use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../migrations");
    let conn = establish().await?;

    let mut async_wrapper: AsyncConnectionWrapper<AsyncPgConnection> =
        AsyncConnectionWrapper::from(conn);

    let applied = tokio::task::spawn_blocking(move || {
        async_wrapper
            .run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))
    })
    .await??;
    tracing::info!(applied, "migrations are up to date");

    Ok(())
}
