use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub type DatabasePool = Arc<PgPool>;

const MAX_CONNECTIONS: u32 = 10;

/// Connects the ledger pool. TLS follows the URL's `sslmode`.
pub async fn new_pool(database_url: &str) -> anyhow::Result<DatabasePool> {
    let is_local = database_url.contains("localhost") || database_url.contains("127.0.0.1");
    if !is_local && !database_url.contains("sslmode=") {
        tracing::warn!("Ledger database is remote but DATABASE_URL sets no sslmode");
    }

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(Arc::new(pool))
}

/// Applies every pending migration under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
