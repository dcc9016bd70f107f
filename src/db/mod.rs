use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, Result};

pub mod pg_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod transaction_store;

pub use pg_store::PgTransactionStore;
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteTransactionStore;
pub use transaction_store::TransactionStore;

pub async fn create_pool(database_url: &str) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Open a SQLite database, creating the file if needed.
#[cfg(feature = "sqlite")]
pub async fn create_sqlite_pool(
    database_url: &str,
) -> std::result::Result<sqlx::SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    // In-memory databases are per-connection; keep a single one so the
    // schema and data stay visible.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(opts)
        .await
}

/// Connect the backend selected by `DATABASE_URL` and prepare its schema.
pub async fn connect_store(config: &Config) -> Result<Arc<dyn TransactionStore>> {
    if config.uses_sqlite() {
        return connect_sqlite(&config.database_url).await;
    }

    tracing::info!("Connecting to PostgreSQL...");
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Database(e.into()))?;
    tracing::info!("Database migrations completed");

    Ok(Arc::new(PgTransactionStore::new(pool)))
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(database_url: &str) -> Result<Arc<dyn TransactionStore>> {
    tracing::info!("Opening SQLite database {}", database_url);
    let pool = create_sqlite_pool(database_url).await?;
    SqliteTransactionStore::create_schema(&pool).await?;
    Ok(Arc::new(SqliteTransactionStore::new(pool)))
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(database_url: &str) -> Result<Arc<dyn TransactionStore>> {
    Err(AppError::Internal(format!(
        "{} requires the `sqlite` feature",
        database_url
    )))
}
