use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

pub mod pagination;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Process-wide connection pool, created lazily from DATABASE_URL.
/// Multi-tenancy is row-level (`firm_id` on every business table), so a
/// single shared database serves all firms.
pub async fn pool() -> Result<&'static PgPool, DbError> {
    POOL.get_or_try_init(connect).await
}

async fn connect() -> Result<PgPool, DbError> {
    let url = std::env::var("DATABASE_URL").map_err(|_| DbError::ConfigMissing("DATABASE_URL"))?;
    let db_config = &config::config().database;

    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout_secs))
        .connect(&url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    info!("database pool ready ({} max connections)", db_config.max_connections);
    Ok(pool)
}

/// Pings the pool to confirm connectivity, used by /health.
pub async fn health_check() -> Result<(), DbError> {
    let pool = pool().await?;
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
