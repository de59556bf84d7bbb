use crate::config::DbConfig;
use crate::error::AppError;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;

pub type DbPool = Pool<Postgres>;

/// Build the shared pool without opening a connection. Connections are made on
/// first use, so an unreachable database does not stop the process from starting.
pub fn connect_lazy(url: &str, cfg: &DbConfig) -> Result<DbPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_lazy(url)?;
    Ok(pool)
}

pub async fn ping(pool: &DbPool) -> Result<(), AppError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create the readings table and its ordering index if missing.
/// `table` must already be validated as a plain identifier.
pub async fn ensure_schema(pool: &DbPool, table: &str) -> Result<(), AppError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            temperature DOUBLE PRECISION NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL,
            local_time TEXT,
            source_address TEXT
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {table}_recorded_at_idx ON {table} (recorded_at DESC)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}
