use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::ReadingRepository;
use crate::db::{self, DbPool};
use crate::error::{AppError, Result};
use crate::models::Reading;

impl<'r> FromRow<'r, PgRow> for Reading {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            temperature: row.try_get("temperature")?,
            recorded_at: row.try_get("recorded_at")?,
            local_time: row.try_get("local_time")?,
            source_address: row.try_get("source_address")?,
        })
    }
}

/// Readings table in Postgres. The `id` column stays inside this type.
#[derive(Clone)]
pub struct PgReadingRepository {
    pool: DbPool,
    table: String,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgReadingRepository {
    pub fn new(pool: DbPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !crate::config::is_valid_identifier(&table) {
            return Err(AppError::Config(format!("invalid table name: {}", table)));
        }
        Ok(Self {
            pool,
            table,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create the table once per process. A failure leaves the cell empty so
    /// the next request tries again.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async { db::ensure_schema(&self.pool, &self.table).await })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReadingRepository for PgReadingRepository {
    async fn append(&self, reading: &Reading) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {}
                (temperature, recorded_at, local_time, source_address)
            VALUES ($1, $2, $3, $4)
            "#,
            self.table
        ))
        .bind(reading.temperature)
        .bind(reading.recorded_at)
        .bind(reading.local_time.as_deref())
        .bind(reading.source_address.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Reading>> {
        self.ensure_schema().await?;

        let results = sqlx::query_as::<_, Reading>(&format!(
            r#"
            SELECT
                temperature,
                recorded_at,
                local_time,
                source_address
            FROM {}
            ORDER BY recorded_at DESC, id DESC
            LIMIT $1
            "#,
            self.table
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }
}
