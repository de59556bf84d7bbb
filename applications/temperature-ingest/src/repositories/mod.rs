pub mod memory;
pub mod postgres;

pub use memory::InMemoryReadingRepository;
pub use postgres::PgReadingRepository;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Reading;

/// Append-only storage for readings.
///
/// Implementations are shared across all in-flight requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    async fn append(&self, reading: &Reading) -> Result<()>;

    /// Most recent readings first, at most `limit` of them.
    async fn recent(&self, limit: i64) -> Result<Vec<Reading>>;
}

/// Stands in when storage could not be set up at boot. Every call fails
/// with `reason`, so the liveness routes keep working while storage reports
/// the problem.
#[derive(Debug, Clone)]
pub struct UnconfiguredReadingRepository {
    reason: String,
}

impl UnconfiguredReadingRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn missing_url() -> Self {
        Self::new("DATABASE_URL is not set")
    }

    fn unavailable(&self) -> AppError {
        AppError::StoreUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl ReadingRepository for UnconfiguredReadingRepository {
    async fn append(&self, _reading: &Reading) -> Result<()> {
        Err(self.unavailable())
    }

    async fn recent(&self, _limit: i64) -> Result<Vec<Reading>> {
        Err(self.unavailable())
    }
}
