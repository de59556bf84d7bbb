use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::ReadingRepository;
use crate::error::Result;
use crate::models::Reading;

/// Process-local store used by tests and local runs without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReadingRepository {
    readings: Arc<RwLock<Vec<Reading>>>,
}

impl InMemoryReadingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }
}

#[async_trait]
impl ReadingRepository for InMemoryReadingRepository {
    async fn append(&self, reading: &Reading) -> Result<()> {
        self.readings.write().await.push(reading.clone());
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Reading>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        // Newest insert first, then a stable sort keeps it first among equal timestamps.
        let mut readings: Vec<Reading> = self.readings.read().await.iter().rev().cloned().collect();
        readings.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        readings.truncate(limit);
        Ok(readings)
    }
}
