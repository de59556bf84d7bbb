use chrono::{FixedOffset, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Reading, SubmitReading, PAGE_SIZE};
use crate::repositories::ReadingRepository;

#[derive(Clone)]
pub struct ReadingService {
    repository: Arc<dyn ReadingRepository>,
    display_offset: FixedOffset,
    operation_timeout: Duration,
}

impl ReadingService {
    pub fn new(
        repository: Arc<dyn ReadingRepository>,
        display_offset: FixedOffset,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            display_offset,
            operation_timeout,
        }
    }

    pub fn from_config(repository: Arc<dyn ReadingRepository>, config: &Config) -> Result<Self> {
        let display_offset = FixedOffset::east_opt(config.display.utc_offset_minutes * 60)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "invalid display offset: {} minutes",
                    config.display.utc_offset_minutes
                ))
            })?;
        Ok(Self::new(
            repository,
            display_offset,
            config.operation_timeout(),
        ))
    }

    /// Validate a raw POST body, stamp it and append it to the store.
    pub async fn submit(&self, body: &[u8], source_address: Option<String>) -> Result<Reading> {
        let received_at = Utc::now();
        let temperature = SubmitReading::parse_temperature(body)?;
        let reading = Reading::new(temperature, received_at, self.display_offset, source_address);

        self.with_timeout("append reading", self.repository.append(&reading))
            .await
            .map_err(|e| e.context("failed to store reading"))?;

        info!(
            temperature = reading.temperature,
            local_time = reading.local_time.as_deref().unwrap_or_default(),
            source = reading.source_address.as_deref().unwrap_or("unknown"),
            "Stored reading"
        );
        Ok(reading)
    }

    pub async fn list_recent(&self) -> Result<Vec<Reading>> {
        self.with_timeout("list readings", self.repository.recent(PAGE_SIZE))
            .await
            .map_err(|e| e.context("failed to load readings"))
    }

    async fn with_timeout<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout(op))?
    }
}
