use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Upper bound on readings returned by a list call.
pub const PAGE_SIZE: i64 = 100;

pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One stored temperature observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
    #[serde(rename = "hora_local", default, skip_serializing_if = "Option::is_none")]
    pub local_time: Option<String>,
    #[serde(rename = "device_ip", default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
}

impl Reading {
    /// Stamp a validated temperature with the receipt time.
    ///
    /// `recorded_at` is truncated to microseconds, the precision Postgres keeps,
    /// so what we answer with matches what a later list returns.
    pub fn new(
        temperature: f64,
        received_at: DateTime<Utc>,
        display_offset: FixedOffset,
        source_address: Option<String>,
    ) -> Self {
        let recorded_at = received_at.trunc_subsecs(6);
        let local_time = recorded_at
            .with_timezone(&display_offset)
            .format(LOCAL_TIME_FORMAT)
            .to_string();

        Self {
            temperature,
            recorded_at,
            local_time: Some(local_time),
            source_address,
        }
    }
}

/// Request body posted by the sensor. Fields other than `temperatura` are ignored,
/// including any client-supplied timestamp.
#[derive(Debug, Deserialize)]
pub struct SubmitReading {
    #[serde(default)]
    pub temperatura: Option<TemperatureValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TemperatureValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl TemperatureValue {
    pub fn to_f64(&self) -> Result<f64> {
        let value = match self {
            TemperatureValue::Number(n) => *n,
            TemperatureValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                AppError::Validation(format!("invalid temperature value: {:?}", s))
            })?,
            TemperatureValue::Other(v) => {
                return Err(AppError::Validation(format!(
                    "invalid temperature value: {}",
                    v
                )))
            }
        };

        // "NaN" and "inf" parse as f64 but are not readings.
        if !value.is_finite() {
            return Err(AppError::Validation(format!(
                "invalid temperature value: {}",
                value
            )));
        }
        Ok(value)
    }
}

impl SubmitReading {
    /// Parse a raw request body against the schema and return the temperature.
    pub fn parse_temperature(body: &[u8]) -> Result<f64> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::Validation("request body is empty".into()));
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("invalid JSON payload: {}", e)))?;
        if !value.is_object() {
            return Err(AppError::Validation(
                "invalid JSON payload: expected an object".into(),
            ));
        }

        let payload: SubmitReading = serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("invalid JSON payload: {}", e)))?;

        payload
            .temperatura
            .ok_or_else(|| AppError::Validation("missing field 'temperatura'".into()))?
            .to_f64()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub mensaje: String,
    pub hora_registrada: Option<String>,
}

impl SubmitResponse {
    pub fn stored(reading: &Reading) -> Self {
        Self {
            status: "OK".into(),
            mensaje: "reading stored".into(),
            hora_registrada: reading.local_time.clone(),
        }
    }
}
