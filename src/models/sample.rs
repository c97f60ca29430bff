use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Device;
use crate::error::{AppError, Result};

/// A single recorded energy reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub device: Device,
    pub usage_kwh: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, device: Device, usage_kwh: f64) -> Result<Self> {
        if !usage_kwh.is_finite() || usage_kwh < 0.0 {
            return Err(AppError::Validation(format!(
                "usage_kwh must be a non-negative number, got {}",
                usage_kwh
            )));
        }

        Ok(Self {
            timestamp,
            device,
            usage_kwh,
        })
    }
}

/// Sample as received over the wire, before the device name is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    pub device: String,
    pub usage_kwh: f64,
}

impl TryFrom<RawSample> for Sample {
    type Error = AppError;

    fn try_from(raw: RawSample) -> Result<Self> {
        let device = raw.device.parse()?;
        Sample::new(raw.timestamp, device, raw.usage_kwh)
    }
}
