use thiserror::Error;

use crate::sensors::calibration::CalibrationError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("Sensor has no ADC pin, call configure() before begin()")]
    NotConfigured,

    #[error("Sensor not initialized, call begin() before update()")]
    NotReady,

    #[error("ADC failure: {0}")]
    Adc(String),

    #[error("Calibration rejected: {0}")]
    Calibration(#[from] CalibrationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("No record stored under '{key}'")]
    NotFound { key: String },

    #[error("Record '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Storage backend failed on '{key}': {reason}")]
    Backend { key: String, reason: String },
}

impl StorageError {
    pub fn backend(key: &str, reason: impl ToString) -> Self {
        Self::Backend {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn corrupt(key: &str, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
