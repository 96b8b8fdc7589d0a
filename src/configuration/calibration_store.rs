use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use serde::Serialize;

use super::{record::Record, storage::RecordStorage};
use crate::{error::StorageError, sensors::calibration::CalibrationCoefficients};

pub const FIELD_SLOPE: &str = "slope";
pub const FIELD_INTERCEPT: &str = "intercept";
pub const FIELD_CALIBRATED_AT: &str = "calibrated_at";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredCalibration {
    pub coefficients: CalibrationCoefficients,
    /// Seconds since the UNIX epoch, when the record carries one.
    pub calibrated_at: Option<u64>,
}

#[derive(Serialize)]
struct CalibrationRecord {
    slope: f64,
    intercept: f64,
    calibrated_at: u64,
}

pub struct CalibrationStore<S: RecordStorage> {
    storage: S,
    key: String,
    defaults: CalibrationCoefficients,
}

impl<S: RecordStorage> CalibrationStore<S> {
    pub fn new(storage: S, key: impl Into<String>, defaults: CalibrationCoefficients) -> Self {
        Self {
            storage,
            key: key.into(),
            defaults,
        }
    }

    pub fn defaults(&self) -> CalibrationCoefficients {
        self.defaults
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Reads the stored record. Missing or unusable fields fall back to the
    /// defaults one by one; only a missing, unreadable or non-object record is
    /// an error.
    pub fn try_load(&self) -> Result<StoredCalibration, StorageError> {
        let bytes = self.storage.load(&self.key)?;
        let record = Record::parse(&self.key, &bytes)?;

        let mut slope = record.read_float(FIELD_SLOPE, self.defaults.slope);
        if slope == 0.0 {
            warn!("Stored slope is zero, using default {:.2}", self.defaults.slope);
            slope = self.defaults.slope;
        }

        let coefficients = CalibrationCoefficients {
            slope,
            intercept: record.read_float(FIELD_INTERCEPT, self.defaults.intercept),
        };

        let calibrated_at = if record.contains(FIELD_CALIBRATED_AT) {
            // Older records store a float timestamp.
            Some(record.read_float(FIELD_CALIBRATED_AT, 0.0).max(0.0) as u64)
        } else {
            None
        };

        Ok(StoredCalibration {
            coefficients,
            calibrated_at,
        })
    }

    /// Like [`Self::try_load`], but never fails: any error yields the defaults.
    pub fn load(&self) -> StoredCalibration {
        match self.try_load() {
            Ok(stored) => {
                info!("Loaded calibration: {}", stored.coefficients);
                stored
            }
            Err(StorageError::NotFound { .. }) => {
                info!("No calibration stored, using default values");
                self.default_calibration()
            }
            Err(e) => {
                warn!("{e}, using default calibration");
                self.default_calibration()
            }
        }
    }

    pub fn save(&mut self, coefficients: &CalibrationCoefficients) -> Result<(), StorageError> {
        let record = CalibrationRecord {
            slope: coefficients.slope,
            intercept: coefficients.intercept,
            calibrated_at: unix_seconds(),
        };

        let bytes = serde_json::to_vec(&record).map_err(|e| StorageError::corrupt(&self.key, e))?;
        self.storage.save(&self.key, &bytes)?;

        debug!("Saved calibration {coefficients} under '{}'", self.key);
        Ok(())
    }

    fn default_calibration(&self) -> StoredCalibration {
        StoredCalibration {
            coefficients: self.defaults,
            calibrated_at: None,
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
