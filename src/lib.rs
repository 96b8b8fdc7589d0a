//! Analog pH probe driver.
//!
//! Samples an ADC channel, filters the batch with a trimmed mean, maps the
//! voltage to pH through a linear calibration and persists the calibration
//! coefficients in a key/value store.

pub mod configuration;
pub mod error;
pub mod sensors;

pub use configuration::calibration_store::{CalibrationStore, StoredCalibration};
pub use configuration::sensor_configuration::SensorConfiguration;
pub use configuration::storage::{FileStorage, MemoryStorage, RecordStorage};
pub use error::{SensorError, StorageError};
pub use sensors::calibration::{CalibrationCoefficients, CalibrationError, CalibrationPoint};
pub use sensors::health::{HealthMonitor, HealthState, HealthStatus};
pub use sensors::ph_sensor::{PhSensor, Reading};
pub use sensors::sensor::Sensor;
