pub mod calibration_store;
pub mod record;
pub mod sensor_configuration;
pub mod storage;

#[cfg(target_os = "espidf")]
pub mod nvs_storage;
