pub mod adc;
pub mod calibration;
pub mod delay;
pub mod health;
pub mod observer;
pub mod ph_sensor;
pub mod sampler;
pub mod sensor;

#[cfg(target_os = "espidf")]
pub mod esp_adc;
