use log::{info, warn};

use super::{record::Record, storage::RecordStorage};
use crate::{
    error::StorageError,
    sensors::{adc::Attenuation, calibration::CalibrationCoefficients},
};

pub const CONFIG_KEY: &str = "ph_config";
pub const CALIBRATION_KEY: &str = "ph_calibration";

pub const DEFAULT_PIN: u8 = 35;
pub const DEFAULT_RESOLUTION_BITS: u8 = 12;
pub const DEFAULT_REFERENCE_VOLTAGE: f64 = 3.3;
pub const DEFAULT_SAMPLE_COUNT: usize = 10;
pub const DEFAULT_SAMPLE_DELAY_MS: u32 = 10;
/// Upper bounds for overrides; one batch must fit in memory and finish in seconds.
pub const MAX_SAMPLE_COUNT: usize = 256;
pub const MAX_SAMPLE_DELAY_MS: u32 = 1000;

pub const KEY_PIN: &str = "pin";
pub const KEY_ATTENUATION: &str = "attenuation";
pub const KEY_RESOLUTION: &str = "resolution_bits";
pub const KEY_VREF: &str = "reference_voltage";
pub const KEY_SAMPLES: &str = "sample_count";
pub const KEY_SAMPLE_DELAY: &str = "sample_delay_ms";
pub const KEY_MAX_VOLTAGE: &str = "max_valid_voltage";
pub const KEY_CALIBRATION: &str = "calibration_key";
pub const KEY_DEFAULT_SLOPE: &str = "default_slope";
pub const KEY_DEFAULT_INTERCEPT: &str = "default_intercept";

#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfiguration {
    pub pin: u8,
    pub attenuation: Attenuation,
    pub resolution_bits: u8,
    pub reference_voltage: f64,
    pub sample_count: usize,
    pub sample_delay_ms: u32,
    /// Health threshold, exclusive.
    pub max_valid_voltage: f64,
    pub calibration_key: String,
    pub default_coefficients: CalibrationCoefficients,
}

impl Default for SensorConfiguration {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN,
            attenuation: Attenuation::Db11,
            resolution_bits: DEFAULT_RESOLUTION_BITS,
            reference_voltage: DEFAULT_REFERENCE_VOLTAGE,
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_delay_ms: DEFAULT_SAMPLE_DELAY_MS,
            max_valid_voltage: DEFAULT_REFERENCE_VOLTAGE,
            calibration_key: CALIBRATION_KEY.to_string(),
            default_coefficients: CalibrationCoefficients::DEFAULT,
        }
    }
}

impl SensorConfiguration {
    /// Highest raw conversion, e.g. 4095 for 12 bits.
    pub fn adc_full_scale(&self) -> u32 {
        (1u32 << self.resolution_bits) - 1
    }

    /// Reads the override record under `key`. Every field missing from the
    /// record, or unusable, keeps its default.
    pub fn load<S: RecordStorage>(storage: &S, key: &str) -> Self {
        let bytes = match storage.load(key) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound { .. }) => {
                info!("No sensor configuration stored, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!("{e}, using default sensor configuration");
                return Self::default();
            }
        };

        match Record::parse(key, &bytes) {
            Ok(record) => Self::from_record(&record),
            Err(e) => {
                warn!("{e}, using default sensor configuration");
                Self::default()
            }
        }
    }

    pub fn from_record(record: &Record) -> Self {
        let defaults = Self::default();

        let pin = u8::try_from(record.read_unsigned(KEY_PIN, defaults.pin as u64))
            .unwrap_or(defaults.pin);

        let attenuation =
            Attenuation::from_label(&record.read_string(KEY_ATTENUATION, defaults.attenuation.label()))
                .unwrap_or(defaults.attenuation);

        let resolution_bits = match record.read_unsigned(KEY_RESOLUTION, defaults.resolution_bits as u64) {
            bits @ 1..=16 => bits as u8,
            bits => {
                warn!("Unsupported ADC resolution of {bits} bits, keeping {}", defaults.resolution_bits);
                defaults.resolution_bits
            }
        };

        let reference_voltage = positive_or(
            record.read_float(KEY_VREF, defaults.reference_voltage),
            defaults.reference_voltage,
        );

        let sample_count = match record.read_unsigned(KEY_SAMPLES, defaults.sample_count as u64) {
            count @ 1..=MAX_SAMPLE_COUNT_U64 => count as usize,
            count => {
                warn!("Unsupported sample count of {count}, keeping {}", defaults.sample_count);
                defaults.sample_count
            }
        };

        let sample_delay_ms =
            match record.read_unsigned(KEY_SAMPLE_DELAY, defaults.sample_delay_ms as u64) {
                delay @ 0..=MAX_SAMPLE_DELAY_MS_U64 => delay as u32,
                delay => {
                    warn!("Sample delay of {delay} ms is too long, keeping {} ms", defaults.sample_delay_ms);
                    defaults.sample_delay_ms
                }
            };

        // The health threshold tracks the reference voltage unless set explicitly.
        let max_valid_voltage = positive_or(
            record.read_float(KEY_MAX_VOLTAGE, reference_voltage),
            reference_voltage,
        );

        let default_coefficients = CalibrationCoefficients::new(
            record.read_float(KEY_DEFAULT_SLOPE, defaults.default_coefficients.slope),
            record.read_float(KEY_DEFAULT_INTERCEPT, defaults.default_coefficients.intercept),
        )
        .unwrap_or(defaults.default_coefficients);

        Self {
            pin,
            attenuation,
            resolution_bits,
            reference_voltage,
            sample_count,
            sample_delay_ms,
            max_valid_voltage,
            calibration_key: record.read_string(KEY_CALIBRATION, &defaults.calibration_key),
            default_coefficients,
        }
    }
}

const MAX_SAMPLE_COUNT_U64: u64 = MAX_SAMPLE_COUNT as u64;
const MAX_SAMPLE_DELAY_MS_U64: u64 = MAX_SAMPLE_DELAY_MS as u64;

fn positive_or(value: f64, default: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        default
    }
}
