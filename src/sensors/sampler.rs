use embedded_hal::delay::DelayNs;
use log::warn;

use super::adc::AdcChannel;
use crate::{configuration::sensor_configuration::SensorConfiguration, error::SensorError};

/// Below this many samples the batch is averaged without trimming.
pub const MIN_TRIMMED_SAMPLES: usize = 5;

/// Mean after dropping one occurrence of the minimum and one of the maximum.
/// Batches shorter than [`MIN_TRIMMED_SAMPLES`] are averaged as they are.
pub fn trimmed_mean(samples: &[u16]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sum: u64 = samples.iter().map(|&s| s as u64).sum();
    let plain_mean = sum as f64 / samples.len() as f64;

    if samples.len() < MIN_TRIMMED_SAMPLES {
        return Some(plain_mean);
    }

    let min = samples.iter().copied().min()? as u64;
    let max = samples.iter().copied().max()? as u64;
    let kept = samples.len() - 2;

    if kept == 0 {
        return Some(plain_mean);
    }

    Some((sum - min - max) as f64 / kept as f64)
}

pub struct Sampler<D: DelayNs> {
    delay: D,
    sample_count: usize,
    sample_delay_ms: u32,
    reference_voltage: f64,
    full_scale: f64,
}

impl<D: DelayNs> Sampler<D> {
    pub fn new(delay: D, config: &SensorConfiguration) -> Self {
        Self {
            delay,
            sample_count: config.sample_count,
            sample_delay_ms: config.sample_delay_ms,
            reference_voltage: config.reference_voltage,
            full_scale: config.adc_full_scale() as f64,
        }
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Reads one batch, one fixed delay after every conversion. Failed
    /// conversions are dropped from the batch; the call only fails when
    /// none succeeded.
    pub fn acquire<A: AdcChannel>(&mut self, adc: &mut A) -> Result<Vec<u16>, SensorError> {
        let mut samples = Vec::with_capacity(self.sample_count);
        let mut last_error = None;

        for _ in 0..self.sample_count {
            match adc.read_raw() {
                Ok(raw) => samples.push(raw),
                Err(e) => {
                    warn!("ADC conversion failed: {e}");
                    last_error = Some(e.to_string());
                }
            }
            self.delay.delay_ms(self.sample_delay_ms);
        }

        if samples.is_empty() {
            return Err(SensorError::Adc(
                last_error.unwrap_or_else(|| "no samples requested".to_string()),
            ));
        }

        Ok(samples)
    }

    pub fn sample<A: AdcChannel>(&mut self, adc: &mut A) -> Result<f64, SensorError> {
        let samples = self.acquire(adc)?;
        let raw_average = trimmed_mean(&samples)
            .ok_or_else(|| SensorError::Adc("empty sample batch".to_string()))?;

        Ok(self.raw_to_voltage(raw_average))
    }

    pub fn raw_to_voltage(&self, raw: f64) -> f64 {
        raw * self.reference_voltage / self.full_scale
    }
}
