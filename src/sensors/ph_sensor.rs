use embedded_hal::delay::DelayNs;
use serde_json::{json, Map, Value};

use super::{
    adc::AdcChannel,
    calibration::{CalibrationCoefficients, CalibrationError, CalibrationMethod, CalibrationPoint},
    health::{HealthMonitor, HealthStatus},
    observer::{LogObserver, SensorEvent, SensorObserver},
    sampler::Sampler,
    sensor::Sensor,
};
use crate::{
    configuration::{
        calibration_store::CalibrationStore, sensor_configuration::SensorConfiguration,
        storage::RecordStorage,
    },
    error::SensorError,
};

const VALUE_DECIMALS: i32 = 2;
const VOLTAGE_DECIMALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub voltage: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Uninitialized,
    Configured { pin: u8 },
    Ready { pin: u8 },
}

/// Analog pH probe: `configure()` binds the ADC pin, `begin()` loads the
/// calibration, then each `update()` takes a fresh measurement.
pub struct PhSensor<A, S, D, O = LogObserver>
where
    A: AdcChannel,
    S: RecordStorage,
    D: DelayNs,
    O: SensorObserver,
{
    adc: A,
    sampler: Sampler<D>,
    store: CalibrationStore<S>,
    health_monitor: HealthMonitor,
    observer: O,
    config: SensorConfiguration,
    state: SensorState,
    coefficients: CalibrationCoefficients,
    reading: Reading,
    health: HealthStatus,
}

impl<A, S, D> PhSensor<A, S, D, LogObserver>
where
    A: AdcChannel,
    S: RecordStorage,
    D: DelayNs,
{
    pub fn new(adc: A, storage: S, delay: D, config: SensorConfiguration) -> Self {
        Self::with_observer(adc, storage, delay, config, LogObserver)
    }
}

impl<A, S, D, O> PhSensor<A, S, D, O>
where
    A: AdcChannel,
    S: RecordStorage,
    D: DelayNs,
    O: SensorObserver,
{
    pub fn with_observer(
        adc: A,
        storage: S,
        delay: D,
        config: SensorConfiguration,
        observer: O,
    ) -> Self {
        Self {
            adc,
            sampler: Sampler::new(delay, &config),
            store: CalibrationStore::new(
                storage,
                config.calibration_key.clone(),
                config.default_coefficients,
            ),
            health_monitor: HealthMonitor::new(config.max_valid_voltage),
            observer,
            coefficients: config.default_coefficients,
            config,
            state: SensorState::Uninitialized,
            reading: Reading::default(),
            health: HealthStatus::ok(),
        }
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn pin(&self) -> Option<u8> {
        match self.state {
            SensorState::Uninitialized => None,
            SensorState::Configured { pin } | SensorState::Ready { pin } => Some(pin),
        }
    }

    pub fn store(&self) -> &CalibrationStore<S> {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    /// Binds the ADC channel. Calibration is not loaded until `begin()`.
    pub fn configure(&mut self, pin: u8) -> Result<(), SensorError> {
        self.adc
            .configure(pin, self.config.attenuation, self.config.resolution_bits)
            .map_err(|e| SensorError::Adc(e.to_string()))?;

        self.state = SensorState::Configured { pin };
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), SensorError> {
        let pin = self.pin().ok_or(SensorError::NotConfigured)?;

        self.coefficients = self.store.load().coefficients;
        self.state = SensorState::Ready { pin };

        self.observer.on_event(&SensorEvent::Ready {
            pin,
            coefficients: self.coefficients,
        });
        Ok(())
    }

    /// Moves the sensor to another pin and reloads the calibration.
    pub fn reconfigure(&mut self, pin: u8) -> Result<(), SensorError> {
        if self.state == (SensorState::Ready { pin }) {
            return Ok(());
        }

        self.configure(pin)?;
        self.begin()
    }

    /// Takes a fresh measurement. Blocks for `sample_count` sample delays.
    pub fn update(&mut self) -> Result<Reading, SensorError> {
        if !matches!(self.state, SensorState::Ready { .. }) {
            return Err(SensorError::NotReady);
        }

        let voltage = self.sampler.sample(&mut self.adc)?;
        self.reading = Reading {
            voltage,
            value: self.coefficients.apply(voltage),
        };

        let health = self.health_monitor.check(voltage);
        if health != self.health {
            self.observer.on_event(&SensorEvent::HealthChanged {
                status: health.clone(),
            });
        }
        self.health = health;

        self.observer.on_event(&SensorEvent::Measured {
            reading: self.reading,
        });
        Ok(self.reading)
    }

    /// Last pH value, rounded for display.
    pub fn get_value(&self) -> f64 {
        round_to(self.reading.value, VALUE_DECIMALS)
    }

    /// Last probe voltage, rounded for display.
    pub fn get_voltage(&self) -> f64 {
        round_to(self.reading.voltage, VOLTAGE_DECIMALS)
    }

    /// Last unrounded reading.
    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn get_health(&self) -> &HealthStatus {
        &self.health
    }

    pub fn get_calibration(&self) -> CalibrationCoefficients {
        self.coefficients
    }

    pub fn calibrate_two_point(
        &mut self,
        a: CalibrationPoint,
        b: CalibrationPoint,
    ) -> Result<CalibrationCoefficients, SensorError> {
        let fitted = CalibrationCoefficients::two_point(a, b);
        self.apply_calibration(CalibrationMethod::TwoPoint, fitted)
    }

    pub fn calibrate_three_point(
        &mut self,
        points: [CalibrationPoint; 3],
    ) -> Result<CalibrationCoefficients, SensorError> {
        let fitted = CalibrationCoefficients::three_point(points);
        self.apply_calibration(CalibrationMethod::ThreePoint, fitted)
    }

    /// Two-point calibration against pH 4.0 and pH 7.0 buffer solutions.
    pub fn calibrate_buffers(
        &mut self,
        ph4_voltage: f64,
        ph7_voltage: f64,
    ) -> Result<CalibrationCoefficients, SensorError> {
        let fitted = CalibrationCoefficients::from_buffers(ph4_voltage, ph7_voltage);
        self.apply_calibration(CalibrationMethod::Buffers, fitted)
    }

    pub fn calibrate_offset(
        &mut self,
        measured: f64,
        truth: f64,
    ) -> Result<CalibrationCoefficients, SensorError> {
        let shifted = self.coefficients.with_offset(measured, truth);
        self.apply_calibration(CalibrationMethod::Offset, shifted)
    }

    pub fn set_calibration(
        &mut self,
        slope: f64,
        intercept: f64,
    ) -> Result<CalibrationCoefficients, SensorError> {
        let direct = CalibrationCoefficients::new(slope, intercept);
        self.apply_calibration(CalibrationMethod::Direct, direct)
    }

    pub fn reset_calibration(&mut self) -> CalibrationCoefficients {
        let defaults = self.store.defaults();
        self.commit(CalibrationMethod::Reset, defaults);
        defaults
    }

    fn apply_calibration(
        &mut self,
        method: CalibrationMethod,
        fitted: Result<CalibrationCoefficients, CalibrationError>,
    ) -> Result<CalibrationCoefficients, SensorError> {
        match fitted {
            Ok(coefficients) => {
                self.commit(method, coefficients);
                Ok(coefficients)
            }
            Err(error) => {
                self.observer
                    .on_event(&SensorEvent::CalibrationRejected { method, error });
                Err(error.into())
            }
        }
    }

    /// Applies the coefficients, then persists them. A failed save keeps the
    /// new coefficients in memory.
    fn commit(&mut self, method: CalibrationMethod, coefficients: CalibrationCoefficients) {
        self.coefficients = coefficients;

        if let Err(error) = self.store.save(&coefficients) {
            self.observer
                .on_event(&SensorEvent::PersistenceFailed { error });
        }

        self.observer.on_event(&SensorEvent::Calibrated {
            method,
            coefficients,
        });
    }
}

impl<A, S, D, O> Sensor for PhSensor<A, S, D, O>
where
    A: AdcChannel,
    S: RecordStorage,
    D: DelayNs,
    O: SensorObserver,
{
    fn add_json_value(&mut self, map: &mut Map<String, Value>) {
        map.insert("ph".to_string(), json!(self.get_value()));
        map.insert("voltage".to_string(), json!(self.get_voltage()));
        map.insert("slope".to_string(), json!(self.coefficients.slope));
        map.insert("intercept".to_string(), json!(self.coefficients.intercept));
        map.insert("health".to_string(), json!(self.health.to_string()));
    }

    fn pretty_print(&mut self) -> String {
        let pin = self
            .pin()
            .map(|p| format!("GPIO {p}"))
            .unwrap_or_else(|| "unbound".to_string());

        format!(
            "{pin} | Voltage: {:.3} V | pH: {:.2} | {} | {}",
            self.reading.voltage, self.reading.value, self.coefficients, self.health
        )
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
