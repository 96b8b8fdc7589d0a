use log::{debug, error, info, warn};

use super::{
    calibration::{CalibrationCoefficients, CalibrationError, CalibrationMethod},
    health::HealthStatus,
    ph_sensor::Reading,
};
use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Ready {
        pin: u8,
        coefficients: CalibrationCoefficients,
    },
    Measured {
        reading: Reading,
    },
    Calibrated {
        method: CalibrationMethod,
        coefficients: CalibrationCoefficients,
    },
    CalibrationRejected {
        method: CalibrationMethod,
        error: CalibrationError,
    },
    PersistenceFailed {
        error: StorageError,
    },
    HealthChanged {
        status: HealthStatus,
    },
}

pub trait SensorObserver {
    fn on_event(&mut self, event: &SensorEvent);
}

/// Renders events through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SensorObserver for LogObserver {
    fn on_event(&mut self, event: &SensorEvent) {
        match event {
            SensorEvent::Ready { pin, coefficients } => {
                info!("PH sensor ready on GPIO {pin} ({coefficients})")
            }
            SensorEvent::Measured { reading } => {
                debug!("Voltage: {:.3} V | pH: {:.2}", reading.voltage, reading.value)
            }
            SensorEvent::Calibrated {
                method,
                coefficients,
            } => info!("{method} calibration applied: {coefficients}"),
            SensorEvent::CalibrationRejected { method, error } => {
                warn!("{method} calibration rejected: {error}")
            }
            SensorEvent::PersistenceFailed { error } => {
                error!("Could not save calibration: {error}")
            }
            SensorEvent::HealthChanged { status } => {
                if status.is_ok() {
                    info!("Sensor health: {status}")
                } else {
                    warn!("Sensor health: {status}")
                }
            }
        }
    }
}

/// Keeps every event, for tests and host tooling.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<SensorEvent>,
}

impl SensorObserver for RecordingObserver {
    fn on_event(&mut self, event: &SensorEvent) {
        self.events.push(event.clone());
    }
}
