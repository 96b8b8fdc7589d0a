use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub state: HealthState,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            state: HealthState::Ok,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == HealthState::Ok
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.state, &self.message) {
            (HealthState::Ok, _) => f.write_str("OK"),
            (HealthState::Error, Some(message)) => write!(f, "ERROR: {message}"),
            (HealthState::Error, None) => f.write_str("ERROR"),
        }
    }
}

/// Advisory probe check. A voltage strictly above `max_valid_voltage` means the
/// front end is floating, usually because the probe is not immersed.
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitor {
    max_valid_voltage: f64,
}

impl HealthMonitor {
    pub fn new(max_valid_voltage: f64) -> Self {
        Self { max_valid_voltage }
    }

    pub fn check(&self, voltage: f64) -> HealthStatus {
        if voltage > self.max_valid_voltage {
            HealthStatus::error(format!(
                "voltage {voltage:.3} V above {:.3} V, probe not immersed or disconnected",
                self.max_valid_voltage
            ))
        } else {
            HealthStatus::ok()
        }
    }
}
