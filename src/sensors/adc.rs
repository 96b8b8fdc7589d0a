use std::fmt;

use thiserror::Error;

/// Input attenuation of an ESP32 ADC channel, which sets its full-scale voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    Db11,
}

impl Attenuation {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "0db" => Some(Self::Db0),
            "2.5db" => Some(Self::Db2_5),
            "6db" => Some(Self::Db6),
            "11db" => Some(Self::Db11),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Db0 => "0db",
            Self::Db2_5 => "2.5db",
            Self::Db6 => "6db",
            Self::Db11 => "11db",
        }
    }
}

impl fmt::Display for Attenuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub trait AdcChannel {
    type Error: fmt::Display;

    fn configure(
        &mut self,
        pin: u8,
        attenuation: Attenuation,
        resolution_bits: u8,
    ) -> Result<(), Self::Error>;

    /// Raw conversion in `0..=2^resolution_bits - 1`.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptedAdcError {
    #[error("unsupported resolution of {0} bits")]
    UnsupportedResolution(u8),

    #[error("channel not configured")]
    NotConfigured,

    #[error("conversion failed")]
    ReadFailed,
}

/// Replays a fixed sequence of conversions, wrapping around at the end.
/// `None` entries simulate a failed conversion.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAdc {
    samples: Vec<Option<u16>>,
    cursor: usize,
    pin: Option<u8>,
    reads: usize,
}

impl ScriptedAdc {
    pub fn new(samples: impl IntoIterator<Item = u16>) -> Self {
        Self::with_failures(samples.into_iter().map(Some))
    }

    pub fn with_failures(samples: impl IntoIterator<Item = Option<u16>>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn pin(&self) -> Option<u8> {
        self.pin
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl AdcChannel for ScriptedAdc {
    type Error = ScriptedAdcError;

    fn configure(
        &mut self,
        pin: u8,
        _attenuation: Attenuation,
        resolution_bits: u8,
    ) -> Result<(), Self::Error> {
        if resolution_bits == 0 || resolution_bits > 16 {
            return Err(ScriptedAdcError::UnsupportedResolution(resolution_bits));
        }

        self.pin = Some(pin);
        Ok(())
    }

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        if self.pin.is_none() {
            return Err(ScriptedAdcError::NotConfigured);
        }
        if self.samples.is_empty() {
            return Err(ScriptedAdcError::ReadFailed);
        }

        let sample = self.samples[self.cursor];
        self.cursor = (self.cursor + 1) % self.samples.len();
        self.reads += 1;

        sample.ok_or(ScriptedAdcError::ReadFailed)
    }
}
