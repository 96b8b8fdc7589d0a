use std::borrow::Borrow;

use esp_idf_svc::{
    hal::{
        adc::{
            attenuation,
            oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
            Adc,
        },
        gpio::ADCPin,
    },
    sys::{adc_atten_t, EspError},
};
use thiserror::Error;

use super::adc::{AdcChannel, Attenuation};

/// Oneshot conversions on ESP32 are 12 bits wide.
const ESP_RESOLUTION_BITS: u8 = 12;

#[derive(Debug, Error)]
pub enum EspAdcError {
    #[error("channel is wired to GPIO {wired}, not GPIO {requested}")]
    PinMismatch { wired: u8, requested: u8 },

    #[error("channel was set up with {wired} attenuation, not {requested}")]
    AttenuationMismatch {
        wired: Attenuation,
        requested: Attenuation,
    },

    #[error("unsupported resolution of {0} bits")]
    UnsupportedResolution(u8),

    #[error(transparent)]
    Driver(#[from] EspError),
}

fn to_esp_attenuation(value: Attenuation) -> adc_atten_t {
    match value {
        Attenuation::Db0 => attenuation::NONE,
        Attenuation::Db2_5 => attenuation::DB_2_5,
        Attenuation::Db6 => attenuation::DB_6,
        Attenuation::Db11 => attenuation::DB_11,
    }
}

/// One ADC channel of the probe. The GPIO is chosen at type level, so
/// `configure` only checks the runtime pin against the wired one.
pub struct EspAdcChannel<'a, ADC: Adc + 'a, APin: ADCPin<Adc = ADC>, M: Borrow<AdcDriver<'a, ADC>>>
{
    channel: AdcChannelDriver<'a, APin, M>,
    pin: u8,
    attenuation: Attenuation,
}

impl<'a, ADC: Adc + 'a, APin: ADCPin<Adc = ADC>, M: Borrow<AdcDriver<'a, ADC>>>
    EspAdcChannel<'a, ADC, APin, M>
{
    pub fn new(
        adc_driver: M,
        pin_adc: APin,
        pin: u8,
        attenuation: Attenuation,
    ) -> Result<Self, EspAdcError> {
        Ok(Self {
            channel: AdcChannelDriver::new(
                adc_driver,
                pin_adc,
                &AdcChannelConfig {
                    attenuation: to_esp_attenuation(attenuation),
                    calibration: false,
                    ..Default::default()
                },
            )?,
            pin,
            attenuation,
        })
    }
}

impl<'a, ADC: Adc + 'a, APin: ADCPin<Adc = ADC>, M: Borrow<AdcDriver<'a, ADC>>> AdcChannel
    for EspAdcChannel<'a, ADC, APin, M>
{
    type Error = EspAdcError;

    fn configure(
        &mut self,
        pin: u8,
        attenuation: Attenuation,
        resolution_bits: u8,
    ) -> Result<(), Self::Error> {
        if pin != self.pin {
            return Err(EspAdcError::PinMismatch {
                wired: self.pin,
                requested: pin,
            });
        }
        if attenuation != self.attenuation {
            return Err(EspAdcError::AttenuationMismatch {
                wired: self.attenuation,
                requested: attenuation,
            });
        }
        if resolution_bits != ESP_RESOLUTION_BITS {
            return Err(EspAdcError::UnsupportedResolution(resolution_bits));
        }

        Ok(())
    }

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        Ok(self.channel.read_raw()?)
    }
}
