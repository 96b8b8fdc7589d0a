use embedded_hal::delay::DelayNs;
use log::{error, info};
use ph_sensor::{
    configuration::sensor_configuration::{SensorConfiguration, CONFIG_KEY},
    sensors::{adc::AdcChannel, observer::SensorObserver},
    PhSensor, RecordStorage, Sensor,
};
use serde_json::{Map, Value};

const MEASURE_PERIOD_MS: u32 = 1000;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_svc::hal::{adc::oneshot::AdcDriver, delay::FreeRtos, peripherals::Peripherals};
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use ph_sensor::{configuration::nvs_storage::NvsStorage, sensors::esp_adc::EspAdcChannel};

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let storage = NvsStorage::new(EspDefaultNvsPartition::take()?)?;
    let config = SensorConfiguration::load(&storage, CONFIG_KEY);

    // The probe front end is wired to GPIO35 (ADC1 channel 7).
    let adc_driver = AdcDriver::new(peripherals.adc1)?;
    let adc = EspAdcChannel::new(&adc_driver, peripherals.pins.gpio35, 35, config.attenuation)?;

    let mut sensor = PhSensor::new(adc, storage, FreeRtos, config.clone());
    sensor.configure(config.pin)?;
    sensor.begin()?;

    loop {
        report(&mut sensor);
        FreeRtos::delay_ms(MEASURE_PERIOD_MS);
    }
}

/// Runs the probe against a simulated ADC, with calibration kept in
/// `<data dir>/ph_calibration.json`.
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use std::{path::PathBuf, thread, time::Duration};

    use ph_sensor::{
        sensors::{adc::ScriptedAdc, delay::StdDelay},
        FileStorage,
    };

    const HOST_CYCLES: usize = 5;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ph_sensor_data"));
    info!("Using data directory {}", data_dir.display());

    let storage = FileStorage::new(&data_dir);
    let config = SensorConfiguration::load(&storage, CONFIG_KEY);

    // Probe sitting near pH 7 with a little noise and one spike per batch.
    let adc = ScriptedAdc::new([3440, 3452, 3434, 3448, 4095, 3441, 3437, 3450, 3445, 3439]);

    let mut sensor = PhSensor::new(adc, storage, StdDelay, config.clone());
    sensor.configure(config.pin)?;
    sensor.begin()?;

    for _ in 0..HOST_CYCLES {
        report(&mut sensor);
        thread::sleep(Duration::from_millis(MEASURE_PERIOD_MS as u64));
    }

    Ok(())
}

fn report<A, S, D, O>(sensor: &mut PhSensor<A, S, D, O>)
where
    A: AdcChannel,
    S: RecordStorage,
    D: DelayNs,
    O: SensorObserver,
{
    match sensor.update() {
        Ok(_) => {
            let mut map = Map::new();
            sensor.add_json_value(&mut map);
            info!("{}", sensor.pretty_print());
            info!("{}", Value::Object(map));
        }
        Err(e) => error!("Measurement failed: {e}"),
    }
}
