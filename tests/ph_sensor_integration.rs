use std::{
    fs,
    sync::{Arc, Mutex},
    thread,
};

use approx::assert_relative_eq;
use ph_sensor::{
    configuration::sensor_configuration::CONFIG_KEY,
    sensors::{
        adc::ScriptedAdc,
        delay::NoopDelay,
        observer::{RecordingObserver, SensorEvent},
    },
    CalibrationCoefficients, CalibrationPoint, FileStorage, MemoryStorage, PhSensor,
    RecordStorage, SensorConfiguration, SensorError,
};

fn file_sensor(
    dir: &std::path::Path,
    samples: &[u16],
) -> PhSensor<ScriptedAdc, FileStorage, NoopDelay, RecordingObserver> {
    let storage = FileStorage::new(dir);
    let config = SensorConfiguration::load(&storage, CONFIG_KEY);

    let mut sensor = PhSensor::with_observer(
        ScriptedAdc::new(samples.iter().copied()),
        storage,
        NoopDelay::default(),
        config,
        RecordingObserver::default(),
    );
    sensor.configure(35).unwrap();
    sensor.begin().unwrap();
    sensor
}

#[test]
fn calibration_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let mut sensor = file_sensor(dir.path(), &[3000]);
    let cal = sensor.calibrate_buffers(3.05, 2.54).unwrap();
    drop(sensor);

    let sensor = file_sensor(dir.path(), &[3000]);
    let loaded = sensor.get_calibration();

    assert_relative_eq!(loaded.slope, cal.slope, epsilon = 1e-9);
    assert_relative_eq!(loaded.intercept, cal.intercept, epsilon = 1e-9);
    assert!(sensor.store().try_load().unwrap().calibrated_at.is_some());
}

#[test]
fn corrupt_calibration_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ph_calibration.json"), "{ not json").unwrap();

    let sensor = file_sensor(dir.path(), &[3000]);

    assert_eq!(sensor.get_calibration(), CalibrationCoefficients::DEFAULT);
}

#[test]
fn stored_configuration_drives_sampling() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ph_config.json"), r#"{"sample_count": 7}"#).unwrap();

    let mut sensor = file_sensor(dir.path(), &[100, 120, 110, 105, 115, 10000, 115]);
    let reading = sensor.update().unwrap();

    assert_eq!(sensor.adc().reads(), 7);
    assert_relative_eq!(reading.voltage, 113.0 * 3.3 / 4095.0, epsilon = 1e-12);
}

#[test]
fn oversized_stored_sample_count_keeps_the_default_batch() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("ph_config.json"),
        r#"{"sample_count": 1000000000000000}"#,
    )
    .unwrap();

    let mut sensor = file_sensor(dir.path(), &[2048]);
    sensor.update().unwrap();

    assert_eq!(sensor.adc().reads(), 10);
}

#[test]
fn full_calibration_session() {
    let mut sensor = PhSensor::with_observer(
        ScriptedAdc::new([2500]),
        MemoryStorage::new(),
        NoopDelay::default(),
        SensorConfiguration::default(),
        RecordingObserver::default(),
    );

    assert_eq!(sensor.update(), Err(SensorError::NotReady));
    sensor.configure(35).unwrap();
    sensor.begin().unwrap();

    let three = sensor
        .calibrate_three_point([
            CalibrationPoint::new(2.5, 4.0),
            CalibrationPoint::new(2.0, 7.0),
            CalibrationPoint::new(1.5, 10.0),
        ])
        .unwrap();
    assert_relative_eq!(three.slope, -6.0, epsilon = 1e-9);
    assert_relative_eq!(three.intercept, 19.0, epsilon = 1e-9);

    let reading = sensor.update().unwrap();
    assert_relative_eq!(reading.value, three.apply(reading.voltage), epsilon = 1e-12);

    // Probe reads 0.1 pH low against a trusted meter.
    let measured = sensor.reading().value;
    let shifted = sensor.calibrate_offset(measured, measured + 0.1).unwrap();
    assert_eq!(shifted.slope.to_bits(), three.slope.to_bits());

    sensor.reset_calibration();
    assert_eq!(sensor.get_calibration(), CalibrationCoefficients::DEFAULT);

    let stored = sensor.store().storage().load("ph_calibration").unwrap();
    let stored: serde_json::Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(stored["slope"], serde_json::json!(-6.8));
    assert_eq!(stored["intercept"], serde_json::json!(25.85));

    let calibrations = sensor
        .observer()
        .events
        .iter()
        .filter(|e| matches!(e, SensorEvent::Calibrated { .. }))
        .count();
    assert_eq!(calibrations, 3);
}

#[test]
fn shared_sensor_serializes_calibration_and_updates() {
    let mut sensor = PhSensor::with_observer(
        ScriptedAdc::new([2000]),
        MemoryStorage::new(),
        NoopDelay::default(),
        SensorConfiguration::default(),
        RecordingObserver::default(),
    );
    sensor.configure(35).unwrap();
    sensor.begin().unwrap();
    let sensor = Arc::new(Mutex::new(sensor));

    let calibrator = {
        let sensor = Arc::clone(&sensor);
        thread::spawn(move || {
            for i in 1..=20 {
                let slope = -(i as f64);
                sensor.lock().unwrap().set_calibration(slope, -slope * 3.0).unwrap();
            }
        })
    };

    for _ in 0..20 {
        let mut sensor = sensor.lock().unwrap();
        let reading = sensor.update().unwrap();
        let cal = sensor.get_calibration();
        assert_relative_eq!(reading.value, cal.apply(reading.voltage), epsilon = 1e-9);
    }

    calibrator.join().unwrap();
    assert_eq!(sensor.lock().unwrap().get_calibration().slope, -20.0);
}
