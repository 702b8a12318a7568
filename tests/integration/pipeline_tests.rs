//! End-to-end tests for the ranging pipeline.
//!
//! The trigger pin is a `SimEcho`, which plays the scripted echo through
//! the real `EchoIsr` on every pulse; everything downstream of the echo
//! edges (raw queue, measurement task, EMA, processed channel) is the
//! production code.

use std::collections::VecDeque;
use std::time::Duration;

use rangeguide::adapters::time::SystemClock;
use rangeguide::config::{
    SensorConfig, KEY_MEASUREMENT_INTERVAL_MS, KEY_SENSOR_TIMEOUT_MS, KEY_SMOOTHING_FACTOR,
};
use rangeguide::error::Error;
use rangeguide::sensors::channels::PROCESSED_CAPACITY;
use rangeguide::sensors::sim::{EchoSource, SimEcho};
use rangeguide::sensors::{echo_link, DistanceSensor, MeasurementStatus};

use crate::mock_hw::{MemStore, NoDelay};

type SimSensor = DistanceSensor<SimEcho<SystemClock>, NoDelay, SystemClock>;

fn fast_config() -> SensorConfig {
    SensorConfig {
        measurement_interval_ms: 50,
        timeout_ms: 10,
        ..SensorConfig::with_pins(14, 13)
    }
}

fn sim_sensor(config: SensorConfig, source: EchoSource) -> SimSensor {
    let (isr, echo) = echo_link();
    let clock = SystemClock::new();
    let pin = SimEcho::new(isr, clock, source);
    DistanceSensor::new(config, pin, NoDelay, clock, echo).expect("valid config")
}

// ── Smoothing ────────────────────────────────────────────────

#[test]
fn scripted_echoes_are_smoothed_in_order() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::distances([800, 820, 810], 200));
    sensor.start().unwrap();

    let got: Vec<_> = (0..3).map(|_| sensor.get_latest().unwrap()).collect();
    sensor.stop().unwrap();

    let mm: Vec<u16> = got.iter().map(|r| r.distance_mm).collect();
    assert_eq!(mm, vec![800, 806, 807]);
    assert!(got.iter().all(|r| r.status == MeasurementStatus::Ok));
    assert!(
        got.windows(2).all(|w| w[0].timestamp_us < w[1].timestamp_us),
        "timestamps must increase: {:?}",
        got
    );
}

#[test]
fn out_of_range_reading_does_not_disturb_filter() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::distances([500, 5000, 520], 200));
    sensor.start().unwrap();

    let first = sensor.get_latest().unwrap();
    let second = sensor.get_latest().unwrap();
    let third = sensor.get_latest().unwrap();
    sensor.stop().unwrap();

    assert_eq!((first.distance_mm, first.status), (500, MeasurementStatus::Ok));
    assert_eq!(second.status, MeasurementStatus::OutOfRange);
    assert_eq!(second.distance_mm, 5000, "raw distance reported unsmoothed");
    assert_eq!((third.distance_mm, third.status), (506, MeasurementStatus::Ok));
}

#[test]
fn smoothing_factor_1000_passes_samples_through() {
    let config = SensorConfig {
        smoothing_factor: 1000,
        ..fast_config()
    };
    let mut sensor = sim_sensor(config, EchoSource::distances([800, 1200], 200));
    sensor.start().unwrap();
    assert_eq!(sensor.get_latest().unwrap().distance_mm, 800);
    assert_eq!(sensor.get_latest().unwrap().distance_mm, 1200);
    sensor.stop().unwrap();
}

// ── Timeouts ─────────────────────────────────────────────────

#[test]
fn missing_echo_yields_timeout_reading() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::script([None, Some(5800)]));
    sensor.start().unwrap();

    let missed = sensor.get_latest().unwrap();
    assert_eq!(missed.status, MeasurementStatus::Timeout);
    assert_eq!(missed.distance_mm, 0);
    assert!(missed.timestamp_us > 0);

    // 5800 µs at 20 °C is just under a metre.  The timeout did not seed
    // the filter, so this is the first sample.
    let hit = sensor.get_latest().unwrap();
    sensor.stop().unwrap();
    assert_eq!(hit.status, MeasurementStatus::Ok);
    assert!((990..=1000).contains(&hit.distance_mm), "got {}", hit.distance_mm);
}

// ── Lifecycle ────────────────────────────────────────────────

#[test]
fn start_and_stop_reject_wrong_state() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::sweep(200));

    assert!(!sensor.is_running());
    assert_eq!(sensor.stop(), Err(Error::InvalidState));
    assert_eq!(sensor.monitor(), Err(Error::InvalidState));

    sensor.start().unwrap();
    assert!(sensor.is_running());
    assert_eq!(sensor.start(), Err(Error::InvalidState));
    assert_eq!(sensor.monitor(), Ok(()));

    sensor.stop().unwrap();
    assert!(!sensor.is_running());
}

#[test]
fn stopped_sensor_drains_then_reports_invalid_state() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::distances([700; 8], 200));
    sensor.start().unwrap();
    assert_eq!(sensor.get_latest().unwrap().distance_mm, 700);
    sensor.stop().unwrap();

    // Whatever was published before the stop is still delivered.
    let mut drained = 0;
    while let Ok(r) = sensor.get_latest() {
        assert_eq!(r.status, MeasurementStatus::Ok);
        drained += 1;
        assert!(drained <= PROCESSED_CAPACITY);
    }
    assert_eq!(sensor.get_latest(), Err(Error::InvalidState));
    assert!(!sensor.has_new_measurement());
}

#[test]
fn restart_begins_with_fresh_filter() {
    let mut sensor = sim_sensor(
        fast_config(),
        EchoSource::distances([1000, 2000, 2000, 2000], 200),
    );
    sensor.start().unwrap();
    assert_eq!(sensor.get_latest().unwrap().distance_mm, 1000);
    sensor.stop().unwrap();
    while sensor.get_latest().is_ok() {}

    sensor.start().unwrap();
    let after = sensor.get_latest().unwrap();
    sensor.stop().unwrap();
    assert_eq!(after.distance_mm, 2000, "a reused filter would give 1300");
}

#[test]
fn dropping_running_sensor_stops_task() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::sweep(200));
    sensor.start().unwrap();
    let reader = sensor.reader();
    assert!(reader.is_running());
    drop(sensor);
    assert!(!reader.is_running());
}

// ── Overflow ─────────────────────────────────────────────────

#[test]
fn unread_readings_overflow_and_keep_newest() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::sweep(200));
    sensor.start().unwrap();

    // At 50 ms per cycle the channel fills after about 250 ms.
    std::thread::sleep(Duration::from_millis(600));
    assert!(sensor.has_new_measurement());
    assert!(sensor.overflow_count() >= 1, "overflows: {}", sensor.overflow_count());
    assert_eq!(sensor.monitor(), Ok(()));

    sensor.stop().unwrap();
    let mut kept = Vec::new();
    while let Ok(r) = sensor.get_latest() {
        kept.push(r);
    }
    assert_eq!(kept.len(), PROCESSED_CAPACITY);
    // Sweep starts at 50 mm, so evicted readings are the closest ones.
    assert!(kept[0].distance_mm > 50);
    assert!(kept.windows(2).all(|w| w[0].timestamp_us < w[1].timestamp_us));
}

// ── Reader handle ────────────────────────────────────────────

#[test]
fn reader_on_another_thread_receives_readings() {
    let mut sensor = sim_sensor(fast_config(), EchoSource::distances([300, 300, 300], 200));
    let reader = sensor.reader();
    sensor.start().unwrap();

    let consumer = std::thread::spawn(move || {
        (0..3)
            .map(|_| reader.get_latest().map(|r| r.distance_mm))
            .collect::<Result<Vec<_>, _>>()
    });
    let got = consumer.join().unwrap().unwrap();
    sensor.stop().unwrap();
    assert_eq!(got, vec![300, 300, 300]);
}

#[test]
fn blocked_reader_is_released_by_stop() {
    // One reading, then a full second of idle: the reader is left waiting.
    let config = SensorConfig {
        measurement_interval_ms: 1000,
        ..fast_config()
    };
    let mut sensor = sim_sensor(config, EchoSource::Script(VecDeque::new()));
    let reader = sensor.reader();
    sensor.start().unwrap();

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let consumer = std::thread::spawn(move || {
        let mut readings = 0;
        let end = loop {
            match reader.get_latest() {
                Ok(_) => readings += 1,
                Err(e) => break e,
            }
        };
        done_tx.send((readings, end)).unwrap();
    });

    std::thread::sleep(Duration::from_millis(200));
    sensor.stop().unwrap();
    drop(sensor);

    let (readings, end) = done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("blocked get_latest must return after stop");
    consumer.join().unwrap();
    assert_eq!(end, Error::InvalidState);
    assert!(readings >= 1, "the first timeout reading is delivered");
}

// ── Configuration ────────────────────────────────────────────

#[test]
fn config_from_store_drives_sensor() {
    let store = MemStore::new()
        .with(KEY_MEASUREMENT_INTERVAL_MS, 50)
        .with(KEY_SENSOR_TIMEOUT_MS, 10)
        .with(KEY_SMOOTHING_FACTOR, 500);
    let config = SensorConfig::load(&store, 14, 13).unwrap();
    assert_eq!(config.temperature_tenths_c, 200, "missing key defaults");

    let mut sensor = sim_sensor(config, EchoSource::distances([1000, 2000], 200));
    sensor.start().unwrap();
    assert_eq!(sensor.get_latest().unwrap().distance_mm, 1000);
    assert_eq!(sensor.get_latest().unwrap().distance_mm, 1500);
    sensor.stop().unwrap();
}

#[test]
fn invalid_config_rejected_at_construction() {
    let config = SensorConfig {
        timeout_ms: 60,
        ..fast_config()
    };
    let (isr, echo) = echo_link();
    let clock = SystemClock::new();
    let pin = SimEcho::new(isr, clock, EchoSource::sweep(200));
    let result = DistanceSensor::new(config, pin, NoDelay, clock, echo);
    assert!(matches!(result, Err(Error::Config(_))));
}
