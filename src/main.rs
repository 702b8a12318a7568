//! RangeGuide Firmware — Main Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  NvsConfigStore ──▶ SensorConfig / LedConfig                │
//! │                                                             │
//! │  echo GPIO ISR ──▶ DistanceSensor task (core 1) ──┐         │
//! │                                                   ▼         │
//! │  main loop: get_latest ──▶ LedController ──▶ RmtStrip       │
//! │             every 5 s: monitor + status JSON                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::{Duration, Instant};

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::Ets;
use rangeguide::adapters::gpio::GpioTrigger;
use rangeguide::adapters::nvs::NvsConfigStore;
use rangeguide::adapters::rmt_strip::RmtStrip;
use rangeguide::adapters::time::SystemClock;
use rangeguide::config::{LedConfig, SensorConfig};
use rangeguide::diagnostics::StatusReport;
use rangeguide::drivers::hw_init;
use rangeguide::drivers::led_strip::{LedController, Rgb};
use rangeguide::pins;
use rangeguide::ports::StripTransmitter;
use rangeguide::sensors::ranging::{MAX_DISTANCE_MM, MIN_DISTANCE_MM};
use rangeguide::sensors::{echo_link, DistanceSensor, MeasurementStatus, ProcessedMeasurement};

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Single-pixel position marker: green at the target's position along the
/// strip, red on the first pixel when there is no valid reading.
fn render_marker<T: StripTransmitter>(leds: &mut LedController<T>, reading: &ProcessedMeasurement) {
    leds.clear_all();
    let count = u32::from(leds.count());
    let result = if reading.status == MeasurementStatus::Ok {
        let span = u32::from(MAX_DISTANCE_MM - MIN_DISTANCE_MM);
        let offset = u32::from(reading.distance_mm.saturating_sub(MIN_DISTANCE_MM));
        let index = (offset * (count - 1) / span) as u16;
        leds.set_pixel(index, Rgb::GREEN)
    } else {
        leds.set_pixel(0, Rgb::RED)
    };
    if let Err(e) = result {
        warn!("marker not drawn: {}", e);
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("RangeGuide v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let store = NvsConfigStore::new()?;
    let led_cfg = LedConfig::load(&store, pins::LED_DATA_GPIO, pins::LED_RMT_CHANNEL)?;
    let sensor_cfg = SensorConfig::load(&store, pins::TRIGGER_GPIO, pins::ECHO_GPIO)?;

    // ── 3. LED strip ──────────────────────────────────────────
    let rmt = RmtStrip::new(
        led_cfg.rmt_channel,
        led_cfg.data_pin,
        usize::from(led_cfg.led_count),
    )?;
    let mut leds = LedController::new(&led_cfg, rmt)?;
    leds.clear_all();
    if let Err(e) = leds.show() {
        warn!("initial blank frame failed: {}", e);
    }
    let snapshot = leds.snapshot();

    // ── 4. Ranging pipeline ───────────────────────────────────
    hw_init::init_ranging_gpio(sensor_cfg.trigger_pin, sensor_cfg.echo_pin)?;
    let (isr, echo) = echo_link();
    hw_init::install_echo_isr(sensor_cfg.echo_pin, isr)?;
    let trigger = GpioTrigger::new(sensor_cfg.trigger_pin);
    let mut sensor = DistanceSensor::new(sensor_cfg, trigger, Ets, SystemClock::new(), echo)?;
    sensor.start()?;
    let reader = sensor.reader();

    // ── 5. Render loop ────────────────────────────────────────
    let clock = SystemClock::new();
    let mut last_status = Instant::now();
    let mut last_reading = None;

    loop {
        match reader.get_latest() {
            Ok(reading) => {
                render_marker(&mut leds, &reading);
                if let Err(e) = leds.show() {
                    // Retried with the next reading.
                    warn!("frame dropped: {}", e);
                }
                last_reading = Some(reading);
            }
            Err(e) => {
                error!("measurement stream ended: {}", e);
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        if last_status.elapsed() >= STATUS_INTERVAL {
            last_status = Instant::now();
            if let Err(e) = sensor.monitor() {
                warn!("sensor monitor: {}", e);
            }
            let report = StatusReport::collect(
                clock.uptime_secs(),
                &reader,
                last_reading,
                &snapshot,
                usize::from(leds.count()),
            );
            match report.to_json() {
                Ok(json) => info!("status {}", json),
                Err(e) => warn!("status serialization failed: {}", e),
            }
        }
    }
}
