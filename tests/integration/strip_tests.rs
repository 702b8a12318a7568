//! Integration tests for the LED controller, its snapshot and the host
//! strip adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rangeguide::adapters::console_strip::ConsoleStrip;
use rangeguide::config::{LedConfig, KEY_LED_BRIGHTNESS, KEY_LED_COUNT};
use rangeguide::drivers::led_strip::{LedController, Rgb};
use rangeguide::error::Error;
use rangeguide::ports::ConfigError;

use crate::mock_hw::{MemStore, MockTransmitter};

fn config(led_count: u16, brightness: u8) -> LedConfig {
    LedConfig {
        data_pin: 12,
        rmt_channel: 0,
        led_count,
        brightness,
    }
}

fn fill<T: rangeguide::ports::StripTransmitter>(leds: &mut LedController<T>, color: Rgb) {
    for i in 0..leds.count() {
        leds.set_pixel(i, color).unwrap();
    }
}

// ── Show / snapshot ──────────────────────────────────────────

#[test]
fn show_sends_grb_with_brightness_and_updates_snapshot() {
    let tx = MockTransmitter::new();
    let mut leds = LedController::new(&config(3, 128), tx.clone()).unwrap();

    leds.set_pixel(0, Rgb::RED).unwrap();
    leds.set_pixel(2, Rgb::new(0, 0, 255)).unwrap();
    assert!(leds.get_all_colors(3).iter().all(|c| c.is_off()), "nothing shown yet");

    leds.show().unwrap();

    assert_eq!(
        tx.last_frame().unwrap(),
        vec![0, 128, 0, 0, 0, 0, 0, 0, 128],
        "GRB order, brightness applied on the wire"
    );
    // The snapshot holds the unscaled colours.
    assert_eq!(
        leds.get_all_colors(10),
        vec![Rgb::RED, Rgb::OFF, Rgb::new(0, 0, 255)]
    );
}

#[test]
fn failed_show_keeps_previous_snapshot() {
    let tx = MockTransmitter::new();
    let mut leds = LedController::new(&config(4, 255), tx.clone()).unwrap();

    fill(&mut leds, Rgb::GREEN);
    leds.show().unwrap();

    fill(&mut leds, Rgb::MAGENTA);
    tx.set_failing(true);
    assert_eq!(leds.show(), Err(Error::Hardware(-1)));

    assert_eq!(leds.get_all_colors(4), vec![Rgb::GREEN; 4]);
    assert_eq!(leds.get_pixel(0), Rgb::MAGENTA, "working buffer keeps the edit");
    assert_eq!(tx.frame_count(), 1);

    tx.set_failing(false);
    leds.show().unwrap();
    assert_eq!(leds.get_all_colors(4), vec![Rgb::MAGENTA; 4]);
}

#[test]
fn index_equal_to_count_is_rejected_without_mutation() {
    let tx = MockTransmitter::new();
    let mut leds = LedController::new(&config(5, 255), tx).unwrap();
    fill(&mut leds, Rgb::BLUE);

    assert_eq!(leds.set_pixel(5, Rgb::RED), Err(Error::InvalidArgument));
    assert_eq!(leds.clear_pixel(5), Err(Error::InvalidArgument));
    assert_eq!(leds.get_pixel(5), Rgb::OFF);
    assert!((0..5).all(|i| leds.get_pixel(i) == Rgb::BLUE));
}

#[test]
fn snapshot_is_never_torn_under_concurrent_reads() {
    const LEDS: u16 = 300;
    let tx = MockTransmitter::with_latency(Duration::from_micros(50));
    let mut leds = LedController::new(&config(LEDS, 255), tx).unwrap();
    let snapshot = leds.snapshot();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let snapshot = snapshot.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checked = 0u32;
                loop {
                    let finished = done.load(Ordering::Relaxed);
                    let frame = snapshot.get_all_colors(usize::from(LEDS));
                    if !frame.is_empty() {
                        assert_eq!(frame.len(), usize::from(LEDS));
                        assert!(
                            frame.iter().all(|&c| c == frame[0]),
                            "torn frame: first {:?}",
                            frame[0]
                        );
                        checked += 1;
                    }
                    if finished {
                        break checked;
                    }
                }
            })
        })
        .collect();

    for round in 0..200 {
        let color = if round % 2 == 0 { Rgb::RED } else { Rgb::CYAN };
        fill(&mut leds, color);
        leds.show().unwrap();
    }
    done.store(true, Ordering::Relaxed);

    for r in readers {
        assert!(r.join().unwrap() > 0);
    }
    assert_eq!(snapshot.get_all_colors(1), vec![Rgb::CYAN]);
}

#[test]
fn deinit_blanks_strip_and_returns_transmitter() {
    let tx = MockTransmitter::new();
    let mut leds = LedController::new(&config(2, 255), tx).unwrap();
    fill(&mut leds, Rgb::WHITE);
    leds.show().unwrap();

    let tx = leds.deinit();
    assert_eq!(tx.last_frame().unwrap(), vec![0; 6]);
    assert_eq!(tx.frame_count(), 2);
}

// ── Configuration ────────────────────────────────────────────

#[test]
fn led_config_requires_both_keys() {
    let store = MemStore::new().with(KEY_LED_COUNT, 60);
    assert_eq!(
        LedConfig::load(&store, 12, 0),
        Err(ConfigError::NotFound(KEY_LED_BRIGHTNESS))
    );

    let store = store.with(KEY_LED_BRIGHTNESS, 64);
    let cfg = LedConfig::load(&store, 12, 0).unwrap();
    assert_eq!((cfg.led_count, cfg.brightness), (60, 64));
}

#[test]
fn led_count_above_limit_is_rejected() {
    let store = MemStore::new()
        .with(KEY_LED_COUNT, 1001)
        .with(KEY_LED_BRIGHTNESS, 10);
    assert!(matches!(
        LedConfig::load(&store, 12, 0),
        Err(ConfigError::ValidationFailed(_))
    ));
    assert!(LedController::new(&config(0, 10), MockTransmitter::new()).is_err());
}

// ── Console strip ────────────────────────────────────────────

#[test]
fn console_strip_fault_leaves_snapshot_unchanged() {
    let strip = ConsoleStrip::new();
    let faults = strip.faults();
    let mut leds = LedController::new(&config(8, 255), strip).unwrap();

    fill(&mut leds, Rgb::YELLOW);
    leds.show().unwrap();

    faults.fail_next(1);
    leds.clear_all();
    assert!(leds.show().is_err());
    assert_eq!(leds.get_all_colors(8), vec![Rgb::YELLOW; 8]);

    leds.show().unwrap();
    assert!(leds.get_all_colors(8).iter().all(|c| c.is_off()));
    assert_eq!(leds.transmitter().frames().len(), 2);
}

#[test]
fn full_length_strip_fits_show_timeout() {
    let mut leds = LedController::new(&config(1000, 255), ConsoleStrip::new()).unwrap();
    fill(&mut leds, Rgb::ORANGE);
    leds.show().unwrap();
    assert_eq!(leds.transmitter().frames()[0].len(), 3000);
}
