//! Time-of-flight to distance conversion and range validation.
//!
//! Integer-only.  The speed of sound is derived once from the configured
//! temperature using `c = 331.3 + 0.606 × T` (m/s) and held in mm/s.

use super::ema::EmaFilter;
use super::measurement::{MeasurementStatus, ProcessedMeasurement, RawMeasurement};

/// Shortest distance the HC-SR04 resolves reliably (2 cm).
pub const MIN_DISTANCE_MM: u16 = 20;
/// Longest distance the HC-SR04 resolves reliably (400 cm).
pub const MAX_DISTANCE_MM: u16 = 4000;

/// Speed of sound in mm/s for a temperature in tenths of °C.
///
/// `(331.3 + 0.606 × t/10) × 1000`, evaluated as
/// `(331_300_000 + 606 × t × 100) / 1000`.  343 420 at 20.0 °C.
pub fn speed_of_sound_mm_per_s(temperature_tenths_c: i16) -> u32 {
    let scaled = 331_300_000_i64 + 606 * i64::from(temperature_tenths_c) * 100;
    (scaled / 1000) as u32
}

/// One-way distance for a round-trip echo of `duration_us`.
///
/// Multiplies before dividing in 64 bits; the result is not range-checked.
pub fn distance_mm(duration_us: u64, speed_mm_per_s: u32) -> u64 {
    duration_us.saturating_mul(u64::from(speed_mm_per_s)) / 2_000_000
}

pub fn in_range(distance_mm: u64) -> bool {
    (u64::from(MIN_DISTANCE_MM)..=u64::from(MAX_DISTANCE_MM)).contains(&distance_mm)
}

/// Turn a captured echo into a consumer-facing reading.
///
/// Only `Ok` readings touch `filter`.  Out-of-range distances are reported
/// unsmoothed, saturated to `u16::MAX`.
pub fn evaluate(
    raw: &RawMeasurement,
    speed_mm_per_s: u32,
    filter: &mut EmaFilter,
) -> ProcessedMeasurement {
    let reading = |distance_mm, status| ProcessedMeasurement {
        distance_mm,
        timestamp_us: raw.echo_end_us,
        status,
    };

    if raw.status != MeasurementStatus::Ok {
        return reading(0, raw.status);
    }
    if raw.echo_end_us < raw.echo_start_us {
        return reading(0, MeasurementStatus::InvalidReading);
    }
    let duration_us = raw.echo_end_us - raw.echo_start_us;
    if duration_us == 0 {
        return reading(0, MeasurementStatus::NoEcho);
    }

    let distance = distance_mm(duration_us, speed_mm_per_s);
    if !in_range(distance) {
        let saturated = u16::try_from(distance).unwrap_or(u16::MAX);
        return reading(saturated, MeasurementStatus::OutOfRange);
    }

    // in_range bounds distance to MAX_DISTANCE_MM.
    let smoothed = filter.update(distance as u16);
    reading(smoothed, MeasurementStatus::Ok)
}
