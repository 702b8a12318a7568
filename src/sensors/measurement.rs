//! Measurement records passed along the ranging pipeline.

use serde::Serialize;

/// Outcome of one ranging cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasurementStatus {
    /// In range and folded into the smoothing filter.
    Ok,
    /// No echo edge pair arrived within the configured window.
    Timeout,
    /// Computed distance outside 2 cm – 400 cm.  Reported raw.
    OutOfRange,
    /// Echo edges with zero width.
    NoEcho,
    /// Echo ended before it started (clock glitch or edge mix-up).
    InvalidReading,
}

impl MeasurementStatus {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Edge timestamps captured by the echo interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMeasurement {
    pub echo_start_us: u64,
    pub echo_end_us: u64,
    pub status: MeasurementStatus,
}

/// A reading as delivered to consumers.
///
/// `distance_mm` is the smoothed value for `Ok`, the unsmoothed value for
/// `OutOfRange` (saturated at `u16::MAX`), and 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessedMeasurement {
    pub distance_mm: u16,
    pub timestamp_us: u64,
    pub status: MeasurementStatus,
}

impl ProcessedMeasurement {
    pub const fn timeout(timestamp_us: u64) -> Self {
        Self {
            distance_mm: 0,
            timestamp_us,
            status: MeasurementStatus::Timeout,
        }
    }
}
