//! Runtime status for a status endpoint or the periodic log line.
//!
//! Built on demand from read-only handles: the measurement reader, the LED
//! snapshot and the last reading the render loop consumed.  Collecting a
//! report never takes a reading off the processed channel.

use serde::Serialize;

use crate::drivers::led_strip::{FrameSnapshot, Rgb};
use crate::sensors::{MeasurementReader, ProcessedMeasurement};

/// Heap figures; synthetic on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapMetrics {
    pub free: u32,
    pub min_free: u32,
}

impl HeapMetrics {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: read-only allocator statistics.
        let free = unsafe { esp_get_free_heap_size() };
        let min_free = unsafe { esp_get_minimum_free_heap_size() };
        Self { free, min_free }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            free: 307_200,
            min_free: 261_120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorStatus {
    pub running: bool,
    pub overflow_count: u32,
    pub pending: bool,
    pub last_reading: Option<ProcessedMeasurement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StripStatus {
    pub led_count: usize,
    /// Last confirmed frame, possibly truncated.  Empty if the snapshot
    /// lock could not be taken in time.
    pub pixels: Vec<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub uptime_secs: u64,
    pub heap: HeapMetrics,
    pub sensor: SensorStatus,
    pub strip: StripStatus,
}

impl StatusReport {
    pub fn collect(
        uptime_secs: u64,
        reader: &MeasurementReader,
        last_reading: Option<ProcessedMeasurement>,
        snapshot: &FrameSnapshot,
        max_pixels: usize,
    ) -> Self {
        Self {
            uptime_secs,
            heap: HeapMetrics::collect(),
            sensor: SensorStatus {
                running: reader.is_running(),
                overflow_count: reader.overflow_count(),
                pending: reader.has_new_measurement(),
                last_reading,
            },
            strip: StripStatus {
                led_count: snapshot.len(),
                pixels: snapshot.get_all_colors(max_pixels),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
