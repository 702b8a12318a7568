//! Echo-pin interrupt handler state.
//!
//! Runs in interrupt context on every edge of the echo line.  The rising
//! edge records a timestamp; the falling edge packages the pair and hands it
//! to the measurement task.  No allocation, no floating point, no logging,
//! no blocking, no waking: a full queue drops the sample, and the task
//! finds new samples by polling.
//!
//! The start timestamp and the in-progress flag are owned by this struct and
//! touched by nothing else.  The queue producer is the only thing shared.

use super::channels::{raw_channel, EchoReceiver, RawProducer};
use super::measurement::{MeasurementStatus, RawMeasurement};

/// Create a connected handler / receiver pair.
///
/// The handler goes to the echo interrupt (or the host simulator), the
/// receiver to [`DistanceSensor::new`](super::DistanceSensor::new).
pub fn echo_link() -> (EchoIsr, EchoReceiver) {
    let (producer, consumer) = raw_channel();
    (EchoIsr::new(producer), EchoReceiver::new(consumer))
}

pub struct EchoIsr {
    producer: RawProducer,
    echo_start_us: u64,
    in_progress: bool,
}

impl EchoIsr {
    pub(crate) fn new(producer: RawProducer) -> Self {
        Self {
            producer,
            echo_start_us: 0,
            in_progress: false,
        }
    }

    /// Handle one edge.  `level_high` is the echo line level after the edge.
    ///
    /// Returns `true` if a sample was enqueued.
    #[inline]
    pub fn on_edge(&mut self, level_high: bool, now_us: u64) -> bool {
        if level_high {
            self.echo_start_us = now_us;
            self.in_progress = true;
            return false;
        }
        if !self.in_progress {
            return false;
        }
        self.in_progress = false;

        let sample = RawMeasurement {
            echo_start_us: self.echo_start_us,
            echo_end_us: now_us,
            status: MeasurementStatus::Ok,
        };
        self.producer.enqueue(sample).is_ok()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }
}
