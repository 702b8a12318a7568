//! Queues that connect the echo interrupt, the measurement task and the
//! consumers.
//!
//! ```text
//! ┌─────────────┐  RawMeasurement  ┌──────────────┐  ProcessedMeasurement  ┌───────────┐
//! │  Echo ISR   │─────────────────▶│ Measurement  │───────────────────────▶│ Consumers │
//! │ (producer)  │  spsc, cap 2     │    task      │  mpmc, cap 5, evicting │ (any task)│
//! └─────────────┘  polled by task  └──────────────┘  + overflow counter    └───────────┘
//! ```
//!
//! The ISR side only enqueues.  Waking a parked thread takes a mutex on
//! ESP-IDF, which is not allowed in interrupt context, so the task polls
//! the raw queue on a short timer tick instead.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::spsc::{Consumer, Producer, Queue};

use super::measurement::{ProcessedMeasurement, RawMeasurement};

/// Usable slots in the raw queue.
pub const RAW_CAPACITY: usize = 2;
/// heapless spsc keeps one slot free.
const RAW_QUEUE_N: usize = RAW_CAPACITY + 1;
/// Slots in the processed channel.
pub const PROCESSED_CAPACITY: usize = 5;
/// Raw-queue poll period while waiting for an echo.  1 ms is about 17 cm
/// of round trip, well inside the timeout.
pub const ECHO_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub type RawProducer = Producer<'static, RawMeasurement, RAW_QUEUE_N>;
pub type RawConsumer = Consumer<'static, RawMeasurement, RAW_QUEUE_N>;

/// Allocate the raw queue.
///
/// Both halves live for the rest of the program: the ISR may still hold the
/// producer after the sensor that created it is gone.
pub fn raw_channel() -> (RawProducer, RawConsumer) {
    let queue: &'static mut Queue<RawMeasurement, RAW_QUEUE_N> = Box::leak(Box::new(Queue::new()));
    queue.split()
}

/// Task side of the raw queue.
pub struct EchoReceiver {
    consumer: RawConsumer,
}

impl EchoReceiver {
    pub(crate) fn new(consumer: RawConsumer) -> Self {
        Self { consumer }
    }

    pub fn try_receive(&mut self) -> Option<RawMeasurement> {
        self.consumer.dequeue()
    }

    /// Wait for the next sample, polling every [`ECHO_POLL_INTERVAL`].
    /// Cancel-safe: dropping the future loses nothing.
    pub async fn receive(&mut self) -> RawMeasurement {
        loop {
            if let Some(sample) = self.consumer.dequeue() {
                return sample;
            }
            async_io_mini::Timer::after(ECHO_POLL_INTERVAL).await;
        }
    }

    /// Empty the queue.  Returns the number of samples dropped.
    pub fn discard_all(&mut self) -> usize {
        let mut dropped = 0;
        while self.consumer.dequeue().is_some() {
            dropped += 1;
        }
        dropped
    }
}

// ── Processed channel ─────────────────────────────────────────

/// Bounded FIFO of processed readings that never blocks the publisher.
pub struct ProcessedChannel {
    inner: Channel<CriticalSectionRawMutex, ProcessedMeasurement, PROCESSED_CAPACITY>,
    overflows: AtomicU32,
}

impl Default for ProcessedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessedChannel {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
            overflows: AtomicU32::new(0),
        }
    }

    /// Enqueue `reading`.  When full, evict the oldest entry, retry once
    /// and count the overflow.  Returns `true` if an eviction happened.
    pub fn publish(&self, reading: ProcessedMeasurement) -> bool {
        let Err(TrySendError::Full(reading)) = self.inner.try_send(reading) else {
            return false;
        };

        let _evicted = self.inner.try_receive();
        let total = self.overflows.fetch_add(1, Ordering::Relaxed) + 1;
        if self.inner.try_send(reading).is_err() {
            // A concurrent receiver cannot refill the slot, so this only
            // happens with a second publisher.  Still counted above.
            log::warn!("processed channel: retry after eviction failed");
        }
        log::warn!("processed channel overflow, oldest reading evicted (total={})", total);
        true
    }

    /// Wait until a reading is available and take it.
    pub async fn receive(&self) -> ProcessedMeasurement {
        self.inner.receive().await
    }

    pub fn try_receive(&self) -> Option<ProcessedMeasurement> {
        self.inner.try_receive().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn overflow_count(&self) -> u32 {
        self.overflows.load(Ordering::Relaxed)
    }
}
