//! Host stand-in for the RMT strip.
//!
//! Sleeps for the time the real strip would take to clock out the frame,
//! records every frame it accepts, and renders the strip to the log at most
//! once per second.  Failures can be injected through a [`FaultSwitch`].

use core::time::Duration;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::drivers::ws2812::{frame_duration, BYTES_PER_LED, WS2812_TIMING};
use crate::ports::{StripTransmitter, TransmitError};

const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// Shared handle to make the next N transmissions fail.
#[derive(Clone, Default)]
pub struct FaultSwitch {
    remaining: Arc<AtomicU32>,
}

impl FaultSwitch {
    pub fn fail_next(&self, frames: u32) {
        self.remaining.store(frames, Ordering::Relaxed);
    }

    fn take(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct ConsoleStrip {
    faults: FaultSwitch,
    frames: Vec<Vec<u8>>,
    keep_frames: usize,
    last_render: Option<Instant>,
}

impl Default for ConsoleStrip {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleStrip {
    pub fn new() -> Self {
        Self {
            faults: FaultSwitch::default(),
            frames: Vec::new(),
            keep_frames: 16,
            last_render: None,
        }
    }

    pub fn faults(&self) -> FaultSwitch {
        self.faults.clone()
    }

    /// Accepted frames, oldest first (the most recent 16).
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    fn render(&mut self, wire: &[u8]) {
        let now = Instant::now();
        if self
            .last_render
            .is_some_and(|t| now.duration_since(t) < RENDER_INTERVAL)
        {
            return;
        }
        self.last_render = Some(now);

        let line: String = wire
            .chunks_exact(BYTES_PER_LED)
            .map(|grb| if grb.iter().all(|&c| c == 0) { '.' } else { '#' })
            .collect();
        info!("strip [{}]", line);
    }
}

impl StripTransmitter for ConsoleStrip {
    fn transmit(&mut self, wire: &[u8], timeout: Duration) -> Result<(), TransmitError> {
        if self.faults.take() {
            return Err(TransmitError::Rejected(-1));
        }

        let needed = frame_duration(&WS2812_TIMING, wire.len() / BYTES_PER_LED);
        if needed > timeout {
            std::thread::sleep(timeout);
            return Err(TransmitError::Timeout);
        }
        std::thread::sleep(needed);

        if self.frames.len() == self.keep_frames {
            self.frames.remove(0);
        }
        self.frames.push(wire.to_vec());
        self.render(wire);
        Ok(())
    }
}
