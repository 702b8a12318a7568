//! Mock adapters for integration tests.
//!
//! Records every frame handed to the strip so tests can assert on the full
//! transmission history without an RMT peripheral.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use rangeguide::ports::{ConfigError, ConfigStore, StripTransmitter, TransmitError};

// ── MockTransmitter ───────────────────────────────────────────

/// Strip transmitter that records accepted frames and can be told to
/// reject everything.
#[derive(Clone, Default)]
pub struct MockTransmitter {
    pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
    pub failing: Arc<AtomicBool>,
    pub latency: Duration,
}

#[allow(dead_code)]
impl MockTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.frames.lock().unwrap().last().cloned()
    }
}

impl StripTransmitter for MockTransmitter {
    fn transmit(&mut self, wire: &[u8], _timeout: Duration) -> Result<(), TransmitError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(TransmitError::Rejected(-1));
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.frames.lock().unwrap().push(wire.to_vec());
        Ok(())
    }
}

// ── MemStore ──────────────────────────────────────────────────

/// In-memory config store.
#[derive(Default)]
pub struct MemStore {
    values: HashMap<&'static str, i32>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: i32) -> Self {
        self.values.insert(key, value);
        self
    }
}

impl ConfigStore for MemStore {
    fn get_i32(&self, key: &'static str) -> Result<i32, ConfigError> {
        self.values
            .get(key)
            .copied()
            .ok_or(ConfigError::NotFound(key))
    }
}

// ── NoDelay ───────────────────────────────────────────────────

/// Trigger-pulse delay that returns immediately.  The simulated echo does
/// not care how long the pulse was.
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
