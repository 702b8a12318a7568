//! Addressable LED strip controller.
//!
//! Two pixel arrays of equal length:
//!
//! - the **working buffer**, written by the render task through
//!   `set_pixel` / `clear_all` with no I/O;
//! - the **snapshot**, a mutex-guarded copy refreshed only after the
//!   hardware confirms a frame, read by anyone through [`FrameSnapshot`].
//!
//! `show()` is the only call that touches hardware.  The wire buffer is
//! allocated once at construction and reused for every frame.

use core::time::Duration;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Instant;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::ws2812::{self, BYTES_PER_LED};
use crate::config::LedConfig;
use crate::error::{Error, Result};
use crate::ports::StripTransmitter;

/// Longest `show()` waits for the transmitter.
pub const SHOW_TIMEOUT: Duration = Duration::from_millis(100);
/// Longest a snapshot reader waits for the lock.
pub const SNAPSHOT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

// ── Colour ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const YELLOW: Self = Self::new(255, 255, 0);
    pub const ORANGE: Self = Self::new(255, 165, 0);
    pub const CYAN: Self = Self::new(0, 255, 255);
    pub const MAGENTA: Self = Self::new(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale each channel by `brightness / 255`.
    pub const fn scaled(self, brightness: u8) -> Self {
        let k = brightness as u16;
        Self {
            r: (self.r as u16 * k / 255) as u8,
            g: (self.g as u16 * k / 255) as u8,
            b: (self.b as u16 * k / 255) as u8,
        }
    }

    pub const fn is_off(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

// ── Snapshot ──────────────────────────────────────────────────

/// Read-only handle on the last frame the strip confirmed.
#[derive(Clone)]
pub struct FrameSnapshot {
    pixels: Arc<Mutex<Vec<Rgb>>>,
    len: usize,
}

impl FrameSnapshot {
    fn new(len: usize) -> Self {
        Self {
            pixels: Arc::new(Mutex::new(vec![Rgb::OFF; len])),
            len,
        }
    }

    /// Copy of up to `max` snapshot pixels.
    ///
    /// Returns an empty vector if the lock cannot be taken within
    /// [`SNAPSHOT_LOCK_TIMEOUT`].
    pub fn get_all_colors(&self, max: usize) -> Vec<Rgb> {
        let mut out = vec![Rgb::OFF; max.min(self.len)];
        let n = self.copy_into(&mut out);
        out.truncate(n);
        out
    }

    /// Fill `out` from the snapshot; returns the number of pixels copied
    /// (0 on lock timeout).
    pub fn copy_into(&self, out: &mut [Rgb]) -> usize {
        let deadline = Instant::now() + SNAPSHOT_LOCK_TIMEOUT;
        loop {
            match self.pixels.try_lock() {
                Ok(guard) => return copy_prefix(&guard, out),
                // A panicked writer never leaves a partial copy: the copy
                // is a single slice assignment.
                Err(TryLockError::Poisoned(p)) => return copy_prefix(&p.into_inner(), out),
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => {
                    std::thread::yield_now();
                }
                Err(TryLockError::WouldBlock) => {
                    warn!("LED snapshot lock timeout");
                    return 0;
                }
            }
        }
    }

    /// Number of pixels in the snapshot.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn publish(&self, frame: &[Rgb]) {
        let mut guard = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        guard.copy_from_slice(frame);
    }
}

fn copy_prefix(src: &[Rgb], out: &mut [Rgb]) -> usize {
    let n = src.len().min(out.len());
    out[..n].copy_from_slice(&src[..n]);
    n
}

// ── Controller ────────────────────────────────────────────────

pub struct LedController<T: StripTransmitter> {
    transmitter: T,
    working: Vec<Rgb>,
    snapshot: FrameSnapshot,
    wire: Vec<u8>,
    brightness: u8,
}

impl<T: StripTransmitter> LedController<T> {
    /// Allocate both pixel buffers and the wire buffer for
    /// `config.led_count` LEDs.
    pub fn new(config: &LedConfig, transmitter: T) -> Result<Self> {
        config.validate()?;
        let count = usize::from(config.led_count);

        let mut working = Vec::new();
        working
            .try_reserve_exact(count)
            .map_err(|_| Error::ResourceExhausted)?;
        working.resize(count, Rgb::OFF);

        let mut wire = Vec::new();
        wire.try_reserve_exact(count * BYTES_PER_LED)
            .map_err(|_| Error::ResourceExhausted)?;

        info!(
            "LED controller ready: {} LEDs, brightness {}",
            count, config.brightness
        );
        Ok(Self {
            transmitter,
            working,
            snapshot: FrameSnapshot::new(count),
            wire,
            brightness: config.brightness,
        })
    }

    pub fn set_pixel(&mut self, index: u16, color: Rgb) -> Result<()> {
        let px = self
            .working
            .get_mut(usize::from(index))
            .ok_or(Error::InvalidArgument)?;
        *px = color;
        Ok(())
    }

    pub fn clear_pixel(&mut self, index: u16) -> Result<()> {
        self.set_pixel(index, Rgb::OFF)
    }

    pub fn clear_all(&mut self) {
        self.working.fill(Rgb::OFF);
    }

    /// Working-buffer colour; off for an out-of-range index.
    pub fn get_pixel(&self, index: u16) -> Rgb {
        self.working
            .get(usize::from(index))
            .copied()
            .unwrap_or(Rgb::OFF)
    }

    pub fn count(&self) -> u16 {
        // Bounded by MAX_LED_COUNT at construction.
        self.working.len() as u16
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Push the working buffer to the strip.
    ///
    /// The snapshot is updated only when the transmitter confirms the
    /// frame; on error it keeps the previous frame.
    pub fn show(&mut self) -> Result<()> {
        ws2812::serialize_grb(&self.working, self.brightness, &mut self.wire);

        if let Err(e) = self.transmitter.transmit(&self.wire, SHOW_TIMEOUT) {
            error!("LED transmission failed: {}", e);
            return Err(e.into());
        }

        self.snapshot.publish(&self.working);
        Ok(())
    }

    /// Snapshot pixels, see [`FrameSnapshot::get_all_colors`].
    pub fn get_all_colors(&self, max: usize) -> Vec<Rgb> {
        self.snapshot.get_all_colors(max)
    }

    /// Cloneable snapshot handle for other tasks.
    pub fn snapshot(&self) -> FrameSnapshot {
        self.snapshot.clone()
    }

    /// Blank the strip and hand back the transmitter.
    pub fn deinit(mut self) -> T {
        self.clear_all();
        if let Err(e) = self.show() {
            warn!("LED deinit: final blank frame not confirmed: {}", e);
        }
        info!("LED controller deinitialized");
        self.transmitter
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }
}
