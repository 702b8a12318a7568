//! WS2812B wire protocol.
//!
//! Each LED takes 24 bits in G-R-B order, most significant bit first.
//! Every bit is one high phase followed by one low phase:
//!
//! | bit | high   | low    |
//! |-----|--------|--------|
//! | 0   | 0.4 µs | 0.8 µs |
//! | 1   | 0.8 µs | 0.4 µs |
//!
//! A frame is latched by holding the line low for at least 50 µs.  The
//! timing is generated by the RMT peripheral from [`Symbol`]s, one per bit,
//! plus a trailing all-low latch symbol.

use core::time::Duration;

use super::led_strip::Rgb;

/// Bytes per LED on the wire.
pub const BYTES_PER_LED: usize = 3;
/// RMT symbols per LED (one per bit).
pub const SYMBOLS_PER_LED: usize = BYTES_PER_LED * 8;

/// Datasheet pulse widths in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitTiming {
    pub t0h_ns: u32,
    pub t0l_ns: u32,
    pub t1h_ns: u32,
    pub t1l_ns: u32,
    pub reset_ns: u32,
}

pub const WS2812_TIMING: BitTiming = BitTiming {
    t0h_ns: 400,
    t0l_ns: 800,
    t1h_ns: 800,
    t1l_ns: 400,
    reset_ns: 50_000,
};

impl BitTiming {
    pub fn bit_period_ns(&self) -> u32 {
        // Both encodings have the same period.
        self.t0h_ns + self.t0l_ns
    }
}

/// One RMT item: two (level, duration) phases.
///
/// Durations are in RMT ticks and limited to 15 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub level0: bool,
    pub duration0: u16,
    pub level1: bool,
    pub duration1: u16,
}

impl Symbol {
    pub const MAX_DURATION: u16 = 0x7FFF;

    /// `rmt_item32_t` layout: `duration0 | level0 << 15 | duration1 << 16 | level1 << 31`.
    pub const fn packed(self) -> u32 {
        (self.duration0 as u32 & 0x7FFF)
            | ((self.level0 as u32) << 15)
            | ((self.duration1 as u32 & 0x7FFF) << 16)
            | ((self.level1 as u32) << 31)
    }
}

fn ns_to_ticks(ns: u32, resolution_hz: u32) -> u16 {
    let ticks = u64::from(ns) * u64::from(resolution_hz) / 1_000_000_000;
    ticks.min(u64::from(Symbol::MAX_DURATION)) as u16
}

/// Bit and latch symbols for one timing at one RMT resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    pub zero: Symbol,
    pub one: Symbol,
    pub latch: Symbol,
}

impl Encoder {
    pub fn new(timing: &BitTiming, resolution_hz: u32) -> Self {
        let reset = ns_to_ticks(timing.reset_ns, resolution_hz);
        // A zero duration ends the RMT transmission early, so split the
        // latch across both phases.
        let half = (reset / 2).max(1);
        Self {
            zero: Symbol {
                level0: true,
                duration0: ns_to_ticks(timing.t0h_ns, resolution_hz),
                level1: false,
                duration1: ns_to_ticks(timing.t0l_ns, resolution_hz),
            },
            one: Symbol {
                level0: true,
                duration0: ns_to_ticks(timing.t1h_ns, resolution_hz),
                level1: false,
                duration1: ns_to_ticks(timing.t1l_ns, resolution_hz),
            },
            latch: Symbol {
                level0: false,
                duration0: reset - half,
                level1: false,
                duration1: half,
            },
        }
    }

    /// Append the eight bit symbols for `byte`, MSB first.
    pub fn encode_byte(&self, byte: u8, out: &mut Vec<u32>) {
        for bit in (0..8).rev() {
            let sym = if byte & (1 << bit) != 0 { self.one } else { self.zero };
            out.push(sym.packed());
        }
    }

    /// Replace `out` with the symbols for `wire` followed by the latch.
    ///
    /// `out` should already have capacity for
    /// `wire.len() * 8 + 1` items to stay allocation-free.
    pub fn encode_frame(&self, wire: &[u8], out: &mut Vec<u32>) {
        out.clear();
        for &byte in wire {
            self.encode_byte(byte, out);
        }
        out.push(self.latch.packed());
    }
}

/// Serialize `pixels` into GRB wire order with `brightness` applied.
///
/// Clears `wire` first; never reallocates if capacity is
/// `pixels.len() * BYTES_PER_LED`.
pub fn serialize_grb(pixels: &[Rgb], brightness: u8, wire: &mut Vec<u8>) {
    wire.clear();
    for px in pixels {
        let c = px.scaled(brightness);
        wire.extend_from_slice(&[c.g, c.r, c.b]);
    }
}

/// Time the strip needs to clock out and latch `led_count` LEDs.
pub fn frame_duration(timing: &BitTiming, led_count: usize) -> Duration {
    let bits = (led_count * SYMBOLS_PER_LED) as u64;
    Duration::from_nanos(bits * u64::from(timing.bit_period_ns()) + u64::from(timing.reset_ns))
}
