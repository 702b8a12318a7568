//! GPIO / peripheral pin assignments for the RangeGuide board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// HC-SR04 ultrasonic sensor
// ---------------------------------------------------------------------------

/// Digital output: 10 µs HIGH pulse starts a ranging cycle.
pub const TRIGGER_GPIO: i32 = 14;
/// Digital input: HIGH for the duration of the echo round trip.
/// Interrupt on any edge.
pub const ECHO_GPIO: i32 = 13;
/// Trigger pulse width (µs).
pub const TRIGGER_PULSE_US: u32 = 10;
/// Settle time with the trigger held LOW before the pulse (µs).
pub const TRIGGER_SETTLE_US: u32 = 2;

// ---------------------------------------------------------------------------
// WS2812B guidance strip
// ---------------------------------------------------------------------------

/// Data line, driven by the RMT peripheral.
pub const LED_DATA_GPIO: i32 = 12;
/// RMT TX channel for the strip.
pub const LED_RMT_CHANNEL: u32 = 0;
/// RMT clock divider.  APB is 80 MHz, so one tick is 12.5 ns.
pub const LED_RMT_CLK_DIV: u8 = 1;
/// Resulting RMT tick rate (Hz).
pub const LED_RMT_RESOLUTION_HZ: u32 = 80_000_000;

// ---------------------------------------------------------------------------
// Measurement task placement
// ---------------------------------------------------------------------------

pub const MEASUREMENT_TASK_PRIORITY: u8 = 5;
pub const MEASUREMENT_TASK_STACK_KB: usize = 4;
