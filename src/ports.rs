//! Port traits — the boundary between the ranging/strip core and the
//! platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DistanceSensor / LedController
//! ```
//!
//! | Port               | Device adapter            | Host adapter              |
//! |--------------------|---------------------------|---------------------------|
//! | `ConfigStore`      | `adapters::nvs` (NVS)     | `adapters::nvs` (HashMap) |
//! | `MonotonicClock`   | `adapters::time` (esp_timer) | `adapters::time` (Instant) |
//! | `StripTransmitter` | `adapters::rmt_strip`     | `adapters::console_strip` |
//!
//! The trigger line and the trigger-pulse delay use the `embedded-hal`
//! `OutputPin` / `DelayNs` traits directly rather than a local port.

use core::time::Duration;

// ───────────────────────────────────────────────────────────────
// Configuration store (driven adapter: persisted settings → core)
// ───────────────────────────────────────────────────────────────

/// Read-only access to persisted integer settings.
pub trait ConfigStore {
    /// Look up `key`.  A key that was never written yields
    /// [`ConfigError::NotFound`], which callers may treat as "use default".
    fn get_i32(&self, key: &'static str) -> Result<i32, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Monotonic clock
// ───────────────────────────────────────────────────────────────

/// Microsecond monotonic time source.
pub trait MonotonicClock {
    fn now_us(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Strip transmitter (driven adapter: core → LED peripheral)
// ───────────────────────────────────────────────────────────────

/// Pushes one serialized frame to the LED strip.
///
/// `wire` is already in the strip's component order (3 bytes per LED).
/// Implementations must generate the bit timing with a peripheral, append
/// the reset latch, and block until the hardware reports completion or
/// `timeout` elapses.
pub trait StripTransmitter {
    fn transmit(&mut self, wire: &[u8], timeout: Duration) -> Result<(), TransmitError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No value stored under this key.
    NotFound(&'static str),
    /// A value failed range validation.  Names the field and the range.
    ValidationFailed(&'static str),
    /// Storage backend error code.
    IoError(i32),
}

/// Errors from [`StripTransmitter::transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    /// The peripheral did not confirm completion within the timeout.
    Timeout,
    /// The peripheral refused the frame (ESP-IDF error code).
    Rejected(i32),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "key '{}' not found", key),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError(rc) => write!(f, "I/O error (rc={})", rc),
        }
    }
}

impl core::fmt::Display for TransmitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "transmission not confirmed in time"),
            Self::Rejected(rc) => write!(f, "transmission rejected (rc={})", rc),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for TransmitError {}
