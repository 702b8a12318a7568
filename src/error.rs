//! Unified error types for the RangeGuide firmware.
//!
//! A single `Error` enum that the ranging pipeline, the strip controller and
//! the configuration layer all convert into.  Every variant is `Copy` so it
//! can be handed across task boundaries without allocation.
//!
//! Note that measurement-level problems (no echo, implausible distance) are
//! *not* errors: they travel to consumers as typed
//! [`ProcessedMeasurement`](crate::sensors::ProcessedMeasurement) readings.

use core::fmt;

use crate::drivers::hw_init::HwInitError;
use crate::ports::{ConfigError, TransmitError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Index or argument outside the accepted range.
    InvalidArgument,
    /// Operation not valid in the current lifecycle state
    /// (e.g. starting a running task, stopping a stopped one).
    InvalidState,
    /// No echo within the window, or transmission not confirmed in time.
    Timeout,
    /// Physically implausible distance.
    OutOfRange,
    /// Allocation or lock acquisition failed.
    ResourceExhausted,
    /// Processed channel was full.  Recovered by eviction; only ever
    /// surfaced through the overflow counter.
    Overflow,
    /// Configuration value missing or rejected by validation.
    Config(&'static str),
    /// A peripheral call returned an ESP-IDF error code.
    Hardware(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::Timeout => write!(f, "timed out"),
            Self::OutOfRange => write!(f, "out of range"),
            Self::ResourceExhausted => write!(f, "resource exhausted"),
            Self::Overflow => write!(f, "queue overflow"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Hardware(rc) => write!(f, "hardware error (rc={rc})"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound(key) => Self::Config(key),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError(rc) => Self::Hardware(rc),
        }
    }
}

impl From<TransmitError> for Error {
    fn from(e: TransmitError) -> Self {
        match e {
            TransmitError::Timeout => Self::Timeout,
            TransmitError::Rejected(rc) => Self::Hardware(rc),
        }
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(rc)
            | HwInitError::IsrInstallFailed(rc)
            | HwInitError::RmtInitFailed(rc) => Self::Hardware(rc),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
