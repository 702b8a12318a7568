//! RangeGuide firmware library.
//!
//! Exposes the ranging pipeline and the LED strip driver for the firmware
//! binary and for host integration testing.  All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod ports;
pub mod sensors;

pub use error::{Error, Result};
