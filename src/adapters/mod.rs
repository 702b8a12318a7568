//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter         | Implements         | Connects to               |
//! |-----------------|--------------------|---------------------------|
//! | `nvs`           | ConfigStore        | NVS / in-memory store     |
//! | `time`          | MonotonicClock     | esp_timer / Instant       |
//! | `rmt_strip`     | StripTransmitter   | RMT TX channel (device)   |
//! | `console_strip` | StripTransmitter   | log output (host)         |
//! | `gpio`          | embedded-hal OutputPin | trigger GPIO (device) |

#[cfg(not(target_os = "espidf"))]
pub mod console_strip;
#[cfg(target_os = "espidf")]
pub mod gpio;
pub mod nvs;
#[cfg(target_os = "espidf")]
pub mod rmt_strip;
pub mod time;
