//! Ultrasonic ranging pipeline.
//!
//! ```text
//! echo pin ──▶ EchoIsr ──▶ raw queue ──▶ measurement task ──▶ processed channel ──▶ readers
//!                           (cap 2)      compute/validate/EMA      (cap 5)
//! ```

pub mod channels;
pub mod distance;
pub mod echo_capture;
pub mod ema;
pub mod measurement;
pub mod ranging;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

pub use distance::{DistanceSensor, MeasurementReader};
pub use channels::EchoReceiver;
pub use echo_capture::{echo_link, EchoIsr};
pub use measurement::{MeasurementStatus, ProcessedMeasurement, RawMeasurement};
