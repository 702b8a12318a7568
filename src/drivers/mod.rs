//! Strip driver, wire protocol, hardware initialisation, and task helpers.

pub mod hw_init;
pub mod led_strip;
pub mod task_pin;
pub mod ws2812;
