//! Trigger output pin over raw GPIO calls.
//!
//! The pin is configured by `drivers::hw_init::init_ranging_gpio`; this
//! type only drives the level.

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use esp_idf_svc::sys::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub i32);

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct GpioTrigger {
    pin: i32,
}

impl GpioTrigger {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }

    fn write(&mut self, level: u32) -> Result<(), GpioError> {
        // SAFETY: pin configured as output during init; only the
        // measurement task drives it.
        let ret = unsafe { gpio_set_level(self.pin, level) };
        if ret == ESP_OK { Ok(()) } else { Err(GpioError(ret)) }
    }
}

impl ErrorType for GpioTrigger {
    type Error = GpioError;
}

impl OutputPin for GpioTrigger {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(0)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(1)
    }
}
