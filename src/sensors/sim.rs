//! Host-side echo simulator.
//!
//! [`SimEcho`] stands in for the trigger GPIO.  When the trigger pulse ends
//! (HIGH → LOW) it plays the matching echo edges through the real
//! [`EchoIsr`], exactly as the GPIO interrupt would on the device.

use std::collections::VecDeque;

use embedded_hal::digital::{ErrorType, OutputPin};

use super::echo_capture::EchoIsr;
use super::ranging;
use crate::ports::MonotonicClock;

/// Delay between the end of the trigger pulse and the rising echo edge.
/// The HC-SR04 emits its 8-cycle burst first, roughly this long.
const BURST_LATENCY_US: u64 = 200;

const SWEEP_MIN_MM: u16 = 50;
const SWEEP_MAX_MM: u16 = 600;
const SWEEP_STEP_MM: u16 = 5;

/// What the simulated target does on each trigger.
#[derive(Debug, Clone)]
pub enum EchoSource {
    /// Echo widths in µs, one per trigger.  `None` (or an exhausted
    /// script) produces no echo at all.
    Script(VecDeque<Option<u64>>),
    /// Target moving 5 cm → 60 cm → 5 cm in 5 mm steps.
    Sweep {
        position_mm: u16,
        receding: bool,
        speed_mm_per_s: u32,
    },
}

impl EchoSource {
    pub fn script(widths: impl IntoIterator<Item = Option<u64>>) -> Self {
        Self::Script(widths.into_iter().collect())
    }

    /// Script of echoes that decode to `distances_mm` at `temperature_tenths_c`.
    pub fn distances(
        distances_mm: impl IntoIterator<Item = u16>,
        temperature_tenths_c: i16,
    ) -> Self {
        let speed = ranging::speed_of_sound_mm_per_s(temperature_tenths_c);
        Self::script(
            distances_mm
                .into_iter()
                .map(|mm| Some(echo_us_for(mm, speed))),
        )
    }

    pub fn sweep(temperature_tenths_c: i16) -> Self {
        Self::Sweep {
            position_mm: SWEEP_MIN_MM,
            receding: true,
            speed_mm_per_s: ranging::speed_of_sound_mm_per_s(temperature_tenths_c),
        }
    }

    fn next_width(&mut self) -> Option<u64> {
        match self {
            Self::Script(widths) => widths.pop_front().flatten(),
            Self::Sweep {
                position_mm,
                receding,
                speed_mm_per_s,
            } => {
                let width = echo_us_for(*position_mm, *speed_mm_per_s);
                if *receding {
                    *position_mm += SWEEP_STEP_MM;
                    if *position_mm >= SWEEP_MAX_MM {
                        *receding = false;
                    }
                } else {
                    *position_mm -= SWEEP_STEP_MM;
                    if *position_mm <= SWEEP_MIN_MM {
                        *receding = true;
                    }
                }
                Some(width)
            }
        }
    }
}

/// Smallest echo width that decodes to at least `distance_mm`.
pub fn echo_us_for(distance_mm: u16, speed_mm_per_s: u32) -> u64 {
    (u64::from(distance_mm) * 2_000_000).div_ceil(u64::from(speed_mm_per_s))
}

/// Simulated trigger pin wired to a simulated echo.
pub struct SimEcho<C> {
    isr: EchoIsr,
    clock: C,
    source: EchoSource,
    high: bool,
    pulses: u32,
}

impl<C: MonotonicClock> SimEcho<C> {
    pub fn new(isr: EchoIsr, clock: C, source: EchoSource) -> Self {
        Self {
            isr,
            clock,
            source,
            high: false,
            pulses: 0,
        }
    }

    /// Number of completed trigger pulses.
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    fn fire(&mut self) {
        self.pulses += 1;
        if let Some(width) = self.source.next_width() {
            let start = self.clock.now_us() + BURST_LATENCY_US;
            self.isr.on_edge(true, start);
            self.isr.on_edge(false, start + width);
        }
    }
}

impl<C> ErrorType for SimEcho<C> {
    type Error = core::convert::Infallible;
}

impl<C: MonotonicClock> OutputPin for SimEcho<C> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            self.high = false;
            self.fire();
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}
