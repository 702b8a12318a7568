//! One-shot hardware peripheral initialization.
//!
//! Configures the ranging GPIOs and attaches the echo interrupt using raw
//! ESP-IDF sys calls.  Called once from `main()` before the measurement
//! task starts.  The RMT channel for the strip is set up by
//! `adapters::rmt_strip`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

use crate::sensors::EchoIsr;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    RmtInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR install failed (rc={})", rc),
            Self::RmtInitFailed(rc) => write!(f, "RMT init failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── Ranging GPIO ──────────────────────────────────────────────

/// Trigger as a push-pull output driven LOW, echo as an input with
/// any-edge interrupts (not yet enabled).
#[cfg(target_os = "espidf")]
pub fn init_ranging_gpio(trigger_pin: i32, echo_pin: i32) -> Result<(), HwInitError> {
    let trig_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << trigger_pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: single-threaded init path; config struct fully initialised.
    let ret = unsafe { gpio_config(&trig_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // SAFETY: pin configured as output just above.
    unsafe { gpio_set_level(trigger_pin, 0) };

    // HC-SR04 drives the echo line push-pull; no pulls.
    let echo_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << echo_pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    // SAFETY: as above.
    let ret = unsafe { gpio_config(&echo_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: trigger=GPIO{} (out) echo=GPIO{} (in, any edge)", trigger_pin, echo_pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_ranging_gpio(trigger_pin: i32, echo_pin: i32) -> Result<(), HwInitError> {
    log::info!(
        "hw_init(sim): GPIO init skipped (trigger={}, echo={})",
        trigger_pin,
        echo_pin
    );
    Ok(())
}

// ── Echo ISR ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
struct EchoIsrContext {
    pin: i32,
    isr: EchoIsr,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn echo_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the leaked EchoIsrContext registered in
    // install_echo_isr(); only this handler ever dereferences it, and the
    // GPIO ISR service never runs it re-entrantly for one pin.
    let ctx = unsafe { &mut *arg.cast::<EchoIsrContext>() };
    // SAFETY: register read and RTC counter read, both ISR-safe.
    let level_high = unsafe { gpio_get_level(ctx.pin) } != 0;
    let now_us = unsafe { esp_timer_get_time() } as u64;
    ctx.isr.on_edge(level_high, now_us);
}

/// Install the per-pin GPIO ISR service and attach `isr` to `echo_pin`.
///
/// Ownership of `isr` passes to the interrupt for the rest of the program.
#[cfg(target_os = "espidf")]
pub fn install_echo_isr(echo_pin: i32, isr: EchoIsr) -> Result<(), HwInitError> {
    let ctx: &'static mut EchoIsrContext = Box::leak(Box::new(EchoIsrContext { pin: echo_pin, isr }));

    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler argument
    // is a 'static allocation never freed.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(
            echo_pin,
            Some(echo_gpio_isr),
            core::ptr::from_mut(ctx).cast(),
        );
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        let ret = gpio_intr_enable(echo_pin);
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
    }

    info!("hw_init: echo ISR attached to GPIO{}", echo_pin);
    Ok(())
}

/// On the host the echo edges come from `sensors::sim::SimEcho`, which owns
/// the handler directly; this variant only exists so callers compile.
#[cfg(not(target_os = "espidf"))]
pub fn install_echo_isr(echo_pin: i32, isr: EchoIsr) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): echo ISR not attached (GPIO{})", echo_pin);
    drop(isr);
    Ok(())
}
