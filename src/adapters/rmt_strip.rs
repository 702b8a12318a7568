//! RMT-driven WS2812 transmitter (ESP-IDF legacy RMT driver).
//!
//! Each wire bit becomes one 32-bit RMT item; the symbol buffer is sized
//! for the full strip at construction and reused for every frame.  The
//! write is started non-blocking and completion is awaited with a bounded
//! `rmt_wait_tx_done`.

use core::time::Duration;

use esp_idf_svc::sys::*;
use log::info;

use crate::drivers::hw_init::HwInitError;
use crate::drivers::ws2812::{Encoder, SYMBOLS_PER_LED, WS2812_TIMING};
use crate::pins;
use crate::ports::{StripTransmitter, TransmitError};

pub struct RmtStrip {
    channel: rmt_channel_t,
    encoder: Encoder,
    items: Vec<u32>,
}

impl RmtStrip {
    /// Configure `channel` as a TX channel on `gpio` and install the driver.
    pub fn new(channel: u32, gpio: i32, led_count: usize) -> Result<Self, HwInitError> {
        let mut cfg = rmt_config_t {
            rmt_mode: rmt_mode_t_RMT_MODE_TX,
            channel,
            gpio_num: gpio,
            clk_div: pins::LED_RMT_CLK_DIV,
            mem_block_num: 1,
            ..Default::default()
        };
        cfg.__bindgen_anon_1.tx_config = rmt_tx_config_t {
            idle_level: rmt_idle_level_t_RMT_IDLE_LEVEL_LOW,
            idle_output_en: true,
            carrier_en: false,
            loop_en: false,
            ..Default::default()
        };

        // SAFETY: called once from main() during init; cfg fully initialised.
        let ret = unsafe { rmt_config(&cfg) };
        if ret != ESP_OK {
            return Err(HwInitError::RmtInitFailed(ret));
        }
        // SAFETY: channel configured above; no RX buffer, default flags.
        let ret = unsafe { rmt_driver_install(channel, 0, 0) };
        if ret != ESP_OK {
            return Err(HwInitError::RmtInitFailed(ret));
        }

        let mut items = Vec::new();
        items
            .try_reserve_exact(led_count * SYMBOLS_PER_LED + 1)
            .map_err(|_| HwInitError::RmtInitFailed(ESP_ERR_NO_MEM))?;

        info!(
            "rmt_strip: channel {} on GPIO{} ({} LEDs, {} items)",
            channel,
            gpio,
            led_count,
            items.capacity()
        );
        Ok(Self {
            channel,
            encoder: Encoder::new(&WS2812_TIMING, pins::LED_RMT_RESOLUTION_HZ),
            items,
        })
    }
}

fn ms_to_ticks(timeout: Duration) -> TickType_t {
    let ms = timeout.as_millis() as u64;
    ((ms * u64::from(configTICK_RATE_HZ)).div_ceil(1000)) as TickType_t
}

impl StripTransmitter for RmtStrip {
    fn transmit(&mut self, wire: &[u8], timeout: Duration) -> Result<(), TransmitError> {
        self.encoder.encode_frame(wire, &mut self.items);

        // SAFETY: rmt_item32_t is a 32-bit union with the same layout as the
        // packed u32 symbols; `items` stays alive and unmodified until
        // rmt_wait_tx_done returns below.
        let ret = unsafe {
            rmt_write_items(
                self.channel,
                self.items.as_ptr().cast::<rmt_item32_t>(),
                self.items.len() as i32,
                false,
            )
        };
        if ret != ESP_OK {
            return Err(TransmitError::Rejected(ret));
        }

        // SAFETY: driver installed in new().
        let ret = unsafe { rmt_wait_tx_done(self.channel, ms_to_ticks(timeout)) };
        match ret {
            ESP_OK => Ok(()),
            ESP_ERR_TIMEOUT => {
                // The driver still reads `items`; halt it before the next
                // frame reuses the buffer.
                // SAFETY: as above.
                unsafe { rmt_tx_stop(self.channel) };
                Err(TransmitError::Timeout)
            }
            rc => Err(TransmitError::Rejected(rc)),
        }
    }
}

impl Drop for RmtStrip {
    fn drop(&mut self) {
        // SAFETY: driver installed in new(); nothing transmits after drop.
        let ret = unsafe { rmt_driver_uninstall(self.channel) };
        if ret != ESP_OK {
            log::warn!("rmt_strip: driver uninstall failed (rc={})", ret);
        }
    }
}
