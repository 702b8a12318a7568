//! Runtime configuration for the ranging pipeline and the LED strip.
//!
//! Both structs are read once from the [`ConfigStore`] at initialization and
//! then moved into their owner (the measurement task, the LED controller).
//! There is no hot-reload: a changed setting takes effect on the next boot.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::ports::{ConfigError, ConfigStore};

// ── NVS keys (15-char limit) ──────────────────────────────────

pub const KEY_MEASUREMENT_INTERVAL_MS: &str = "meas_int_ms";
pub const KEY_SENSOR_TIMEOUT_MS: &str = "sens_timeout_ms";
pub const KEY_TEMPERATURE_C_X10: &str = "temp_c_x10";
pub const KEY_SMOOTHING_FACTOR: &str = "smooth_factor";
pub const KEY_LED_COUNT: &str = "led_count";
pub const KEY_LED_BRIGHTNESS: &str = "led_bright";

/// Upper bound for the strip length.
pub const MAX_LED_COUNT: u16 = 1000;

/// Ultrasonic sensor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Trigger output GPIO.
    pub trigger_pin: i32,
    /// Echo input GPIO (interrupt on any edge).
    pub echo_pin: i32,
    /// Time between ranging cycles (ms).
    pub measurement_interval_ms: u32,
    /// Maximum wait for an echo (ms).  30 ms covers 4 m plus margin.
    pub timeout_ms: u32,
    /// Ambient temperature for speed-of-sound compensation, tenths of °C.
    pub temperature_tenths_c: i16,
    /// EMA weight of the new sample, 0–1000 (1000 = no smoothing).
    pub smoothing_factor: u16,
}

impl SensorConfig {
    /// Defaults used when a key has never been written.
    pub const fn with_pins(trigger_pin: i32, echo_pin: i32) -> Self {
        Self {
            trigger_pin,
            echo_pin,
            measurement_interval_ms: 100,
            timeout_ms: 30,
            temperature_tenths_c: 200,
            smoothing_factor: 300,
        }
    }

    /// Load every sensor key from `store`, defaulting missing keys.
    ///
    /// A missing key is logged and replaced by its default; any other store
    /// error aborts.  The assembled config must pass [`Self::validate`].
    pub fn load(
        store: &impl ConfigStore,
        trigger_pin: i32,
        echo_pin: i32,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::with_pins(trigger_pin, echo_pin);

        let cfg = Self {
            trigger_pin,
            echo_pin,
            measurement_interval_ms: read_or_default(
                store,
                KEY_MEASUREMENT_INTERVAL_MS,
                defaults.measurement_interval_ms as i32,
            )? as u32,
            timeout_ms: read_or_default(store, KEY_SENSOR_TIMEOUT_MS, defaults.timeout_ms as i32)?
                as u32,
            temperature_tenths_c: read_or_default(
                store,
                KEY_TEMPERATURE_C_X10,
                i32::from(defaults.temperature_tenths_c),
            )? as i16,
            smoothing_factor: read_or_default(
                store,
                KEY_SMOOTHING_FACTOR,
                i32::from(defaults.smoothing_factor),
            )? as u16,
        };
        // Casts above are lossless: read_or_default already bounded the raw values.
        cfg.validate()?;

        info!("Sensor config loaded:");
        info!("  trigger=GPIO{} echo=GPIO{}", cfg.trigger_pin, cfg.echo_pin);
        info!("  interval={} ms timeout={} ms", cfg.measurement_interval_ms, cfg.timeout_ms);
        info!(
            "  temperature={} ({}.{}\u{00b0}C)",
            cfg.temperature_tenths_c,
            cfg.temperature_tenths_c / 10,
            (cfg.temperature_tenths_c % 10).abs()
        );
        info!(
            "  smoothing={} ({}% new, {}% previous)",
            cfg.smoothing_factor,
            cfg.smoothing_factor / 10,
            (1000 - cfg.smoothing_factor) / 10
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(50..=1000).contains(&self.measurement_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "meas_int_ms must be 50–1000",
            ));
        }
        if !(10..=50).contains(&self.timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "sens_timeout_ms must be 10–50",
            ));
        }
        if self.timeout_ms >= self.measurement_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "sens_timeout_ms must be < meas_int_ms",
            ));
        }
        if !(-200..=600).contains(&self.temperature_tenths_c) {
            return Err(ConfigError::ValidationFailed(
                "temp_c_x10 must be -200–600",
            ));
        }
        if self.smoothing_factor > 1000 {
            return Err(ConfigError::ValidationFailed(
                "smooth_factor must be 0–1000",
            ));
        }
        Ok(())
    }
}

/// LED strip settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedConfig {
    /// Data line GPIO.
    pub data_pin: i32,
    /// RMT channel driving the data line.
    pub rmt_channel: u32,
    /// Number of pixels, 1–1000.
    pub led_count: u16,
    /// Global brightness applied on the wire, 0–255.
    pub brightness: u8,
}

impl LedConfig {
    /// Load the strip keys.  Unlike the sensor keys these have no defaults.
    pub fn load(
        store: &impl ConfigStore,
        data_pin: i32,
        rmt_channel: u32,
    ) -> Result<Self, ConfigError> {
        let led_count = store.get_i32(KEY_LED_COUNT)?;
        if led_count <= 0 || led_count > i32::from(MAX_LED_COUNT) {
            return Err(ConfigError::ValidationFailed("led_count must be 1–1000"));
        }
        let brightness = store.get_i32(KEY_LED_BRIGHTNESS)?;
        if !(0..=255).contains(&brightness) {
            return Err(ConfigError::ValidationFailed("led_bright must be 0–255"));
        }

        let cfg = Self {
            data_pin,
            rmt_channel,
            led_count: led_count as u16,
            brightness: brightness as u8,
        };
        info!(
            "LED config loaded: {} LEDs on GPIO{} (RMT ch{}), brightness {}",
            cfg.led_count, cfg.data_pin, cfg.rmt_channel, cfg.brightness
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.led_count == 0 || self.led_count > MAX_LED_COUNT {
            return Err(ConfigError::ValidationFailed("led_count must be 1–1000"));
        }
        Ok(())
    }
}

fn read_or_default(
    store: &impl ConfigStore,
    key: &'static str,
    default: i32,
) -> Result<i32, ConfigError> {
    match store.get_i32(key) {
        Ok(v) => {
            check_raw_range(key, v)?;
            Ok(v)
        }
        Err(ConfigError::NotFound(_)) => {
            warn!("{} not found in config store, using default: {}", key, default);
            Ok(default)
        }
        Err(e) => Err(e),
    }
}

/// Reject values that would be mangled by the narrowing casts in
/// [`SensorConfig::load`].
fn check_raw_range(key: &'static str, v: i32) -> Result<(), ConfigError> {
    let ok = match key {
        KEY_TEMPERATURE_C_X10 => i16::try_from(v).is_ok(),
        KEY_SMOOTHING_FACTOR => u16::try_from(v).is_ok(),
        _ => v >= 0,
    };
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore(HashMap<&'static str, i32>);

    impl ConfigStore for MapStore {
        fn get_i32(&self, key: &'static str) -> Result<i32, ConfigError> {
            self.0.get(key).copied().ok_or(ConfigError::NotFound(key))
        }
    }

    #[test]
    fn empty_store_yields_defaults() {
        let store = MapStore(HashMap::new());
        let cfg = SensorConfig::load(&store, 14, 13).unwrap();
        assert_eq!(cfg, SensorConfig::with_pins(14, 13));
        assert_eq!(cfg.measurement_interval_ms, 100);
        assert_eq!(cfg.timeout_ms, 30);
        assert_eq!(cfg.temperature_tenths_c, 200);
        assert_eq!(cfg.smoothing_factor, 300);
    }

    #[test]
    fn stored_values_override_defaults() {
        let store = MapStore(HashMap::from([
            (KEY_MEASUREMENT_INTERVAL_MS, 250),
            (KEY_TEMPERATURE_C_X10, -55),
        ]));
        let cfg = SensorConfig::load(&store, 1, 2).unwrap();
        assert_eq!(cfg.measurement_interval_ms, 250);
        assert_eq!(cfg.temperature_tenths_c, -55);
        assert_eq!(cfg.timeout_ms, 30);
    }

    #[test]
    fn timeout_must_be_below_interval() {
        let cfg = SensorConfig {
            measurement_interval_ms: 50,
            timeout_ms: 50,
            ..SensorConfig::with_pins(0, 0)
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn smoothing_above_1000_rejected() {
        let store = MapStore(HashMap::from([(KEY_SMOOTHING_FACTOR, 1001)]));
        assert!(matches!(
            SensorConfig::load(&store, 0, 0),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn temperature_that_does_not_fit_i16_rejected() {
        let store = MapStore(HashMap::from([(KEY_TEMPERATURE_C_X10, 70_000)]));
        assert!(SensorConfig::load(&store, 0, 0).is_err());
    }

    #[test]
    fn led_keys_are_mandatory() {
        let store = MapStore(HashMap::from([(KEY_LED_COUNT, 40)]));
        assert_eq!(
            LedConfig::load(&store, 12, 0),
            Err(ConfigError::NotFound(KEY_LED_BRIGHTNESS))
        );
    }

    #[test]
    fn led_count_bounds() {
        for bad in [0, -1, 1001] {
            let store = MapStore(HashMap::from([(KEY_LED_COUNT, bad), (KEY_LED_BRIGHTNESS, 128)]));
            assert!(
                matches!(LedConfig::load(&store, 12, 0), Err(ConfigError::ValidationFailed(_))),
                "led_count {} should be rejected",
                bad
            );
        }
        let store = MapStore(HashMap::from([(KEY_LED_COUNT, 1000), (KEY_LED_BRIGHTNESS, 255)]));
        let cfg = LedConfig::load(&store, 12, 0).unwrap();
        assert_eq!(cfg.led_count, 1000);
        assert_eq!(cfg.brightness, 255);
    }

    #[test]
    fn brightness_bounds() {
        let store = MapStore(HashMap::from([(KEY_LED_COUNT, 40), (KEY_LED_BRIGHTNESS, 256)]));
        assert!(LedConfig::load(&store, 12, 0).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let c = SensorConfig::with_pins(14, 13);
        let json = serde_json::to_string(&c).unwrap();
        let c2: SensorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }
}
