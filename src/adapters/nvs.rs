//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigStore`] over the `"config"` namespace.  Values are
//! plain `i32` entries written by the provisioning side; this firmware only
//! reads them at boot, plus `set_i32` for provisioning and tests.
//!
//! The simulation backend is an in-memory map.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::ports::{ConfigError, ConfigStore};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const CONFIG_NAMESPACE: &str = "config";

/// NVS keys and namespaces are limited to 15 characters.
const MAX_KEY_LEN: usize = 15;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, i32>,
}

impl NvsConfigStore {
    /// Initialise NVS flash and open the config store.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError(ret2));
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError(ret3));
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError(ret));
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    /// Null-terminated copy of `s`, truncated to the NVS limit.
    #[cfg(target_os = "espidf")]
    fn c_name(s: &str) -> [u8; MAX_KEY_LEN + 1] {
        let mut buf = [0u8; MAX_KEY_LEN + 1];
        let bytes = s.as_bytes();
        let len = bytes.len().min(MAX_KEY_LEN);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open the config namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(CONFIG_NAMESPACE);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is null-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle opened above and not used after this point.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Store `value` under `key`.
    #[cfg(target_os = "espidf")]
    pub fn set_i32(&mut self, key: &'static str, value: i32) -> Result<(), ConfigError> {
        check_key(key)?;
        let k = Self::c_name(key);
        Self::with_nvs_handle(true, |handle| {
            // SAFETY: handle is open read-write; `k` is null-terminated.
            let ret = unsafe { nvs_set_i32(handle, k.as_ptr().cast(), value) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|rc| {
            warn!("NvsConfigStore: write of '{}' failed (rc={})", key, rc);
            ConfigError::IoError(rc)
        })
    }

    /// Store `value` under `key`.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_i32(&mut self, key: &'static str, value: i32) -> Result<(), ConfigError> {
        check_key(key)?;
        self.store.insert(key.to_owned(), value);
        Ok(())
    }
}

fn check_key(key: &'static str) -> Result<(), ConfigError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(ConfigError::ValidationFailed("NVS key must be 1–15 characters"));
    }
    Ok(())
}

impl ConfigStore for NvsConfigStore {
    #[cfg(target_os = "espidf")]
    fn get_i32(&self, key: &'static str) -> Result<i32, ConfigError> {
        check_key(key)?;
        let k = Self::c_name(key);
        let result = Self::with_nvs_handle(false, |handle| {
            let mut value: i32 = 0;
            // SAFETY: handle is open; `k` is null-terminated; `value` is a
            // valid out-pointer for the duration of the call.
            let ret = unsafe { nvs_get_i32(handle, k.as_ptr().cast(), &mut value) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(value)
        });
        match result {
            Ok(v) => Ok(v),
            // A namespace that was never written also reads as "not found".
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(ConfigError::NotFound(key)),
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn get_i32(&self, key: &'static str) -> Result<i32, ConfigError> {
        check_key(key)?;
        self.store
            .get(key)
            .copied()
            .ok_or(ConfigError::NotFound(key))
    }
}
