//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`]: the light configuration is stored as one
//! `postcard` blob under `beaconlight::lightcfg`.
//!
//! - Config validation: fields are range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Host builds keep blobs in an in-memory map.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{COLOR_TEMP_RANGE, LightConfig, MAX_FADE_MS};
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "beaconlight";
const CONFIG_KEY: &str = "lightcfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On a full or outdated partition the flash is erased and
    /// re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                log::warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = CONFIG_NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_cstr() -> [u8; 16] {
        let mut key_buf = [0u8; 16];
        let kb = CONFIG_KEY.as_bytes();
        let kl = kb.len().min(15);
        key_buf[..kl].copy_from_slice(&kb[..kl]);
        key_buf
    }
}

pub(crate) fn validate_config(cfg: &LightConfig) -> Result<(), ConfigError> {
    let (min_k, max_k) = COLOR_TEMP_RANGE;
    if !(min_k..=max_k).contains(&cfg.color_temperature) {
        return Err(ConfigError::ValidationFailed(
            "colorTemp must be 1000–40000",
        ));
    }
    if cfg.fade_in_ms > MAX_FADE_MS {
        return Err(ConfigError::ValidationFailed(
            "fadeInTime must be 0–60000",
        ));
    }
    if cfg.fade_out_ms > MAX_FADE_MS {
        return Err(ConfigError::ValidationFailed(
            "fadeOutTime must be 0–60000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<LightConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        let bytes = self
            .store
            .borrow()
            .get(&Self::composite_key())
            .cloned()
            .ok_or(ConfigError::NotFound)?;

        #[cfg(target_os = "espidf")]
        let bytes = {
            let key = Self::key_cstr();
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret != ESP_OK as i32 || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(buf)
            });
            match result {
                Ok(bytes) => bytes,
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => return Err(ConfigError::NotFound),
                Err(e) => {
                    log::warn!("NvsAdapter: NVS read error {}", e);
                    return Err(ConfigError::IoError);
                }
            }
        };

        let cfg: LightConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg).map_err(|_| ConfigError::Corrupted)?;
        info!("NvsAdapter: loaded light config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &LightConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().insert(Self::composite_key(), bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::key_cstr();
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 => Err(ConfigError::StorageFull),
                Err(e) => {
                    log::warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_config(&LightConfig::default()).is_ok());
    }

    #[test]
    fn rejects_color_temperature_out_of_range() {
        let cfg = LightConfig {
            color_temperature: 500,
            ..LightConfig::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_fade_over_limit() {
        let cfg = LightConfig {
            fade_out_ms: 60_001,
            ..LightConfig::default()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn first_boot_reports_not_found() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::NotFound));
    }

    #[test]
    fn save_then_load() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = LightConfig {
            red: 12,
            away_brightness: 40,
            smoothing: false,
            ..LightConfig::default()
        };
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn invalid_config_is_not_persisted() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = LightConfig {
            color_temperature: 50_000,
            ..LightConfig::default()
        };
        assert!(nvs.save(&cfg).is_err());
        assert_eq!(nvs.load(), Err(ConfigError::NotFound));
    }

    #[test]
    fn corrupted_blob_is_reported() {
        let nvs = NvsAdapter::new().unwrap();
        nvs.store
            .borrow_mut()
            .insert(NvsAdapter::composite_key(), vec![0xFF; 3]);
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }
}
