//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for AmpSwitch.
//!
//! - Config validation: [`DeviceConfig::validate`] runs before persistence.
//! - Namespace isolation: each setting lives in its own namespace (see
//!   [`crate::settings`]).
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//!
//! NVS keys and namespaces are limited to 15 characters; longer names are
//! truncated.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::DeviceConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "ampswitch";
const CONFIG_KEY: &str = "devcfg";

const MAX_BLOB_SIZE: usize = 1024;
const NVS_NAME_MAX: usize = 15;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On a full partition or after an IDF version change the partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 {
                    return Err(StorageError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(StorageError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", truncate(namespace), truncate(key))
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

fn truncate(name: &str) -> &str {
    let mut end = name.len().min(NVS_NAME_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// NUL-terminated copy of an NVS name.
#[cfg(target_os = "espidf")]
fn c_name(name: &str) -> [u8; NVS_NAME_MAX + 1] {
    let mut buf = [0u8; NVS_NAME_MAX + 1];
    let bytes = truncate(name).as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);
    buf
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Err(ConfigError::NotFound),
            Err(_) => return Err(ConfigError::IoError),
        };
        let cfg: DeviceConfig = postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate().map_err(ConfigError::ValidationFailed)?;
        info!("NvsAdapter: loaded config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&mut self, config: &DeviceConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let bytes = postcard::to_slice(config, &mut buf).map_err(|_| ConfigError::StorageFull)?;
        let len = bytes.len();
        self.write(CONFIG_NAMESPACE, CONFIG_KEY, bytes).map_err(|e| match e {
            StorageError::Full => ConfigError::StorageFull,
            _ => ConfigError::IoError,
        })?;
        info!("NvsAdapter: config saved ({} bytes)", len);
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let data = self
                .store
                .get(&Self::composite_key(namespace, key))
                .ok_or(StorageError::NotFound)?;
            if data.len() > buf.len() {
                return Err(StorageError::TooLarge);
            }
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let k = c_name(key);
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(handle, k.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Err(StorageError::NotFound),
                Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH as i32 => Err(StorageError::TooLarge),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let k = c_name(key);
                let ret = unsafe {
                    nvs_set_blob(handle, k.as_ptr() as *const _, data.as_ptr() as *const _, data.len())
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
            result.map_err(|e| {
                warn!("NvsAdapter: write {}/{} failed ({})", namespace, key, e);
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let k = c_name(key);
                let ret = unsafe { nvs_erase_key(handle, k.as_ptr() as *const _) };
                if ret != ESP_OK as i32 && ret != ESP_ERR_NVS_NOT_FOUND as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => Ok(()),
                // Namespace never written: nothing to delete.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Ok(()),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.contains_key(&Self::composite_key(namespace, key))
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let k = c_name(key);
                let ret = unsafe { nvs_find_key(handle, k.as_ptr() as *const _, core::ptr::null_mut()) };
                Ok(ret == ESP_OK as i32)
            });
            result.unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Role;

    #[test]
    fn storage_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("midi_map", "map", &[1, 2, 3]).unwrap();
        assert!(nvs.exists("midi_map", "map"));

        let mut buf = [0u8; 16];
        let len = nvs.read("midi_map", "map", &mut buf).unwrap();
        assert_eq!(&buf[..len], &[1, 2, 3]);

        nvs.delete("midi_map", "map").unwrap();
        assert!(!nvs.exists("midi_map", "map"));
    }

    #[test]
    fn read_missing_key() {
        let nvs = NvsAdapter::new().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(nvs.read("ns", "nope", &mut buf), Err(StorageError::NotFound));
    }

    #[test]
    fn read_into_short_buffer_fails() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("ns", "big", &[0; 32]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(nvs.read("ns", "big", &mut buf), Err(StorageError::TooLarge));
    }

    #[test]
    fn long_names_truncate_like_nvs() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("a_very_long_namespace", "k", &[7]).unwrap();
        assert!(nvs.exists("a_very_long_nam", "k"));
    }

    #[test]
    fn config_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::NotFound));
        let cfg = DeviceConfig::server(3);
        nvs.save(&cfg).unwrap();
        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.role, Role::Server);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn invalid_config_is_not_saved() {
        let mut nvs = NvsAdapter::new().unwrap();
        let mut cfg = DeviceConfig::client(2);
        cfg.channel_count = 0;
        assert!(matches!(nvs.save(&cfg), Err(ConfigError::ValidationFailed(_))));
        assert_eq!(nvs.load(), Err(ConfigError::NotFound));
    }

    #[test]
    fn corrupted_config_detected() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write(CONFIG_NAMESPACE, CONFIG_KEY, &[0xFF; 4]).unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }
}
