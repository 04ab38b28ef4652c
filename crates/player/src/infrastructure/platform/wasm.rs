//! WASM platform implementations
//!
//! Backs storage with the browser's `localStorage` and time with `Date.now()`.

use crate::ports::outbound::{StorageError, StorageProvider, TimeProvider};
use crate::state::Platform;
use chrono::{DateTime, Utc};

/// Browser time provider using `Date.now()`
#[derive(Clone, Default)]
pub struct WasmTimeProvider;

impl TimeProvider for WasmTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        let millis = js_sys::Date::now() as i64;
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// Browser storage provider using `window.localStorage`
#[derive(Clone, Default)]
pub struct WasmStorageProvider;

impl WasmStorageProvider {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl StorageProvider for WasmStorageProvider {
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = Self::storage()
            .ok_or_else(|| StorageError::unavailable("localStorage is not available"))?;
        storage.set_item(key, value).map_err(|e| {
            // Browsers raise QuotaExceededError here; the JsValue carries no size.
            let message = format!("{:?}", e);
            if message.contains("Quota") {
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed: key.len() + value.len(),
                    available: 0,
                }
            } else {
                StorageError::io("set_item", message)
            }
        })
    }

    fn load(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            if let Err(e) = storage.remove_item(key) {
                tracing::warn!("Failed to remove localStorage key {}: {:?}", key, e);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        let Some(storage) = Self::storage() else {
            return Vec::new();
        };
        let len = storage.length().unwrap_or(0);
        (0..len)
            .filter_map(|i| storage.key(i).ok().flatten())
            .collect()
    }
}

/// Create platform services for the browser
pub fn create_platform() -> Platform {
    Platform::new(WasmTimeProvider, WasmStorageProvider)
}
