//! Desktop platform implementations
//!
//! Provides platform-specific implementations for desktop using
//! standard library and native crates.

use crate::ports::outbound::{StorageError, StorageProvider, TimeProvider};
use crate::state::Platform;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Desktop time provider using the system clock
#[derive(Clone, Default)]
pub struct DesktopTimeProvider;

impl TimeProvider for DesktopTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Desktop storage provider with file-based persistence
///
/// Stores key-value pairs in a JSON file at:
/// - Linux: ~/.config/duality/storage.json
/// - macOS: ~/Library/Application Support/io.duality.sheet/storage.json
/// - Windows: C:\Users\<User>\AppData\Roaming\duality\sheet\storage.json
#[derive(Clone)]
pub struct DesktopStorageProvider {
    /// Path to the storage file
    storage_path: PathBuf,
    /// In-memory cache of stored values
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for DesktopStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopStorageProvider {
    /// Create a storage provider at the platform config directory
    pub fn new() -> Self {
        let storage_path = if let Some(dirs) = ProjectDirs::from("io", "duality", "sheet") {
            dirs.config_dir().join("storage.json")
        } else {
            // Fallback to current directory if project dirs unavailable
            PathBuf::from("duality_storage.json")
        };
        Self::with_path(storage_path)
    }

    /// Create a storage provider backed by an explicit file
    ///
    /// Loads existing data from the file if it exists. An unreadable or
    /// corrupt file is logged and treated as empty.
    pub fn with_path(storage_path: impl Into<PathBuf>) -> Self {
        let storage_path = storage_path.into();

        let cache = if storage_path.exists() {
            match fs::read_to_string(&storage_path) {
                Ok(data) => match serde_json::from_str::<HashMap<String, String>>(&data) {
                    Ok(map) => map,
                    Err(e) => {
                        tracing::warn!("Failed to parse storage file: {}", e);
                        HashMap::new()
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read storage file: {}", e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        tracing::debug!("Desktop storage initialized at: {:?}", storage_path);

        Self {
            storage_path,
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Persist the cache to disk
    fn persist(&self) -> Result<(), StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = self.storage_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io("create_dir", e))?;
            }
        }

        let data = {
            let cache = self
                .cache
                .read()
                .map_err(|e| StorageError::io("persist", e))?;
            serde_json::to_string_pretty(&*cache)
                .map_err(|e| StorageError::io("serialize", e))?
        };

        // Write to a sibling file first so a crash never leaves a torn file
        let tmp_path = self.storage_path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(|e| StorageError::io("write", e))?;
        fs::rename(&tmp_path, &self.storage_path).map_err(|e| StorageError::io("rename", e))
    }
}

impl StorageProvider for DesktopStorageProvider {
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        {
            let mut guard = self
                .cache
                .write()
                .map_err(|e| StorageError::io("save", e))?;
            guard.insert(key.to_string(), value.to_string());
        } // Release lock before I/O
        self.persist().inspect_err(|e| {
            tracing::error!("Failed to write storage file: {}", e);
        })
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.cache.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                if guard.remove(key).is_none() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!("Failed to acquire write lock for storage: {}", e);
                return;
            }
        }
        if let Err(e) = self.persist() {
            tracing::error!("Failed to write storage file: {}", e);
        }
    }

    fn keys(&self) -> Vec<String> {
        match self.cache.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                Vec::new()
            }
        }
    }
}

/// Create platform services for desktop
///
/// `storage_path` overrides the platform config directory.
pub fn create_platform(storage_path: Option<&Path>) -> Platform {
    let storage = match storage_path {
        Some(path) => DesktopStorageProvider::with_path(path),
        None => DesktopStorageProvider::new(),
    };
    Platform::new(DesktopTimeProvider, storage)
}
