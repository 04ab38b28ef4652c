//! In-memory storage provider
//!
//! Used as the degraded backend when no persistent storage is reachable and
//! as the default test double. An optional byte quota mimics the browser's
//! localStorage limit so quota failures can be exercised.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ports::outbound::{StorageError, StorageProvider};

#[derive(Clone, Default)]
pub struct MemoryStorageProvider {
    data: Arc<RwLock<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit total stored bytes (keys + values).
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            data: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Seed from existing pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(map)),
            quota_bytes: None,
        }
    }

    pub fn len(&self) -> usize {
        match self.data.read() {
            Ok(guard) => guard.len(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn used_bytes(map: &HashMap<String, String>, skip_key: &str) -> usize {
        map.iter()
            .filter(|(k, _)| k.as_str() != skip_key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .data
            .write()
            .map_err(|e| StorageError::io("save", e))?;
        if let Some(quota) = self.quota_bytes {
            let used = Self::used_bytes(&guard, key);
            let needed = key.len() + value.len();
            if used + needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.data.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        match self.data.write() {
            Ok(mut guard) => {
                guard.remove(key);
            }
            Err(e) => {
                tracing::error!("Failed to acquire write lock for storage: {}", e);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        match self.data.read() {
            Ok(guard) => {
                let mut keys: Vec<String> = guard.keys().cloned().collect();
                keys.sort();
                keys
            }
            Err(e) => {
                tracing::error!("Failed to acquire read lock for storage: {}", e);
                Vec::new()
            }
        }
    }
}
