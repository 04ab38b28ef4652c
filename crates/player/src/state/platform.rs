//! Platform DI Container
//!
//! This module provides the `Platform` struct - a dependency injection container
//! that aggregates the platform-specific storage and clock behind port traits.
//!
//! Usage:
//! - Created by `create_platform()` in platform/desktop.rs or platform/wasm.rs
//! - Handed to `SheetSession` through `storage_adapter()` / `time_adapter()`

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ports::outbound::{StorageError, StorageProvider, TimeProvider};

/// Unified platform services container
#[derive(Clone)]
pub struct Platform {
    time: Arc<dyn TimeProviderDyn>,
    storage: Arc<dyn StorageProviderDyn>,
}

// =============================================================================
// Dynamic trait versions for Arc storage
// =============================================================================

trait TimeProviderDyn: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

trait StorageProviderDyn: Send + Sync {
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn load(&self, key: &str) -> Option<String>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

// =============================================================================
// Blanket implementations - convert port traits to dyn-safe wrappers
// =============================================================================

impl<T: TimeProvider + Send + Sync> TimeProviderDyn for T {
    fn now(&self) -> DateTime<Utc> {
        TimeProvider::now(self)
    }
}

impl<T: StorageProvider + Send + Sync> StorageProviderDyn for T {
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        StorageProvider::save(self, key, value)
    }
    fn load(&self, key: &str) -> Option<String> {
        StorageProvider::load(self, key)
    }
    fn remove(&self, key: &str) {
        StorageProvider::remove(self, key)
    }
    fn keys(&self) -> Vec<String> {
        StorageProvider::keys(self)
    }
}

// =============================================================================
// Platform implementation
// =============================================================================

impl Platform {
    /// Create a new Platform with the given providers
    pub fn new<Tm, S>(time: Tm, storage: S) -> Self
    where
        Tm: TimeProvider + Send + Sync,
        S: StorageProvider + Send + Sync,
    {
        Self {
            time: Arc::new(time),
            storage: Arc::new(storage),
        }
    }

    // -------------------------------------------------------------------------
    // Time operations
    // -------------------------------------------------------------------------

    /// Current UTC time
    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    // -------------------------------------------------------------------------
    // Storage operations
    // -------------------------------------------------------------------------

    /// Save a string value with the given key
    pub fn storage_save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.save(key, value)
    }

    /// Load a string value by key, returns None if not found
    pub fn storage_load(&self, key: &str) -> Option<String> {
        self.storage.load(key)
    }

    /// Remove a value by key
    pub fn storage_remove(&self, key: &str) {
        self.storage.remove(key)
    }

    /// Every stored key
    pub fn storage_keys(&self) -> Vec<String> {
        self.storage.keys()
    }

    /// Get a StorageProvider adapter for use with application services
    ///
    /// # Example
    /// ```ignore
    /// let session = SheetSession::new(platform.storage_adapter(), platform.time_adapter(), config);
    /// ```
    pub fn storage_adapter(&self) -> PlatformStorageAdapter {
        PlatformStorageAdapter {
            platform: self.clone(),
        }
    }

    /// Get a TimeProvider adapter for use with application services
    pub fn time_adapter(&self) -> PlatformTimeAdapter {
        PlatformTimeAdapter {
            platform: self.clone(),
        }
    }
}

// =============================================================================
// Adapters for application services
// =============================================================================

/// Adapter that allows application services to use Platform's storage
#[derive(Clone)]
pub struct PlatformStorageAdapter {
    platform: Platform,
}

impl StorageProvider for PlatformStorageAdapter {
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.platform.storage_save(key, value)
    }

    fn load(&self, key: &str) -> Option<String> {
        self.platform.storage_load(key)
    }

    fn remove(&self, key: &str) {
        self.platform.storage_remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.platform.storage_keys()
    }
}

/// Adapter that allows application services to use Platform's clock
#[derive(Clone)]
pub struct PlatformTimeAdapter {
    platform: Platform,
}

impl TimeProvider for PlatformTimeAdapter {
    fn now(&self) -> DateTime<Utc> {
        self.platform.now()
    }
}
