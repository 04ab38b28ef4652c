//! Platform abstraction ports for cross-platform compatibility
//!
//! These traits abstract platform-specific operations so that:
//! 1. The persistence core stays platform-agnostic
//! 2. Platform-specific code is isolated in infrastructure
//! 3. Code becomes easily testable with in-memory implementations

use chrono::{DateTime, Utc};

use super::error::StorageError;

/// Wall-clock abstraction used for record timestamps
pub trait TimeProvider: Clone + 'static {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Flat key-value storage abstraction (localStorage/file-based)
///
/// Keys are undifferentiated: any namespacing is layered on top by the
/// scoped key proxy.
pub trait StorageProvider: Clone + 'static {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a value by key
    fn remove(&self, key: &str);

    /// Every key currently stored
    fn keys(&self) -> Vec<String>;
}

/// Storage key constants
///
/// These define the contract for the global (never entity-scoped) keys used
/// by the persistence core.
pub mod storage_keys {
    use duality_domain::EntityId;

    /// Holds the active entity id; absent or empty when none is active.
    pub const CURRENT_ENTITY: &str = "duality_current_entity";

    /// Prefix of persisted character records.
    pub const ENTITY_DATA_PREFIX: &str = "entity-data-";

    /// `entity-data-{id}`
    pub fn entity_data(id: &EntityId) -> String {
        format!("{}{}", ENTITY_DATA_PREFIX, id)
    }
}
