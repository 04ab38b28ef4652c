//! SheetSession - the surface presentation collaborators talk to
//!
//! Wires the entity store, scoped key proxy, and autosave controller
//! together over one storage backend and clock. Collaborators read and
//! write named fields of the current character, register field bindings,
//! and forward change notifications; everything else stays inside.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use duality_domain::{CharacterRecord, EntityId, FieldPath};
use serde_json::Value;

use super::autosave::{AutosaveController, SaveOutcome, SaveTrigger};
use super::entity_store::EntityStore;
use super::field_bindings::{Coercion, TrackerSource, ValueSource};
use super::scoped_keys::ScopedKeyProxy;
use crate::application::error::StoreError;
use crate::config::SheetConfig;
use crate::ports::outbound::{SaveStatusPort, StorageError, StorageProvider, TimeProvider};

pub struct SheetSession<S: StorageProvider, T: TimeProvider> {
    store: EntityStore<S, T>,
    proxy: ScopedKeyProxy<S>,
    autosave: AutosaveController,
}

impl<S: StorageProvider, T: TimeProvider> SheetSession<S, T> {
    pub fn new(storage: S, clock: T, config: &SheetConfig, status: Arc<dyn SaveStatusPort>) -> Self {
        let proxy = ScopedKeyProxy::new(storage.clone(), config.scope_policy());
        let store = EntityStore::new(storage, clock, config.hope_bounds());
        let autosave = AutosaveController::new(config.autosave_settings(), status);
        Self {
            store,
            proxy,
            autosave,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.store.clock().now()
    }

    pub fn store(&self) -> &EntityStore<S, T> {
        &self.store
    }

    pub fn proxy(&self) -> &ScopedKeyProxy<S> {
        &self.proxy
    }

    pub fn autosave(&self) -> &AutosaveController {
        &self.autosave
    }

    pub fn current_id(&self) -> Option<&EntityId> {
        self.store.current_id()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Reload the character named by the persisted pointer, if any.
    pub fn restore(&mut self) -> Option<CharacterRecord> {
        let id = self.store.current_id().cloned()?;
        let record = self.store.load(&id);
        tracing::info!(entity = %id, name = %record.name, "Restored session");
        Some(record)
    }

    /// Create a character with a generated id. The current entity is not
    /// changed.
    pub fn create_character(&mut self, seed: &Value) -> CharacterRecord {
        let id = EntityId::generate();
        tracing::info!(entity = %id, "Creating character");
        self.store.create(&id, seed)
    }

    /// Switch characters, saving the outgoing character's live state first.
    pub fn switch_to(&mut self, id: &EntityId) -> CharacterRecord {
        let now = self.now();
        self.autosave.switch_entity(&mut self.store, id, now)
    }

    /// Remove a character's record and every key scoped to it.
    ///
    /// Returns the number of scoped keys purged.
    pub fn delete_character(&mut self, id: &EntityId) -> usize {
        if self.store.session().is_current(id) {
            self.autosave.cancel_pending();
        }
        self.store.remove(id);
        self.proxy.purge_entity(id)
    }

    /// Save the current character, then forget it.
    pub fn logout(&mut self) -> Option<SaveOutcome> {
        let outcome = if self.store.current_id().is_some() {
            self.flush()
        } else {
            None
        };
        self.autosave.cancel_pending();
        if let Err(e) = self.store.set_current_id(None) {
            tracing::warn!(error = %e, "Failed to clear current entity pointer");
        }
        self.store.clear_cache();
        tracing::info!("Logged out");
        outcome
    }

    pub fn known_characters(&self) -> Vec<EntityId> {
        self.store.known_ids()
    }

    // =========================================================================
    // Fields of the current character
    // =========================================================================

    pub fn current_record(&mut self) -> Result<CharacterRecord, StoreError> {
        let id = self
            .store
            .current_id()
            .cloned()
            .ok_or(StoreError::NoActiveEntity)?;
        Ok(self.store.load(&id))
    }

    /// Value at a dotted path of the current record.
    pub fn read_field(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        let path = FieldPath::parse(path)?;
        let record = self.current_record()?;
        let doc = record
            .to_document()
            .map_err(|e| StoreError::malformed(&record.id, e))?;
        Ok(path.get(&doc).cloned())
    }

    /// Write a value at a dotted path of the current record and save.
    pub fn write_field(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        let path = FieldPath::parse(path)?;
        let id = self
            .store
            .current_id()
            .cloned()
            .ok_or(StoreError::NoActiveEntity)?;
        if self.store.update(&id, &path.to_patch(value))? {
            Ok(())
        } else {
            Err(StoreError::malformed(
                &id,
                format!("value at {} does not fit the record", path.as_str()),
            ))
        }
    }

    // =========================================================================
    // Scoped keys
    // =========================================================================

    pub fn read_scoped(&self, key: &str) -> Option<String> {
        self.proxy.read(self.store.session(), key)
    }

    pub fn write_scoped(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.proxy.write(self.store.session(), key, value)
    }

    pub fn erase_scoped(&self, key: &str) {
        self.proxy.erase(self.store.session(), key)
    }

    /// Copy legacy global values into the current character's scope.
    pub fn migrate_legacy_keys(&self) -> Result<usize, StoreError> {
        let id = self.store.current_id().ok_or(StoreError::NoActiveEntity)?;
        Ok(self.proxy.migrate(id))
    }

    // =========================================================================
    // Autosave
    // =========================================================================

    pub fn bind_field(&mut self, path: &str, read: ValueSource, coercion: Coercion) -> Result<(), StoreError> {
        Ok(self.autosave.bind_field(path, read, coercion)?)
    }

    pub fn bind_trackers(&mut self, source: TrackerSource) {
        self.autosave.bind_trackers(source);
    }

    pub fn on_change(&mut self, path: &str) {
        let now = self.now();
        self.autosave.on_change(path, now);
    }

    pub fn poll(&mut self) -> Option<SaveTrigger> {
        let now = self.now();
        self.autosave.poll(&mut self.store, now)
    }

    pub fn flush(&mut self) -> Option<SaveOutcome> {
        let now = self.now();
        self.autosave.flush(&mut self.store, now)
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.autosave.next_deadline()
    }
}
