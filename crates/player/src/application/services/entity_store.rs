//! Entity Data Store - canonical CRUD over character records
//!
//! Records are persisted as JSON under `entity-data-{id}` and cached by id;
//! once warm, the cache is the authoritative read path. The store also owns
//! the session (current-entity pointer) and mirrors it to storage.
//!
//! Read failures never propagate: a missing or corrupt record degrades to
//! the canonical default. Write failures keep the cache updated and are
//! returned so the caller can report them.

use std::collections::HashMap;

use duality_domain::{deep_merge, CharacterRecord, EntityId, HopeBounds};
use serde_json::Value;

use crate::application::error::StoreError;
use crate::ports::outbound::{storage_keys, StorageProvider, TimeProvider};
use crate::state::Session;

/// Result of [`EntityStore::switch_to`]
#[derive(Debug)]
pub struct SwitchOutcome {
    /// The incoming entity's record.
    pub record: CharacterRecord,
    /// Result of persisting the outgoing entity's live state, when a patch
    /// was supplied and another entity was current.
    pub outgoing: Option<Result<bool, StoreError>>,
}

pub struct EntityStore<S: StorageProvider, T: TimeProvider> {
    storage: S,
    clock: T,
    bounds: HopeBounds,
    cache: HashMap<EntityId, CharacterRecord>,
    session: Session,
}

impl<S: StorageProvider, T: TimeProvider> EntityStore<S, T> {
    /// Create a store, restoring the persisted current-entity pointer.
    pub fn new(storage: S, clock: T, bounds: HopeBounds) -> Self {
        let session = Session::restore(&storage);
        Self {
            storage,
            clock,
            bounds,
            cache: HashMap::new(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Create a record from the canonical default with `seed` overlaid.
    ///
    /// If `id` already has a record, that record is returned unchanged.
    pub fn create(&mut self, id: &EntityId, seed: &Value) -> CharacterRecord {
        if self.exists(id) {
            tracing::warn!(entity = %id, "Record already exists, returning existing record");
            return self.load(id);
        }
        self.create_fresh(id, seed)
    }

    /// Load a record, completing older documents against the default shape.
    pub fn load(&mut self, id: &EntityId) -> CharacterRecord {
        if let Some(record) = self.cache.get(id) {
            return record.clone();
        }

        let key = storage_keys::entity_data(id);
        let Some(raw) = self.storage.load(&key) else {
            tracing::debug!(entity = %id, "No persisted record, creating default");
            return self.create_fresh(id, &Value::Null);
        };

        match self.parse_persisted(id, &raw) {
            Ok(record) => {
                self.cache.insert(id.clone(), record.clone());
                record
            }
            Err(e) => {
                tracing::warn!(entity = %id, error = %e, "Discarding malformed record");
                self.create_fresh(id, &Value::Null)
            }
        }
    }

    /// Persist a complete record. No merging happens here.
    ///
    /// The cache is updated even when the backend rejects the write.
    pub fn save(&mut self, id: &EntityId, mut record: CharacterRecord) -> Result<(), StoreError> {
        if record.id != *id {
            tracing::warn!(entity = %id, record_id = %record.id, "Record id mismatch, keeping store id");
            record.id = id.clone();
        }
        record.touch(self.clock.now());

        let payload = serde_json::to_string(&record);
        self.cache.insert(id.clone(), record);
        let payload = payload.map_err(|e| StoreError::save_failed(id, e))?;

        self.storage
            .save(&storage_keys::entity_data(id), &payload)
            .map_err(|e| {
                tracing::error!(entity = %id, error = %e, "Failed to persist record, keeping it in memory");
                StoreError::storage(id, e)
            })
    }

    /// Deep-merge `patch` over the current record and save.
    ///
    /// Returns `Ok(false)` when the patch is rejected: not an object, or the
    /// merged document no longer describes a record. Nothing is written then.
    pub fn update(&mut self, id: &EntityId, patch: &Value) -> Result<bool, StoreError> {
        if !patch.is_object() {
            tracing::warn!(entity = %id, "Ignoring non-object patch");
            return Ok(false);
        }

        let current = self.load(id);
        let mut doc = current
            .to_document()
            .map_err(|e| StoreError::save_failed(id, e))?;
        deep_merge(&mut doc, patch);

        let mut record = match CharacterRecord::from_document(doc, self.bounds) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(entity = %id, error = %e, "Rejected patch");
                return Ok(false);
            }
        };
        record.id = id.clone();
        record.created_at = current.created_at;

        self.save(id, record)?;
        Ok(true)
    }

    /// Make `id` current and load its record.
    ///
    /// When a different entity is current and `outgoing` is supplied, that
    /// patch is persisted for the outgoing entity before the pointer moves.
    pub fn switch_to(&mut self, id: &EntityId, outgoing: Option<&Value>) -> SwitchOutcome {
        let outgoing = match (self.session.current().cloned(), outgoing) {
            (Some(previous), Some(patch)) if previous != *id => {
                tracing::debug!(from = %previous, to = %id, "Persisting outgoing entity before switch");
                Some(self.update(&previous, patch))
            }
            _ => None,
        };

        if let Err(e) = self.set_current_id(Some(id.clone())) {
            tracing::warn!(entity = %id, error = %e, "Current entity pointer not persisted");
        }
        let record = self.load(id);
        tracing::info!(entity = %id, "Switched current entity");

        SwitchOutcome { record, outgoing }
    }

    /// Delete the persisted record and evict it; clears the pointer if `id`
    /// was current.
    pub fn remove(&mut self, id: &EntityId) {
        self.storage.remove(&storage_keys::entity_data(id));
        self.cache.remove(id);
        if self.session.is_current(id) {
            // Clearing the pointer only removes a key and cannot fail.
            let _ = self.set_current_id(None);
        }
        tracing::info!(entity = %id, "Removed record");
    }

    // =========================================================================
    // Pointer
    // =========================================================================

    pub fn current_id(&self) -> Option<&EntityId> {
        self.session.current()
    }

    /// Move the pointer; `None` removes the persisted pointer key.
    ///
    /// The in-memory pointer moves even if persisting it fails.
    pub fn set_current_id(&mut self, id: Option<EntityId>) -> Result<(), StoreError> {
        self.session.set(id);
        self.session.persist(&self.storage).map_err(|e| match self.session.current() {
            Some(current) => StoreError::storage(current, e),
            None => StoreError::NoActiveEntity,
        })
    }

    // =========================================================================
    // Cache and enumeration
    // =========================================================================

    /// Ids with a persisted record, sorted.
    pub fn known_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .storage
            .keys()
            .iter()
            .filter_map(|key| key.strip_prefix(storage_keys::ENTITY_DATA_PREFIX))
            .filter_map(|raw| EntityId::new(raw).ok())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn is_cached(&self, id: &EntityId) -> bool {
        self.cache.contains_key(id)
    }

    /// Drop a cached record; the next load re-reads storage.
    pub fn evict(&mut self, id: &EntityId) -> Option<CharacterRecord> {
        self.cache.remove(id)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn exists(&self, id: &EntityId) -> bool {
        self.cache.contains_key(id) || self.storage.load(&storage_keys::entity_data(id)).is_some()
    }

    fn create_fresh(&mut self, id: &EntityId, seed: &Value) -> CharacterRecord {
        let now = self.clock.now();
        let mut record = CharacterRecord::new(id.clone(), now);

        match seed {
            Value::Null => {}
            Value::Object(map) if map.is_empty() => {}
            Value::Object(_) => match self.apply_seed(&record, seed) {
                Ok(seeded) => record = seeded,
                Err(e) => tracing::warn!(entity = %id, error = %e, "Ignoring unusable seed"),
            },
            _ => tracing::warn!(entity = %id, "Ignoring non-object seed"),
        }
        record.id = id.clone();
        record.created_at = now;

        if let Err(e) = self.save(id, record) {
            tracing::warn!(entity = %id, error = %e, "New record kept in memory only");
        }
        self.cache
            .get(id)
            .cloned()
            .unwrap_or_else(|| CharacterRecord::new(id.clone(), now))
    }

    fn apply_seed(&self, base: &CharacterRecord, seed: &Value) -> Result<CharacterRecord, StoreError> {
        let mut doc = base
            .to_document()
            .map_err(|e| StoreError::malformed(&base.id, e))?;
        deep_merge(&mut doc, seed);
        CharacterRecord::from_document(doc, self.bounds).map_err(|e| StoreError::malformed(&base.id, e))
    }

    fn parse_persisted(&self, id: &EntityId, raw: &str) -> Result<CharacterRecord, StoreError> {
        let doc: Value = serde_json::from_str(raw).map_err(|e| StoreError::malformed(id, e))?;
        let (mut record, filled) =
            CharacterRecord::upgrade_document(doc, id, self.clock.now(), self.bounds)
                .map_err(|e| StoreError::malformed(id, e))?;
        if !filled.is_empty() {
            tracing::debug!(entity = %id, filled = ?filled, "Completed record with defaults");
        }
        if record.id != *id {
            tracing::warn!(entity = %id, record_id = %record.id, "Persisted record id mismatch");
            record.id = id.clone();
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::MemoryStorageProvider;
    use crate::infrastructure::testing::ManualTimeProvider;
    use chrono::Duration;
    use serde_json::json;

    type TestStore = EntityStore<MemoryStorageProvider, ManualTimeProvider>;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn store_with(storage: &MemoryStorageProvider) -> (TestStore, ManualTimeProvider) {
        let clock = ManualTimeProvider::default();
        let store = EntityStore::new(storage.clone(), clock.clone(), HopeBounds::default());
        (store, clock)
    }

    fn persisted(storage: &MemoryStorageProvider, id: &EntityId) -> Value {
        let raw = storage.load(&storage_keys::entity_data(id)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn create_rex_scenario() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");

        store.create(&char_1, &json!({"name": "Rex", "level": 3}));
        store.clear_cache();
        let record = store.load(&char_1);

        assert_eq!(record.name, "Rex");
        assert_eq!(record.level, 3);
        assert_eq!(record.hp.circles().len(), 4);
        assert!(record.hp.circles().iter().all(|c| c.active));
        assert_eq!((record.hope.current(), record.hope.max()), (0, 6));
    }

    #[test]
    fn create_stamps_timestamps_and_persists() {
        let storage = MemoryStorageProvider::new();
        let (mut store, clock) = store_with(&storage);
        let char_1 = id("char_1");

        let record = store.create(&char_1, &json!({}));

        assert_eq!(record.created_at, clock.now());
        assert_eq!(record.last_modified, clock.now());
        assert_eq!(persisted(&storage, &char_1)["id"], json!("char_1"));
        assert!(store.is_cached(&char_1));
    }

    #[test]
    fn create_on_existing_id_returns_existing_record() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");

        store.create(&char_1, &json!({"name": "Rex"}));
        let again = store.create(&char_1, &json!({"name": "Impostor"}));

        assert_eq!(again.name, "Rex");
        assert_eq!(persisted(&storage, &char_1)["name"], json!("Rex"));
    }

    #[test]
    fn seed_cannot_change_id() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);

        let record = store.create(&id("char_1"), &json!({"id": "char_2"}));
        assert_eq!(record.id.as_str(), "char_1");
    }

    #[test]
    fn load_absent_creates_default() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_9 = id("char_9");

        let record = store.load(&char_9);

        assert_eq!(record.level, 1);
        assert!(storage.load(&storage_keys::entity_data(&char_9)).is_some());
    }

    #[test]
    fn load_malformed_recreates_default() {
        for raw in ["{not json", "[1, 2, 3]", r#"{"hp": "full"}"#] {
            let storage =
                MemoryStorageProvider::from_pairs([(storage_keys::entity_data(&id("char_1")), raw)]);
            let (mut store, _) = store_with(&storage);

            let record = store.load(&id("char_1"));

            assert_eq!(record.hp.max(), 4, "input {raw}");
            assert_eq!(persisted(&storage, &id("char_1"))["hp"]["max"], json!(4));
        }
    }

    #[test]
    fn completion_merge_is_additive() {
        let char_1 = id("char_1");
        let original = json!({
            "id": "char_1",
            "name": "Rex",
            "level": 5,
            "attributes": {"strength": 1, "agility": -1},
            "hp": {"current": 1, "max": 2, "circles": [{"active": true}, {"active": false}]},
            "equipment": [{"name": "Rope", "qty": 1}],
            "houseRule": {"critsExplode": true}
        });
        let storage = MemoryStorageProvider::from_pairs([(
            storage_keys::entity_data(&char_1),
            original.to_string(),
        )]);
        let (mut store, _) = store_with(&storage);

        let doc = store.load(&char_1).to_document().unwrap();

        for key in ["id", "name", "level", "hp", "equipment", "houseRule"] {
            assert_eq!(doc[key], original[key], "key {key} changed");
        }
        assert_eq!(doc["attributes"]["strength"], json!(1));
        assert_eq!(doc["attributes"]["agility"], json!(-1));
        assert_eq!(doc["attributes"]["finesse"], json!(0));
        assert_eq!(doc["hope"], json!({"current": 0, "max": 6}));
        assert_eq!(doc["uiPreferences"]["theme"], json!("dark"));
        assert_eq!(doc["damageThresholds"], json!({"major": 7, "severe": 14}));
    }

    #[test]
    fn cache_hit_returns_cached_record() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        store.create(&char_1, &json!({"name": "Rex"}));

        storage.remove(&storage_keys::entity_data(&char_1));
        assert_eq!(store.load(&char_1).name, "Rex");

        store.evict(&char_1);
        assert_eq!(store.load(&char_1).name, "");
    }

    #[test]
    fn save_stamps_last_modified_and_forces_id() {
        let storage = MemoryStorageProvider::new();
        let (mut store, clock) = store_with(&storage);
        let char_1 = id("char_1");
        let mut record = store.create(&char_1, &json!({}));
        let created = record.created_at;

        clock.advance(Duration::seconds(30));
        record.id = id("char_other");
        record.name = "Renamed".into();
        store.save(&char_1, record).unwrap();

        let saved = store.load(&char_1);
        assert_eq!(saved.id, char_1);
        assert_eq!(saved.created_at, created);
        assert_eq!(saved.last_modified, clock.now());
        assert_eq!(persisted(&storage, &char_1)["name"], json!("Renamed"));
    }

    #[test]
    fn save_failure_keeps_cache_and_reports_storage_unavailable() {
        let storage = MemoryStorageProvider::with_quota(64);
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");

        let mut record = store.load(&char_1);
        record.name = "Rex".into();
        let err = store.save(&char_1, record).unwrap_err();

        assert!(err.is_degraded());
        assert_eq!(store.load(&char_1).name, "Rex");
        assert!(storage.load(&storage_keys::entity_data(&char_1)).is_none());
    }

    #[test]
    fn update_merges_attributes() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        store.create(&char_1, &json!({"attributes": {"strength": 1}}));

        assert!(store.update(&char_1, &json!({"attributes": {"agility": 2}})).unwrap());
        store.clear_cache();
        let record = store.load(&char_1);

        assert_eq!(record.attributes.agility, 2);
        assert_eq!(record.attributes.strength, 1);
    }

    #[test]
    fn update_replaces_tracker_circles_wholesale() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        store.create(&char_1, &json!({}));

        let patch = json!({"hp": {"circles": [{"active": false}, {"active": true}]}});
        assert!(store.update(&char_1, &patch).unwrap());
        store.clear_cache();
        let hp = store.load(&char_1).hp;

        assert_eq!(hp.circles().len(), 2);
        assert_eq!(hp.max(), 2);
        assert_eq!(hp.current(), 1);
        assert!(!hp.circles()[0].active);
    }

    #[test]
    fn update_with_empty_circles_clears_tracker() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        store.create(&char_1, &json!({}));

        assert!(store.update(&char_1, &json!({"hp": {"circles": []}})).unwrap());
        store.clear_cache();
        let hp = store.load(&char_1).hp;

        assert!(hp.circles().is_empty());
        assert_eq!(hp.max(), 0);
        assert_eq!(hp.current(), 0);
    }

    #[test]
    fn update_rejects_oversized_tracker() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        store.create(&char_1, &json!({}));

        let patch = json!({"stress": {"circles": vec![json!({"active": false}); 40]}});
        assert!(!store.update(&char_1, &patch).unwrap());
        assert_eq!(store.load(&char_1).stress.max(), 6);
    }

    #[test]
    fn update_rejects_uncoercible_patch() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        store.create(&char_1, &json!({"level": 2}));
        let before = persisted(&storage, &char_1);

        assert!(!store.update(&char_1, &json!({"level": "two"})).unwrap());
        assert!(!store.update(&char_1, &json!([1])).unwrap());
        assert_eq!(persisted(&storage, &char_1), before);
        assert_eq!(store.load(&char_1).level, 2);
    }

    #[test]
    fn update_keeps_identity() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let char_1 = id("char_1");
        let created = store.create(&char_1, &json!({})).created_at;

        store
            .update(&char_1, &json!({"id": "char_2", "createdAt": "2001-01-01T00:00:00Z"}))
            .unwrap();
        let record = store.load(&char_1);
        assert_eq!(record.id, char_1);
        assert_eq!(record.created_at, created);
    }

    #[test]
    fn switch_persists_outgoing_patch_before_loading() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let (a, b) = (id("char_a"), id("char_b"));
        store.create(&a, &json!({"name": "A"}));
        store.switch_to(&a, None);

        let outcome = store.switch_to(&b, Some(&json!({"name": "A edited"})));

        assert!(matches!(outcome.outgoing, Some(Ok(true))));
        assert_eq!(persisted(&storage, &a)["name"], json!("A edited"));
        assert_eq!(outcome.record.id, b);
        assert_eq!(store.current_id(), Some(&b));
        assert_eq!(storage.load(storage_keys::CURRENT_ENTITY), Some("char_b".into()));
    }

    #[test]
    fn switch_without_current_entity_skips_outgoing() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);

        let outcome = store.switch_to(&id("char_a"), Some(&json!({"name": "ghost"})));

        assert!(outcome.outgoing.is_none());
        assert_eq!(outcome.record.name, "");
    }

    #[test]
    fn remove_only_affects_target_and_clears_pointer() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        let (a, b) = (id("char_a"), id("char_b"));
        store.create(&a, &json!({"name": "A"}));
        store.create(&b, &json!({"name": "B"}));
        store.switch_to(&a, None);

        store.remove(&a);

        assert_eq!(store.current_id(), None);
        assert_eq!(storage.load(storage_keys::CURRENT_ENTITY), None);
        assert!(!store.is_cached(&a));
        assert_eq!(store.known_ids(), vec![b.clone()]);
        assert_eq!(store.load(&b).name, "B");
    }

    #[test]
    fn pointer_survives_restart() {
        let storage = MemoryStorageProvider::new();
        let (mut store, _) = store_with(&storage);
        store.set_current_id(Some(id("char_7"))).unwrap();

        let (restarted, _) = store_with(&storage);
        assert_eq!(restarted.current_id(), Some(&id("char_7")));
    }

    #[test]
    fn known_ids_skips_foreign_keys() {
        let storage = MemoryStorageProvider::from_pairs([
            ("entity-data-char_2", "{}"),
            ("entity-data-char_1", "{}"),
            ("entity-data-bad-id", "{}"),
            ("character-name-char_1", "Rex"),
        ]);
        let (store, _) = store_with(&storage);

        assert_eq!(store.known_ids(), vec![id("char_1"), id("char_2")]);
    }
}
