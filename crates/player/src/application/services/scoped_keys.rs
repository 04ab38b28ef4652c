//! Scoped Key Proxy - per-entity namespacing over a flat key-value store
//!
//! A designated subset of key names is redirected to `{key}-{entityId}`
//! according to the session's current entity. Everything else stays global.
//! The proxy never writes the current-entity pointer; that belongs to the
//! entity store.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use duality_domain::EntityId;
use regex_lite::Regex;

use crate::ports::outbound::{storage_keys, StorageError, StorageProvider};
use crate::state::Session;

/// Keys that are always entity-scoped.
pub const STATIC_SCOPED_KEYS: &[&str] = &[
    "character-name",
    "character-subtitle",
    "character-level",
    "character-portrait",
    "character-details",
    "equipment-items",
    "journal-entries",
    "experiences",
    "downtime-projects",
    "hp-circles",
    "stress-circles",
    "armor-circles",
    "hope-value",
    "hope-max",
    "ui-theme",
    "accent-color",
    "collapsed-sections",
];

/// Prefixes of dynamically named overrides (`theme-background`, `color-accent`).
pub const DEFAULT_SCOPED_PREFIXES: &[&str] = &["theme-", "color-"];

static DAMAGE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(damage|threshold)-(minor|major|severe)$").expect("valid regex")
});

/// Decides which key names are entity-scoped
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    static_keys: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self::new(
            STATIC_SCOPED_KEYS.iter().copied(),
            DEFAULT_SCOPED_PREFIXES.iter().copied(),
        )
    }
}

impl ScopePolicy {
    pub fn new<K, P>(static_keys: K, prefixes: P) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            static_keys: static_keys.into_iter().map(Into::into).collect(),
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Default static set with a custom prefix list.
    pub fn with_prefixes<P>(prefixes: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self::new(STATIC_SCOPED_KEYS.iter().copied(), prefixes)
    }

    pub fn is_scoped(&self, key: &str) -> bool {
        if is_global(key) {
            return false;
        }
        self.static_keys.contains(key)
            || self
                .prefixes
                .iter()
                .any(|prefix| key.len() > prefix.len() && key.starts_with(prefix.as_str()))
            || DAMAGE_KEY.is_match(key)
    }

    pub fn static_keys(&self) -> impl Iterator<Item = &str> {
        self.static_keys.iter().map(String::as_str)
    }
}

/// Keys owned by the entity store, never redirected.
fn is_global(key: &str) -> bool {
    key == storage_keys::CURRENT_ENTITY || key.starts_with(storage_keys::ENTITY_DATA_PREFIX)
}

/// Storage facade applying the scope policy to every access
#[derive(Clone)]
pub struct ScopedKeyProxy<S: StorageProvider> {
    storage: S,
    policy: ScopePolicy,
    active: bool,
}

impl<S: StorageProvider> ScopedKeyProxy<S> {
    pub fn new(storage: S, policy: ScopePolicy) -> Self {
        Self {
            storage,
            policy,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_scoped(&self, key: &str) -> bool {
        self.policy.is_scoped(key)
    }

    pub fn activate(&mut self) {
        if !self.active {
            tracing::debug!("Scoped key redirection activated");
            self.active = true;
        }
    }

    pub fn deactivate(&mut self) {
        if self.active {
            tracing::debug!("Scoped key redirection deactivated");
            self.active = false;
        }
    }

    /// The physical key an access to `key` touches under `session`.
    pub fn resolve(&self, session: &Session, key: &str) -> String {
        if !self.active || !self.policy.is_scoped(key) {
            return key.to_string();
        }
        match session.current() {
            Some(id) => {
                let scoped = id.scoped_key(key);
                tracing::debug!(key, scoped = %scoped, "Redirecting scoped key");
                scoped
            }
            None => {
                tracing::warn!(key, "Scoped key accessed with no active entity, using global key");
                key.to_string()
            }
        }
    }

    pub fn read(&self, session: &Session, key: &str) -> Option<String> {
        self.storage.load(&self.resolve(session, key))
    }

    pub fn write(&self, session: &Session, key: &str, value: &str) -> Result<(), StorageError> {
        let target = self.resolve(session, key);
        self.storage.save(&target, value).inspect_err(|e| {
            tracing::error!(key = %target, error = %e, "Failed to write scoped key");
        })
    }

    pub fn erase(&self, session: &Session, key: &str) {
        self.storage.remove(&self.resolve(session, key));
    }

    /// Remove every key whose suffix after the last `-` is `id`, known or
    /// not. Record keys are left to the entity store. Returns the count.
    pub fn purge_entity(&self, id: &EntityId) -> usize {
        let doomed: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|key| !is_global(key))
            .filter(|key| {
                key.rsplit_once('-')
                    .is_some_and(|(_, suffix)| suffix == id.as_str())
            })
            .collect();
        for key in &doomed {
            self.storage.remove(key);
        }
        tracing::info!(entity = %id, removed = doomed.len(), "Purged scoped keys");
        doomed.len()
    }

    /// Copy global values of the static keys into `id`'s scope where the
    /// scoped variant does not exist yet. Originals are kept. Returns the
    /// number of keys copied.
    pub fn migrate(&self, id: &EntityId) -> usize {
        let mut copied = 0;
        for key in self.policy.static_keys() {
            let Some(value) = self.storage.load(key) else {
                continue;
            };
            let scoped = id.scoped_key(key);
            if self.storage.load(&scoped).is_some() {
                continue;
            }
            match self.storage.save(&scoped, &value) {
                Ok(()) => copied += 1,
                Err(e) => tracing::warn!(key, entity = %id, error = %e, "Failed to migrate key"),
            }
        }
        if copied > 0 {
            tracing::info!(entity = %id, copied, "Migrated global keys into entity scope");
        }
        copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::MemoryStorageProvider;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn proxy(storage: &MemoryStorageProvider) -> ScopedKeyProxy<MemoryStorageProvider> {
        ScopedKeyProxy::new(storage.clone(), ScopePolicy::default())
    }

    #[test]
    fn policy_recognizes_static_prefix_and_damage_keys() {
        let policy = ScopePolicy::default();
        assert!(policy.is_scoped("character-name"));
        assert!(policy.is_scoped("theme-background"));
        assert!(policy.is_scoped("color-accent"));
        assert!(policy.is_scoped("damage-minor"));
        assert!(policy.is_scoped("threshold-severe"));

        assert!(!policy.is_scoped("theme-"));
        assert!(!policy.is_scoped("damage-critical"));
        assert!(!policy.is_scoped("damage-minor-extra"));
        assert!(!policy.is_scoped("auth-token"));
    }

    #[test]
    fn pointer_and_record_keys_are_never_scoped() {
        let policy = ScopePolicy::new(
            [storage_keys::CURRENT_ENTITY, "entity-data-x"],
            ["entity-", "duality_"],
        );
        assert!(!policy.is_scoped(storage_keys::CURRENT_ENTITY));
        assert!(!policy.is_scoped("entity-data-char_1"));
    }

    #[test]
    fn scoped_access_is_redirected_to_current_entity() {
        let storage = MemoryStorageProvider::new();
        let proxy = proxy(&storage);
        let session = Session::with_current(id("char_1"));

        proxy.write(&session, "character-name", "Rex").unwrap();
        proxy.write(&session, "auth-token", "abc").unwrap();

        assert_eq!(storage.load("character-name-char_1"), Some("Rex".into()));
        assert_eq!(storage.load("character-name"), None);
        assert_eq!(storage.load("auth-token"), Some("abc".into()));
        assert_eq!(proxy.read(&session, "character-name"), Some("Rex".into()));

        proxy.erase(&session, "character-name");
        assert_eq!(storage.load("character-name-char_1"), None);
    }

    #[test]
    fn no_active_entity_falls_back_to_global_key() {
        let storage = MemoryStorageProvider::new();
        let proxy = proxy(&storage);

        proxy.write(&Session::new(), "hope-value", "3").unwrap();
        assert_eq!(storage.load("hope-value"), Some("3".into()));
    }

    #[test]
    fn redirection_never_touches_pointer() {
        let storage = MemoryStorageProvider::new();
        let proxy = proxy(&storage);
        let session = Session::with_current(id("char_1"));

        proxy.read(&session, "character-name");
        proxy.write(&session, "damage-major", "2").unwrap();
        assert_eq!(storage.load(storage_keys::CURRENT_ENTITY), None);
    }

    #[test]
    fn entities_are_isolated() {
        let storage = MemoryStorageProvider::new();
        let proxy = proxy(&storage);

        let a = Session::with_current(id("char_a"));
        proxy.write(&a, "color-accent", "#ff0000").unwrap();

        let b = Session::with_current(id("char_b"));
        assert_eq!(proxy.read(&b, "color-accent"), None);
        assert_eq!(proxy.read(&a, "color-accent"), Some("#ff0000".into()));
    }

    #[test]
    fn deactivated_proxy_passes_through() {
        let storage = MemoryStorageProvider::new();
        let mut proxy = proxy(&storage);
        let session = Session::with_current(id("char_1"));

        proxy.deactivate();
        proxy.deactivate();
        assert!(!proxy.is_active());
        proxy.write(&session, "character-name", "Raw").unwrap();
        assert_eq!(storage.load("character-name"), Some("Raw".into()));

        proxy.activate();
        proxy.activate();
        assert!(proxy.is_active());
        assert_eq!(proxy.read(&session, "character-name"), None);
    }

    #[test]
    fn purge_removes_every_suffixed_key() {
        let storage = MemoryStorageProvider::from_pairs([
            ("character-name-char_1", "Rex"),
            ("legacy-widget-char_1", "x"),
            ("character-name-char_12", "Other"),
            ("character-name", "global"),
            ("entity-data-char_1", "{}"),
        ]);
        let proxy = proxy(&storage);

        assert_eq!(proxy.purge_entity(&id("char_1")), 2);
        assert_eq!(
            storage.keys(),
            vec![
                "character-name".to_string(),
                "character-name-char_12".to_string(),
                "entity-data-char_1".to_string(),
            ]
        );
    }

    #[test]
    fn migrate_is_idempotent_and_keeps_originals() {
        let storage = MemoryStorageProvider::from_pairs([
            ("character-name", "Rex"),
            ("hope-value", "2"),
            ("theme-background", "blue"),
        ]);
        let proxy = proxy(&storage);
        let char_1 = id("char_1");

        assert_eq!(proxy.migrate(&char_1), 2);
        let after_first = storage.keys();
        assert_eq!(proxy.migrate(&char_1), 0);
        assert_eq!(storage.keys(), after_first);

        assert_eq!(storage.load("character-name"), Some("Rex".into()));
        assert_eq!(storage.load("character-name-char_1"), Some("Rex".into()));
        assert_eq!(storage.load("hope-value-char_1"), Some("2".into()));
        assert_eq!(storage.load("theme-background-char_1"), None);
    }

    #[test]
    fn migrate_does_not_overwrite_existing_scoped_value() {
        let storage = MemoryStorageProvider::from_pairs([
            ("character-name", "Global"),
            ("character-name-char_1", "Scoped"),
        ]);
        let proxy = proxy(&storage);

        assert_eq!(proxy.migrate(&id("char_1")), 0);
        assert_eq!(storage.load("character-name-char_1"), Some("Scoped".into()));
    }
}
