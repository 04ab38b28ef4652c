//! Session - the current-entity pointer as an explicit context value
//!
//! The pointer selects whose scoped keys are active. It is owned by the
//! entity store and passed by reference into every scoped key proxy call,
//! so nothing reads it from ambient global state.

use duality_domain::EntityId;

use crate::ports::outbound::{storage_keys, StorageError, StorageProvider};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    current: Option<EntityId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current(id: EntityId) -> Self {
        Self { current: Some(id) }
    }

    pub fn current(&self) -> Option<&EntityId> {
        self.current.as_ref()
    }

    pub fn is_current(&self, id: &EntityId) -> bool {
        self.current.as_ref() == Some(id)
    }

    pub(crate) fn set(&mut self, id: Option<EntityId>) {
        self.current = id;
    }

    /// Read the persisted pointer. An empty or invalid value means no entity.
    pub fn restore<S: StorageProvider>(storage: &S) -> Self {
        let current = storage
            .load(storage_keys::CURRENT_ENTITY)
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match EntityId::new(&raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Ignoring invalid current entity pointer {:?}: {}", raw, e);
                    None
                }
            });
        Self { current }
    }

    /// Mirror the pointer to storage; `None` removes the key.
    pub fn persist<S: StorageProvider>(&self, storage: &S) -> Result<(), StorageError> {
        match &self.current {
            Some(id) => storage.save(storage_keys::CURRENT_ENTITY, id.as_str()),
            None => {
                storage.remove(storage_keys::CURRENT_ENTITY);
                Ok(())
            }
        }
    }
}
