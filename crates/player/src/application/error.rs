//! Persistence core error taxonomy
//!
//! Every variant is converted into a log line and a `SaveStatus` at the
//! component boundary; none of them interrupts the presentation layer.

use duality_domain::{DomainError, EntityId};

use crate::ports::outbound::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend rejected a write; the cache still holds the data.
    #[error("Storage unavailable while saving {entity}: {source}")]
    StorageUnavailable {
        entity: EntityId,
        #[source]
        source: StorageError,
    },

    /// A document could not be coerced into a character record.
    #[error("Malformed record for {entity}: {reason}")]
    MalformedRecord { entity: EntityId, reason: String },

    /// The operation needs a current entity and none is set.
    #[error("No active entity")]
    NoActiveEntity,

    /// The record could not be prepared for persistence.
    #[error("Save failed for {entity}: {message}")]
    SaveFailed { entity: EntityId, message: String },

    /// Caller-supplied input (field path, entity id) was rejected.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl StoreError {
    pub fn storage(entity: &EntityId, source: StorageError) -> Self {
        Self::StorageUnavailable {
            entity: entity.clone(),
            source,
        }
    }

    pub fn malformed(entity: &EntityId, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            entity: entity.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn save_failed(entity: &EntityId, message: impl ToString) -> Self {
        Self::SaveFailed {
            entity: entity.clone(),
            message: message.to_string(),
        }
    }

    /// True when the data reached the cache but not the backend.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}
