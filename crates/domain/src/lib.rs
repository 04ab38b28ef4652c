pub mod entities;
pub mod error;
pub mod ids;
pub mod merge;
pub mod value_objects;

pub use entities::{
    Attributes, CharacterRecord, DamageThresholds, Downtime, Journal, UiPreferences,
    CURRENT_SCHEMA_VERSION,
};
pub use error::DomainError;
pub use ids::EntityId;
pub use merge::{complete_with_defaults, deep_merge};
pub use value_objects::{Circle, FieldPath, Hope, HopeBounds, Tracker};
