//! Entities - objects with identity that persist across save cycles

mod character_record;

pub use character_record::{
    Attributes, CharacterRecord, DamageThresholds, Downtime, Journal, UiPreferences,
    CURRENT_SCHEMA_VERSION, DEFAULT_ARMOR_MAX, DEFAULT_HP_MAX, DEFAULT_STRESS_MAX,
};
