//! Application services
//!
//! The persistence core: scoped key proxy, entity store, field bindings and
//! the autosave controller, tied together by `SheetSession`. Services depend
//! on port traits, not concrete infrastructure implementations.

pub mod autosave;
pub mod entity_store;
pub mod field_bindings;
pub mod scoped_keys;
pub mod sheet_session;

pub use autosave::{
    AutosaveController, AutosaveSettings, SaveOutcome, SaveRequest, SaveTrigger, SyncState,
};
pub use entity_store::{EntityStore, SwitchOutcome};
pub use field_bindings::{
    Coercion, FieldBinding, FieldBindings, TrackerSnapshot, TrackerSource, ValueSource,
};
pub use scoped_keys::{ScopePolicy, ScopedKeyProxy};
pub use sheet_session::SheetSession;
