//! Duality Player crate.
//!
//! Per-character scoped persistence for the character sheet: storage ports
//! and adapters, the entity store, the scoped key proxy, and debounced
//! autosave. Multi-platform support is provided via compile-time `cfg`
//! selection.

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
#[cfg(not(target_arch = "wasm32"))]
pub mod runner;
pub mod state;

// Re-export commonly used entrypoints
pub use application::services::{EntityStore, ScopedKeyProxy, SheetSession};
pub use application::StoreError;
pub use config::SheetConfig;
#[cfg(not(target_arch = "wasm32"))]
pub use runner::{run_autosave, AutosaveHandle};
pub use state::{Platform, Session};
