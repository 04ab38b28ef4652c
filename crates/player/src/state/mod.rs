//! State containers for player-side dependency injection
//!
//! `Platform` aggregates storage and clock adapters; `Session` carries the
//! current-entity pointer that scoped storage access is resolved against.

mod platform;
mod session;

pub use platform::{Platform, PlatformStorageAdapter, PlatformTimeAdapter};
pub use session::Session;
