//! Platform-specific implementations
//!
//! This module provides platform-specific implementations of the
//! platform abstraction traits defined in ports/outbound/platform.rs.
//!
//! The correct platform is selected at compile time based on the target architecture.

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(not(target_arch = "wasm32"))]
mod desktop;

mod memory;

// Re-export the platform-specific types explicitly
#[cfg(target_arch = "wasm32")]
pub use wasm::{create_platform, WasmStorageProvider, WasmTimeProvider};

#[cfg(not(target_arch = "wasm32"))]
pub use desktop::{create_platform, DesktopStorageProvider, DesktopTimeProvider};

pub use memory::MemoryStorageProvider;
