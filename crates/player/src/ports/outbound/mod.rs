//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing application services to interact with storage, clocks, and the
//! status channel without depending on concrete implementations.

pub mod error;
pub mod platform;
pub mod save_status_port;

pub use error::StorageError;
pub use platform::{storage_keys, StorageProvider, TimeProvider};
#[cfg(any(test, feature = "testing"))]
pub use save_status_port::MockSaveStatusPort;
pub use save_status_port::{SaveStatus, SaveStatusPort};
