//! SaveStatusPort - status channel consumed by presentation collaborators
//!
//! One status is emitted per save attempt: `Saving` when it starts, then
//! `Success`, `Error`, or `Warning` when it ends. Widgets render these as
//! transient notifications; nothing here blocks.

use std::fmt;

/// Outcome signal of a save cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saving,
    Success,
    Error(String),
    Warning(String),
}

impl SaveStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Saving => write!(f, "saving"),
            SaveStatus::Success => write!(f, "saved"),
            SaveStatus::Error(msg) => write!(f, "save failed: {}", msg),
            SaveStatus::Warning(msg) => write!(f, "warning: {}", msg),
        }
    }
}

/// Receiver of save status signals
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SaveStatusPort: Send + Sync {
    fn report(&self, status: SaveStatus);
}
