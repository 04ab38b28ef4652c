//! Save status adapters
//!
//! `TracingStatusPort` logs every signal; `ChannelStatusPort` forwards them
//! to a presentation task over an unbounded channel.

use futures_channel::mpsc;

use crate::ports::outbound::{SaveStatus, SaveStatusPort};

/// Logs save statuses through `tracing`
#[derive(Clone, Default)]
pub struct TracingStatusPort;

impl SaveStatusPort for TracingStatusPort {
    fn report(&self, status: SaveStatus) {
        match &status {
            SaveStatus::Saving => tracing::debug!("Save started"),
            SaveStatus::Success => tracing::debug!("Save succeeded"),
            SaveStatus::Error(msg) => tracing::error!(error = %msg, "Save failed"),
            SaveStatus::Warning(msg) => tracing::warn!(warning = %msg, "Save warning"),
        }
    }
}

/// Forwards save statuses to a channel receiver
#[derive(Clone)]
pub struct ChannelStatusPort {
    tx: mpsc::UnboundedSender<SaveStatus>,
}

impl ChannelStatusPort {
    /// Create a port and the receiver the presentation layer listens on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SaveStatus>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }
}

impl SaveStatusPort for ChannelStatusPort {
    fn report(&self, status: SaveStatus) {
        if let Err(e) = self.tx.unbounded_send(status) {
            tracing::debug!("Save status receiver dropped: {}", e);
        }
    }
}
