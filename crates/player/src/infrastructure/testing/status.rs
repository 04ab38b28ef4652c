//! Status port that records every signal in order.

use std::sync::{Arc, Mutex};

use crate::ports::outbound::{SaveStatus, SaveStatusPort};

#[derive(Clone, Default)]
pub struct RecordingStatusPort {
    statuses: Arc<Mutex<Vec<SaveStatus>>>,
}

impl RecordingStatusPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far.
    pub fn statuses(&self) -> Vec<SaveStatus> {
        self.statuses.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of `Success` signals.
    pub fn successes(&self) -> usize {
        self.statuses()
            .iter()
            .filter(|s| matches!(s, SaveStatus::Success))
            .count()
    }

    pub fn last(&self) -> Option<SaveStatus> {
        self.statuses().last().cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.clear();
        }
    }
}

impl SaveStatusPort for RecordingStatusPort {
    fn report(&self, status: SaveStatus) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.push(status);
        }
    }
}
