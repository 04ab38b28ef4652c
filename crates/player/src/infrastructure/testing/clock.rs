//! Manual clock implementation for testing.
//!
//! Provides a controllable clock for deterministic record timestamps.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ports::outbound::TimeProvider;

/// Clock frozen at a settable instant; clones share the same time.
#[derive(Clone)]
pub struct ManualTimeProvider {
    frozen_time: Arc<RwLock<DateTime<Utc>>>,
}

impl Default for ManualTimeProvider {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }
}

impl ManualTimeProvider {
    /// Create a clock frozen at the given time
    pub fn new(frozen_time: DateTime<Utc>) -> Self {
        Self {
            frozen_time: Arc::new(RwLock::new(frozen_time)),
        }
    }

    /// Advance the frozen time by the given duration
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut time) = self.frozen_time.write() {
            *time += duration;
        }
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        self.frozen_time
            .read()
            .map(|t| *t)
            .unwrap_or_default()
    }
}
