//! Debounced Auto-Save Controller
//!
//! Turns fine-grained field change notifications into infrequent, complete
//! saves. All bindings share one debounce window per controller; a
//! background tick snapshots the sheet on a fixed interval regardless of
//! debounce activity.
//!
//! The controller is clock-driven rather than timer-driven: callers pass
//! `now` into every operation and `poll` whenever the next deadline passes
//! (see [`AutosaveController::next_deadline`]). The async runner does this
//! on a tokio timer; tests do it with a manual clock.
//!
//! ```text
//! Idle ──change──▶ PendingSave{due} ──due──▶ Saving{dirty} ──▶ Idle | Failed
//!                     ▲    │ change resets due      │ change sets dirty
//!                     └────┴────────────────────────┘ (dirty re-enters PendingSave)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use duality_domain::{CharacterRecord, DomainError, EntityId, FieldPath};
use serde_json::Value;

use super::entity_store::EntityStore;
use super::field_bindings::{Coercion, FieldBindings, TrackerSource, ValueSource};
use crate::application::error::StoreError;
use crate::ports::outbound::{SaveStatus, SaveStatusPort, StorageProvider, TimeProvider};

pub const DEFAULT_DEBOUNCE_MS: i64 = 1500;
pub const DEFAULT_BACKGROUND_SECS: i64 = 10;
/// Longest debounce window accepted from configuration.
pub const MAX_DEBOUNCE_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveSettings {
    pub debounce: Duration,
    pub background_interval: Duration,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::milliseconds(DEFAULT_DEBOUNCE_MS),
            background_interval: Duration::seconds(DEFAULT_BACKGROUND_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    PendingSave { due: DateTime<Utc> },
    /// A save is in flight; `dirty` records changes that arrived meanwhile.
    Saving { dirty: bool },
    Failed,
}

/// What started a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Debounce,
    Background,
    Manual,
}

/// A collected save handed to a persistence collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub entity: EntityId,
    pub patch: Value,
    pub trigger: SaveTrigger,
}

/// How a save attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The patch did not describe a valid record; nothing was written.
    Rejected(String),
    Failed(String),
}

impl SaveOutcome {
    pub fn from_update(entity: &EntityId, result: &Result<bool, StoreError>) -> Self {
        match result {
            Ok(true) => Self::Saved,
            Ok(false) => Self::Rejected(format!("changes for {} were not applied", entity)),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    fn status(&self) -> SaveStatus {
        match self {
            Self::Saved => SaveStatus::Success,
            Self::Rejected(msg) => SaveStatus::warning(msg.clone()),
            Self::Failed(msg) => SaveStatus::error(msg.clone()),
        }
    }
}

pub struct AutosaveController {
    settings: AutosaveSettings,
    bindings: FieldBindings,
    status: Arc<dyn SaveStatusPort>,
    state: SyncState,
    next_background: Option<DateTime<Utc>>,
}

impl AutosaveController {
    pub fn new(settings: AutosaveSettings, status: Arc<dyn SaveStatusPort>) -> Self {
        Self {
            settings,
            bindings: FieldBindings::new(),
            status,
            state: SyncState::Idle,
            next_background: None,
        }
    }

    pub fn settings(&self) -> AutosaveSettings {
        self.settings
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn has_pending(&self) -> bool {
        matches!(
            self.state,
            SyncState::PendingSave { .. } | SyncState::Saving { dirty: true }
        )
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    pub fn bind_field(
        &mut self,
        path: &str,
        read: ValueSource,
        coercion: Coercion,
    ) -> Result<(), DomainError> {
        let path = FieldPath::parse(path)?;
        tracing::debug!(path = %path.as_str(), coercion = ?coercion, "Bound field");
        self.bindings.bind(path, read, coercion);
        Ok(())
    }

    pub fn bind_trackers(&mut self, source: TrackerSource) {
        self.bindings.bind_trackers(source);
    }

    pub fn collect_patch(&self) -> Value {
        self.bindings.collect_patch()
    }

    // =========================================================================
    // Change notification and timers
    // =========================================================================

    /// Record a change; starts or resets the shared debounce window.
    pub fn on_change(&mut self, path: &str, now: DateTime<Utc>) {
        if !self.bindings.contains(path) {
            tracing::debug!(path, "Change notified for unbound path");
        }
        self.state = match self.state {
            SyncState::Saving { .. } => SyncState::Saving { dirty: true },
            SyncState::Idle | SyncState::Failed | SyncState::PendingSave { .. } => {
                SyncState::PendingSave {
                    due: deadline(now, self.settings.debounce),
                }
            }
        };
    }

    /// Earliest instant at which `poll` has work to do.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        let pending = match self.state {
            SyncState::PendingSave { due } => Some(due),
            _ => None,
        };
        match (pending, self.next_background) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire whichever save is due. Saves target the entity current now.
    pub fn poll<S, T>(&mut self, store: &mut EntityStore<S, T>, now: DateTime<Utc>) -> Option<SaveTrigger>
    where
        S: StorageProvider,
        T: TimeProvider,
    {
        let Some(next_background) = self.next_background else {
            self.next_background = Some(deadline(now, self.settings.background_interval));
            return self.poll_debounce(store, now);
        };

        if let Some(trigger) = self.poll_debounce(store, now) {
            if next_background <= now {
                self.next_background = Some(deadline(now, self.settings.background_interval));
            }
            return Some(trigger);
        }

        if next_background > now {
            return None;
        }
        self.next_background = Some(deadline(now, self.settings.background_interval));
        if store.current_id().is_none() {
            tracing::debug!("Background save skipped, no active entity");
            return None;
        }
        self.save_now(store, SaveTrigger::Background, now)
            .map(|_| SaveTrigger::Background)
    }

    fn poll_debounce<S, T>(&mut self, store: &mut EntityStore<S, T>, now: DateTime<Utc>) -> Option<SaveTrigger>
    where
        S: StorageProvider,
        T: TimeProvider,
    {
        match self.state {
            SyncState::PendingSave { due } if due <= now => self
                .save_now(store, SaveTrigger::Debounce, now)
                .map(|_| SaveTrigger::Debounce),
            _ => None,
        }
    }

    // =========================================================================
    // Save path
    // =========================================================================

    /// Collect the patch for the current entity and enter `Saving`.
    ///
    /// Returns `None` when a save is already in flight (the change is kept
    /// as dirty) or when no entity is active (reported as a warning).
    pub fn begin_save<S, T>(&mut self, store: &EntityStore<S, T>, trigger: SaveTrigger) -> Option<SaveRequest>
    where
        S: StorageProvider,
        T: TimeProvider,
    {
        if let SyncState::Saving { .. } = self.state {
            self.state = SyncState::Saving { dirty: true };
            return None;
        }

        let Some(entity) = store.current_id().cloned() else {
            tracing::warn!(?trigger, "Save requested with no active entity");
            self.state = SyncState::Idle;
            self.status
                .report(SaveStatus::warning("No active character, nothing saved"));
            return None;
        };

        self.state = SyncState::Saving { dirty: false };
        self.status.report(SaveStatus::Saving);
        tracing::debug!(entity = %entity, ?trigger, "Save started");
        Some(SaveRequest {
            entity,
            patch: self.collect_patch(),
            trigger,
        })
    }

    /// Record the result of a save started with [`Self::begin_save`].
    pub fn finish_save(&mut self, outcome: &SaveOutcome, now: DateTime<Utc>) {
        let dirty = matches!(self.state, SyncState::Saving { dirty: true });
        self.status.report(outcome.status());

        self.state = match (dirty, outcome) {
            (true, _) => SyncState::PendingSave {
                due: deadline(now, self.settings.debounce),
            },
            (false, SaveOutcome::Failed(msg)) => {
                tracing::warn!(error = %msg, "Save failed, will retry on next cycle");
                SyncState::Failed
            }
            (false, _) => SyncState::Idle,
        };
    }

    fn save_now<S, T>(&mut self, store: &mut EntityStore<S, T>, trigger: SaveTrigger, now: DateTime<Utc>) -> Option<SaveOutcome>
    where
        S: StorageProvider,
        T: TimeProvider,
    {
        let request = self.begin_save(store, trigger)?;
        let result = store.update(&request.entity, &request.patch);
        let outcome = SaveOutcome::from_update(&request.entity, &result);
        self.finish_save(&outcome, now);
        Some(outcome)
    }

    /// Cancel the debounce window and save immediately.
    pub fn flush<S, T>(&mut self, store: &mut EntityStore<S, T>, now: DateTime<Utc>) -> Option<SaveOutcome>
    where
        S: StorageProvider,
        T: TimeProvider,
    {
        if let SyncState::PendingSave { .. } = self.state {
            self.state = SyncState::Idle;
        }
        self.save_now(store, SaveTrigger::Manual, now)
    }

    /// Drop any pending change without saving it.
    pub fn cancel_pending(&mut self) {
        self.state = match self.state {
            SyncState::Saving { .. } => SyncState::Saving { dirty: false },
            _ => SyncState::Idle,
        };
    }

    /// Switch entities, persisting the outgoing entity's live state first.
    ///
    /// Pending changes are attributed to the outgoing entity; nothing
    /// collected before the switch is saved to the incoming one.
    pub fn switch_entity<S, T>(
        &mut self,
        store: &mut EntityStore<S, T>,
        id: &EntityId,
        now: DateTime<Utc>,
    ) -> CharacterRecord
    where
        S: StorageProvider,
        T: TimeProvider,
    {
        if store.current_id() == Some(id) {
            if self.has_pending() {
                self.flush(store, now);
            }
            return store.switch_to(id, None).record;
        }

        let previous = store.current_id().cloned();
        let outgoing = match previous {
            Some(_) if !self.bindings.is_empty() => Some(self.collect_patch()),
            _ => None,
        };
        self.cancel_pending();

        if outgoing.is_some() {
            self.status.report(SaveStatus::Saving);
        }
        let switched = store.switch_to(id, outgoing.as_ref());
        if let (Some(previous), Some(result)) = (&previous, &switched.outgoing) {
            self.status
                .report(SaveOutcome::from_update(previous, result).status());
        }
        switched.record
    }
}

/// `now + delay`, saturating at the latest representable instant.
fn deadline(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
