//! Async autosave runner
//!
//! Drives a [`SheetSession`] on tokio: wakes on change notifications or the
//! controller's next deadline, polls, and goes back to sleep. Shutdown is
//! signalled through a `CancellationToken` and ends with a final flush.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::services::autosave::SaveOutcome;
use crate::application::services::sheet_session::SheetSession;
use crate::ports::outbound::{StorageProvider, TimeProvider};

pub type SharedSession<S, T> = Arc<Mutex<SheetSession<S, T>>>;

/// Control surface of a running autosave task
pub struct AutosaveHandle<S: StorageProvider, T: TimeProvider> {
    session: SharedSession<S, T>,
    notify: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<S, T> AutosaveHandle<S, T>
where
    S: StorageProvider + Send,
    T: TimeProvider + Send,
{
    /// Shared access to the session for reads, writes, and switches.
    pub fn session(&self) -> SharedSession<S, T> {
        self.session.clone()
    }

    /// Report a field change and wake the runner.
    pub async fn notify_change(&self, path: &str) {
        self.session.lock().await.on_change(path);
        self.notify.notify_one();
    }

    /// Save immediately, bypassing the debounce window.
    pub async fn save_now(&self) -> Option<SaveOutcome> {
        let outcome = self.session.lock().await.flush();
        self.notify.notify_one();
        outcome
    }

    /// Stop the runner and wait for its final flush.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Autosave task ended abnormally");
        }
    }
}

/// Spawn the autosave loop for `session` on the current tokio runtime.
pub fn run_autosave<S, T>(session: SheetSession<S, T>) -> AutosaveHandle<S, T>
where
    S: StorageProvider + Send,
    T: TimeProvider + Send,
{
    let session = Arc::new(Mutex::new(session));
    let notify = Arc::new(Notify::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(autosave_loop(
        session.clone(),
        notify.clone(),
        cancel.clone(),
    ));

    AutosaveHandle {
        session,
        notify,
        cancel,
        task,
    }
}

async fn autosave_loop<S, T>(session: SharedSession<S, T>, notify: Arc<Notify>, cancel: CancellationToken)
where
    S: StorageProvider + Send,
    T: TimeProvider + Send,
{
    tracing::info!("Autosave runner started");
    loop {
        let wait = {
            let mut session = session.lock().await;
            session.poll();
            session.next_deadline().map(|deadline| {
                (deadline - session.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            })
        };

        let sleep = async {
            match wait {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = notify.notified() => {}
            _ = sleep => {}
        }
    }

    let mut session = session.lock().await;
    if session.current_id().is_some() {
        session.flush();
    }
    tracing::info!("Autosave runner stopped");
}
