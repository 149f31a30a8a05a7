//! Async session driver.
//!
//! A single `tokio::select!` loop owns the [`SessionHost`]: it waits for the
//! timeout configuration, the next timer deadline, operator input and
//! cancellation, and handles whichever is ready first to completion before
//! looking again. Nothing else touches the host while it runs.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::TimeoutConfigProvider;
use crate::error::SessionError;
use crate::machine::{Snapshot, TrialEvent};
use crate::observability::events::EndReason;
use crate::timers::TimerDiagnostic;

use super::host::{JournalEntry, SessionHost};

/// What a finished session looked like.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub snapshot: Snapshot,
    pub end_reason: EndReason,
    pub trials_completed: u32,
    pub diagnostics: Vec<TimerDiagnostic>,
    pub journal: Vec<JournalEntry>,
}

/// Runs one session until it ends, is cancelled, or loses every handle.
pub struct SessionRunner {
    host: SessionHost,
    provider: Arc<dyn TimeoutConfigProvider>,
    events: mpsc::UnboundedReceiver<TrialEvent>,
    snapshots: watch::Sender<Snapshot>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Cloneable front end to a running session.
///
/// The session ends with [`EndReason::Abandoned`] once every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    events: mpsc::UnboundedSender<TrialEvent>,
    snapshots: watch::Receiver<Snapshot>,
    cancel: CancellationToken,
}

/// Deferred dispatch for bus listeners.
///
/// Events sent here are queued and processed after the current transition
/// has finished. Holding a dispatcher does not keep the session alive.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    id: Uuid,
    events: mpsc::WeakUnboundedSender<TrialEvent>,
}

impl Dispatcher {
    /// Queues an event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session is gone.
    pub fn dispatch(&self, event: TrialEvent) -> Result<(), SessionError> {
        self.events
            .upgrade()
            .ok_or(SessionError::Closed(self.id))?
            .send(event)
            .map_err(|_| SessionError::Closed(self.id))
    }
}

impl SessionHandle {
    /// Session identifier.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.id
    }

    /// Queues an event for the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the runner has finished.
    pub fn dispatch(&self, event: TrialEvent) -> Result<(), SessionError> {
        self.events
            .send(event)
            .map_err(|_| SessionError::Closed(self.id))
    }

    /// Returns a deferred dispatcher for use inside listeners.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            id: self.id,
            events: self.events.downgrade(),
        }
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified after every processed input.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Asks the runner to stop; the session ends as cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the runner has stopped accepting events.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

impl SessionRunner {
    /// Wraps a host. The runner does nothing until [`run`](Self::run) is polled.
    #[must_use]
    pub fn new(
        host: SessionHost,
        provider: Arc<dyn TimeoutConfigProvider>,
    ) -> (Self, SessionHandle) {
        Self::with_cancel(host, provider, CancellationToken::new())
    }

    /// Like [`new`](Self::new), but stops when `cancel` (or a parent of it) fires.
    #[must_use]
    pub fn with_cancel(
        host: SessionHost,
        provider: Arc<dyn TimeoutConfigProvider>,
        cancel: CancellationToken,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(host.snapshot());
        let handle = SessionHandle {
            id: host.session_id(),
            events: tx,
            snapshots: snap_rx,
            cancel: cancel.clone(),
        };
        let runner = Self {
            host,
            provider,
            events: rx,
            snapshots: snap_tx,
            cancel,
        };
        (runner, handle)
    }

    /// Access to the host before the runner starts, e.g. to subscribe.
    pub const fn host_mut(&mut self) -> &mut SessionHost {
        &mut self.host
    }

    /// Drives the session to its end.
    pub async fn run(mut self) -> SessionSummary {
        let provider = Arc::clone(&self.provider);
        let config = async move { provider.timeout_config().await };
        tokio::pin!(config);
        let mut config_pending = true;
        let cancel = self.cancel.clone();

        info!(session_id = %self.host.session_id(), "session runner started");

        let reason = loop {
            if let Some(reason) = self.host.end_reason() {
                break reason;
            }
            let deadline = self.host.next_deadline();

            tokio::select! {
                biased;

                () = cancel.cancelled() => break EndReason::Cancelled,

                result = &mut config, if config_pending => {
                    config_pending = false;
                    match result {
                        Ok(config) => self.host.config_loaded(config, Instant::now()),
                        Err(e) => self.host.config_failed(e.to_string()),
                    }
                }

                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.host.fire_expired(Instant::now());
                }

                event = self.events.recv() => match event {
                    Some(event) => {
                        self.host.dispatch(event, Instant::now());
                    }
                    None => break EndReason::Abandoned,
                },
            }

            self.snapshots.send_replace(self.host.snapshot());
        };

        self.host.teardown(reason);
        self.events.close();
        let snapshot = self.host.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        debug!(session_id = %self.host.session_id(), %reason, "session runner finished");

        SessionSummary {
            session_id: self.host.session_id(),
            end_reason: self.host.end_reason().unwrap_or(reason),
            trials_completed: self.host.trials_completed(),
            diagnostics: self.host.timers().diagnostics().to_vec(),
            journal: self.host.journal().to_vec(),
            snapshot,
        }
    }
}
