//! Synchronous session host.
//!
//! Owns one machine, its bus and its timers, and turns every applied
//! transition into bus publications, event-log records, metrics and timer
//! reconciliation. All methods take `now` explicitly; the async runner
//! supplies tokio's clock, tests can supply their own.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, SubscriptionId};
use crate::catalog::RandomSource;
use crate::config::TimeoutConfig;
use crate::machine::{
    Emitted, EmittedKind, Snapshot, Step, TrialEvent, TrialMachine, TrialState,
};
use crate::observability::events::{EndReason, Event, EventEmitter};
use crate::observability::metrics;
use crate::timers::{TimerDiagnostic, TimerKind, TimerOrchestrator};

/// One dispatched inbound event and what it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub event: TrialEvent,
    pub from: TrialState,
    pub to: TrialState,
    pub applied: bool,
    pub emitted: Vec<Emitted>,
}

/// Owns one participant session.
pub struct SessionHost {
    id: Uuid,
    participant: Option<String>,
    machine: TrialMachine,
    bus: EventBus,
    timers: TimerOrchestrator,
    emitter: Arc<EventEmitter>,
    journal: Vec<JournalEntry>,
    trial_started_at: Option<Instant>,
    end_reason: Option<EndReason>,
}

impl std::fmt::Debug for SessionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHost")
            .field("id", &self.id)
            .field("machine", &self.machine)
            .field("bus", &self.bus)
            .field("timers", &self.timers)
            .field("end_reason", &self.end_reason)
            .finish_non_exhaustive()
    }
}

impl SessionHost {
    /// Creates a session in `introduction` with both timers waiting for
    /// configuration.
    #[must_use]
    pub fn new(
        rng: Box<dyn RandomSource>,
        emitter: Arc<EventEmitter>,
        participant: Option<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        let mut timers = TimerOrchestrator::new();
        timers.begin();

        emitter.emit(Event::SessionStarted {
            timestamp: Utc::now(),
            session_id: id,
            participant: participant.clone(),
        });
        info!(session_id = %id, participant = participant.as_deref().unwrap_or("-"), "session created");

        Self {
            id,
            participant,
            machine: TrialMachine::new(rng),
            bus: EventBus::new(),
            timers,
            emitter,
            journal: Vec::new(),
            trial_started_at: None,
            end_reason: None,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.id
    }

    /// Participant identifier, if one was given.
    #[must_use]
    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    /// Dispatches `StartSession`.
    pub fn start(&mut self, now: Instant) -> Step {
        self.dispatch(TrialEvent::StartSession, now)
    }

    /// Current state and a copy of the context.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    /// Whether the session is over, either by the machine or by teardown.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.end_reason.is_some()
    }

    /// Why the session ended, once it has.
    #[must_use]
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Every event dispatched so far, including ignored ones.
    #[must_use]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// The timer orchestrator, for inspection.
    #[must_use]
    pub const fn timers(&self) -> &TimerOrchestrator {
        &self.timers
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Registers a listener for every emitted event.
    pub fn subscribe_all<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Emitted) + Send + 'static,
    {
        self.bus.subscribe_all(listener)
    }

    /// Registers a listener for one kind of emitted event.
    pub fn subscribe<F>(&mut self, kind: EmittedKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&Emitted) + Send + 'static,
    {
        self.bus.subscribe(kind, listener)
    }

    /// Removes a listener.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Processes one event to completion.
    ///
    /// After teardown every event is dropped without reaching the machine.
    pub fn dispatch(&mut self, event: TrialEvent, now: Instant) -> Step {
        let before = self.machine.snapshot();

        if self.is_ended() && !before.state.is_terminal() {
            debug!(event = event.name(), "session torn down; event dropped");
            self.journal.push(JournalEntry {
                event,
                from: before.state,
                to: before.state,
                applied: false,
                emitted: Vec::new(),
            });
            return Step {
                state: before.state,
                context: before.context,
                emitted: Vec::new(),
                applied: false,
            };
        }

        let step = self.machine.dispatch(&event);
        self.journal.push(JournalEntry {
            event,
            from: before.state,
            to: step.state,
            applied: step.applied,
            emitted: step.emitted.clone(),
        });

        if !step.applied {
            return step;
        }

        metrics::record_transition(event.name());
        metrics::set_cue_level(step.context.cue_level);
        self.record(event, &before, &step, now);

        for emitted in &step.emitted {
            self.bus.publish(emitted);
        }

        let diagnostics = self.timers.observe(&self.machine.snapshot(), now);
        self.report(diagnostics);

        if step.state.is_terminal() {
            let reason = match event {
                TrialEvent::SessionTimeout => EndReason::SessionTimeout,
                _ => EndReason::ManualExit,
            };
            self.finish(reason);
        }

        step
    }

    /// Writes the event-log records and metrics for one applied step.
    fn record(&mut self, event: TrialEvent, before: &Snapshot, step: &Step, now: Instant) {
        let timestamp = Utc::now();
        let prior = &before.context;

        match event {
            TrialEvent::Selection { position } => {
                let correct = position == prior.correct_item;
                metrics::record_selection(correct);
                self.emitter.emit(Event::ItemClick {
                    timestamp,
                    trial: prior.trial_count,
                    position,
                    correct_position: prior.correct_item,
                    correct,
                    cue_level: prior.cue_level,
                    difficulty_level: prior.difficulty_level,
                });
            }
            TrialEvent::ConfirmationFailed => {
                metrics::record_confirmation_failed();
                self.emitter.emit(Event::ConfirmationFailed {
                    timestamp,
                    trial: prior.trial_count,
                });
            }
            _ => {}
        }

        for emitted in &step.emitted {
            match *emitted {
                Emitted::SelectionMade {
                    selected_position,
                    correct_item,
                } => self.emitter.emit(Event::SelectionMade {
                    timestamp,
                    selected_position,
                    correct_item,
                }),
                Emitted::ConfirmationSucceeded => {
                    let elapsed = self
                        .trial_started_at
                        .map(|start| now.saturating_duration_since(start))
                        .unwrap_or_default();
                    metrics::record_trial_completed(elapsed);
                    self.emitter.emit(Event::ConfirmationSucceeded {
                        timestamp,
                        trial: prior.trial_count,
                    });
                }
            }
        }

        if step.context.difficulty_level > prior.difficulty_level {
            info!(
                from = prior.difficulty_level.tier(),
                to = step.context.difficulty_level.tier(),
                cue_level = prior.cue_level.get(),
                "difficulty upgraded"
            );
            metrics::record_difficulty_upgrade();
            self.emitter.emit(Event::DifficultyUpgraded {
                timestamp,
                from: prior.difficulty_level,
                to: step.context.difficulty_level,
                cue_level: prior.cue_level,
            });
        }

        let presents_trial = step.state == TrialState::PresentingTrial
            && before.state != TrialState::PresentingTrial;
        if presents_trial {
            if before.state == TrialState::Introduction
                || step.context.trial_count != prior.trial_count
            {
                self.trial_started_at = Some(now);
            }
            self.emitter.emit(Event::TrialPresented {
                timestamp,
                trial: step.context.trial_count,
                difficulty_level: step.context.difficulty_level,
                correct_item: step.context.correct_item,
            });
        }
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Hands the fetched configuration to the timers.
    pub fn config_loaded(&mut self, config: TimeoutConfig, now: Instant) {
        if self.is_ended() {
            return;
        }
        debug!(config = %config, "timeout configuration loaded");
        let diagnostics = self.timers.config_loaded(config, &self.machine.snapshot(), now);
        self.report(diagnostics);
    }

    /// Records a failed configuration fetch.
    pub fn config_failed(&mut self, reason: impl Into<String>) {
        let diagnostic = self.timers.config_failed(reason);
        self.report(vec![diagnostic]);
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Dispatches every timer due at `now`, earliest first.
    ///
    /// Each fired timer is dispatched even if an earlier one in the same
    /// batch ended the session; the machine drops the late ones.
    pub fn fire_expired(&mut self, now: Instant) -> Vec<(TimerKind, Step)> {
        let fired = self.timers.take_expired(now);
        fired
            .into_iter()
            .map(|kind| {
                metrics::record_timeout(kind);
                debug!(timer = kind.as_str(), "dispatching timeout");
                (kind, self.dispatch(kind.event(), now))
            })
            .collect()
    }

    fn report(&self, diagnostics: Vec<TimerDiagnostic>) {
        for diagnostic in diagnostics {
            warn!(session_id = %self.id, "{diagnostic}");
            self.emitter.emit(Event::TimerDiagnostic {
                timestamp: Utc::now(),
                message: diagnostic.to_string(),
                diagnostic,
            });
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Ends the session from outside the machine and cancels both timers.
    ///
    /// Idempotent; the first reason recorded wins.
    pub fn teardown(&mut self, reason: EndReason) {
        self.finish(reason);
    }

    fn finish(&mut self, reason: EndReason) {
        self.timers.cancel_all();
        if self.end_reason.is_some() {
            return;
        }
        self.end_reason = Some(reason);

        let trials_completed = self.trials_completed();
        info!(session_id = %self.id, %reason, trials_completed, "session ended");
        metrics::record_session_ended(reason);
        self.emitter.emit(Event::SessionEnded {
            timestamp: Utc::now(),
            reason,
            trials_completed,
        });
    }

    /// Trials confirmed so far.
    #[must_use]
    pub fn trials_completed(&self) -> u32 {
        self.machine.context().trial_count.saturating_sub(1)
    }
}
