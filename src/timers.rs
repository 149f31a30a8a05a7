//! Timer orchestration
//!
//! Two logical timers feed timeouts back into the machine:
//!
//! - the **session** timer, armed once as soon as the session duration is
//!   known, firing `SessionTimeout`;
//! - the **cue** timer, re-armed whenever the machine is presenting a trial
//!   and the cue level differs from the one the timer was armed for,
//!   firing `CueTimeout`.
//!
//! Timers are plain deadlines held here rather than spawned tasks. The
//! owner asks for [`next_deadline`](TimerOrchestrator::next_deadline),
//! sleeps, then collects [`take_expired`](TimerOrchestrator::take_expired).
//! Cancelling is therefore a synchronous state change, and a cancelled
//! timer has nothing left that could fire.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::TimeoutConfig;
use crate::cue::CueLevel;
use crate::machine::{Snapshot, TrialEvent, TrialState};

// ============================================================================
// Types
// ============================================================================

/// Which logical timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Session,
    Cue,
}

impl TimerKind {
    /// Machine event this timer injects when it fires.
    #[must_use]
    pub const fn event(self) -> TrialEvent {
        match self {
            Self::Session => TrialEvent::SessionTimeout,
            Self::Cue => TrialEvent::CueTimeout,
        }
    }

    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Cue => "cue",
        }
    }
}

/// Lifecycle of one timer: `idle -> waitingForConfig -> armed -> fired | canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    WaitingForConfig,
    Armed { deadline: Instant },
    Fired,
    Canceled,
}

impl TimerStatus {
    /// Deadline if armed.
    #[must_use]
    pub const fn deadline(self) -> Option<Instant> {
        match self {
            Self::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }
}

/// Non-fatal problems that left a timer unarmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerDiagnostic {
    /// The configuration fetch failed; nothing will be armed.
    ConfigUnavailable { reason: String },
    /// Session duration is missing or zero.
    MissingSessionDuration,
    /// Cue timeout for this level is missing or zero.
    MissingCueTimeout { cue_level: CueLevel },
    /// The duration is too large to turn into a deadline.
    DeadlineOutOfRange { timer: TimerKind, duration_secs: u64 },
}

impl std::fmt::Display for TimerDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigUnavailable { reason } => {
                write!(f, "timeout configuration unavailable: {reason}")
            }
            Self::MissingSessionDuration => {
                f.write_str("session duration is missing or zero; session timer not armed")
            }
            Self::MissingCueTimeout { cue_level } => {
                write!(f, "no timeout configured for {cue_level}; cue timer not armed")
            }
            Self::DeadlineOutOfRange {
                timer,
                duration_secs,
            } => write!(
                f,
                "{} timeout of {duration_secs}s is out of range; timer not armed",
                timer.as_str()
            ),
        }
    }
}

#[derive(Debug, Clone)]
enum ConfigState {
    Pending,
    Loaded(TimeoutConfig),
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    status: TimerStatus,
    /// Arming order; breaks ties between equal deadlines.
    seq: u64,
}

impl Slot {
    const fn idle() -> Self {
        Self {
            status: TimerStatus::Idle,
            seq: 0,
        }
    }

    const fn is_live(self) -> bool {
        matches!(
            self.status,
            TimerStatus::WaitingForConfig | TimerStatus::Armed { .. }
        )
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns the session and cue deadlines for one session.
#[derive(Debug)]
pub struct TimerOrchestrator {
    session: Slot,
    cue: Slot,
    config: ConfigState,
    /// Cue level the cue timer currently tracks; `None` when not presenting.
    cue_key: Option<CueLevel>,
    next_seq: u64,
    torn_down: bool,
    diagnostics: Vec<TimerDiagnostic>,
}

impl Default for TimerOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerOrchestrator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: Slot::idle(),
            cue: Slot::idle(),
            config: ConfigState::Pending,
            cue_key: None,
            next_seq: 0,
            torn_down: false,
            diagnostics: Vec::new(),
        }
    }

    /// Marks both timers as waiting for configuration.
    pub const fn begin(&mut self) {
        if self.torn_down {
            return;
        }
        if matches!(self.session.status, TimerStatus::Idle) {
            self.session.status = TimerStatus::WaitingForConfig;
        }
        if matches!(self.cue.status, TimerStatus::Idle) {
            self.cue.status = TimerStatus::WaitingForConfig;
        }
    }

    /// Accepts the fetched configuration and arms what it can.
    ///
    /// Returns diagnostics raised by this call.
    pub fn config_loaded(
        &mut self,
        config: TimeoutConfig,
        snapshot: &Snapshot,
        now: Instant,
    ) -> Vec<TimerDiagnostic> {
        if self.torn_down || !matches!(self.config, ConfigState::Pending) {
            return Vec::new();
        }
        self.config = ConfigState::Loaded(config);
        let mut raised = Vec::new();

        if snapshot.state.is_terminal() {
            self.cancel_all();
            return raised;
        }

        if matches!(
            self.session.status,
            TimerStatus::Idle | TimerStatus::WaitingForConfig
        ) {
            let armed = match config.session_duration() {
                Some(duration) => self.arm(TimerKind::Session, now, duration),
                None => Err(TimerDiagnostic::MissingSessionDuration),
            };
            match armed {
                Ok(slot) => self.session = slot,
                Err(diagnostic) => {
                    self.session.status = TimerStatus::Idle;
                    raised.push(diagnostic);
                    self.record(&raised);
                }
            }
        }

        // Re-evaluate the cue timer from scratch for the current snapshot.
        self.cue_key = None;
        if matches!(self.cue.status, TimerStatus::WaitingForConfig) {
            self.cue.status = TimerStatus::Idle;
        }
        raised.extend(self.observe(snapshot, now));
        raised
    }

    /// Records a failed configuration fetch. Nothing gets armed afterwards.
    pub fn config_failed(&mut self, reason: impl Into<String>) -> TimerDiagnostic {
        let diagnostic = TimerDiagnostic::ConfigUnavailable {
            reason: reason.into(),
        };
        if matches!(self.config, ConfigState::Pending) {
            self.config = ConfigState::Failed;
            for slot in [&mut self.session, &mut self.cue] {
                if matches!(slot.status, TimerStatus::WaitingForConfig) {
                    slot.status = TimerStatus::Idle;
                }
            }
        }
        self.record(std::slice::from_ref(&diagnostic));
        diagnostic
    }

    /// Reconciles the cue timer with a new snapshot.
    ///
    /// Call after every applied transition. Returns diagnostics raised by
    /// this call.
    pub fn observe(&mut self, snapshot: &Snapshot, now: Instant) -> Vec<TimerDiagnostic> {
        if self.torn_down {
            return Vec::new();
        }
        if snapshot.state.is_terminal() {
            self.cancel_all();
            return Vec::new();
        }

        let key = (snapshot.state == TrialState::PresentingTrial)
            .then_some(snapshot.context.cue_level);
        if key == self.cue_key {
            return Vec::new();
        }
        self.cue_key = key;
        self.cancel(TimerKind::Cue);

        let Some(level) = key else {
            return Vec::new();
        };

        let config = match &self.config {
            ConfigState::Pending => {
                self.cue.status = TimerStatus::WaitingForConfig;
                return Vec::new();
            }
            ConfigState::Failed => return Vec::new(),
            ConfigState::Loaded(config) => *config,
        };

        let armed = match config.cue_timeout(level) {
            Some(duration) => self.arm(TimerKind::Cue, now, duration),
            None => Err(TimerDiagnostic::MissingCueTimeout { cue_level: level }),
        };
        match armed {
            Ok(slot) => {
                self.cue = slot;
                Vec::new()
            }
            Err(diagnostic) => {
                warn!(cue_level = level.get(), "{diagnostic}");
                let raised = vec![diagnostic];
                self.record(&raised);
                raised
            }
        }
    }

    /// Earliest armed deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.session.status.deadline(), self.cue.status.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Returns every timer due at `now`, earliest deadline first and, on
    /// equal deadlines, in arming order. Each returned timer is marked fired.
    pub fn take_expired(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, u64, TimerKind)> = [
            (TimerKind::Session, self.session),
            (TimerKind::Cue, self.cue),
        ]
        .into_iter()
        .filter_map(|(kind, slot)| {
            slot.status
                .deadline()
                .filter(|deadline| *deadline <= now)
                .map(|deadline| (deadline, slot.seq, kind))
        })
        .collect();
        due.sort_by_key(|(deadline, seq, _)| (*deadline, *seq));

        for (_, _, kind) in &due {
            self.slot_mut(*kind).status = TimerStatus::Fired;
            debug!(timer = kind.as_str(), "timer fired");
        }
        due.into_iter().map(|(_, _, kind)| kind).collect()
    }

    /// Cancels both timers for good; later config or snapshots arm nothing.
    pub fn cancel_all(&mut self) {
        self.cancel(TimerKind::Session);
        self.cancel(TimerKind::Cue);
        self.cue_key = None;
        self.torn_down = true;
    }

    /// Current status of one timer.
    #[must_use]
    pub const fn status(&self, kind: TimerKind) -> TimerStatus {
        match kind {
            TimerKind::Session => self.session.status,
            TimerKind::Cue => self.cue.status,
        }
    }

    /// Every diagnostic raised so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[TimerDiagnostic] {
        &self.diagnostics
    }

    fn cancel(&mut self, kind: TimerKind) {
        let slot = self.slot_mut(kind);
        if slot.is_live() {
            slot.status = TimerStatus::Canceled;
            debug!(timer = kind.as_str(), "timer canceled");
        }
    }

    fn arm(
        &mut self,
        kind: TimerKind,
        now: Instant,
        duration: Duration,
    ) -> Result<Slot, TimerDiagnostic> {
        let deadline = now
            .checked_add(duration)
            .ok_or(TimerDiagnostic::DeadlineOutOfRange {
                timer: kind,
                duration_secs: duration.as_secs(),
            })?;
        self.next_seq += 1;
        debug!(
            timer = kind.as_str(),
            after_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "timer armed"
        );
        Ok(Slot {
            status: TimerStatus::Armed { deadline },
            seq: self.next_seq,
        })
    }

    const fn slot_mut(&mut self, kind: TimerKind) -> &mut Slot {
        match kind {
            TimerKind::Session => &mut self.session,
            TimerKind::Cue => &mut self.cue,
        }
    }

    fn record(&mut self, raised: &[TimerDiagnostic]) {
        self.diagnostics.extend_from_slice(raised);
    }
}
