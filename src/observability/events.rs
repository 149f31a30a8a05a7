//! Session event log.
//!
//! Per-session events and per-click records, written as newline-delimited
//! JSON with a monotonically increasing sequence number. This is the
//! write-only persistence interface: whatever stores or exports session
//! data reads this stream.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::{DifficultyLevel, Position};
use crate::cue::CueLevel;
use crate::timers::TimerDiagnostic;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The session timer elapsed.
    SessionTimeout,
    /// The operator exited from a presented trial.
    ManualExit,
    /// The driver was cancelled (Ctrl+C or an explicit cancel).
    Cancelled,
    /// Every handle was dropped before the session ended.
    Abandoned,
}

impl EndReason {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionTimeout => "session_timeout",
            Self::ManualExit => "manual_exit",
            Self::Cancelled => "cancelled",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event in the life of a session.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A session was created.
    SessionStarted {
        timestamp: DateTime<Utc>,
        session_id: Uuid,
        /// Participant identifier supplied by the operator, if any.
        participant: Option<String>,
    },

    /// A trial (or a retry after a failed confirmation) is on screen.
    TrialPresented {
        timestamp: DateTime<Utc>,
        trial: u32,
        difficulty_level: DifficultyLevel,
        correct_item: Position,
    },

    /// Per-click record: one per tap while a trial is presented.
    ItemClick {
        timestamp: DateTime<Utc>,
        trial: u32,
        position: Position,
        correct_position: Position,
        correct: bool,
        /// Cue level in effect when the tap happened.
        cue_level: CueLevel,
        difficulty_level: DifficultyLevel,
    },

    /// Mirror of the bus event of the same name.
    SelectionMade {
        timestamp: DateTime<Utc>,
        selected_position: Position,
        correct_item: Position,
    },

    /// The confirmation drag landed; `trial` is the trial just completed.
    ConfirmationSucceeded {
        timestamp: DateTime<Utc>,
        trial: u32,
    },

    /// The confirmation drag missed; the trial will be presented again.
    ConfirmationFailed {
        timestamp: DateTime<Utc>,
        trial: u32,
    },

    /// Difficulty went up after a confirmed trial.
    DifficultyUpgraded {
        timestamp: DateTime<Utc>,
        from: DifficultyLevel,
        to: DifficultyLevel,
        /// Cue level on entry to the deciding confirmation.
        cue_level: CueLevel,
    },

    /// A timer could not be armed.
    TimerDiagnostic {
        timestamp: DateTime<Utc>,
        diagnostic: TimerDiagnostic,
        message: String,
    },

    /// The session is over.
    SessionEnded {
        timestamp: DateTime<Utc>,
        reason: EndReason,
        trials_completed: u32,
    },
}

// ---------------------------------------------------------------------------
// Log writer
// ---------------------------------------------------------------------------

/// One JSONL line: the sequence number followed by the flattened event.
#[derive(Serialize)]
struct Record<'a> {
    sequence: u64,
    #[serde(flatten)]
    event: &'a Event,
}

struct Sink {
    out: Box<dyn Write + Send>,
    next: u64,
}

/// Appends session events to a JSONL stream.
///
/// The sequence number is taken under the same lock as the write, so line
/// order and sequence order always agree. Every record is flushed on its
/// own; a session that is killed mid-trial leaves a log that ends on a
/// whole line. Serialization and I/O failures are dropped.
pub struct EventEmitter {
    sink: Mutex<Sink>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("events", &self.event_count())
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Log to any writer, numbering events from zero.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(Sink { out, next: 0 }),
        }
    }

    /// Log on stderr, next to diagnostics.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Counts events and writes nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Log in a file at `path`, truncating it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Writes `event` as one flushed JSON line tagged with the next
    /// sequence number.
    pub fn emit(&self, event: Event) {
        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        let record = Record {
            sequence: sink.next,
            event: &event,
        };
        sink.next += 1;

        if let Ok(line) = serde_json::to_string(&record) {
            let _ = writeln!(sink.out, "{line}");
            let _ = sink.out.flush();
        }
    }

    /// Sequence number the next event will get.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sink.lock().map_or(0, |sink| sink.next)
    }
}
