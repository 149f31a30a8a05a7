//! Inbound machine events and outbound semantic events.

use serde::{Deserialize, Serialize};

use crate::catalog::Position;

/// Everything the machine can be told.
///
/// UI input produces `StartSession`, `Selection` and `ManualExit`; the drag
/// collaborator produces the two confirmation outcomes; timers produce the
/// two timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrialEvent {
    StartSession,
    Selection { position: Position },
    CueTimeout,
    SessionTimeout,
    ManualExit,
    ConfirmationSucceeded,
    ConfirmationFailed,
}

impl TrialEvent {
    /// Short name for logs and metrics labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartSession => "start_session",
            Self::Selection { .. } => "selection",
            Self::CueTimeout => "cue_timeout",
            Self::SessionTimeout => "session_timeout",
            Self::ManualExit => "manual_exit",
            Self::ConfirmationSucceeded => "confirmation_succeeded",
            Self::ConfirmationFailed => "confirmation_failed",
        }
    }

    /// Shorthand for a selection event.
    #[must_use]
    pub const fn select(position: Position) -> Self {
        Self::Selection { position }
    }
}

/// Semantic events published to listeners.
///
/// Payloads carry everything a listener needs to pick feedback, so no
/// listener has to read machine context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Emitted {
    /// A position was tapped while a trial was presented.
    #[serde(rename_all = "camelCase")]
    SelectionMade {
        selected_position: Position,
        correct_item: Position,
    },
    /// The confirmation drag landed; the trial counts as complete.
    ConfirmationSucceeded,
}

impl Emitted {
    /// Returns the kind used for filtered subscriptions.
    #[must_use]
    pub const fn kind(&self) -> EmittedKind {
        match self {
            Self::SelectionMade { .. } => EmittedKind::SelectionMade,
            Self::ConfirmationSucceeded => EmittedKind::ConfirmationSucceeded,
        }
    }
}

/// Discriminant of [`Emitted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmittedKind {
    SelectionMade,
    ConfirmationSucceeded,
}
