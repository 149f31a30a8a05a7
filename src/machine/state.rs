//! Trial state and context records.

use serde::{Deserialize, Serialize};

use crate::catalog::{DifficultyLevel, Position};
use crate::cue::CueLevel;

/// Machine states.
///
/// `SessionEnded` is terminal: once entered, every further event is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrialState {
    Introduction,
    PresentingTrial,
    AwaitingConfirmation,
    SessionEnded,
}

impl TrialState {
    /// Returns the wire name of this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::PresentingTrial => "presentingTrial",
            Self::AwaitingConfirmation => "awaitingConfirmation",
            Self::SessionEnded => "sessionEnded",
        }
    }

    /// Whether no further transitions are accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::SessionEnded)
    }
}

impl std::fmt::Display for TrialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable record the machine carries between events.
///
/// Only transition logic produces new values of this type for a live
/// machine; everyone else sees copies through [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialContext {
    /// Never decreases within a session.
    pub difficulty_level: DifficultyLevel,
    pub cue_level: CueLevel,
    /// 1-based; counts confirmed correct trials plus the one in progress.
    pub trial_count: u32,
    /// Back-to-back trials confirmed while at cue level 2.
    #[serde(rename = "consecutiveCorrectAtCL2")]
    pub consecutive_correct_at_cl2: u32,
    pub correct_item: Position,
    /// Last tapped position, if any.
    pub selected_position: Option<Position>,
}

impl TrialContext {
    /// Context at session creation.
    #[must_use]
    pub const fn initial(correct_item: Position) -> Self {
        Self {
            difficulty_level: DifficultyLevel::One,
            cue_level: CueLevel::MIN,
            trial_count: 1,
            consecutive_correct_at_cl2: 0,
            correct_item,
            selected_position: None,
        }
    }
}

/// Read-only view of a machine: state plus a copy of its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: TrialState,
    pub context: TrialContext,
}
