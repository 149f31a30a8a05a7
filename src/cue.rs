//! Cue levels and the semantic cue shown at each level.
//!
//! The character escalates gaze, face-turn, point, then highlight. How a
//! cue is drawn is up to the rendering collaborator; this module only says
//! which cue applies and which position it refers to.

use serde::{Deserialize, Serialize};

use crate::catalog::Position;
use crate::error::RangeError;
use crate::machine::{Snapshot, TrialState};

/// Prompting intensity, always within `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CueLevel(u8);

impl CueLevel {
    /// No cueing beyond the initial gaze.
    pub const MIN: Self = Self(1);
    /// Strongest cue; escalation stops here.
    pub const MAX: Self = Self(4);

    /// Returns the numeric level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the next level, saturating at [`MAX`](Self::MAX).
    #[must_use]
    pub const fn escalate(self) -> Self {
        if self.0 >= Self::MAX.0 {
            Self::MAX
        } else {
            Self(self.0 + 1)
        }
    }

    /// Whether no further escalation is possible.
    #[must_use]
    pub const fn is_max(self) -> bool {
        self.0 >= Self::MAX.0
    }

    /// Zero-based index for per-level lookup tables.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// All levels in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }
}

impl Default for CueLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for CueLevel {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RangeError {
                what: "cue level",
                value,
                min: Self::MIN.0,
                max: Self::MAX.0,
            })
        }
    }
}

impl From<CueLevel> for u8 {
    fn from(level: CueLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for CueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CL{}", self.0)
    }
}

/// Kind of prompt the character gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CueKind {
    /// Eyes only.
    Gaze,
    /// Whole head turns.
    FaceTurn,
    /// Arm points.
    Point,
    /// The item itself is highlighted; the character stays neutral.
    Highlight,
}

impl CueKind {
    /// Cue kind for a level.
    #[must_use]
    pub const fn for_level(level: CueLevel) -> Self {
        match level.get() {
            1 => Self::Gaze,
            2 => Self::FaceTurn,
            3 => Self::Point,
            _ => Self::Highlight,
        }
    }
}

/// The cue currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub kind: CueKind,
    /// Position the cue refers to (always the correct item).
    pub toward: Position,
}

/// Returns the cue to present for a snapshot, or `None` outside `presentingTrial`.
#[must_use]
pub const fn cue_for(snapshot: &Snapshot) -> Option<Cue> {
    match snapshot.state {
        TrialState::PresentingTrial => Some(Cue {
            kind: CueKind::for_level(snapshot.context.cue_level),
            toward: snapshot.context.correct_item,
        }),
        _ => None,
    }
}
