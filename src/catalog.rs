//! Position catalog
//!
//! Maps a difficulty tier to its fixed set of candidate positions and picks
//! the hidden item's position uniformly at random through an injected
//! [`RandomSource`].

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{InputError, RangeError};

// ============================================================================
// Positions
// ============================================================================

/// A place on screen where an item can be hidden.
///
/// Tier 1 uses only [`Left`](Self::Left) and [`Right`](Self::Right); tier 2
/// uses the four corners. A position outside the current tier is still a
/// valid value, it just never matches the correct item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    /// Every position, in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Left,
        Self::Right,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Returns the kebab-case name used on the wire and in the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum edit distance for a "did you mean" suggestion.
const SUGGESTION_DISTANCE: usize = 3;

impl FromStr for Position {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        if let Some(position) = Self::ALL.iter().find(|p| p.as_str() == normalized) {
            return Ok(*position);
        }

        let suggestion = Self::ALL
            .iter()
            .map(|p| (p.as_str(), strsim::damerau_levenshtein(&normalized, p.as_str())))
            .filter(|(_, distance)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(_, distance)| *distance)
            .map(|(name, _)| name);

        Err(InputError::UnknownPosition {
            input: s.trim().to_string(),
            suggestion,
        })
    }
}

// ============================================================================
// Difficulty
// ============================================================================

/// Difficulty tier; controls how many candidate positions are shown.
///
/// Ordered so that "never downgrade" can be expressed as `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DifficultyLevel {
    /// Two positions: left and right.
    One,
    /// Four positions: the corners.
    Two,
}

impl DifficultyLevel {
    /// Returns the numeric tier (1 or 2).
    #[must_use]
    pub const fn tier(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Converts a numeric tier, treating anything else as a broken caller.
    ///
    /// # Panics
    ///
    /// Panics if `tier` is not 1 or 2.
    #[must_use]
    pub fn from_tier(tier: u8) -> Self {
        match Self::try_from(tier) {
            Ok(level) => level,
            Err(err) => panic!("undefined difficulty tier: {err}"),
        }
    }
}

impl TryFrom<u8> for DifficultyLevel {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            _ => Err(RangeError {
                what: "difficulty level",
                value,
                min: 1,
                max: 2,
            }),
        }
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> Self {
        level.tier()
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tier())
    }
}

const TIER_ONE: [Position; 2] = [Position::Left, Position::Right];
const TIER_TWO: [Position; 4] = [
    Position::TopLeft,
    Position::TopRight,
    Position::BottomLeft,
    Position::BottomRight,
];

/// Returns the ordered, non-empty set of candidate positions for a tier.
#[must_use]
pub const fn positions_for(level: DifficultyLevel) -> &'static [Position] {
    match level {
        DifficultyLevel::One => &TIER_ONE,
        DifficultyLevel::Two => &TIER_TWO,
    }
}

/// Picks the hidden item's position uniformly among the tier's positions.
pub fn pick_correct_position(level: DifficultyLevel, rng: &mut dyn RandomSource) -> Position {
    let positions = positions_for(level);
    let sample = rng.next_float().clamp(0.0, 1.0);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let index = ((sample * positions.len() as f64).floor() as usize).min(positions.len() - 1);
    positions[index]
}

// ============================================================================
// Random Sources
// ============================================================================

/// Source of uniform floats in `[0, 1)`.
pub trait RandomSource: Send {
    /// Returns the next sample.
    fn next_float(&mut self) -> f64;
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// OS-seeded generator for live sessions.
    #[must_use]
    pub fn from_os() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Deterministic generator for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> RandomSource for RngSource<R> {
    fn next_float(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when exhausted.
///
/// Used to pin the correct item in tests.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    /// Creates a source that cycles through `samples`.
    ///
    /// An empty list behaves like `[0.0]`.
    #[must_use]
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples, cursor: 0 }
    }

    /// Creates a source that always returns `sample`.
    #[must_use]
    pub fn constant(sample: f64) -> Self {
        Self::new(vec![sample])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_float(&mut self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sample = self.samples[self.cursor % self.samples.len()];
        self.cursor = self.cursor.wrapping_add(1);
        sample
    }
}
