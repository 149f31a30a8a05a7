//! Settings schema
//!
//! Two layers: [`SettingsFile`] mirrors the YAML document as written, and
//! [`TimeoutConfig`] is the resolved form the timer orchestrator reads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cue::CueLevel;

/// Session length used when nothing has been configured.
pub const DEFAULT_SESSION_TIME_LIMIT: Duration = Duration::from_secs(5 * 60);

/// Per-cue-level timeout used when nothing has been configured.
pub const DEFAULT_CUE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// File Schema
// ============================================================================

/// Settings document as it appears on disk.
///
/// ```yaml
/// session_time_limit: 5m
/// cue_timeouts:
///   cl1: 30s
///   cl4: 45s
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    /// Whole-session limit. A bare number is minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_time_limit: Option<DurationValue>,

    /// Per-level cue timeouts. Bare numbers are seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cue_timeouts: Option<CueTimeoutsFile>,
}

/// The `cue_timeouts` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CueTimeoutsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl1: Option<DurationValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl2: Option<DurationValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl3: Option<DurationValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cl4: Option<DurationValue>,
}

impl CueTimeoutsFile {
    /// Entries in cue level order.
    #[must_use]
    pub const fn levels(&self) -> [&Option<DurationValue>; 4] {
        [&self.cl1, &self.cl2, &self.cl3, &self.cl4]
    }
}

/// A duration as written by a person: `"90s"`, `"1m 30s"`, or a bare number
/// whose unit depends on the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Number(u64),
    Text(String),
}

/// Unit applied to bare numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BareUnit {
    Seconds,
    Minutes,
}

impl BareUnit {
    const fn to_duration(self, value: u64) -> Duration {
        match self {
            Self::Seconds => Duration::from_secs(value),
            Self::Minutes => Duration::from_secs(value.saturating_mul(60)),
        }
    }
}

impl DurationValue {
    /// Resolves to a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns the parser's message when the text is not a valid duration.
    pub fn resolve(&self, unit: BareUnit) -> Result<Duration, String> {
        match self {
            Self::Number(n) => Ok(unit.to_duration(*n)),
            Self::Text(text) => parse_duration_text(text, unit),
        }
    }
}

/// Parses `humantime` syntax, treating an all-digit string as a bare number.
///
/// # Errors
///
/// Returns the parser's message on invalid input.
pub fn parse_duration_text(text: &str, unit: BareUnit) -> Result<Duration, String> {
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse::<u64>()
            .map(|n| unit.to_duration(n))
            .map_err(|e| e.to_string());
    }
    humantime::parse_duration(text).map_err(|e| e.to_string())
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Timeouts the timer orchestrator works from.
///
/// `None` or a zero duration means "do not arm".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub session_duration: Option<Duration>,
    /// Indexed by [`CueLevel::index`].
    pub cue_timeouts: [Option<Duration>; 4],
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            session_duration: Some(DEFAULT_SESSION_TIME_LIMIT),
            cue_timeouts: [Some(DEFAULT_CUE_TIMEOUT); 4],
        }
    }
}

impl TimeoutConfig {
    /// Same timeout for every cue level.
    #[must_use]
    pub const fn uniform(session: Duration, cue: Duration) -> Self {
        Self {
            session_duration: Some(session),
            cue_timeouts: [Some(cue); 4],
        }
    }

    /// Session duration, if one is usable.
    #[must_use]
    pub fn session_duration(&self) -> Option<Duration> {
        self.session_duration.filter(|d| !d.is_zero())
    }

    /// Cue timeout for `level`, if one is usable.
    #[must_use]
    pub fn cue_timeout(&self, level: CueLevel) -> Option<Duration> {
        self.cue_timeouts[level.index()].filter(|d| !d.is_zero())
    }

    /// Replaces one level's timeout.
    #[must_use]
    pub const fn with_cue_timeout(mut self, level: CueLevel, timeout: Option<Duration>) -> Self {
        self.cue_timeouts[level.index()] = timeout;
        self
    }
}

impl std::fmt::Display for TimeoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn show(d: Option<Duration>) -> String {
            d.filter(|d| !d.is_zero())
                .map_or_else(|| "off".to_string(), |d| humantime::format_duration(d).to_string())
        }
        write!(f, "session {}", show(self.session_duration))?;
        for (i, timeout) in self.cue_timeouts.iter().enumerate() {
            write!(f, ", cl{} {}", i + 1, show(*timeout))?;
        }
        Ok(())
    }
}
