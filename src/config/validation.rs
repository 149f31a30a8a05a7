//! Settings validation
//!
//! Runs on the resolved [`TimeoutConfig`]. A disabled or odd timeout still
//! loads with a warning so the operator knows a timer will never fire.
//! Durations beyond [`MAX_TIMEOUT`] are errors. Unparseable values are
//! rejected earlier, during resolution in the loader.

use std::time::Duration;

use crate::config::schema::TimeoutConfig;
use crate::cue::CueLevel;
use crate::error::{Severity, ValidationIssue};

/// Cue timeouts below this are almost certainly a unit mistake.
const SUSPICIOUSLY_SHORT_CUE: Duration = Duration::from_secs(1);

/// Longest accepted session limit or cue timeout (one week).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Result of settings validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that prevent the settings from loading.
    pub errors: Vec<ValidationIssue>,

    /// Issues worth reporting; the settings still load.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Merges another result into this one.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Settings validator.
///
/// Collects every issue rather than stopping at the first one.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a resolved configuration.
    pub fn validate(&mut self, config: &TimeoutConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_session(config);
        self.validate_cue_levels(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_session(&mut self, config: &TimeoutConfig) {
        if let Some(limit) = config.session_duration() {
            self.check_ceiling("session_time_limit", limit);
        } else {
            self.add_warning(
                "session_time_limit",
                "session time limit is zero or unset; the session will only end on manual exit",
            );
        }
    }

    fn validate_cue_levels(&mut self, config: &TimeoutConfig) {
        let session = config.session_duration();

        for level in CueLevel::all() {
            let path = format!("cue_timeouts.cl{}", level.get());
            let Some(timeout) = config.cue_timeout(level) else {
                self.add_warning(
                    &path,
                    &format!("timeout is zero or unset; {level} will never escalate on its own"),
                );
                continue;
            };

            self.check_ceiling(&path, timeout);

            if timeout < SUSPICIOUSLY_SHORT_CUE {
                self.add_warning(
                    &path,
                    &format!(
                        "timeout of {} is shorter than one second",
                        humantime::format_duration(timeout)
                    ),
                );
            }

            if let Some(session) = session
                && timeout >= session
            {
                self.add_warning(
                    &path,
                    "timeout is not shorter than the session time limit; the session ends first",
                );
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn check_ceiling(&mut self, path: &str, duration: Duration) {
        if duration > MAX_TIMEOUT {
            self.errors.push(ValidationIssue {
                path: path.to_string(),
                message: format!(
                    "duration of {} exceeds the maximum of {}",
                    humantime::format_duration(duration),
                    humantime::format_duration(MAX_TIMEOUT)
                ),
                severity: Severity::Error,
            });
        }
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
