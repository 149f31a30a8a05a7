//! Error types for `gazecue`
//!
//! The trial engine itself never fails for expected conditions (ignored
//! events, terminal state, unknown positions). The errors here cover the
//! surrounding surfaces: settings loading, the async session driver, and
//! the command-line input parser.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `gazecue` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Session driver error (session closed, driver task failed)
    pub const SESSION_ERROR: i32 = 5;

    /// Usage error (invalid arguments, malformed input line)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `gazecue` operations.
///
/// Aggregates all domain-specific errors and maps them to exit codes.
#[derive(Debug, Error)]
pub enum GazecueError {
    /// Settings loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session driver error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Malformed operator input
    #[error(transparent)]
    Input(#[from] InputError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GazecueError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Session(_) => ExitCode::SESSION_ERROR,
            Self::Input(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Settings loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the settings file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Settings validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the settings file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced settings file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Settings file exceeds the configured size limit
    #[error("settings file {path} is {size} bytes (limit: {limit})")]
    FileTooLarge {
        /// Path to the oversized file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// The provider could not produce a configuration at all
    #[error("settings unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found while checking a settings file.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "cue_timeouts.cl2")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Settings cannot be used
    Error,
    /// Settings load, but some timer will not be armed
    Warning,
}

// ============================================================================
// Session Errors
// ============================================================================

/// Errors from the async session driver.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session runner has already finished
    #[error("session {0} is closed")]
    Closed(uuid::Uuid),

    /// The session runner task panicked or was aborted
    #[error("session task failed: {0}")]
    TaskFailed(String),
}

// ============================================================================
// Input Errors
// ============================================================================

/// Errors parsing operator input lines and position names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// First word of the line is not a known command
    #[error("unknown command '{0}' (try: start, select <position>, drag ok|fail, exit, status)")]
    UnknownCommand(String),

    /// Position name not recognised
    #[error(
        "unknown position '{input}'{}",
        .suggestion.map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default()
    )]
    UnknownPosition {
        /// The text that failed to parse
        input: String,
        /// Closest known position name, if any is close enough
        suggestion: Option<&'static str>,
    },

    /// Command requires an argument that was not given
    #[error("'{command}' requires {expected}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Description of the missing argument
        expected: &'static str,
    },
}

// ============================================================================
// Range Errors
// ============================================================================

/// A numeric domain value fell outside its allowed range.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{what} must be in {min}..={max}, got {value}")]
pub struct RangeError {
    /// Name of the value
    pub what: &'static str,
    /// The rejected value
    pub value: u8,
    /// Inclusive lower bound
    pub min: u8,
    /// Inclusive upper bound
    pub max: u8,
}

// ============================================================================
// Tests
// ============================================================================
