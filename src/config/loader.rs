//! Settings loader
//!
//! Pipeline:
//! 1. Existence and size check
//! 2. YAML parsing (unknown keys rejected)
//! 3. Duration resolution on top of the defaults
//! 4. Environment overrides
//! 5. Validation
//!
//! Resolution and override failures are collected, not returned one by one,
//! so a single run reports every bad value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::schema::{
    BareUnit, DurationValue, SettingsFile, TimeoutConfig, parse_duration_text,
};
use crate::config::validation::{ValidationResult, Validator};
use crate::cue::CueLevel;
use crate::error::{ConfigError, Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Environment variable overriding the session time limit.
pub const ENV_SESSION_TIME_LIMIT: &str = "GAZECUE_SESSION_TIME_LIMIT";

/// Environment variables overriding the per-level cue timeouts, in level order.
pub const ENV_CUE_TIMEOUTS: [&str; 4] = [
    "GAZECUE_CL1_TIMEOUT",
    "GAZECUE_CL2_TIMEOUT",
    "GAZECUE_CL3_TIMEOUT",
    "GAZECUE_CL4_TIMEOUT",
];

/// Environment variable for the maximum settings file size.
pub const ENV_MAX_SETTINGS_SIZE: &str = "GAZECUE_MAX_SETTINGS_SIZE";

const DEFAULT_MAX_SETTINGS_SIZE: u64 = 64 * 1024;

/// Options for the settings loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum settings file size in bytes.
    pub max_settings_size: u64,

    /// Whether `GAZECUE_*` overrides are applied after the file.
    pub apply_env: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_settings_size: env_or(ENV_MAX_SETTINGS_SIZE, DEFAULT_MAX_SETTINGS_SIZE),
            apply_env: true,
        }
    }
}

/// Where the loaded values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// No file; built-in defaults.
    Defaults,
    /// A settings file.
    File(PathBuf),
}

impl std::fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => f.write_str("defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Result of loading settings.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// The resolved configuration.
    pub config: TimeoutConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<ValidationIssue>,

    /// Origin of the values.
    pub source: SettingsSource,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Settings loader.
pub struct SettingsLoader {
    options: LoaderOptions,
    env: EnvLookup,
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsLoader")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SettingsLoader {
    /// Creates a loader reading overrides from the process environment.
    #[must_use]
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Replaces the environment lookup.
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Loads settings from `path`, or from defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, too large, not valid YAML,
    /// or holds values that cannot be parsed.
    pub fn load(&self, path: Option<&Path>) -> Result<LoadResult, ConfigError> {
        match path {
            Some(path) => self.load_file(path),
            None => self.finish(
                TimeoutConfig::default(),
                ValidationResult::default(),
                SettingsSource::Defaults,
                "defaults",
            ),
        }
    }

    /// Loads a settings file.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_file(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        if metadata.len() > self.options.max_settings_size {
            return Err(ConfigError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.options.max_settings_size,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Loads settings from YAML text; `origin` is used for messages.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_str(&self, content: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let file: SettingsFile = if content.trim().is_empty() {
            SettingsFile::default()
        } else {
            serde_yaml::from_str::<Option<SettingsFile>>(content)
                .map_err(|e| ConfigError::ParseError {
                    path: origin.to_path_buf(),
                    line: e.location().map(|l| l.line()),
                    message: e.to_string(),
                })?
                .unwrap_or_default()
        };

        let mut result = ValidationResult::default();
        let config = resolve(&file, &mut result.errors);

        self.finish(
            config,
            result,
            SettingsSource::File(origin.to_path_buf()),
            &origin.display().to_string(),
        )
    }

    fn finish(
        &self,
        mut config: TimeoutConfig,
        mut result: ValidationResult,
        source: SettingsSource,
        label: &str,
    ) -> Result<LoadResult, ConfigError> {
        if self.options.apply_env {
            self.apply_env(&mut config, &mut result.errors);
        }

        result.extend(Validator::new().validate(&config));

        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: label.to_string(),
                errors: result.errors,
            });
        }

        debug!(source = %source, config = %config, "settings loaded");

        Ok(LoadResult {
            config,
            warnings: result.warnings,
            source,
        })
    }

    fn apply_env(&self, config: &mut TimeoutConfig, errors: &mut Vec<ValidationIssue>) {
        if let Some(value) = (self.env)(ENV_SESSION_TIME_LIMIT) {
            match parse_duration_text(&value, BareUnit::Minutes) {
                Ok(d) => config.session_duration = Some(d),
                Err(message) => errors.push(error_issue(
                    &format!("env:{ENV_SESSION_TIME_LIMIT}"),
                    &format!("invalid duration '{value}': {message}"),
                )),
            }
        }

        for (slot, name) in config.cue_timeouts.iter_mut().zip(ENV_CUE_TIMEOUTS) {
            if let Some(value) = (self.env)(name) {
                match parse_duration_text(&value, BareUnit::Seconds) {
                    Ok(d) => *slot = Some(d),
                    Err(message) => errors.push(error_issue(
                        &format!("env:{name}"),
                        &format!("invalid duration '{value}': {message}"),
                    )),
                }
            }
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves file values on top of the defaults; absent keys keep the default.
fn resolve(file: &SettingsFile, errors: &mut Vec<ValidationIssue>) -> TimeoutConfig {
    let mut config = TimeoutConfig::default();

    if let Some(value) = &file.session_time_limit
        && let Some(d) = resolve_one(value, BareUnit::Minutes, "session_time_limit", errors)
    {
        config.session_duration = Some(d);
    }

    if let Some(cues) = &file.cue_timeouts {
        for (level, value) in CueLevel::all().zip(cues.levels()) {
            let Some(value) = value else { continue };
            let path = format!("cue_timeouts.cl{}", level.get());
            if let Some(d) = resolve_one(value, BareUnit::Seconds, &path, errors) {
                config.cue_timeouts[level.index()] = Some(d);
            }
        }
    }

    config
}

fn resolve_one(
    value: &DurationValue,
    unit: BareUnit,
    path: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<Duration> {
    match value.resolve(unit) {
        Ok(d) => Some(d),
        Err(message) => {
            errors.push(error_issue(path, &format!("invalid duration: {message}")));
            None
        }
    }
}

fn error_issue(path: &str, message: &str) -> ValidationIssue {
    ValidationIssue {
        path: path.to_string(),
        message: message.to_string(),
        severity: Severity::Error,
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
