//! Asynchronous timeout configuration sources.
//!
//! The session driver asks a provider once per session and keeps accepting
//! input while it waits. A failed fetch is reported to the timer
//! orchestrator and leaves the timers unarmed; it never ends the session.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::config::loader::{LoaderOptions, SettingsLoader};
use crate::config::schema::TimeoutConfig;
use crate::error::ConfigError;

/// Produces the timeout configuration for a session.
#[async_trait]
pub trait TimeoutConfigProvider: Send + Sync {
    /// Fetches the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when no usable configuration can be produced.
    async fn timeout_config(&self) -> Result<TimeoutConfig, ConfigError>;
}

/// Hands out a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: TimeoutConfig,
}

impl StaticConfigProvider {
    #[must_use]
    pub const fn new(config: TimeoutConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TimeoutConfigProvider for StaticConfigProvider {
    async fn timeout_config(&self) -> Result<TimeoutConfig, ConfigError> {
        Ok(self.config)
    }
}

/// Loads the settings file on a blocking thread each time it is asked.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: Option<PathBuf>,
    options: LoaderOptions,
}

impl FileConfigProvider {
    /// `None` means "no file": defaults plus environment overrides.
    #[must_use]
    pub const fn new(path: Option<PathBuf>, options: LoaderOptions) -> Self {
        Self { path, options }
    }
}

#[async_trait]
impl TimeoutConfigProvider for FileConfigProvider {
    async fn timeout_config(&self) -> Result<TimeoutConfig, ConfigError> {
        let path = self.path.clone();
        let options = self.options.clone();

        let result = tokio::task::spawn_blocking(move || {
            SettingsLoader::new(options).load(path.as_deref())
        })
        .await
        .map_err(|e| ConfigError::Unavailable(format!("settings task failed: {e}")))??;

        for warning in &result.warnings {
            warn!(path = %warning.path, "{}", warning.message);
        }

        Ok(result.config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_static_provider() {
        let config = TimeoutConfig::uniform(Duration::from_secs(9), Duration::from_secs(3));
        let provider = StaticConfigProvider::new(config);
        let fetched = tokio_test::block_on(provider.timeout_config()).unwrap();
        assert_eq!(fetched, config);
    }

    #[tokio::test]
    async fn test_file_provider_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "session_time_limit: 90s").unwrap();
        let provider = FileConfigProvider::new(
            Some(file.path().to_path_buf()),
            LoaderOptions {
                max_settings_size: 1024,
                apply_env: false,
            },
        );
        let config = provider.timeout_config().await.unwrap();
        assert_eq!(config.session_duration(), Some(Duration::from_secs(90)));
    }

    #[tokio::test]
    async fn test_file_provider_missing_file() {
        let provider = FileConfigProvider::new(
            Some(PathBuf::from("/definitely/not/here.yaml")),
            LoaderOptions {
                max_settings_size: 1024,
                apply_env: false,
            },
        );
        let err = provider.timeout_config().await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }
}
