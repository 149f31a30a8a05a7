//! Shared integration-test helpers: hosts with pinned item placement,
//! configuration providers with controllable behavior, and a harness for
//! running the `gazecue` binary.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gazecue::catalog::ScriptedRandom;
use gazecue::config::{TimeoutConfig, TimeoutConfigProvider};
use gazecue::error::ConfigError;
use gazecue::machine::Emitted;
use gazecue::observability::EventEmitter;
use gazecue::session::SessionHost;

/// A sample of 0.1 always lands on the first position of a tier:
/// `left` at difficulty 1, `top-left` at difficulty 2.
pub const FIRST_POSITION: f64 = 0.1;

/// Host whose hidden item is always the first position of the tier.
pub fn host() -> SessionHost {
    host_with(vec![FIRST_POSITION])
}

/// Host replaying `samples` for item placement.
pub fn host_with(samples: Vec<f64>) -> SessionHost {
    SessionHost::new(
        Box::new(ScriptedRandom::new(samples)),
        Arc::new(EventEmitter::noop()),
        Some("it-participant".into()),
    )
}

/// Host that writes its event log into a shared buffer.
pub fn host_with_log() -> (SessionHost, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let host = SessionHost::new(
        Box::new(ScriptedRandom::constant(FIRST_POSITION)),
        Arc::new(EventEmitter::new(Box::new(buffer.clone()))),
        None,
    );
    (host, buffer)
}

/// Same timeout for every cue level.
pub fn config(session_secs: u64, cue_secs: u64) -> TimeoutConfig {
    TimeoutConfig::uniform(
        Duration::from_secs(session_secs),
        Duration::from_secs(cue_secs),
    )
}

/// Collects every emitted event a host publishes.
pub fn record_emitted(host: &mut SessionHost) -> Arc<Mutex<Vec<Emitted>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    host.subscribe_all(move |event| sink.lock().unwrap().push(*event));
    seen
}

// ============================================================================
// Configuration providers
// ============================================================================

/// Provider whose fetch always fails.
pub struct FailingConfigProvider;

#[async_trait]
impl TimeoutConfigProvider for FailingConfigProvider {
    async fn timeout_config(&self) -> Result<TimeoutConfig, ConfigError> {
        Err(ConfigError::Unavailable("settings store offline".into()))
    }
}

/// Provider that answers after a delay on tokio's clock.
pub struct DelayedConfigProvider {
    pub delay: Duration,
    pub config: TimeoutConfig,
}

#[async_trait]
impl TimeoutConfigProvider for DelayedConfigProvider {
    async fn timeout_config(&self) -> Result<TimeoutConfig, ConfigError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.config)
    }
}

/// Provider that never answers.
pub struct PendingConfigProvider;

#[async_trait]
impl TimeoutConfigProvider for PendingConfigProvider {
    async fn timeout_config(&self) -> Result<TimeoutConfig, ConfigError> {
        std::future::pending().await
    }
}

// ============================================================================
// Event log capture
// ============================================================================

/// `Write` sink shared between an emitter and the test.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Parses every JSONL record written so far.
    pub fn records(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Record `type` fields in order.
    pub fn types(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|r| r["type"].as_str().unwrap().to_string())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Binary harness
// ============================================================================

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs `gazecue` with `args` and no stdin.
pub fn spawn_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gazecue"))
        .args(args)
        .env_remove("GAZECUE_SETTINGS")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run gazecue")
}

/// Runs `gazecue` with `args`, feeding `input` on stdin and then closing it.
pub fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_gazecue"))
        .args(args)
        .env_remove("GAZECUE_SETTINGS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn gazecue");

    child
        .stdin
        .take()
        .expect("stdin not captured")
        .write_all(input.as_bytes())
        .expect("failed to write stdin");

    child.wait_with_output().expect("failed to wait for gazecue")
}
