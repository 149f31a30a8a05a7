//! Metrics collection for `gazecue`.
//!
//! Prometheus-compatible counters and gauges with typed recording helpers.
//! Every label value comes from a closed enum, so cardinality is bounded
//! without sanitizing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::cue::CueLevel;
use crate::error::GazecueError;
use crate::observability::events::EndReason;
use crate::timers::TimerKind;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `GazecueError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), GazecueError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| GazecueError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "gazecue_transitions_total",
        "Machine events that changed state or context"
    );
    describe_counter!(
        "gazecue_selections_total",
        "Taps on a position while a trial was presented"
    );
    describe_counter!(
        "gazecue_trials_completed_total",
        "Trials completed with a successful confirmation"
    );
    describe_counter!(
        "gazecue_confirmations_failed_total",
        "Confirmation drags that missed"
    );
    describe_counter!("gazecue_timeouts_total", "Timers that fired");
    describe_counter!(
        "gazecue_difficulty_upgrades_total",
        "Difficulty upgrades from tier 1 to tier 2"
    );
    describe_counter!(
        "gazecue_sessions_ended_total",
        "Sessions ended, by reason"
    );
    describe_gauge!("gazecue_cue_level", "Cue level of the current trial");
    describe_histogram!(
        "gazecue_trial_duration_seconds",
        "Time from presenting a trial to its successful confirmation"
    );
}

/// Records an applied transition.
pub fn record_transition(event: &'static str) {
    counter!("gazecue_transitions_total", "event" => event).increment(1);
}

/// Records a tap and whether it hit the correct item.
pub fn record_selection(correct: bool) {
    let label = if correct { "true" } else { "false" };
    counter!("gazecue_selections_total", "correct" => label).increment(1);
}

/// Records a completed trial and how long it took.
pub fn record_trial_completed(duration: Duration) {
    counter!("gazecue_trials_completed_total").increment(1);
    histogram!("gazecue_trial_duration_seconds").record(duration.as_secs_f64());
}

/// Records a missed confirmation drag.
pub fn record_confirmation_failed() {
    counter!("gazecue_confirmations_failed_total").increment(1);
}

/// Records a fired timer.
pub fn record_timeout(kind: TimerKind) {
    counter!("gazecue_timeouts_total", "timer" => kind.as_str()).increment(1);
}

/// Records a difficulty upgrade.
pub fn record_difficulty_upgrade() {
    counter!("gazecue_difficulty_upgrades_total").increment(1);
}

/// Records the end of a session.
pub fn record_session_ended(reason: EndReason) {
    counter!("gazecue_sessions_ended_total", "reason" => reason.as_str()).increment(1);
}

/// Sets the cue level gauge.
pub fn set_cue_level(level: CueLevel) {
    gauge!("gazecue_cue_level").set(f64::from(level.get()));
}
