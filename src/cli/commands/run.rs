//! `run`: administer one session from stdin.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::catalog::{RandomSource, RngSource};
use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::input::{HELP, InputCommand, parse_line};
use crate::config::{FileConfigProvider, LoaderOptions};
use crate::cue::cue_for;
use crate::error::{GazecueError, SessionError};
use crate::machine::{Emitted, Snapshot};
use crate::observability::events::EventEmitter;
use crate::session::{SessionHandle, SessionHost, SessionRunner, SessionSummary};

/// Runs a session until it ends, stdin closes, or `cancel` fires.
///
/// # Errors
///
/// Returns an error if the event log or metrics endpoint cannot be set up,
/// stdin cannot be read, or the session task fails.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), GazecueError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let emitter = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stderr(),
    };

    let rng: Box<dyn RandomSource> = match args.seed {
        Some(seed) => Box::new(RngSource::seeded(seed)),
        None => Box::new(RngSource::from_os()),
    };

    if let Some(path) = &args.settings {
        tracing::info!(settings = %path.display(), "using settings file");
    }
    let provider = Arc::new(FileConfigProvider::new(
        args.settings.clone(),
        LoaderOptions::default(),
    ));

    let host = SessionHost::new(rng, Arc::new(emitter), args.participant.clone());
    let (mut runner, handle) = SessionRunner::with_cancel(host, provider, cancel.child_token());

    let format = args.format;
    runner
        .host_mut()
        .subscribe_all(move |event| print_emitted(event, format));

    let watcher = tokio::spawn(watch_snapshots(handle.watch(), format));
    let task = tokio::spawn(runner.run());
    let task = async move {
        task.await
            .map_err(|e| GazecueError::from(SessionError::TaskFailed(e.to_string())))
    };

    let summary = drive(BufReader::new(tokio::io::stdin()), handle, task, format).await?;

    watcher.abort();
    print_summary(&summary, format);
    Ok(())
}

/// Feeds operator lines to the session until the session task finishes.
///
/// Closing `input` drops the handle, which abandons the session. A line that
/// races the end of the session is discarded; the summary still arrives
/// through `task`.
async fn drive<R, F>(
    input: R,
    handle: SessionHandle,
    task: F,
    format: OutputFormat,
) -> Result<SessionSummary, GazecueError>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = Result<SessionSummary, GazecueError>>,
{
    tokio::pin!(task);
    let mut handle = Some(handle);
    let mut lines = input.lines();

    loop {
        tokio::select! {
            result = &mut task => return result,
            line = lines.next_line(), if handle.is_some() => match line? {
                Some(line) => {
                    let closed = handle
                        .as_ref()
                        .is_some_and(|h| handle_line(h, &line, format).is_err());
                    if closed {
                        tracing::debug!(line = %line, "session already closed; input discarded");
                        handle = None;
                    }
                }
                None => handle = None,
            },
        }
    }
}

fn handle_line(
    handle: &SessionHandle,
    line: &str,
    format: OutputFormat,
) -> Result<(), SessionError> {
    match parse_line(line) {
        Ok(None) => {}
        Ok(Some(InputCommand::Event(event))) => handle.dispatch(event)?,
        Ok(Some(InputCommand::Status)) => print_snapshot(&handle.snapshot(), format),
        Ok(Some(InputCommand::Help)) => println!("{HELP}"),
        Err(e) => eprintln!("error: {e}"),
    }
    Ok(())
}

async fn watch_snapshots(mut rx: tokio::sync::watch::Receiver<Snapshot>, format: OutputFormat) {
    let mut last = rx.borrow_and_update().clone();
    while rx.changed().await.is_ok() {
        let current = rx.borrow_and_update().clone();
        if current != last {
            print_snapshot(&current, format);
            last = current;
        }
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_snapshot(snapshot: &Snapshot, format: OutputFormat) {
    let cue = cue_for(snapshot);
    match format {
        OutputFormat::Human => {
            let ctx = &snapshot.context;
            let shown = cue
                .map(|cue| format!(" cue {:?} toward {}", cue.kind, cue.toward))
                .unwrap_or_default();
            println!(
                "[{}] trial {} difficulty {} {}{shown}",
                snapshot.state, ctx.trial_count, ctx.difficulty_level, ctx.cue_level
            );
        }
        OutputFormat::Json => {
            let value = serde_json::json!({ "snapshot": snapshot, "cue": cue });
            println!("{value}");
        }
    }
}

fn print_emitted(event: &Emitted, format: OutputFormat) {
    match format {
        OutputFormat::Human => match event {
            Emitted::SelectionMade {
                selected_position,
                correct_item,
            } => {
                let verdict = if selected_position == correct_item {
                    "correct"
                } else {
                    "incorrect"
                };
                println!("selection {selected_position}: {verdict}");
            }
            Emitted::ConfirmationSucceeded => println!("confirmation succeeded"),
        },
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(&serde_json::json!({ "emitted": event })) {
                println!("{line}");
            }
        }
    }
}

fn print_summary(summary: &SessionSummary, format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            println!(
                "session {} ended ({}): {} trial(s) completed, difficulty {}",
                summary.session_id,
                summary.end_reason,
                summary.trials_completed,
                summary.snapshot.context.difficulty_level
            );
            for diagnostic in &summary.diagnostics {
                println!("  note: {diagnostic}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "summary": summary }));
        }
    }
}
