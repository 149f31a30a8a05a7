//! Operator input lines.
//!
//! ```text
//! start
//! select top-left      (alias: tap)
//! drag ok | drag fail
//! exit
//! status
//! help
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::catalog::Position;
use crate::error::InputError;
use crate::machine::TrialEvent;

/// One parsed operator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    /// Forward to the session.
    Event(TrialEvent),
    /// Print the current snapshot.
    Status,
    /// Print the command list.
    Help,
}

/// Command summary printed by `help`.
pub const HELP: &str = "\
commands:
  start                 begin the session
  select <position>     tap a position (alias: tap)
  drag ok | drag fail   report the confirmation drag outcome
  exit                  end the session from a presented trial
  status                show the current state
  help                  show this list
positions: left, right, top-left, top-right, bottom-left, bottom-right";

/// Parses one line. Returns `Ok(None)` for blank and comment lines.
///
/// # Errors
///
/// Returns an [`InputError`] for unknown commands, unknown positions, and
/// missing arguments.
pub fn parse_line(line: &str) -> Result<Option<InputCommand>, InputError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();

    let parsed = match command.as_str() {
        "start" => InputCommand::Event(TrialEvent::StartSession),
        "select" | "tap" => {
            if rest.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "select",
                    expected: "a position",
                });
            }
            // Accept "top left" as well as "top-left".
            let position: Position = rest.join(" ").parse()?;
            InputCommand::Event(TrialEvent::select(position))
        }
        "drag" => match rest.first().map(|w| w.to_ascii_lowercase()).as_deref() {
            Some("ok" | "success" | "succeeded") => {
                InputCommand::Event(TrialEvent::ConfirmationSucceeded)
            }
            Some("fail" | "failed" | "miss") => InputCommand::Event(TrialEvent::ConfirmationFailed),
            Some(other) => return Err(InputError::UnknownCommand(format!("drag {other}"))),
            None => {
                return Err(InputError::MissingArgument {
                    command: "drag",
                    expected: "'ok' or 'fail'",
                });
            }
        },
        "exit" | "quit" => InputCommand::Event(TrialEvent::ManualExit),
        "status" => InputCommand::Status,
        "help" | "?" => InputCommand::Help,
        _ => return Err(InputError::UnknownCommand(command)),
    };

    Ok(Some(parsed))
}
