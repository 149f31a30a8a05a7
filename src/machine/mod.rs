//! Trial state machine
//!
//! The deterministic core: states, guarded transitions, context updates and
//! the difficulty rule. [`transition`] is a pure function; [`TrialMachine`]
//! owns one `(state, context, rng)` triple and applies events to it.

pub mod event;
pub mod state;
pub mod transition;

use tracing::{debug, trace};

use crate::catalog::{Position, RandomSource, pick_correct_position};

pub use event::{Emitted, EmittedKind, TrialEvent};
pub use state::{Snapshot, TrialContext, TrialState};
pub use transition::{Step, transition, upgraded_difficulty};

/// One live machine instance.
///
/// Nothing outside [`dispatch`](Self::dispatch) writes the context; readers
/// take [`Snapshot`] copies.
pub struct TrialMachine {
    state: TrialState,
    context: TrialContext,
    rng: Box<dyn RandomSource>,
}

impl TrialMachine {
    /// Creates a machine in `introduction` with a fresh tier-1 item.
    #[must_use]
    pub fn new(mut rng: Box<dyn RandomSource>) -> Self {
        let initial = TrialContext::initial(Position::Left);
        let correct_item = pick_correct_position(initial.difficulty_level, rng.as_mut());
        Self {
            state: TrialState::Introduction,
            context: TrialContext {
                correct_item,
                ..initial
            },
            rng,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> TrialState {
        self.state
    }

    /// Returns the current context.
    #[must_use]
    pub const fn context(&self) -> &TrialContext {
        &self.context
    }

    /// Returns a read-only copy of state and context.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            context: self.context.clone(),
        }
    }

    /// Processes one event to completion.
    ///
    /// The returned [`Step`] holds the new state and context plus whatever
    /// was emitted. Ignored events leave the machine untouched.
    pub fn dispatch(&mut self, event: &TrialEvent) -> Step {
        let step = transition(self.state, &self.context, event, self.rng.as_mut());

        if step.applied {
            debug!(
                event = event.name(),
                from = %self.state,
                to = %step.state,
                cue_level = step.context.cue_level.get(),
                difficulty = step.context.difficulty_level.tier(),
                trial = step.context.trial_count,
                "transition"
            );
            self.state = step.state;
            self.context = step.context.clone();
        } else {
            trace!(event = event.name(), state = %self.state, "event ignored");
        }

        step
    }
}

impl std::fmt::Debug for TrialMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialMachine")
            .field("state", &self.state)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DifficultyLevel, ScriptedRandom, positions_for};
    use crate::cue::CueLevel;

    fn machine(samples: Vec<f64>) -> TrialMachine {
        TrialMachine::new(Box::new(ScriptedRandom::new(samples)))
    }

    #[test]
    fn test_new_machine_is_in_introduction() {
        let m = machine(vec![0.9]);
        assert_eq!(m.state(), TrialState::Introduction);
        assert_eq!(m.context().correct_item, Position::Right);
        assert_eq!(m.context().trial_count, 1);
    }

    #[test]
    fn test_dispatch_updates_snapshot() {
        let mut m = machine(vec![0.1]);
        m.dispatch(&TrialEvent::StartSession);
        let snap = m.snapshot();
        assert_eq!(snap.state, TrialState::PresentingTrial);
        assert_eq!(snap.context.difficulty_level, DifficultyLevel::One);
        assert_eq!(snap.context.cue_level, CueLevel::MIN);
        assert!(positions_for(DifficultyLevel::One).contains(&snap.context.correct_item));
    }

    #[test]
    fn test_ignored_event_keeps_machine() {
        let mut m = machine(vec![0.1]);
        let before = m.snapshot();
        let step = m.dispatch(&TrialEvent::CueTimeout);
        assert!(!step.applied);
        assert_eq!(m.snapshot(), before);
    }

    #[test]
    fn test_session_timeout_is_terminal() {
        let mut m = machine(vec![0.1]);
        m.dispatch(&TrialEvent::StartSession);
        m.dispatch(&TrialEvent::SessionTimeout);
        assert_eq!(m.state(), TrialState::SessionEnded);
        let before = m.snapshot();
        m.dispatch(&TrialEvent::CueTimeout);
        m.dispatch(&TrialEvent::StartSession);
        assert_eq!(m.snapshot(), before);
    }
}
