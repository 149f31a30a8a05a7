//! Transition function
//!
//! `(state, context, event) -> (state', context', emitted)`, with the only
//! impurity (picking the next hidden position) routed through an injected
//! [`RandomSource`].
//!
//! | From | Event | Guard | To |
//! |------|-------|-------|----|
//! | introduction | StartSession | | presentingTrial |
//! | introduction | SessionTimeout | | sessionEnded |
//! | presentingTrial | Selection | correct | awaitingConfirmation |
//! | presentingTrial | Selection | incorrect | presentingTrial (escalate) |
//! | presentingTrial | CueTimeout | cue == 4 | awaitingConfirmation |
//! | presentingTrial | CueTimeout | cue < 4 | presentingTrial (escalate) |
//! | presentingTrial | SessionTimeout, ManualExit | | sessionEnded |
//! | awaitingConfirmation | ConfirmationSucceeded | | presentingTrial (next trial) |
//! | awaitingConfirmation | ConfirmationFailed | | presentingTrial (same trial number) |
//! | awaitingConfirmation | SessionTimeout | | sessionEnded |
//!
//! Every other pairing is ignored.

use crate::catalog::{DifficultyLevel, RandomSource, pick_correct_position};
use crate::cue::CueLevel;

use super::event::{Emitted, TrialEvent};
use super::state::{TrialContext, TrialState};

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: TrialState,
    pub context: TrialContext,
    /// Semantic events, in publication order.
    pub emitted: Vec<Emitted>,
    /// `false` when the event was ignored and nothing changed.
    pub applied: bool,
}

impl Step {
    fn ignored(state: TrialState, context: &TrialContext) -> Self {
        Self {
            state,
            context: context.clone(),
            emitted: Vec::new(),
            applied: false,
        }
    }

    const fn applied(state: TrialState, context: TrialContext, emitted: Vec<Emitted>) -> Self {
        Self {
            state,
            context,
            emitted,
            applied: true,
        }
    }
}

/// Applies `event` to `(state, context)`.
pub fn transition(
    state: TrialState,
    context: &TrialContext,
    event: &TrialEvent,
    rng: &mut dyn RandomSource,
) -> Step {
    match (state, event) {
        (TrialState::Introduction, TrialEvent::StartSession) => {
            let mut next = context.clone();
            next.correct_item = pick_correct_position(next.difficulty_level, rng);
            Step::applied(TrialState::PresentingTrial, next, Vec::new())
        }

        (TrialState::PresentingTrial, TrialEvent::Selection { position }) => {
            let mut next = context.clone();
            next.selected_position = Some(*position);
            let emitted = vec![Emitted::SelectionMade {
                selected_position: *position,
                correct_item: context.correct_item,
            }];

            if *position == context.correct_item {
                next.cue_level = CueLevel::MIN;
                Step::applied(TrialState::AwaitingConfirmation, next, emitted)
            } else {
                next.cue_level = context.cue_level.escalate();
                next.consecutive_correct_at_cl2 = 0;
                Step::applied(TrialState::PresentingTrial, next, emitted)
            }
        }

        (TrialState::PresentingTrial, TrialEvent::CueTimeout) => {
            let mut next = context.clone();
            next.consecutive_correct_at_cl2 = 0;
            if context.cue_level.is_max() {
                // Nothing left to escalate: hand over to the confirmation step.
                Step::applied(TrialState::AwaitingConfirmation, next, Vec::new())
            } else {
                next.cue_level = context.cue_level.escalate();
                Step::applied(TrialState::PresentingTrial, next, Vec::new())
            }
        }

        (TrialState::PresentingTrial, TrialEvent::ManualExit)
        | (
            TrialState::Introduction
            | TrialState::PresentingTrial
            | TrialState::AwaitingConfirmation,
            TrialEvent::SessionTimeout,
        ) => {
            Step::applied(TrialState::SessionEnded, context.clone(), Vec::new())
        }

        (TrialState::AwaitingConfirmation, TrialEvent::ConfirmationSucceeded) => {
            let cue_at_entry = context.cue_level;
            let mut next = context.clone();
            next.trial_count = context.trial_count.saturating_add(1);
            next.consecutive_correct_at_cl2 = if cue_at_entry.get() == 2 {
                context.consecutive_correct_at_cl2.saturating_add(1)
            } else {
                0
            };
            next.difficulty_level = upgraded_difficulty(
                context.difficulty_level,
                cue_at_entry,
                next.consecutive_correct_at_cl2,
            );
            next.cue_level = CueLevel::MIN;
            next.correct_item = pick_correct_position(next.difficulty_level, rng);
            Step::applied(
                TrialState::PresentingTrial,
                next,
                vec![Emitted::ConfirmationSucceeded],
            )
        }

        (TrialState::AwaitingConfirmation, TrialEvent::ConfirmationFailed) => {
            let mut next = context.clone();
            next.cue_level = CueLevel::MIN;
            next.correct_item = pick_correct_position(next.difficulty_level, rng);
            Step::applied(TrialState::PresentingTrial, next, Vec::new())
        }

        _ => Step::ignored(state, context),
    }
}

/// Difficulty after a confirmed trial.
///
/// `cue_at_entry` is the cue level before the confirmation reset it;
/// `consecutive_at_cl2` is the counter after this trial was counted.
/// The result is never lower than `current`.
#[must_use]
pub fn upgraded_difficulty(
    current: DifficultyLevel,
    cue_at_entry: CueLevel,
    consecutive_at_cl2: u32,
) -> DifficultyLevel {
    let proposed = match cue_at_entry.get() {
        1 => DifficultyLevel::Two,
        2 if consecutive_at_cl2 >= 2 && current == DifficultyLevel::One => DifficultyLevel::Two,
        _ => current,
    };
    current.max(proposed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Position, ScriptedRandom};

    fn cue(level: u8) -> CueLevel {
        CueLevel::try_from(level).unwrap()
    }

    fn presenting(cue_level: u8) -> TrialContext {
        TrialContext {
            cue_level: cue(cue_level),
            ..TrialContext::initial(Position::Left)
        }
    }

    fn rng() -> ScriptedRandom {
        ScriptedRandom::constant(0.1)
    }

    #[test]
    fn test_start_session_assigns_tier_one_item() {
        let ctx = TrialContext::initial(Position::Right);
        let step = transition(
            TrialState::Introduction,
            &ctx,
            &TrialEvent::StartSession,
            &mut rng(),
        );
        assert!(step.applied);
        assert_eq!(step.state, TrialState::PresentingTrial);
        assert_eq!(step.context.correct_item, Position::Left);
        assert!(step.emitted.is_empty());
    }

    #[test]
    fn test_correct_selection_awaits_confirmation() {
        let step = transition(
            TrialState::PresentingTrial,
            &presenting(3),
            &TrialEvent::select(Position::Left),
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::AwaitingConfirmation);
        assert_eq!(step.context.cue_level, CueLevel::MIN);
        assert_eq!(step.context.selected_position, Some(Position::Left));
        assert_eq!(
            step.emitted,
            vec![Emitted::SelectionMade {
                selected_position: Position::Left,
                correct_item: Position::Left,
            }]
        );
    }

    #[test]
    fn test_incorrect_selection_escalates_and_resets_streak() {
        let ctx = TrialContext {
            consecutive_correct_at_cl2: 1,
            ..presenting(2)
        };
        let step = transition(
            TrialState::PresentingTrial,
            &ctx,
            &TrialEvent::select(Position::Right),
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::PresentingTrial);
        assert_eq!(step.context.cue_level, cue(3));
        assert_eq!(step.context.consecutive_correct_at_cl2, 0);
        assert_eq!(step.emitted.len(), 1);
    }

    #[test]
    fn test_off_catalog_selection_is_incorrect() {
        let step = transition(
            TrialState::PresentingTrial,
            &presenting(1),
            &TrialEvent::select(Position::BottomRight),
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::PresentingTrial);
        assert_eq!(step.context.cue_level, cue(2));
    }

    #[test]
    fn test_cue_timeout_escalates_below_max() {
        let step = transition(
            TrialState::PresentingTrial,
            &presenting(1),
            &TrialEvent::CueTimeout,
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::PresentingTrial);
        assert_eq!(step.context.cue_level, cue(2));
        assert!(step.emitted.is_empty());
    }

    #[test]
    fn test_cue_timeout_at_max_hands_over_to_confirmation() {
        let step = transition(
            TrialState::PresentingTrial,
            &presenting(4),
            &TrialEvent::CueTimeout,
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::AwaitingConfirmation);
        assert_eq!(step.context.cue_level, cue(4));
    }

    #[test]
    fn test_confirmation_after_uncued_selection_upgrades() {
        let step = transition(
            TrialState::AwaitingConfirmation,
            &presenting(1),
            &TrialEvent::ConfirmationSucceeded,
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::PresentingTrial);
        assert_eq!(step.context.difficulty_level, DifficultyLevel::Two);
        assert_eq!(step.context.trial_count, 2);
        assert_eq!(step.context.correct_item, Position::TopLeft);
        assert_eq!(step.emitted, vec![Emitted::ConfirmationSucceeded]);
    }

    #[test]
    fn test_confirmation_at_cl4_keeps_difficulty() {
        let step = transition(
            TrialState::AwaitingConfirmation,
            &presenting(4),
            &TrialEvent::ConfirmationSucceeded,
            &mut rng(),
        );
        assert_eq!(step.context.difficulty_level, DifficultyLevel::One);
        assert_eq!(step.context.cue_level, CueLevel::MIN);
        assert_eq!(step.context.consecutive_correct_at_cl2, 0);
    }

    #[test]
    fn test_second_consecutive_cl2_confirmation_upgrades() {
        let first = transition(
            TrialState::AwaitingConfirmation,
            &presenting(2),
            &TrialEvent::ConfirmationSucceeded,
            &mut rng(),
        );
        assert_eq!(first.context.consecutive_correct_at_cl2, 1);
        assert_eq!(first.context.difficulty_level, DifficultyLevel::One);

        let ctx = TrialContext {
            cue_level: cue(2),
            ..first.context
        };
        let second = transition(
            TrialState::AwaitingConfirmation,
            &ctx,
            &TrialEvent::ConfirmationSucceeded,
            &mut rng(),
        );
        assert_eq!(second.context.consecutive_correct_at_cl2, 2);
        assert_eq!(second.context.difficulty_level, DifficultyLevel::Two);
    }

    #[test]
    fn test_failed_confirmation_keeps_trial_count() {
        let ctx = TrialContext {
            trial_count: 5,
            ..presenting(3)
        };
        let step = transition(
            TrialState::AwaitingConfirmation,
            &ctx,
            &TrialEvent::ConfirmationFailed,
            &mut rng(),
        );
        assert_eq!(step.state, TrialState::PresentingTrial);
        assert_eq!(step.context.trial_count, 5);
        assert_eq!(step.context.cue_level, CueLevel::MIN);
        assert!(step.emitted.is_empty());
    }

    #[test]
    fn test_session_timeout_ends_from_every_live_state() {
        for state in [
            TrialState::Introduction,
            TrialState::PresentingTrial,
            TrialState::AwaitingConfirmation,
        ] {
            let step = transition(state, &presenting(2), &TrialEvent::SessionTimeout, &mut rng());
            assert!(step.applied, "{state} should accept the session timeout");
            assert_eq!(step.state, TrialState::SessionEnded);
            assert_eq!(step.context, presenting(2));
        }
    }

    #[test]
    fn test_manual_exit_before_start_is_ignored() {
        let ctx = TrialContext::initial(Position::Right);
        let step = transition(
            TrialState::Introduction,
            &ctx,
            &TrialEvent::ManualExit,
            &mut rng(),
        );
        assert!(!step.applied);
        assert_eq!(step.state, TrialState::Introduction);
    }

    #[test]
    fn test_selection_while_awaiting_is_ignored() {
        let ctx = presenting(1);
        let step = transition(
            TrialState::AwaitingConfirmation,
            &ctx,
            &TrialEvent::select(Position::Right),
            &mut rng(),
        );
        assert!(!step.applied);
        assert_eq!(step.state, TrialState::AwaitingConfirmation);
        assert_eq!(step.context, ctx);
    }

    #[test]
    fn test_manual_exit_while_awaiting_is_ignored() {
        let step = transition(
            TrialState::AwaitingConfirmation,
            &presenting(1),
            &TrialEvent::ManualExit,
            &mut rng(),
        );
        assert!(!step.applied);
    }

    #[test]
    fn test_session_ended_ignores_everything() {
        let ctx = presenting(2);
        for event in [
            TrialEvent::StartSession,
            TrialEvent::select(Position::Left),
            TrialEvent::CueTimeout,
            TrialEvent::SessionTimeout,
            TrialEvent::ManualExit,
            TrialEvent::ConfirmationSucceeded,
            TrialEvent::ConfirmationFailed,
        ] {
            let step = transition(TrialState::SessionEnded, &ctx, &event, &mut rng());
            assert!(!step.applied, "{event:?} should be ignored");
            assert_eq!(step.state, TrialState::SessionEnded);
            assert_eq!(step.context, ctx);
        }
    }

    #[test]
    fn test_upgrade_rule_never_downgrades() {
        for level in CueLevel::all() {
            for streak in 0..4 {
                assert_eq!(
                    upgraded_difficulty(DifficultyLevel::Two, level, streak),
                    DifficultyLevel::Two
                );
            }
        }
    }

    #[test]
    fn test_upgrade_rule_cl3_never_upgrades() {
        assert_eq!(
            upgraded_difficulty(DifficultyLevel::One, cue(3), 5),
            DifficultyLevel::One
        );
    }
}
