mod common;

use tokio::time::Instant;

use gazecue::catalog::{DifficultyLevel, Position, ScriptedRandom};
use gazecue::cue::{CueKind, CueLevel, cue_for};
use gazecue::machine::{Emitted, TrialContext, TrialEvent, TrialState, transition};
use gazecue::observability::EndReason;

fn cue(level: u8) -> CueLevel {
    CueLevel::try_from(level).unwrap()
}

// ============================================================================
// Core scenarios
// ============================================================================

#[test]
fn fresh_session_starts_presenting_at_lowest_levels() {
    let mut host = common::host();
    assert_eq!(host.snapshot().state, TrialState::Introduction);

    host.start(Instant::now());

    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::PresentingTrial);
    assert_eq!(snap.context.difficulty_level, DifficultyLevel::One);
    assert_eq!(snap.context.cue_level, CueLevel::MIN);
    assert_eq!(snap.context.trial_count, 1);
}

#[test]
fn correct_selection_awaits_confirmation_at_cue_one() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);
    host.dispatch(TrialEvent::CueTimeout, now);
    assert_eq!(host.snapshot().context.cue_level, cue(2));

    host.dispatch(TrialEvent::select(Position::Left), now);

    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::AwaitingConfirmation);
    assert_eq!(snap.context.cue_level, CueLevel::MIN);
    assert_eq!(snap.context.selected_position, Some(Position::Left));
}

#[test]
fn incorrect_selection_escalates_cue() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);

    host.dispatch(TrialEvent::select(Position::Right), now);

    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::PresentingTrial);
    assert_eq!(snap.context.cue_level, cue(2));
    let shown = cue_for(&snap).unwrap();
    assert_eq!(shown.kind, CueKind::FaceTurn);
    assert_eq!(shown.toward, Position::Left);
}

#[test]
fn uncued_confirmation_upgrades_difficulty() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);
    host.dispatch(TrialEvent::select(Position::Left), now);

    host.dispatch(TrialEvent::ConfirmationSucceeded, now);

    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::PresentingTrial);
    assert_eq!(snap.context.difficulty_level, DifficultyLevel::Two);
    assert_eq!(snap.context.trial_count, 2);
    assert_eq!(snap.context.cue_level, CueLevel::MIN);
    assert_eq!(snap.context.correct_item, Position::TopLeft);
}

#[test]
fn two_wrong_then_right_cycles_end_at_difficulty_two() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);

    for _ in 0..2 {
        let correct = host.snapshot().context.correct_item;
        let wrong = if correct == Position::Left {
            Position::Right
        } else {
            Position::BottomRight
        };
        host.dispatch(TrialEvent::select(wrong), now);
        assert_eq!(host.snapshot().context.cue_level, cue(2));
        host.dispatch(TrialEvent::select(correct), now);
        host.dispatch(TrialEvent::ConfirmationSucceeded, now);
    }

    let ctx = host.snapshot().context;
    assert_eq!(ctx.difficulty_level, DifficultyLevel::Two);
    assert_eq!(ctx.trial_count, 3);
}

#[test]
fn cue_two_streak_reaching_two_upgrades() {
    let mut rng = ScriptedRandom::constant(common::FIRST_POSITION);
    let awaiting_at_cl2 = |streak: u32| TrialContext {
        cue_level: cue(2),
        consecutive_correct_at_cl2: streak,
        ..TrialContext::initial(Position::Left)
    };

    let first = transition(
        TrialState::AwaitingConfirmation,
        &awaiting_at_cl2(0),
        &TrialEvent::ConfirmationSucceeded,
        &mut rng,
    );
    assert_eq!(first.context.consecutive_correct_at_cl2, 1);
    assert_eq!(first.context.difficulty_level, DifficultyLevel::One);

    let second = transition(
        TrialState::AwaitingConfirmation,
        &awaiting_at_cl2(first.context.consecutive_correct_at_cl2),
        &TrialEvent::ConfirmationSucceeded,
        &mut rng,
    );
    assert_eq!(second.context.consecutive_correct_at_cl2, 2);
    assert_eq!(second.context.difficulty_level, DifficultyLevel::Two);
    assert_eq!(second.context.cue_level, CueLevel::MIN);
}

#[test]
fn session_timeout_ends_session_from_every_live_state() {
    let now = Instant::now();

    let mut in_intro = common::host();
    in_intro.dispatch(TrialEvent::SessionTimeout, now);

    let mut presenting = common::host();
    presenting.start(now);
    presenting.dispatch(TrialEvent::SessionTimeout, now);

    let mut awaiting = common::host();
    awaiting.start(now);
    awaiting.dispatch(TrialEvent::select(Position::Left), now);
    awaiting.dispatch(TrialEvent::SessionTimeout, now);

    for mut host in [in_intro, presenting, awaiting] {
        assert_eq!(host.snapshot().state, TrialState::SessionEnded);
        assert_eq!(host.end_reason(), Some(EndReason::SessionTimeout));

        let before = host.snapshot();
        let step = host.dispatch(TrialEvent::CueTimeout, now);
        assert!(!step.applied);
        assert_eq!(host.snapshot(), before);
    }
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn cue_never_exceeds_four_and_max_timeout_awaits_confirmation() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);

    for _ in 0..10 {
        host.dispatch(TrialEvent::select(Position::Right), now);
    }
    assert_eq!(host.snapshot().context.cue_level, CueLevel::MAX);
    assert_eq!(host.snapshot().state, TrialState::PresentingTrial);

    host.dispatch(TrialEvent::CueTimeout, now);
    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::AwaitingConfirmation);
    assert_eq!(snap.context.cue_level, CueLevel::MAX);
    assert!(cue_for(&snap).is_none());

    // Hand-off at maximum cue is not an uncued success.
    host.dispatch(TrialEvent::ConfirmationSucceeded, now);
    assert_eq!(
        host.snapshot().context.difficulty_level,
        DifficultyLevel::One
    );
}

#[test]
fn failed_confirmation_retries_without_counting() {
    let now = Instant::now();
    let mut host = common::host_with(vec![0.1, 0.9]);
    host.start(now);
    let first = host.snapshot().context.correct_item;
    host.dispatch(TrialEvent::select(first), now);

    host.dispatch(TrialEvent::ConfirmationFailed, now);

    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::PresentingTrial);
    assert_eq!(snap.context.trial_count, 1);
    assert_eq!(snap.context.cue_level, CueLevel::MIN);
    assert_eq!(snap.context.difficulty_level, DifficultyLevel::One);
    assert_eq!(host.trials_completed(), 0);
}

#[test]
fn selection_while_awaiting_changes_nothing() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);
    host.dispatch(TrialEvent::select(Position::Left), now);
    let before = host.snapshot();

    let step = host.dispatch(TrialEvent::select(Position::Right), now);

    assert!(!step.applied);
    assert!(step.emitted.is_empty());
    assert_eq!(host.snapshot(), before);
}

#[test]
fn off_tier_position_counts_as_incorrect() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);

    host.dispatch(TrialEvent::select(Position::BottomRight), now);

    let snap = host.snapshot();
    assert_eq!(snap.state, TrialState::PresentingTrial);
    assert_eq!(snap.context.cue_level, cue(2));
    assert_eq!(snap.context.selected_position, Some(Position::BottomRight));
}

#[test]
fn difficulty_does_not_drop_after_poor_trials() {
    let now = Instant::now();
    let mut host = common::host();
    host.start(now);
    host.dispatch(TrialEvent::select(Position::Left), now);
    host.dispatch(TrialEvent::ConfirmationSucceeded, now);
    assert_eq!(host.snapshot().context.difficulty_level, DifficultyLevel::Two);

    for _ in 0..3 {
        host.dispatch(TrialEvent::select(Position::BottomRight), now);
    }
    host.dispatch(TrialEvent::select(Position::TopLeft), now);
    host.dispatch(TrialEvent::ConfirmationSucceeded, now);

    let ctx = host.snapshot().context;
    assert_eq!(ctx.difficulty_level, DifficultyLevel::Two);
    assert!(gazecue::catalog::positions_for(ctx.difficulty_level).contains(&ctx.correct_item));
}

// ============================================================================
// Bus and event log
// ============================================================================

#[test]
fn listeners_see_one_event_per_participant_action() {
    let now = Instant::now();
    let mut host = common::host();
    let seen = common::record_emitted(&mut host);

    host.start(now);
    host.dispatch(TrialEvent::CueTimeout, now);
    host.dispatch(TrialEvent::select(Position::Right), now);
    host.dispatch(TrialEvent::select(Position::Left), now);
    host.dispatch(TrialEvent::ConfirmationSucceeded, now);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            Emitted::SelectionMade {
                selected_position: Position::Right,
                correct_item: Position::Left,
            },
            Emitted::SelectionMade {
                selected_position: Position::Left,
                correct_item: Position::Left,
            },
            Emitted::ConfirmationSucceeded,
        ]
    );
}

#[test]
fn unsubscribed_listener_stops_receiving() {
    let now = Instant::now();
    let mut host = common::host();
    let seen = std::sync::Arc::new(std::sync::Mutex::new(0_u32));
    let sink = std::sync::Arc::clone(&seen);
    let id = host.subscribe_all(move |_| *sink.lock().unwrap() += 1);

    host.start(now);
    host.dispatch(TrialEvent::select(Position::Right), now);
    assert!(host.unsubscribe(id));
    host.dispatch(TrialEvent::select(Position::Right), now);

    assert_eq!(*seen.lock().unwrap(), 1);
    assert!(!host.unsubscribe(id));
}

#[test]
fn event_log_records_a_full_trial() {
    let now = Instant::now();
    let (mut host, log) = common::host_with_log();

    host.start(now);
    host.dispatch(TrialEvent::select(Position::Right), now);
    host.dispatch(TrialEvent::select(Position::Left), now);
    host.dispatch(TrialEvent::ConfirmationSucceeded, now);
    host.dispatch(TrialEvent::ManualExit, now);

    assert_eq!(
        log.types(),
        vec![
            "SessionStarted",
            "TrialPresented",
            "ItemClick",
            "SelectionMade",
            "ItemClick",
            "SelectionMade",
            "ConfirmationSucceeded",
            "DifficultyUpgraded",
            "TrialPresented",
            "SessionEnded",
        ]
    );

    let records = log.records();
    let sequences: Vec<u64> = records
        .iter()
        .map(|r| r["sequence"].as_u64().unwrap())
        .collect();
    assert_eq!(sequences, (0..records.len() as u64).collect::<Vec<_>>());

    let first_click = &records[2];
    assert_eq!(first_click["correct"], false);
    assert_eq!(first_click["cue_level"], 1);
    assert_eq!(first_click["correct_position"], "left");

    let ended = records.last().unwrap();
    assert_eq!(ended["reason"], "manual_exit");
    assert_eq!(ended["trials_completed"], 1);
}
