use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tempo::{
    Action, ManualClock, Phase, Plan, SaveState, SessionPlayer, SessionSummary, Step, SubmitError,
    Submitter, SummaryOutbox, SummaryStatus,
};

fn plan(exercises: serde_json::Value) -> Plan {
    Plan::from_value(json!({
        "titulo": "Session",
        "subtitulo": "",
        "fecha": "2024-06-01",
        "equipamiento": "none",
        "tipoEntrenamiento": "circuit",
        "duracion_estimada_min": 15,
        "ejercicios": exercises,
    }))
    .unwrap()
}

fn timed(name: &str, series: u32, work: u32, rest: u32) -> serde_json::Value {
    json!({"nombre": name, "tipo": "time", "series": series, "repeticiones": null,
           "duracion_seg": work, "descanso_seg": rest, "notas": ""})
}

fn reps(name: &str, series: u32, rest: u32) -> serde_json::Value {
    json!({"nombre": name, "tipo": "reps", "series": series, "repeticiones": "10",
           "duracion_seg": null, "descanso_seg": rest, "notas": ""})
}

fn player(exercises: serde_json::Value) -> (SessionPlayer<ManualClock>, ManualClock) {
    let clock = ManualClock::default();
    let player = SessionPlayer::new(plan(exercises), clock.clone()).unwrap();
    (player, clock)
}

/// Ticks `n` times, advancing the clock a second per tick.
fn run(player: &mut SessionPlayer<ManualClock>, clock: &ManualClock, n: usize) -> Vec<Step> {
    (0..n)
        .map(|_| {
            clock.advance_secs(1);
            player.tick()
        })
        .collect()
}

#[derive(Default)]
struct CountingSubmitter {
    calls: AtomicUsize,
}

#[async_trait]
impl Submitter for CountingSubmitter {
    async fn submit(&self, _summary: &SessionSummary) -> Result<(), SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn timed_exercise_with_rest_walks_through_every_phase() {
    let (mut player, clock) = player(json!([timed("Jacks", 2, 3, 2)]));
    player.apply(Action::Toggle);

    run(&mut player, &clock, 3);
    assert_eq!(player.completed_series(), &[1]);
    assert_eq!(player.phase(), Phase::Rest { remaining: 2 });

    run(&mut player, &clock, 2);
    assert_eq!(player.phase(), Phase::Work { remaining: 3 });
    assert_eq!(player.series(), 2);

    let steps = run(&mut player, &clock, 3);
    assert_eq!(player.completed_series(), &[2]);
    assert_eq!(player.phase(), Phase::Done);
    assert!(!player.is_running());

    let Some(Step::Finished(summary)) = steps.last() else {
        panic!("last tick should finish the session");
    };
    assert_eq!(summary.metrics.status, SummaryStatus::Completed);
    assert_eq!(summary.metrics.active_secs, 8);
    assert_eq!(summary.series_completed, vec![2]);
}

#[test]
fn one_work_and_rest_cycle_credits_exactly_one_series() {
    let (mut player, clock) = player(json!([timed("Plank", 3, 4, 2), timed("Bridge", 1, 5, 0)]));
    player.apply(Action::Toggle);

    run(&mut player, &clock, 4 + 2);
    assert_eq!(player.completed_series(), &[1, 0]);
    assert_eq!(player.phase(), Phase::Work { remaining: 4 });
    assert_eq!(player.current_index(), 0);

    run(&mut player, &clock, 2 * (4 + 2));
    assert_eq!(player.completed_series(), &[3, 0]);
    assert_eq!(player.current_index(), 1);
    assert_eq!(player.phase(), Phase::Work { remaining: 5 });
}

#[test]
fn completed_series_never_exceeds_the_target() {
    let (mut player, clock) = player(json!([reps("Push-up", 2, 0), timed("Plank", 1, 2, 1)]));

    for _ in 0..5 {
        player.apply(Action::Jump(0));
        player.apply(Action::MarkDone);
        player.apply(Action::MarkDone);
        player.apply(Action::MarkDone);
    }
    assert!(player.completed_series()[0] <= 2);

    player.apply(Action::Jump(1));
    player.apply(Action::Toggle);
    run(&mut player, &clock, 50);

    for (done, ex) in player.completed_series().iter().zip(&player.plan().exercises) {
        assert!(*done <= ex.series);
    }
}

#[test]
fn last_series_of_last_exercise_always_ends_the_session() {
    let (mut timed_player, clock) = player(json!([timed("Plank", 1, 2, 30)]));
    timed_player.apply(Action::Toggle);
    run(&mut timed_player, &clock, 2);
    assert_eq!(timed_player.phase(), Phase::Done);
    assert!(!timed_player.is_running());

    let (mut reps_player, _) = player(json!([reps("Squat", 1, 30)]));
    reps_player.apply(Action::Toggle);
    let step = reps_player.apply(Action::MarkDone);
    assert!(matches!(step, Step::Finished(_)));
    assert_eq!(reps_player.phase(), Phase::Done);
    assert!(!reps_player.is_running());
    assert_eq!(reps_player.current_index(), 1);
}

#[test]
fn pausing_freezes_and_never_rewinds_active_time() {
    let (mut player, clock) = player(json!([timed("Row", 5, 60, 30)]));
    player.apply(Action::Toggle);

    let mut last = 0;
    for round in 0..4 {
        run(&mut player, &clock, 7);
        let running = player.elapsed_active_secs();
        assert!(running >= last);

        player.apply(Action::Toggle);
        clock.advance_secs(45 + round);
        assert_eq!(player.elapsed_active_secs(), running);

        player.apply(Action::Toggle);
        last = running;
    }
    assert_eq!(player.elapsed_active_secs(), 28);
}

#[tokio::test]
async fn summary_is_submitted_exactly_once() {
    let counter = Arc::new(CountingSubmitter::default());
    let outbox = SummaryOutbox::new(counter.clone());
    let (mut player, clock) = player(json!([reps("Dips", 1, 0), reps("Curl", 1, 0)]));

    player.apply(Action::MarkDone);
    clock.advance_secs(20);
    let step = player.apply(Action::FinishNow);
    let Step::Finished(summary) = step else {
        panic!("finish now should produce a summary");
    };
    assert_eq!(summary.metrics.status, SummaryStatus::Partial);
    assert_eq!(summary.metrics.completed_exercises, 1);
    assert!(outbox.stage(summary));
    assert_eq!(outbox.flush().await, SaveState::Saved);

    // A second "finish now" after done is a no-op.
    assert_eq!(player.apply(Action::FinishNow), Step::Ignored);
    if let Some(summary) = player.summary() {
        assert!(!outbox.stage(summary));
    }
    assert_eq!(outbox.flush().await, SaveState::Saved);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn repetition_series_without_rest_never_enter_rest() {
    let (mut player, _) = player(json!([reps("Lunge", 3, 0)]));

    assert_eq!(player.apply(Action::MarkDone), Step::Changed);
    assert_eq!(player.completed_series(), &[1]);
    assert_eq!(player.phase(), Phase::Idle);
    assert_eq!(player.series(), 2);

    assert_eq!(player.apply(Action::MarkDone), Step::Changed);
    assert_eq!(player.completed_series(), &[2]);
    assert_eq!(player.phase(), Phase::Idle);

    assert!(matches!(player.apply(Action::MarkDone), Step::Finished(_)));
    assert_eq!(player.completed_series(), &[3]);
    assert_eq!(player.phase(), Phase::Done);
}

#[test]
fn skip_mid_work_does_not_credit_the_series() {
    let (mut player, clock) = player(json!([timed("Burpee", 3, 4, 1), reps("Sit-up", 2, 0)]));
    player.apply(Action::Toggle);
    run(&mut player, &clock, 4 + 1 + 2);
    assert_eq!(player.completed_series(), &[1, 0]);
    assert_eq!(player.phase(), Phase::Work { remaining: 2 });

    assert_eq!(player.apply(Action::Skip), Step::Changed);
    assert_eq!(player.completed_series(), &[1, 0]);
    assert_eq!(player.current_index(), 1);
    assert_eq!(player.phase(), Phase::Idle);

    let step = player.apply(Action::Skip);
    assert!(matches!(step, Step::Finished(_)));
    assert_eq!(player.completed_series(), &[1, 0]);
}

#[test]
fn empty_plan_cannot_start() {
    let result = SessionPlayer::new(plan(json!([])), ManualClock::default());
    assert!(matches!(result, Err(tempo::PlayerError::EmptyPlan)));
}

#[test]
fn summary_echoes_the_input_plan() {
    let raw = json!({
        "titulo": "Echo",
        "duracion_estimada_min": 5,
        "coach": "Ana",
        "ejercicios": [timed("Hold", 1, 1, 0)],
    });
    let plan = Plan::from_value(raw.clone()).unwrap();
    let mut player = SessionPlayer::new(plan, ManualClock::default())
        .unwrap()
        .with_user_id("abc");

    player.apply(Action::Toggle);
    let Step::Finished(summary) = player.tick() else {
        panic!("single one-second interval should finish");
    };
    assert_eq!(summary.plan, raw);
    assert_eq!(summary.user_id, "abc");
    assert_eq!(summary.metrics.estimated_minutes, 5.0);
    assert!(summary.started_at.is_some());
    assert!(summary.finished_at >= summary.started_at.unwrap_or_default());
}
