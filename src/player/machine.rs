use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::phase::Phase;
use crate::error::PlayerError;
use crate::models::{ExerciseKind, Plan, PlanExercise, SessionMetrics, SessionSummary, SummaryStatus};

/// User input the player reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start, pause or resume.
    Toggle,
    /// Move on to the next exercise without crediting the current series.
    Skip,
    /// Reset the current exercise's countdown and pause.
    Restart,
    /// Confirm a repetition series.
    MarkDone,
    /// End the session now, as a partial session.
    FinishNow,
    /// Select an exercise by 0-based index.
    Jump(usize),
}

/// Outcome of a tick or an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Not applicable in the current phase; nothing changed.
    Ignored,
    Changed,
    /// The session just reached `done`. Emitted once per session.
    Finished(SessionSummary),
}

impl Step {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Step::Ignored)
    }
}

/// Drives one workout plan through its exercises, series and work/rest
/// intervals.
///
/// The player owns no timer: callers feed it one [`tick`](Self::tick) per
/// second while [`wants_ticks`](Self::wants_ticks) is true. Wall-clock time is
/// only read through the injected [`Clock`] for elapsed-time accounting.
#[derive(Debug)]
pub struct SessionPlayer<C: Clock = SystemClock> {
    session_id: Uuid,
    user_id: String,
    plan: Plan,

    index: usize,
    /// 1-based series number shown for the current exercise.
    series: u32,
    phase: Phase,
    running: bool,
    completed: Vec<u32>,

    started_at: Option<DateTime<Utc>>,
    paused_ms: i64,
    pause_started: Option<DateTime<Utc>>,
    finished: Option<(DateTime<Utc>, SummaryStatus)>,

    clock: C,
}

impl<C: Clock> SessionPlayer<C> {
    pub fn new(plan: Plan, clock: C) -> Result<Self, PlayerError> {
        plan.validate()?;

        let completed = vec![0; plan.exercises.len()];
        let mut player = Self {
            session_id: Uuid::new_v4(),
            user_id: String::new(),
            plan,
            index: 0,
            series: 1,
            phase: Phase::Idle,
            running: false,
            completed,
            started_at: None,
            paused_ms: 0,
            pause_started: None,
            finished: None,
            clock,
        };
        player.phase = player.initial_phase(0);

        debug!(
            "session {} created with {} exercises",
            player.session_id,
            player.plan.exercises.len()
        );
        Ok(player)
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    //
    // Reads
    //

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seconds_left(&self) -> u32 {
        self.phase.seconds_left()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_done()
    }

    /// Equals the plan length once the session is done.
    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_exercise(&self) -> Option<&PlanExercise> {
        self.plan.exercises.get(self.index)
    }

    pub fn next_exercise(&self) -> Option<&PlanExercise> {
        if self.is_done() {
            return None;
        }
        self.plan.exercises.get(self.index + 1)
    }

    pub fn series(&self) -> u32 {
        self.series
    }

    pub fn completed_series(&self) -> &[u32] {
        &self.completed
    }

    pub fn is_exercise_complete(&self, index: usize) -> bool {
        match (self.plan.exercises.get(index), self.completed.get(index)) {
            (Some(ex), Some(&done)) => done >= ex.series,
            _ => false,
        }
    }

    pub fn completed_exercises(&self) -> usize {
        (0..self.plan.exercises.len())
            .filter(|&i| self.is_exercise_complete(i))
            .count()
    }

    pub fn progress_percent(&self) -> u8 {
        if self.is_done() {
            return 100;
        }
        let total = self.plan.exercises.len() as f64;
        ((self.completed_exercises() as f64 / total) * 100.0).round() as u8
    }

    /// A tick source should exist exactly while this is true.
    pub fn wants_ticks(&self) -> bool {
        self.running && self.phase.is_counting()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Active (unpaused) time since the first start, in milliseconds.
    pub fn elapsed_active_ms(&self) -> i64 {
        let Some(start) = self.started_at else {
            return 0;
        };
        let end = match self.finished {
            Some((at, _)) => at,
            None => self.clock.now(),
        };
        let current_pause = self
            .pause_started
            .map(|p| (end - p).num_milliseconds())
            .unwrap_or(0);

        ((end - start).num_milliseconds() - self.paused_ms - current_pause).max(0)
    }

    pub fn elapsed_active_secs(&self) -> u64 {
        (self.elapsed_active_ms() as f64 / 1000.0).round() as u64
    }

    /// The summary, once the session is done.
    pub fn summary(&self) -> Option<SessionSummary> {
        self.finished
            .map(|(at, status)| self.build_summary(at, status))
    }

    //
    // Transitions
    //

    pub fn apply(&mut self, action: Action) -> Step {
        let step = match action {
            Action::Toggle => self.toggle(),
            Action::Skip => self.skip(),
            Action::Restart => self.restart(),
            Action::MarkDone => self.mark_done(),
            Action::FinishNow => self.finish_now(),
            Action::Jump(target) => self.jump(target),
        };

        if step.is_changed() {
            debug!(
                "{:?} -> exercise {} series {} phase {} ({}s) running={}",
                action,
                self.index,
                self.series,
                self.phase,
                self.seconds_left(),
                self.running
            );
        }
        step
    }

    /// One second of countdown.
    pub fn tick(&mut self) -> Step {
        if !self.wants_ticks() {
            return Step::Ignored;
        }

        match self.phase {
            Phase::Work { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining > 0 {
                    self.phase = Phase::Work { remaining };
                    return Step::Changed;
                }

                self.credit_series();
                let rest = self.plan.exercises[self.index].rest_secs;
                if rest > 0 && !self.is_last_series_of_plan() {
                    self.phase = Phase::Rest { remaining: rest };
                    debug!("work interval over, resting {}s", rest);
                    Step::Changed
                } else {
                    self.advance_after_interval()
                }
            }
            Phase::Rest { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining > 0 {
                    self.phase = Phase::Rest { remaining };
                    return Step::Changed;
                }
                self.advance_after_interval()
            }
            Phase::Idle | Phase::Done => Step::Ignored,
        }
    }

    fn toggle(&mut self) -> Step {
        if self.is_done() {
            return Step::Ignored;
        }

        if self.running {
            self.pause();
        } else {
            self.resume();
        }
        Step::Changed
    }

    fn skip(&mut self) -> Step {
        if self.is_done() {
            return Step::Ignored;
        }
        self.advance_exercise()
    }

    fn restart(&mut self) -> Step {
        if self.is_done() {
            return Step::Ignored;
        }
        self.series = self.next_series_number(self.index);
        self.phase = self.initial_phase(self.index);
        self.pause();
        Step::Changed
    }

    fn mark_done(&mut self) -> Step {
        if self.phase != Phase::Idle {
            return Step::Ignored;
        }
        let ex = &self.plan.exercises[self.index];
        if ex.kind != ExerciseKind::Repetition {
            return Step::Ignored;
        }
        let (total, rest) = (ex.series, ex.rest_secs);

        self.resume();
        self.credit_series();

        if self.completed[self.index] < total {
            if rest > 0 {
                self.phase = Phase::Rest { remaining: rest };
                Step::Changed
            } else {
                self.advance_after_interval()
            }
        } else {
            self.advance_exercise()
        }
    }

    fn finish_now(&mut self) -> Step {
        if self.is_done() {
            return Step::Ignored;
        }
        self.finish(SummaryStatus::Partial)
    }

    fn jump(&mut self, target: usize) -> Step {
        if self.is_done() || target >= self.plan.exercises.len() {
            return Step::Ignored;
        }

        self.index = target;
        self.series = self.next_series_number(target);
        self.phase = self.initial_phase(target);
        self.pause();
        Step::Changed
    }

    /// After a finished work or rest interval: next series of the same
    /// exercise, or the next exercise once all series are in.
    fn advance_after_interval(&mut self) -> Step {
        let total = self.plan.exercises[self.index].series;
        if self.completed[self.index] < total {
            self.series = self.next_series_number(self.index);
            self.phase = self.initial_phase(self.index);
            Step::Changed
        } else {
            self.advance_exercise()
        }
    }

    fn advance_exercise(&mut self) -> Step {
        let next = self.index + 1;
        if next >= self.plan.exercises.len() {
            return self.finish(SummaryStatus::Completed);
        }

        self.index = next;
        self.series = self.next_series_number(next);
        self.phase = self.initial_phase(next);
        Step::Changed
    }

    fn finish(&mut self, status: SummaryStatus) -> Step {
        let now = self.clock.now();
        if let Some(p) = self.pause_started.take() {
            self.paused_ms += (now - p).num_milliseconds().max(0);
        }

        self.running = false;
        self.index = self.plan.exercises.len();
        self.phase = Phase::Done;
        self.finished = Some((now, status));

        let summary = self.build_summary(now, status);
        debug!(
            "session {} {} after {}s, {}/{} exercises",
            self.session_id,
            status,
            summary.metrics.active_secs,
            summary.metrics.completed_exercises,
            summary.metrics.total_exercises
        );
        Step::Finished(summary)
    }

    //
    // Helpers
    //

    fn initial_phase(&self, index: usize) -> Phase {
        let ex = &self.plan.exercises[index];
        match ex.kind {
            ExerciseKind::Duration => Phase::Work {
                remaining: ex.work_secs(),
            },
            ExerciseKind::Repetition => Phase::Idle,
        }
    }

    fn next_series_number(&self, index: usize) -> u32 {
        (self.completed[index] + 1).min(self.plan.exercises[index].series)
    }

    fn credit_series(&mut self) {
        let total = self.plan.exercises[self.index].series;
        let done = &mut self.completed[self.index];
        *done = (*done + 1).min(total);
    }

    /// Nothing follows the interval that just ended.
    fn is_last_series_of_plan(&self) -> bool {
        self.index + 1 == self.plan.exercises.len()
            && self.completed[self.index] >= self.plan.exercises[self.index].series
    }

    fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if self.started_at.is_some() {
            self.pause_started = Some(self.clock.now());
        }
    }

    fn resume(&mut self) {
        if self.running {
            return;
        }
        let now = self.clock.now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if let Some(p) = self.pause_started.take() {
            self.paused_ms += (now - p).num_milliseconds().max(0);
        }
        self.running = true;
    }

    fn build_summary(&self, finished_at: DateTime<Utc>, status: SummaryStatus) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            user_id: self.user_id.clone(),
            plan: self.plan.to_wire(),
            metrics: SessionMetrics {
                estimated_minutes: self.plan.estimated_minutes,
                active_secs: self.elapsed_active_secs(),
                total_exercises: self.plan.exercises.len(),
                completed_exercises: self.completed_exercises(),
                status,
            },
            series_completed: self.completed.clone(),
            started_at: self.started_at.map(|t| t.timestamp_millis()),
            finished_at: finished_at.timestamp_millis(),
        }
    }
}
