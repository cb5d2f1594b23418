use std::fmt;
use std::time::Duration;

use strength_core::TickOutcome;
use strength_core::model::{
    QuestionId, SessionPhase, SessionRecord, SessionSettings, SetLog, WorkoutPlan,
    is_valid_weight,
};

use super::observer::{CompletionHandler, SessionObserver};
use super::progress::SessionProgress;
use crate::question_pool::QuestionPool;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Whether a transition changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    Applied,
    /// Not valid in the current phase; the record is untouched.
    Ignored,
}

impl Transition {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Identifies one scheduled redo. A redo carrying a stale token is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RedoToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AnswerOutcome {
    /// The rest gate is open.
    Correct,
    /// The set must be redone once `redo_after` has passed.
    Incorrect {
        redo: RedoToken,
        redo_after: Duration,
    },
    Ignored,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// State machine driving one workout: reps entry, rest with a knowledge
/// check, and progression through sets and exercises.
///
/// The controller performs no I/O. Hosts persist [`Self::record`] and
/// [`Self::used_question_ids`] after each applied transition, call
/// [`Self::tick`] once per second while resting, and schedule
/// [`Self::redo_set_if_pending`] after a wrong answer.
pub struct WorkoutSessionController {
    plan: WorkoutPlan,
    settings: SessionSettings,
    record: SessionRecord,
    pool: QuestionPool,
    on_complete: Option<CompletionHandler>,
    observer: Option<Box<dyn SessionObserver>>,
    pending_redo: Option<RedoToken>,
    next_redo: u64,
    completion_notified: bool,
}

impl WorkoutSessionController {
    /// Creates a controller positioned at the start of `plan`.
    #[must_use]
    pub fn new(plan: WorkoutPlan, pool: QuestionPool, settings: SessionSettings) -> Self {
        let record = fresh_record(&plan, &settings);
        Self {
            plan,
            settings,
            record,
            pool,
            on_complete: None,
            observer: None,
            pending_redo: None,
            next_redo: 0,
            completion_notified: false,
        }
    }

    /// Resumes from a persisted record when it belongs to the bound plan.
    ///
    /// A record for another plan, or one that does not fit the plan's shape,
    /// is discarded and the fresh start is kept.
    #[must_use]
    pub fn with_stored_record(mut self, stored: Option<SessionRecord>) -> Self {
        match stored {
            Some(record) if record.fits_plan(&self.plan) => {
                tracing::debug!(
                    plan_id = %record.plan_id,
                    exercise_index = record.exercise_index,
                    set_number = record.set_number,
                    "resuming stored session"
                );
                self.record = record;
                // The redo timer did not survive the reload; re-arm it.
                if self.record.phase == SessionPhase::Resting
                    && self.record.answered_correctly() == Some(false)
                {
                    self.pending_redo = Some(self.next_redo_token());
                }
            }
            Some(record) => {
                tracing::info!(
                    stored_plan = %record.plan_id,
                    plan_id = %self.plan.id(),
                    "stored session does not match bound plan; starting fresh"
                );
            }
            None => {}
        }
        self
    }

    #[must_use]
    pub fn with_completion_handler(mut self, handler: CompletionHandler) -> Self {
        self.on_complete = Some(handler);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    // ── accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    #[must_use]
    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    #[must_use]
    pub fn used_question_ids(&self) -> Vec<QuestionId> {
        self.pool.used_ids()
    }

    #[must_use]
    pub fn pending_redo(&self) -> Option<RedoToken> {
        self.pending_redo
    }

    /// True once the workout is complete and the completion handler has not
    /// run yet.
    #[must_use]
    pub fn awaiting_completion(&self) -> bool {
        self.record.phase == SessionPhase::Complete && !self.completion_notified
    }

    /// True while the host should deliver one tick per second.
    #[must_use]
    pub fn needs_ticks(&self) -> bool {
        self.record.phase == SessionPhase::Resting && self.record.clock.is_running()
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        let exercise = self.plan.exercise(self.record.exercise_index)?;
        Some(SessionProgress {
            exercise_number: self.record.exercise_index + 1,
            exercise_count: self.plan.len(),
            exercise_name: exercise.name().to_owned(),
            set_number: self.record.set_number,
            target_sets: exercise.target_sets(),
            target_reps: exercise.target_reps().to_owned(),
            phase: self.record.phase,
            sets_logged: self.record.logged_sets.len(),
        })
    }

    // ── binding ────────────────────────────────────────────────────────────

    /// Binds another plan. A different plan id discards the whole record,
    /// including any running clock and pending redo.
    pub fn bind_plan(&mut self, plan: WorkoutPlan) -> Transition {
        if plan.id() == self.plan.id() {
            return Transition::Ignored;
        }
        tracing::info!(from = %self.plan.id(), to = %plan.id(), "binding new plan; discarding session");
        self.record = fresh_record(&plan, &self.settings);
        self.plan = plan;
        self.pending_redo = None;
        self.completion_notified = false;
        Transition::Applied
    }

    /// Starts the bound plan over and forgets which questions were used.
    pub fn reset_progress(&mut self) {
        self.record = fresh_record(&self.plan, &self.settings);
        self.pool.reset();
        self.pending_redo = None;
        self.completion_notified = false;
    }

    // ── transitions ────────────────────────────────────────────────────────

    pub fn adjust_reps(&mut self, delta: i32) -> Transition {
        if self.record.phase != SessionPhase::Input {
            return self.ignored("adjust_reps");
        }
        let next = (i64::from(self.record.reps_entered) + i64::from(delta)).max(0);
        self.record.reps_entered = u32::try_from(next).unwrap_or(u32::MAX);
        Transition::Applied
    }

    /// Sets the bar weight, in pounds, for the current exercise.
    pub fn set_weight(&mut self, lbs: f64) -> Transition {
        if self.record.phase != SessionPhase::Input || !is_valid_weight(lbs) {
            return self.ignored("set_weight");
        }
        self.record.weight_entered = Some(lbs);
        Transition::Applied
    }

    pub fn complete_set(&mut self) -> Transition {
        if self.record.phase != SessionPhase::Input {
            return self.ignored("complete_set");
        }
        if self.settings.require_reps_to_complete() && self.record.reps_entered == 0 {
            return self.ignored("complete_set");
        }

        let question = self.pool.draw();
        tracing::debug!(
            question_id = %question.id,
            exercise_index = self.record.exercise_index,
            set_number = self.record.set_number,
            reps = self.record.reps_entered,
            "set completed; resting"
        );
        self.record.clock.start(self.settings.rest_secs());
        self.record.question = Some(question);
        self.record.answer = None;
        self.record.can_advance = false;
        self.record.phase = SessionPhase::Resting;
        self.pending_redo = None;
        Transition::Applied
    }

    pub fn answer_question(&mut self, answer: bool) -> AnswerOutcome {
        if self.record.phase != SessionPhase::Resting || self.record.answer.is_some() {
            let _ = self.ignored("answer_question");
            return AnswerOutcome::Ignored;
        }
        let Some(question) = self.record.question.as_ref() else {
            let _ = self.ignored("answer_question");
            return AnswerOutcome::Ignored;
        };

        let correct = question.is_correct(answer);
        let id = question.id.clone();
        self.record.answer = Some(answer);
        self.pool.mark_used(&id);
        tracing::debug!(question_id = %id, correct, "question answered");

        if let Some(observer) = self.observer.as_mut() {
            observer.answered(&self.record, correct);
        }

        if correct {
            self.record.can_advance = true;
            return AnswerOutcome::Correct;
        }

        let redo = self.next_redo_token();
        self.pending_redo = Some(redo);
        AnswerOutcome::Incorrect {
            redo,
            redo_after: self.settings.redo_delay(),
        }
    }

    /// Throws away the current set after a wrong answer.
    pub fn redo_set(&mut self) -> Transition {
        if self.record.phase != SessionPhase::Resting
            || self.record.answered_correctly() != Some(false)
        {
            return self.ignored("redo_set");
        }

        self.record.phase = SessionPhase::Input;
        self.record.reps_entered = 0;
        self.record.question = None;
        self.record.answer = None;
        self.record.clock.cancel();
        self.record.can_advance = false;
        self.pending_redo = None;
        tracing::debug!(
            exercise_index = self.record.exercise_index,
            set_number = self.record.set_number,
            "set redone"
        );

        if let Some(observer) = self.observer.as_mut() {
            observer.set_redone(&self.record);
        }
        Transition::Applied
    }

    /// Redo fired by a timer; only the most recently scheduled token counts.
    pub fn redo_set_if_pending(&mut self, token: RedoToken) -> Transition {
        if self.pending_redo != Some(token) {
            tracing::debug!(?token, "stale redo ignored");
            return Transition::Ignored;
        }
        self.redo_set()
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.record.phase != SessionPhase::Resting {
            return TickOutcome::Idle;
        }
        let outcome = self.record.clock.tick();
        if outcome == TickOutcome::Elapsed {
            self.record.can_advance = true;
            tracing::debug!("rest elapsed; progression unlocked");
            if let Some(observer) = self.observer.as_mut() {
                observer.rest_elapsed(&self.record);
            }
        }
        outcome
    }

    pub fn pause_rest(&mut self) -> Transition {
        if self.record.phase != SessionPhase::Resting || !self.record.clock.is_running() {
            return self.ignored("pause_rest");
        }
        self.record.clock.pause();
        Transition::Applied
    }

    pub fn resume_rest(&mut self) -> Transition {
        if self.record.phase != SessionPhase::Resting
            || self.record.clock.is_running()
            || !self.record.clock.resume()
        {
            return self.ignored("resume_rest");
        }
        Transition::Applied
    }

    pub fn advance_set(&mut self) -> Transition {
        if self.record.phase != SessionPhase::Resting || !self.record.can_advance {
            return self.ignored("advance_set");
        }
        let index = self.record.exercise_index;
        let Some(exercise) = self.plan.exercise(index) else {
            return self.ignored("advance_set");
        };
        let finished_exercise = self.record.set_number >= exercise.target_sets();

        self.record.logged_sets.push(SetLog {
            exercise_index: index,
            set_number: self.record.set_number,
            reps: self.record.reps_entered,
            weight: self.record.weight_entered,
        });
        self.pending_redo = None;

        if finished_exercise {
            if self.plan.is_last_exercise(index) {
                self.record.phase = SessionPhase::Complete;
                self.record.clock.cancel();
                tracing::info!(plan_id = %self.plan.id(), "workout complete");
                return Transition::Applied;
            }
            self.record.exercise_index += 1;
            self.record.set_number = 1;
            self.record.weight_entered = None;
        } else {
            self.record.set_number += 1;
        }
        self.begin_input();
        Transition::Applied
    }

    /// Hands the finished workout to the host's completion handler, once.
    pub fn complete_workout(&mut self) -> Transition {
        if !self.awaiting_completion() {
            return self.ignored("complete_workout");
        }
        self.completion_notified = true;
        if let Some(handler) = self.on_complete.as_mut() {
            handler();
        }
        Transition::Applied
    }

    // ── helpers ────────────────────────────────────────────────────────────

    fn begin_input(&mut self) {
        self.record.phase = SessionPhase::Input;
        self.record.reps_entered =
            starting_reps(&self.plan, self.record.exercise_index, &self.settings);
        self.record.clock = strength_core::RestClock::zeroed();
        self.record.question = None;
        self.record.answer = None;
        self.record.can_advance = false;
    }

    fn next_redo_token(&mut self) -> RedoToken {
        self.next_redo += 1;
        RedoToken(self.next_redo)
    }

    fn ignored(&self, transition: &'static str) -> Transition {
        tracing::debug!(transition, phase = ?self.record.phase, "transition not valid now; ignoring");
        Transition::Ignored
    }
}

impl fmt::Debug for WorkoutSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkoutSessionController")
            .field("plan_id", self.plan.id())
            .field("record", &self.record)
            .field("pending_redo", &self.pending_redo)
            .field("completion_notified", &self.completion_notified)
            .finish_non_exhaustive()
    }
}

fn fresh_record(plan: &WorkoutPlan, settings: &SessionSettings) -> SessionRecord {
    SessionRecord::fresh(plan.id().clone(), starting_reps(plan, 0, settings))
}

fn starting_reps(plan: &WorkoutPlan, index: usize, settings: &SessionSettings) -> u32 {
    let Some(exercise) = plan.exercise(index) else {
        return settings.fallback_reps();
    };
    exercise.parsed_target_reps().unwrap_or_else(|| {
        tracing::warn!(
            exercise_id = %exercise.id(),
            target_reps = exercise.target_reps(),
            "rep target is not numeric; using fallback"
        );
        settings.fallback_reps()
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
