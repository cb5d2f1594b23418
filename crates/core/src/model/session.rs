use serde::{Deserialize, Serialize};

use crate::model::ids::PlanId;
use crate::model::plan::WorkoutPlan;
use crate::model::question::Question;
use crate::rest_clock::RestClock;

/// Mode of the workout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// Entering reps for the current set.
    Input,
    /// Rest period with a knowledge check.
    Resting,
    /// All sets of all exercises are done.
    Complete,
}

/// Reps and weight recorded for a finished set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLog {
    pub exercise_index: usize,
    pub set_number: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Position of the user inside a bound plan.
///
/// Fields are public so the record can travel through storage and UI layers
/// as plain data; only the session controller mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub plan_id: PlanId,
    pub exercise_index: usize,
    pub set_number: u32,
    pub phase: SessionPhase,
    pub reps_entered: u32,
    /// Bar weight in pounds for the current exercise. Kept across its sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_entered: Option<f64>,
    pub clock: RestClock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<bool>,
    pub can_advance: bool,
    #[serde(default)]
    pub logged_sets: Vec<SetLog>,
}

impl SessionRecord {
    /// Start-of-workout record for `plan`.
    #[must_use]
    pub fn fresh(plan_id: PlanId, starting_reps: u32) -> Self {
        Self {
            plan_id,
            exercise_index: 0,
            set_number: 1,
            phase: SessionPhase::Input,
            reps_entered: starting_reps,
            weight_entered: None,
            clock: RestClock::zeroed(),
            question: None,
            answer: None,
            can_advance: false,
            logged_sets: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    /// True when the answer given for the current question was correct.
    #[must_use]
    pub fn answered_correctly(&self) -> Option<bool> {
        match (&self.question, self.answer) {
            (Some(question), Some(answer)) => Some(question.is_correct(answer)),
            _ => None,
        }
    }

    /// Checks that the record is a plausible position inside `plan` and that
    /// an open progression gate is backed by a correct answer or an elapsed
    /// rest.
    ///
    /// A record that fails this check is treated as absent by the controller.
    #[must_use]
    pub fn fits_plan(&self, plan: &WorkoutPlan) -> bool {
        if &self.plan_id != plan.id() || self.set_number == 0 {
            return false;
        }
        if !self.weight_entered.is_none_or(is_valid_weight) {
            return false;
        }
        if self.phase == SessionPhase::Complete {
            return true;
        }
        let Some(exercise) = plan.exercise(self.exercise_index) else {
            return false;
        };
        if self.set_number > exercise.target_sets() {
            return false;
        }
        match self.phase {
            SessionPhase::Resting => {
                self.question.is_some()
                    && (!self.can_advance
                        || self.answered_correctly() == Some(true)
                        || self.clock.has_elapsed())
            }
            SessionPhase::Input => {
                self.question.is_none() && self.answer.is_none() && !self.can_advance
            }
            SessionPhase::Complete => true,
        }
    }
}

/// A bar weight must be a finite, non-negative number of pounds.
#[must_use]
pub fn is_valid_weight(lbs: f64) -> bool {
    lbs.is_finite() && lbs >= 0.0
}
