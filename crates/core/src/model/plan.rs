use thiserror::Error;

use crate::model::ids::{ExerciseId, PlanId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("plan name cannot be empty")]
    EmptyName,

    #[error("plan must contain at least one exercise")]
    NoExercises,

    #[error("exercise {id} must have at least one set")]
    InvalidTargetSets { id: ExerciseId },
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// One exercise of a workout plan.
///
/// `target_reps` is kept textual because plans may describe ranges or
/// free-form targets; [`ExerciseSpec::parsed_target_reps`] extracts a number
/// when one is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseSpec {
    id: ExerciseId,
    name: String,
    target_sets: u32,
    target_reps: String,
}

impl ExerciseSpec {
    /// Creates an exercise.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTargetSets` if `target_sets` is zero.
    pub fn new(
        id: ExerciseId,
        name: impl Into<String>,
        target_sets: u32,
        target_reps: impl Into<String>,
    ) -> Result<Self, PlanError> {
        if target_sets == 0 {
            return Err(PlanError::InvalidTargetSets { id });
        }
        Ok(Self {
            id,
            name: name.into(),
            target_sets,
            target_reps: target_reps.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &ExerciseId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target_sets(&self) -> u32 {
        self.target_sets
    }

    #[must_use]
    pub fn target_reps(&self) -> &str {
        &self.target_reps
    }

    /// Leading integer of the rep target, if any.
    ///
    /// `"5"` and `"5-8"` both yield `Some(5)`; `"AMRAP"` yields `None`.
    #[must_use]
    pub fn parsed_target_reps(&self) -> Option<u32> {
        let trimmed = self.target_reps.trim_start();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        trimmed[..end].parse().ok()
    }
}

//
// ─── PLAN ──────────────────────────────────────────────────────────────────────
//

/// Immutable ordered list of exercises. Plans are compared by id only.
#[derive(Debug, Clone)]
pub struct WorkoutPlan {
    id: PlanId,
    name: String,
    exercises: Vec<ExerciseSpec>,
}

impl PartialEq for WorkoutPlan {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WorkoutPlan {}

impl WorkoutPlan {
    /// Creates a plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::EmptyName` for a blank name and
    /// `PlanError::NoExercises` when `exercises` is empty.
    pub fn new(
        id: PlanId,
        name: impl Into<String>,
        exercises: Vec<ExerciseSpec>,
    ) -> Result<Self, PlanError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanError::EmptyName);
        }
        if exercises.is_empty() {
            return Err(PlanError::NoExercises);
        }
        Ok(Self {
            id,
            name,
            exercises,
        })
    }

    #[must_use]
    pub fn id(&self) -> &PlanId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn exercises(&self) -> &[ExerciseSpec] {
        &self.exercises
    }

    #[must_use]
    pub fn exercise(&self, index: usize) -> Option<&ExerciseSpec> {
        self.exercises.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    #[must_use]
    pub fn is_last_exercise(&self, index: usize) -> bool {
        index + 1 >= self.exercises.len()
    }
}

//
// ─── BUILT-IN PLANS ────────────────────────────────────────────────────────────
//

fn five_by(id: &str, name: &str, sets: u32) -> Result<ExerciseSpec, PlanError> {
    ExerciseSpec::new(ExerciseId::new(id), name, sets, "5")
}

/// The two alternating Starting Strength days.
///
/// # Errors
///
/// Never fails for the built-in data; the `Result` keeps construction on the
/// validating path.
pub fn starting_strength_plans() -> Result<Vec<WorkoutPlan>, PlanError> {
    let day_a = WorkoutPlan::new(
        PlanId::new("day-a"),
        "Workout A",
        vec![
            five_by("squat-a", "Squat", 3)?,
            five_by("press-a", "Press", 3)?,
            five_by("deadlift-a", "Deadlift", 1)?,
        ],
    )?;
    let day_b = WorkoutPlan::new(
        PlanId::new("day-b"),
        "Workout B",
        vec![
            five_by("squat-b", "Squat", 3)?,
            five_by("bench-b", "Bench Press", 3)?,
            five_by("row-b", "Barbell Row", 3)?,
        ],
    )?;
    Ok(vec![day_a, day_b])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(reps: &str) -> ExerciseSpec {
        ExerciseSpec::new(ExerciseId::new("squat"), "Squat", 3, reps).unwrap()
    }

    #[test]
    fn parses_leading_integer_of_rep_target() {
        assert_eq!(exercise("5").parsed_target_reps(), Some(5));
        assert_eq!(exercise(" 8-12").parsed_target_reps(), Some(8));
        assert_eq!(exercise("AMRAP").parsed_target_reps(), None);
        assert_eq!(exercise("").parsed_target_reps(), None);
    }

    #[test]
    fn zero_sets_rejected() {
        let err = ExerciseSpec::new(ExerciseId::new("x"), "X", 0, "5").unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTargetSets {
                id: ExerciseId::new("x")
            }
        );
    }

    #[test]
    fn empty_plan_rejected() {
        let err = WorkoutPlan::new(PlanId::new("p"), "Plan", Vec::new()).unwrap_err();
        assert_eq!(err, PlanError::NoExercises);
    }

    #[test]
    fn plans_with_same_id_are_equal() {
        let short = WorkoutPlan::new(PlanId::new("p"), "Short", vec![exercise("5")]).unwrap();
        let long =
            WorkoutPlan::new(PlanId::new("p"), "Long", vec![exercise("5"), exercise("3")]).unwrap();
        let other = WorkoutPlan::new(PlanId::new("q"), "Short", vec![exercise("5")]).unwrap();
        assert_eq!(short, long);
        assert_ne!(short, other);
    }

    #[test]
    fn builtin_plans_match_program() {
        let plans = starting_strength_plans().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id().as_str(), "day-a");
        assert_eq!(plans[0].exercise(2).unwrap().target_sets(), 1);
        assert!(plans[1].is_last_exercise(2));
        assert!(!plans[1].is_last_exercise(1));
    }
}
