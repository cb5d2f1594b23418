use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::PlanId;
use crate::model::plan::WorkoutPlan;
use crate::model::session::SetLog;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub reps: u32,
    /// Bar weight in pounds, when one was entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistory {
    pub name: String,
    pub sets: Vec<LoggedSet>,
}

/// One finished workout, as written to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutHistoryEntry {
    pub completed_at: DateTime<Utc>,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub exercises: Vec<ExerciseHistory>,
}

impl WorkoutHistoryEntry {
    /// Groups the logged sets of a finished session by exercise, in plan order.
    #[must_use]
    pub fn from_sets(plan: &WorkoutPlan, sets: &[SetLog], completed_at: DateTime<Utc>) -> Self {
        let exercises = plan
            .exercises()
            .iter()
            .enumerate()
            .map(|(index, exercise)| ExerciseHistory {
                name: exercise.name().to_owned(),
                sets: sets
                    .iter()
                    .filter(|log| log.exercise_index == index)
                    .map(|log| LoggedSet {
                        reps: log.reps,
                        weight: log.weight,
                    })
                    .collect(),
            })
            .collect();

        Self {
            completed_at,
            plan_id: plan.id().clone(),
            plan_name: plan.name().to_owned(),
            exercises,
        }
    }

    #[must_use]
    pub fn total_reps(&self) -> u64 {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .map(|s| u64::from(s.reps))
            .sum()
    }
}
