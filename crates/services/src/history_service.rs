use std::sync::Arc;

use strength_core::model::WorkoutHistoryEntry;
use storage::repository::SessionStore;
use storage::slots::{self, WORKOUT_HISTORY};

use crate::error::HistoryError;

/// Completed workouts, kept as one JSON array slot.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn SessionStore>,
}

impl HistoryService {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// All recorded workouts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the backend cannot be read.
    pub async fn list(&self) -> Result<Vec<WorkoutHistoryEntry>, HistoryError> {
        let entries = slots::read_json(self.store.as_ref(), WORKOUT_HISTORY).await?;
        Ok(entries.unwrap_or_default())
    }

    /// Append a completed workout.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the history cannot be read or written.
    pub async fn append(&self, entry: WorkoutHistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.list().await?;
        tracing::info!(
            plan_id = %entry.plan_id,
            total_reps = entry.total_reps(),
            "recording workout"
        );
        entries.push(entry);
        slots::write_json(self.store.as_ref(), WORKOUT_HISTORY, &entries).await?;
        Ok(())
    }

    /// Reps of the first logged set in the most recent workout that
    /// included `exercise_name`.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the backend cannot be read.
    pub async fn last_reps_for(&self, exercise_name: &str) -> Result<Option<u32>, HistoryError> {
        let entries = self.list().await?;
        Ok(entries.iter().rev().find_map(|entry| {
            entry
                .exercises
                .iter()
                .find(|exercise| exercise.name == exercise_name)
                .and_then(|exercise| exercise.sets.first())
                .map(|set| set.reps)
        }))
    }

    /// Weight of the first weighed set of `exercise_name` in the most recent
    /// workout that logged one.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the backend cannot be read.
    pub async fn last_weight_for(&self, exercise_name: &str) -> Result<Option<f64>, HistoryError> {
        let entries = self.list().await?;
        Ok(entries.iter().rev().find_map(|entry| {
            entry
                .exercises
                .iter()
                .filter(|exercise| exercise.name == exercise_name)
                .flat_map(|exercise| exercise.sets.iter())
                .find_map(|set| set.weight)
        }))
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the backend cannot be written.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.store.delete(WORKOUT_HISTORY).await?;
        Ok(())
    }
}
