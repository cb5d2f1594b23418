use std::sync::Arc;

use strength_core::model::{
    PlanId, SessionSettings, WorkoutPlan, builtin_catalog, starting_strength_plans,
};
use storage::repository::Storage;
use storage::slots::{self, CURRENT_PLAN};

use crate::Clock;
use crate::error::AppServicesError;
use crate::history_service::HistoryService;
use crate::sessions::{ObserverFactory, SessionService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    plans: Arc<Vec<WorkoutPlan>>,
    sessions: Arc<SessionService>,
    history: Arc<HistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or the built-in
    /// data fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, settings)
    }

    /// Build services over an in-memory store; nothing survives the process.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the built-in data fails to validate.
    pub fn in_memory(clock: Clock, settings: SessionSettings) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, settings)
    }

    fn from_storage(
        storage: Storage,
        clock: Clock,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let plans = starting_strength_plans()?;
        let catalog = builtin_catalog()?;
        let sessions = SessionService::new(Arc::clone(&storage.sessions), catalog, settings)
            .with_clock(clock);
        let history = HistoryService::new(Arc::clone(&storage.sessions));

        Ok(Self {
            storage,
            plans: Arc::new(plans),
            sessions: Arc::new(sessions),
            history: Arc::new(history),
        })
    }

    /// Attach an observer to every session bound from now on.
    #[must_use]
    pub fn with_session_observers(mut self, factory: ObserverFactory) -> Self {
        let sessions = (*self.sessions).clone().with_observer_factory(factory);
        self.sessions = Arc::new(sessions);
        self
    }

    #[must_use]
    pub fn plan(&self, id: &PlanId) -> Option<&WorkoutPlan> {
        self.plans.iter().find(|plan| plan.id() == id)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    /// Plan to train next: the one left unfinished, otherwise the day after
    /// the most recent workout, otherwise the first plan.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::History` if history cannot be read.
    pub async fn suggested_plan(&self) -> Result<&WorkoutPlan, AppServicesError> {
        let unfinished: Option<PlanId> =
            slots::read_json_lossy(self.storage.sessions.as_ref(), CURRENT_PLAN).await;
        if let Some(plan) = unfinished.as_ref().and_then(|id| self.plan(id)) {
            return Ok(plan);
        }

        let last = self.history.list().await?.pop();
        let next_index = last
            .and_then(|entry| self.plans.iter().position(|p| *p.id() == entry.plan_id))
            .map_or(0, |index| (index + 1) % self.plans.len());
        self.plans
            .get(next_index)
            .ok_or(AppServicesError::NoPlans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn suggests_first_plan_on_fresh_store() {
        let app = AppServices::in_memory(Clock::System, SessionSettings::default()).unwrap();
        let plan = app.suggested_plan().await.unwrap();
        assert_eq!(plan.id().as_str(), "day-a");
    }

    #[tokio::test]
    async fn suggests_unfinished_plan() {
        let app = AppServices::in_memory(Clock::System, SessionSettings::default()).unwrap();
        let day_b = app.plan(&PlanId::new("day-b")).unwrap().clone();
        app.sessions().bind_plan(day_b, None).await.unwrap();

        let plan = app.suggested_plan().await.unwrap();
        assert_eq!(plan.id().as_str(), "day-b");
    }
}
