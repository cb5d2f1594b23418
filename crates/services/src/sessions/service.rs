use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use strength_core::model::{
    QuestionCatalog, QuestionId, SessionRecord, SessionSettings, WorkoutHistoryEntry, WorkoutPlan,
};
use strength_core::{Clock, TickOutcome};
use storage::repository::SessionStore;
use storage::slots::{self, CURRENT_PLAN, CURRENT_SESSION, USED_QUESTION_IDS};

use super::controller::{AnswerOutcome, RedoToken, Transition, WorkoutSessionController};
use super::observer::{CompletionHandler, SessionObserver};
use super::progress::SessionProgress;
use crate::error::SessionServiceError;
use crate::history_service::HistoryService;
use crate::question_pool::QuestionPool;

/// Builds a fresh observer for every bound session.
pub type ObserverFactory = Arc<dyn Fn() -> Box<dyn SessionObserver> + Send + Sync>;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Inner {
    generation: u64,
    active: Option<Active>,
}

/// The bound controller, tagged with the generation that created it.
/// Redo timers carry the generation and die quietly once it changes.
struct Active {
    generation: u64,
    controller: WorkoutSessionController,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Host-facing session orchestration.
///
/// Wraps one [`WorkoutSessionController`] behind an async mutex, persists
/// the record and used question ids after every change, and runs the
/// delayed redo after a wrong answer. Calls made while no plan is bound are
/// ignored.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    catalog: QuestionCatalog,
    settings: SessionSettings,
    history: HistoryService,
    clock: Clock,
    seed: Option<u64>,
    observers: Option<ObserverFactory>,
    state: Arc<Mutex<Inner>>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: QuestionCatalog,
        settings: SessionSettings,
    ) -> Self {
        let history = HistoryService::new(Arc::clone(&store));
        Self {
            store,
            catalog,
            settings,
            history,
            clock: Clock::System,
            seed: None,
            observers: None,
            state: Arc::new(Mutex::new(Inner::default())),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Seeds question selection so draws are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_observer_factory(mut self, factory: ObserverFactory) -> Self {
        self.observers = Some(factory);
        self
    }

    /// Binds `plan`, resuming the stored session when it belongs to it.
    ///
    /// Any previously bound session is dropped along with its pending redo
    /// timer. A stored record for another plan is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the initial state cannot be written.
    pub async fn bind_plan(
        &self,
        plan: WorkoutPlan,
        on_complete: Option<CompletionHandler>,
    ) -> Result<SessionRecord, SessionServiceError> {
        // Held across the slot reads so an older session's redo cannot
        // write in between.
        let mut inner = self.state.lock().await;
        let stored: Option<SessionRecord> =
            slots::read_json_lossy(self.store.as_ref(), CURRENT_SESSION).await;
        let used: Option<Vec<QuestionId>> =
            slots::read_json_lossy(self.store.as_ref(), USED_QUESTION_IDS).await;

        let pool = match self.seed {
            Some(seed) => QuestionPool::with_seed(self.catalog.clone(), seed),
            None => QuestionPool::new(self.catalog.clone()),
        }
        .with_used(used.unwrap_or_default());

        let mut controller =
            WorkoutSessionController::new(plan, pool, self.settings).with_stored_record(stored);
        if let Some(handler) = on_complete {
            controller = controller.with_completion_handler(handler);
        }
        if let Some(factory) = &self.observers {
            controller = controller.with_observer(factory());
        }

        let record = controller.record().clone();
        let used = controller.used_question_ids();
        let plan_id = controller.plan().id().clone();
        let pending = controller.pending_redo();

        inner.generation += 1;
        let generation = inner.generation;
        inner.active = Some(Active {
            generation,
            controller,
        });

        tracing::info!(
            plan_id = %plan_id,
            exercise_index = record.exercise_index,
            set_number = record.set_number,
            phase = ?record.phase,
            "plan bound"
        );
        self.persist(&record, &used).await?;
        slots::write_json(self.store.as_ref(), CURRENT_PLAN, &plan_id).await?;
        drop(inner);

        if let Some(token) = pending {
            self.schedule_redo(generation, token, self.settings.redo_delay());
        }
        Ok(record)
    }

    /// The record of the bound session.
    pub async fn snapshot(&self) -> Option<SessionRecord> {
        let inner = self.state.lock().await;
        inner
            .active
            .as_ref()
            .map(|active| active.controller.record().clone())
    }

    pub async fn progress(&self) -> Option<SessionProgress> {
        let inner = self.state.lock().await;
        inner
            .active
            .as_ref()
            .and_then(|active| active.controller.progress())
    }

    pub async fn used_question_ids(&self) -> Vec<QuestionId> {
        let inner = self.state.lock().await;
        inner
            .active
            .as_ref()
            .map(|active| active.controller.used_question_ids())
            .unwrap_or_default()
    }

    /// True while the bound session wants one tick per second.
    pub async fn needs_ticks(&self) -> bool {
        let inner = self.state.lock().await;
        inner
            .active
            .as_ref()
            .is_some_and(|active| active.controller.needs_ticks())
    }

    // ── transitions ────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn adjust_reps(&self, delta: i32) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(|c| c.adjust_reps(delta)).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// Sets the bar weight in pounds for the current exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn set_weight(&self, lbs: f64) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(|c| c.set_weight(lbs)).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn complete_set(&self) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(WorkoutSessionController::complete_set).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// Answers the current question. A wrong answer schedules the redo.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn answer_question(&self, answer: bool) -> Result<AnswerOutcome, SessionServiceError> {
        let Some((outcome, generation)) = self.apply(|c| c.answer_question(answer)).await? else {
            return Ok(AnswerOutcome::Ignored);
        };
        if let AnswerOutcome::Incorrect { redo, redo_after } = outcome {
            self.schedule_redo(generation, redo, redo_after);
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn redo_set(&self) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(WorkoutSessionController::redo_set).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn tick(&self) -> Result<TickOutcome, SessionServiceError> {
        let applied = self.apply(WorkoutSessionController::tick).await?;
        Ok(applied.map_or(TickOutcome::Idle, |(t, _)| t))
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn pause_rest(&self) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(WorkoutSessionController::pause_rest).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn resume_rest(&self) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(WorkoutSessionController::resume_rest).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the new state cannot be written.
    pub async fn advance_set(&self) -> Result<Transition, SessionServiceError> {
        let applied = self.apply(WorkoutSessionController::advance_set).await?;
        Ok(applied.map_or(Transition::Ignored, |(t, _)| t))
    }

    /// Finishes a completed workout: appends it to history, runs the
    /// completion handler and releases the session slots.
    ///
    /// Returns the history entry, or `None` if there was nothing to finish.
    /// When history cannot be written the session stays bound and complete,
    /// and the handler has not run.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError` if history or slots cannot be written.
    pub async fn complete_workout(
        &self,
    ) -> Result<Option<WorkoutHistoryEntry>, SessionServiceError> {
        let mut inner = self.state.lock().await;
        let entry = match inner.active.as_ref() {
            None => {
                tracing::debug!("complete_workout without a bound plan; ignoring");
                return Ok(None);
            }
            Some(active) if !active.controller.awaiting_completion() => return Ok(None),
            Some(active) => WorkoutHistoryEntry::from_sets(
                active.controller.plan(),
                &active.controller.record().logged_sets,
                self.clock.now(),
            ),
        };

        self.history.append(entry.clone()).await?;

        if let Some(mut active) = inner.active.take() {
            let _ = active.controller.complete_workout();
        }
        inner.generation += 1;

        self.store.delete(CURRENT_SESSION).await?;
        self.store.delete(CURRENT_PLAN).await?;
        Ok(Some(entry))
    }

    /// Drops the bound session and clears the session slots.
    /// History is kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if the slots cannot be deleted.
    pub async fn reset_progress(&self) -> Result<(), SessionServiceError> {
        let mut inner = self.state.lock().await;
        inner.generation += 1;
        inner.active = None;
        tracing::info!("session progress reset");

        self.store.delete(CURRENT_SESSION).await?;
        self.store.delete(USED_QUESTION_IDS).await?;
        self.store.delete(CURRENT_PLAN).await?;
        Ok(())
    }

    /// Recorded workouts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::History` if history cannot be read.
    pub async fn history(&self) -> Result<Vec<WorkoutHistoryEntry>, SessionServiceError> {
        Ok(self.history.list().await?)
    }

    // ── helpers ────────────────────────────────────────────────────────────

    /// Runs `op` on the bound controller and persists if anything changed.
    /// Returns `None` when no plan is bound.
    async fn apply<T, F>(&self, op: F) -> Result<Option<(T, u64)>, SessionServiceError>
    where
        F: FnOnce(&mut WorkoutSessionController) -> T + Send,
        T: Send,
    {
        let mut inner = self.state.lock().await;
        let Some(active) = inner.active.as_mut() else {
            tracing::debug!("no plan bound; ignoring transition");
            return Ok(None);
        };

        let before = active.controller.record().clone();
        let used_before = active.controller.used_question_ids();
        let outcome = op(&mut active.controller);
        let record = active.controller.record().clone();
        let used = active.controller.used_question_ids();
        let generation = active.generation;

        if record != before || used != used_before {
            self.persist(&record, &used).await?;
        }
        Ok(Some((outcome, generation)))
    }

    async fn persist(
        &self,
        record: &SessionRecord,
        used: &[QuestionId],
    ) -> Result<(), SessionServiceError> {
        slots::write_json(self.store.as_ref(), CURRENT_SESSION, record).await?;
        slots::write_json(self.store.as_ref(), USED_QUESTION_IDS, used).await?;
        Ok(())
    }

    fn schedule_redo(&self, generation: u64, token: RedoToken, delay: Duration) {
        tracing::debug!(?token, delay_ms = delay.as_millis(), "redo scheduled");
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = service.apply_scheduled_redo(generation, token).await {
                tracing::warn!(error = %err, "failed to persist redone set");
            }
        });
    }

    async fn apply_scheduled_redo(
        &self,
        generation: u64,
        token: RedoToken,
    ) -> Result<Transition, SessionServiceError> {
        let mut inner = self.state.lock().await;
        let Some(active) = inner
            .active
            .as_mut()
            .filter(|active| active.generation == generation)
        else {
            tracing::debug!(?token, "redo timer outlived its session");
            return Ok(Transition::Ignored);
        };

        let transition = active.controller.redo_set_if_pending(token);
        if transition.is_applied() {
            let record = active.controller.record().clone();
            let used = active.controller.used_question_ids();
            self.persist(&record, &used).await?;
        }
        Ok(transition)
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
