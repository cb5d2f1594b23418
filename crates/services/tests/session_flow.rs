use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use services::{
    AnswerOutcome, Clock, SessionObserver, SessionService, SessionServiceError, Transition,
};
use storage::repository::{InMemoryStore, SessionStore, StorageError};
use storage::slots::{self, CURRENT_PLAN, CURRENT_SESSION, USED_QUESTION_IDS, WORKOUT_HISTORY};
use strength_core::TickOutcome;
use strength_core::model::{
    ExerciseId, ExerciseSpec, PlanId, QuestionId, SessionPhase, SessionRecord, SessionSettings,
    WorkoutPlan, builtin_catalog,
};

fn plan(id: &str, sets: &[u32]) -> WorkoutPlan {
    let exercises = sets
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            ExerciseSpec::new(ExerciseId::new(format!("{id}-{i}")), format!("Lift {i}"), n, "5")
                .unwrap()
        })
        .collect();
    WorkoutPlan::new(PlanId::new(id), id.to_uppercase(), exercises).unwrap()
}

fn finished_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 18, 0, 0).unwrap()
}

fn service(store: &InMemoryStore) -> SessionService {
    SessionService::new(
        Arc::new(store.clone()),
        builtin_catalog().unwrap(),
        SessionSettings::default(),
    )
    .with_clock(Clock::fixed(finished_at()))
    .with_seed(11)
}

async fn correct_answer(svc: &SessionService) -> bool {
    svc.snapshot()
        .await
        .and_then(|r| r.question)
        .map(|q| q.correct_answer)
        .expect("question on screen")
}

#[tokio::test]
async fn full_workout_records_history_and_clears_slots() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    svc.bind_plan(
        plan("solo", &[2]),
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    )
    .await
    .unwrap();

    for _ in 0..2 {
        assert_eq!(svc.complete_set().await.unwrap(), Transition::Applied);
        let answer = correct_answer(&svc).await;
        assert_eq!(svc.answer_question(answer).await.unwrap(), AnswerOutcome::Correct);
        assert_eq!(svc.advance_set().await.unwrap(), Transition::Applied);
    }
    assert_eq!(
        svc.snapshot().await.map(|r| r.phase),
        Some(SessionPhase::Complete)
    );

    let entry = svc.complete_workout().await.unwrap().expect("history entry");
    assert_eq!(entry.plan_id, PlanId::new("solo"));
    assert_eq!(entry.completed_at, finished_at());
    assert_eq!(entry.total_reps(), 10);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(svc.complete_workout().await.unwrap().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(svc.history().await.unwrap(), vec![entry]);
    assert_eq!(store.get(CURRENT_SESSION).await.unwrap(), None);
    assert_eq!(store.get(CURRENT_PLAN).await.unwrap(), None);
    // Used questions carry over to the next workout.
    assert!(store.get(USED_QUESTION_IDS).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn wrong_answer_redoes_set_after_delay() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    svc.bind_plan(plan("solo", &[3]), None).await.unwrap();

    assert!(svc.complete_set().await.unwrap().is_applied());
    let wrong = !correct_answer(&svc).await;
    let outcome = svc.answer_question(wrong).await.unwrap();
    assert!(matches!(
        outcome,
        AnswerOutcome::Incorrect { redo_after, .. } if redo_after == Duration::from_secs(2)
    ));
    assert_eq!(svc.advance_set().await.unwrap(), Transition::Ignored);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        svc.snapshot().await.map(|r| r.phase),
        Some(SessionPhase::Resting)
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    let record = svc.snapshot().await.unwrap();
    assert_eq!(record.phase, SessionPhase::Input);
    assert_eq!(record.reps_entered, 0);
    assert_eq!(record.set_number, 1);
    assert!(record.question.is_none());

    let stored: SessionRecord = slots::read_json(&store, CURRENT_SESSION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
}

#[tokio::test(start_paused = true)]
async fn rebinding_invalidates_pending_redo_timer() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    svc.bind_plan(plan("solo", &[3]), None).await.unwrap();

    assert!(svc.complete_set().await.unwrap().is_applied());
    let wrong = !correct_answer(&svc).await;
    let _ = svc.answer_question(wrong).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    // Resumes the stored wrong answer and re-arms a fresh timer.
    svc.bind_plan(plan("solo", &[3]), None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        svc.snapshot().await.map(|r| r.phase),
        Some(SessionPhase::Resting)
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        svc.snapshot().await.map(|r| r.phase),
        Some(SessionPhase::Input)
    );
}

#[tokio::test(start_paused = true)]
async fn new_plan_discards_session_and_pending_redo() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    svc.bind_plan(plan("first", &[2, 2]), None).await.unwrap();

    assert!(svc.complete_set().await.unwrap().is_applied());
    let wrong = !correct_answer(&svc).await;
    let _ = svc.answer_question(wrong).await.unwrap();

    let record = svc.bind_plan(plan("second", &[4]), None).await.unwrap();
    assert_eq!(record.plan_id, PlanId::new("second"));
    assert_eq!(record.phase, SessionPhase::Input);
    assert_eq!(record.reps_entered, 5);

    assert_eq!(svc.adjust_reps(2).await.unwrap(), Transition::Applied);
    tokio::time::sleep(Duration::from_secs(5)).await;
    let record = svc.snapshot().await.unwrap();
    assert_eq!(record.reps_entered, 7);
    assert_eq!(record.phase, SessionPhase::Input);

    let current: Option<PlanId> = slots::read_json(&store, CURRENT_PLAN).await.unwrap();
    assert_eq!(current, Some(PlanId::new("second")));
}

#[tokio::test]
async fn resumes_stored_session_in_new_service() {
    let store = InMemoryStore::new();
    let first = service(&store);
    first.bind_plan(plan("solo", &[3]), None).await.unwrap();
    let _ = first.adjust_reps(1).await.unwrap();
    assert!(first.complete_set().await.unwrap().is_applied());
    let before = first.snapshot().await.unwrap();
    let used = first.used_question_ids().await;
    assert_eq!(used.len(), 1);

    let second = service(&store);
    let resumed = second.bind_plan(plan("solo", &[3]), None).await.unwrap();
    assert_eq!(resumed, before);
    assert_eq!(second.used_question_ids().await, used);
}

#[tokio::test]
async fn malformed_slots_start_fresh() {
    let store = InMemoryStore::new();
    store
        .put(CURRENT_SESSION, r#"{"workoutId":"solo","currentSet":2}"#)
        .await
        .unwrap();
    store.put(USED_QUESTION_IDS, "not json").await.unwrap();

    let svc = service(&store);
    let record = svc.bind_plan(plan("solo", &[3]), None).await.unwrap();
    assert_eq!(record, SessionRecord::fresh(PlanId::new("solo"), 5));
    assert!(svc.used_question_ids().await.is_empty());

    let stored: Vec<QuestionId> = slots::read_json(&store, USED_QUESTION_IDS)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn ticks_count_down_and_persist() {
    let store = InMemoryStore::new();
    let svc = SessionService::new(
        Arc::new(store.clone()),
        builtin_catalog().unwrap(),
        SessionSettings::new(2, 2, true, 0).unwrap(),
    );
    svc.bind_plan(plan("solo", &[2]), None).await.unwrap();
    assert_eq!(svc.tick().await.unwrap(), TickOutcome::Idle);
    assert!(!svc.needs_ticks().await);

    assert!(svc.complete_set().await.unwrap().is_applied());
    assert!(svc.needs_ticks().await);
    assert_eq!(
        svc.tick().await.unwrap(),
        TickOutcome::Running { time_left_secs: 1 }
    );
    let stored: SessionRecord = slots::read_json(&store, CURRENT_SESSION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.clock.time_left_secs(), 1);

    assert_eq!(svc.tick().await.unwrap(), TickOutcome::Elapsed);
    assert!(!svc.needs_ticks().await);
    assert_eq!(svc.advance_set().await.unwrap(), Transition::Applied);
    let progress = svc.progress().await.unwrap();
    assert_eq!(progress.set_number, 2);
    assert_eq!(progress.sets_logged, 1);
}

#[tokio::test]
async fn transitions_without_bound_plan_are_ignored() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    assert_eq!(svc.adjust_reps(1).await.unwrap(), Transition::Ignored);
    assert_eq!(svc.complete_set().await.unwrap(), Transition::Ignored);
    assert_eq!(svc.answer_question(true).await.unwrap(), AnswerOutcome::Ignored);
    assert_eq!(svc.tick().await.unwrap(), TickOutcome::Idle);
    assert!(svc.snapshot().await.is_none());
    assert_eq!(store.len().unwrap(), 0);
}

#[tokio::test]
async fn reset_progress_clears_session_slots_but_keeps_history() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    svc.bind_plan(plan("solo", &[1]), None).await.unwrap();
    assert!(svc.complete_set().await.unwrap().is_applied());
    let answer = correct_answer(&svc).await;
    let _ = svc.answer_question(answer).await.unwrap();
    assert!(svc.advance_set().await.unwrap().is_applied());
    assert!(svc.complete_workout().await.unwrap().is_some());

    svc.bind_plan(plan("solo", &[1]), None).await.unwrap();
    svc.reset_progress().await.unwrap();

    assert!(svc.snapshot().await.is_none());
    assert_eq!(store.get(CURRENT_SESSION).await.unwrap(), None);
    assert_eq!(store.get(USED_QUESTION_IDS).await.unwrap(), None);
    assert_eq!(svc.history().await.unwrap().len(), 1);
}

struct ReadOnlyStore;

#[async_trait]
impl SessionStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("read-only".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("read-only".into()))
    }
}

#[tokio::test]
async fn write_failures_surface_as_storage_errors() {
    let svc = SessionService::new(
        Arc::new(ReadOnlyStore),
        builtin_catalog().unwrap(),
        SessionSettings::default(),
    );
    let err = svc
        .bind_plan(plan("solo", &[1]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionServiceError::Storage(_)));

    // The session is bound in memory even though it could not be saved.
    assert_eq!(
        svc.adjust_reps(1).await.unwrap_err().to_string(),
        "connection error: read-only"
    );
    assert_eq!(svc.snapshot().await.map(|r| r.reps_entered), Some(6));
}

#[tokio::test]
async fn weight_is_persisted_and_logged_with_each_set() {
    let store = InMemoryStore::new();
    let svc = service(&store);
    svc.bind_plan(plan("solo", &[2]), None).await.unwrap();

    assert!(svc.set_weight(135.0).await.unwrap().is_applied());
    let stored: SessionRecord = slots::read_json(&store, CURRENT_SESSION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.weight_entered, Some(135.0));

    for _ in 0..2 {
        assert!(svc.complete_set().await.unwrap().is_applied());
        assert_eq!(svc.set_weight(140.0).await.unwrap(), Transition::Ignored);
        let answer = correct_answer(&svc).await;
        let _ = svc.answer_question(answer).await.unwrap();
        assert!(svc.advance_set().await.unwrap().is_applied());
    }

    let entry = svc.complete_workout().await.unwrap().expect("history entry");
    let weights: Vec<_> = entry.exercises[0].sets.iter().map(|s| s.weight).collect();
    assert_eq!(weights, vec![Some(135.0), Some(135.0)]);
}

/// Fails history writes while `reject` is set.
struct HistoryRejectingStore {
    inner: InMemoryStore,
    reject: Arc<AtomicBool>,
}

#[async_trait]
impl SessionStore for HistoryRejectingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == WORKOUT_HISTORY && self.reject.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk full".into()));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn failed_history_write_keeps_session_bound_and_handler_unfired() {
    let inner = InMemoryStore::new();
    let reject = Arc::new(AtomicBool::new(true));
    let store = HistoryRejectingStore {
        inner: inner.clone(),
        reject: Arc::clone(&reject),
    };
    let svc = SessionService::new(
        Arc::new(store),
        builtin_catalog().unwrap(),
        SessionSettings::default(),
    )
    .with_seed(11);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    svc.bind_plan(
        plan("solo", &[1]),
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    )
    .await
    .unwrap();

    assert!(svc.complete_set().await.unwrap().is_applied());
    let answer = correct_answer(&svc).await;
    let _ = svc.answer_question(answer).await.unwrap();
    assert!(svc.advance_set().await.unwrap().is_applied());

    let err = svc.complete_workout().await.unwrap_err();
    assert!(matches!(err, SessionServiceError::History(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        svc.snapshot().await.map(|r| r.phase),
        Some(SessionPhase::Complete)
    );
    assert!(inner.get(CURRENT_SESSION).await.unwrap().is_some());

    reject.store(false, Ordering::SeqCst);
    assert!(svc.complete_workout().await.unwrap().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(svc.snapshot().await.is_none());
    assert_eq!(svc.history().await.unwrap().len(), 1);
}

/// Returns what was stored, but only after `delay`.
struct SlowReadStore {
    inner: InMemoryStore,
    delay: Duration,
}

#[async_trait]
impl SessionStore for SlowReadStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self.inner.get(key).await?;
        tokio::time::sleep(self.delay).await;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

struct RedoCounter(Arc<AtomicUsize>);

impl SessionObserver for RedoCounter {
    fn set_redone(&mut self, _record: &SessionRecord) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn rebinding_while_redo_is_due_redoes_the_set_once() {
    let redos = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redos);
    let store = SlowReadStore {
        inner: InMemoryStore::new(),
        delay: Duration::from_secs(1),
    };
    let svc = SessionService::new(
        Arc::new(store),
        builtin_catalog().unwrap(),
        SessionSettings::default(),
    )
    .with_seed(11)
    .with_observer_factory(Arc::new(move || {
        Box::new(RedoCounter(Arc::clone(&counter))) as Box<dyn SessionObserver>
    }));
    svc.bind_plan(plan("solo", &[3]), None).await.unwrap();

    assert!(svc.complete_set().await.unwrap().is_applied());
    let wrong = !correct_answer(&svc).await;
    let _ = svc.answer_question(wrong).await.unwrap();

    // The first redo falls due while the rebind is still reading its slots.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    svc.bind_plan(plan("solo", &[3]), None).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(redos.load(Ordering::SeqCst), 1);
    assert_eq!(
        svc.snapshot().await.map(|r| r.phase),
        Some(SessionPhase::Input)
    );
}
