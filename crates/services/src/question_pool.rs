use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strength_core::model::{Question, QuestionCatalog, QuestionId};

/// Draws knowledge-check questions without repeats until the catalog is exhausted.
///
/// The used-id set belongs to this instance; callers persist it through
/// [`QuestionPool::used_ids`] and restore it with [`QuestionPool::with_used`].
pub struct QuestionPool {
    catalog: QuestionCatalog,
    used: HashSet<QuestionId>,
    rng: StdRng,
}

impl QuestionPool {
    #[must_use]
    pub fn new(catalog: QuestionCatalog) -> Self {
        Self::with_rng(catalog, StdRng::from_os_rng())
    }

    /// Deterministic pool for tests and replays.
    #[must_use]
    pub fn with_seed(catalog: QuestionCatalog, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: QuestionCatalog, rng: StdRng) -> Self {
        Self {
            catalog,
            used: HashSet::new(),
            rng,
        }
    }

    /// Restores a persisted used-id set. Ids missing from the catalog are dropped.
    #[must_use]
    pub fn with_used(mut self, ids: impl IntoIterator<Item = QuestionId>) -> Self {
        self.used = ids
            .into_iter()
            .filter(|id| self.catalog.contains(id))
            .collect();
        self
    }

    /// Picks a question uniformly from the ones not used in this cycle.
    ///
    /// When every question has been used, the cycle restarts: the used set is
    /// cleared and the pick comes from the whole catalog. That pick is not
    /// recorded in the fresh set, so it can come up again right away.
    pub fn draw(&mut self) -> Question {
        let available: Vec<&Question> = self
            .catalog
            .questions()
            .iter()
            .filter(|q| !self.used.contains(&q.id))
            .collect();

        if available.is_empty() {
            tracing::debug!(catalog = self.catalog.len(), "question pool exhausted; recycling");
            self.used.clear();
            let questions = self.catalog.questions();
            let index = self.rng.random_range(0..questions.len());
            return questions[index].clone();
        }

        let index = self.rng.random_range(0..available.len());
        let question = available[index].clone();
        self.used.insert(question.id.clone());
        question
    }

    pub fn mark_used(&mut self, id: &QuestionId) {
        if self.catalog.contains(id) {
            self.used.insert(id.clone());
        }
    }

    #[must_use]
    pub fn is_used(&self, id: &QuestionId) -> bool {
        self.used.contains(id)
    }

    /// Used ids in a stable order, ready to persist.
    #[must_use]
    pub fn used_ids(&self) -> Vec<QuestionId> {
        let mut ids: Vec<_> = self.used.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }
}
