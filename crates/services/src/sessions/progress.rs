use strength_core::model::SessionPhase;

/// Aggregated view of session progress, useful for UI.
///
/// Numbers are 1-based, ready for "Exercise 2 of 3 · Set 1 of 3".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub exercise_number: usize,
    pub exercise_count: usize,
    pub exercise_name: String,
    pub set_number: u32,
    pub target_sets: u32,
    pub target_reps: String,
    pub phase: SessionPhase,
    pub sets_logged: usize,
}
