use strength_core::model::SessionRecord;

/// Hook for side effects such as sound cues.
///
/// All methods default to no-ops so hosts only implement what they render.
pub trait SessionObserver: Send {
    /// The rest countdown reached zero on its own.
    fn rest_elapsed(&mut self, _record: &SessionRecord) {}

    /// The knowledge-check question was answered.
    fn answered(&mut self, _record: &SessionRecord, _correct: bool) {}

    /// A set was thrown away after a wrong answer.
    fn set_redone(&mut self, _record: &SessionRecord) {}
}

/// Zero-argument handler invoked once when the workout is completed.
pub type CompletionHandler = Box<dyn FnMut() + Send>;
