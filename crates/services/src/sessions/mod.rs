mod controller;
mod observer;
mod progress;
mod service;

// Public API of the session subsystem.
pub use crate::error::SessionServiceError;
pub use controller::{AnswerOutcome, RedoToken, Transition, WorkoutSessionController};
pub use observer::{CompletionHandler, SessionObserver};
pub use progress::SessionProgress;
pub use service::{ObserverFactory, SessionService};
