#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod history_service;
pub mod question_pool;
pub mod sessions;

pub use strength_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, HistoryError, SessionServiceError};
pub use history_service::HistoryService;
pub use question_pool::QuestionPool;

pub use sessions::{
    AnswerOutcome, CompletionHandler, ObserverFactory, RedoToken, SessionObserver,
    SessionProgress, SessionService, Transition, WorkoutSessionController,
};
