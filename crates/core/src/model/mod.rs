mod history;
mod ids;
mod plan;
mod question;
mod session;
mod settings;

pub use history::{ExerciseHistory, LoggedSet, WorkoutHistoryEntry};
pub use ids::{ExerciseId, PlanId, QuestionId};
pub use plan::{ExerciseSpec, PlanError, WorkoutPlan, starting_strength_plans};
pub use question::{CatalogError, Question, QuestionCatalog, builtin_catalog};
pub use session::{SessionPhase, SessionRecord, SetLog, is_valid_weight};
pub use settings::{SessionSettings, SettingsError};
