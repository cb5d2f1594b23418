use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("rest duration must be > 0 seconds")]
    InvalidRestSeconds,

    #[error("redo delay must be at most 60 seconds, got {0}")]
    InvalidRedoDelay(u32),
}

/// Tunables for a workout session.
///
/// Defaults: 180 s rest, 2 s redo delay, a set needs at least one rep,
/// and unparseable rep targets fall back to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    rest_secs: u32,
    redo_delay_secs: u32,
    require_reps_to_complete: bool,
    fallback_reps: u32,
}

impl SessionSettings {
    pub const DEFAULT_REST_SECS: u32 = 180;
    pub const DEFAULT_REDO_DELAY_SECS: u32 = 2;
    const MAX_REDO_DELAY_SECS: u32 = 60;

    /// Creates custom session settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidRestSeconds` for a zero rest period and
    /// `SettingsError::InvalidRedoDelay` for a redo delay above one minute.
    pub fn new(
        rest_secs: u32,
        redo_delay_secs: u32,
        require_reps_to_complete: bool,
        fallback_reps: u32,
    ) -> Result<Self, SettingsError> {
        if rest_secs == 0 {
            return Err(SettingsError::InvalidRestSeconds);
        }
        if redo_delay_secs > Self::MAX_REDO_DELAY_SECS {
            return Err(SettingsError::InvalidRedoDelay(redo_delay_secs));
        }
        Ok(Self {
            rest_secs,
            redo_delay_secs,
            require_reps_to_complete,
            fallback_reps,
        })
    }

    #[must_use]
    pub fn rest_secs(&self) -> u32 {
        self.rest_secs
    }

    #[must_use]
    pub fn redo_delay_secs(&self) -> u32 {
        self.redo_delay_secs
    }

    #[must_use]
    pub fn redo_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.redo_delay_secs))
    }

    #[must_use]
    pub fn require_reps_to_complete(&self) -> bool {
        self.require_reps_to_complete
    }

    #[must_use]
    pub fn fallback_reps(&self) -> u32 {
        self.fallback_reps
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rest_secs: Self::DEFAULT_REST_SECS,
            redo_delay_secs: Self::DEFAULT_REDO_DELAY_SECS,
            require_reps_to_complete: true,
            fallback_reps: 0,
        }
    }
}
