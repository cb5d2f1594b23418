//! Logical countdown used for the rest period between sets.
//!
//! The clock holds no thread or timer of its own. The host calls
//! [`RestClock::tick`] once per second while [`RestClock::is_running`] is true.

use serde::{Deserialize, Serialize};

/// Result of a single [`RestClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock was not running; nothing changed.
    Idle,
    /// One second elapsed and the countdown continues.
    Running { time_left_secs: u32 },
    /// The countdown reached zero on this tick and stopped.
    Elapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestClock {
    #[serde(rename = "timeLeftSeconds")]
    time_left_secs: u32,
    #[serde(rename = "totalSeconds")]
    total_secs: u32,
    running: bool,
}

impl RestClock {
    /// A stopped clock with nothing on it.
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    #[must_use]
    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True once a started countdown has reached zero.
    #[must_use]
    pub fn has_elapsed(&self) -> bool {
        self.total_secs > 0 && self.time_left_secs == 0 && !self.running
    }

    pub fn start(&mut self, duration_secs: u32) {
        self.total_secs = duration_secs;
        self.time_left_secs = duration_secs;
        self.running = duration_secs > 0;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.time_left_secs == 0 {
            return TickOutcome::Idle;
        }
        self.time_left_secs -= 1;
        if self.time_left_secs == 0 {
            self.running = false;
            return TickOutcome::Elapsed;
        }
        TickOutcome::Running {
            time_left_secs: self.time_left_secs,
        }
    }

    /// Stops the countdown, keeping the remaining time.
    pub fn cancel(&mut self) {
        self.running = false;
    }

    /// Holds the countdown. Same effect as [`RestClock::cancel`], but the
    /// clock can be picked up again with [`RestClock::resume`].
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Continues a paused countdown. A clock with no time left stays stopped.
    pub fn resume(&mut self) -> bool {
        self.running = self.time_left_secs > 0;
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_sets_total_and_remaining() {
        let mut clock = RestClock::zeroed();
        clock.start(3);
        assert_eq!(clock.total_secs(), 3);
        assert_eq!(clock.time_left_secs(), 3);
        assert!(clock.is_running());
    }

    #[test]
    fn tick_counts_down_and_signals_elapsed_once() {
        let mut clock = RestClock::zeroed();
        clock.start(2);
        assert_eq!(clock.tick(), TickOutcome::Running { time_left_secs: 1 });
        assert_eq!(clock.tick(), TickOutcome::Elapsed);
        assert!(!clock.is_running());
        assert!(clock.has_elapsed());
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock.time_left_secs(), 0);
    }

    #[test]
    fn cancel_keeps_remaining_time() {
        let mut clock = RestClock::zeroed();
        clock.start(10);
        clock.tick();
        clock.cancel();
        assert!(!clock.is_running());
        assert_eq!(clock.time_left_secs(), 9);
        assert!(!clock.has_elapsed());
        assert_eq!(clock.tick(), TickOutcome::Idle);
    }

    #[test]
    fn tick_on_zeroed_clock_is_noop() {
        let mut clock = RestClock::zeroed();
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock, RestClock::zeroed());
    }

    #[test]
    fn serializes_with_record_field_names() {
        let mut clock = RestClock::zeroed();
        clock.start(180);
        let json = serde_json::to_value(clock).unwrap();
        assert_eq!(json["timeLeftSeconds"], 180);
        assert_eq!(json["totalSeconds"], 180);
        assert_eq!(json["running"], true);
    }

    #[test]
    fn pause_and_resume_keep_remaining_time() {
        let mut clock = RestClock::zeroed();
        clock.start(5);
        let _ = clock.tick();
        clock.pause();
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock.time_left_secs(), 4);

        assert!(clock.resume());
        assert_eq!(clock.tick(), TickOutcome::Running { time_left_secs: 3 });
    }

    #[test]
    fn resume_after_elapsed_stays_stopped() {
        let mut clock = RestClock::zeroed();
        clock.start(1);
        assert_eq!(clock.tick(), TickOutcome::Elapsed);
        assert!(!clock.resume());
        assert!(!clock.is_running());
    }
}
