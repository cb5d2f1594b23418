#![forbid(unsafe_code)]
//! Domain types for the SecureStrength workout session engine.

pub mod model;
pub mod rest_clock;
pub mod time;

pub use rest_clock::{RestClock, TickOutcome};
pub use time::Clock;
