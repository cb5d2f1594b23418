#![forbid(unsafe_code)]
//! Key-value persistence for the workout session engine.

pub mod repository;
pub mod slots;
pub mod sqlite;

pub use repository::{InMemoryStore, SessionStore, Storage, StorageError};
