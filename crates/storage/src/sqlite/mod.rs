//! `SQLite` backing for the slot store: one `kv_store` table keyed by slot name.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod kv_repo;
mod migrate;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("invalid sqlite url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Slot store over a single pooled connection, so slot writes never race.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database at `url`, creating the file and slot table when
    /// they are missing.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::InvalidUrl` when `url` is not a `SQLite`
    /// url, and `SqliteInitError::Sqlx` when connecting or migrating fails.
    pub async fn open(url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|source| SqliteInitError::InvalidUrl {
                url: url.to_owned(),
                source,
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;
        migrate::run_migrations(&pool).await?;
        tracing::debug!(url, "slot store ready");

        Ok(Self { pool })
    }
}

impl Storage {
    /// Slot storage in the `SQLite` database at `url`.
    ///
    /// # Errors
    ///
    /// See [`SqliteStore::open`].
    pub async fn sqlite(url: &str) -> Result<Self, SqliteInitError> {
        let store = SqliteStore::open(url).await?;
        Ok(Self {
            sessions: Arc::new(store),
        })
    }
}
