//! Well-known slot keys and typed JSON access on top of [`SessionStore`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::{SessionStore, StorageError};

pub const CURRENT_SESSION: &str = "current-session";
pub const USED_QUESTION_IDS: &str = "used-question-ids";
pub const WORKOUT_HISTORY: &str = "workout-history";
pub const CURRENT_PLAN: &str = "current-plan";

/// Read and decode a slot.
///
/// A value that does not decode into `T` is reported as absent, the same as
/// a missing key.
///
/// # Errors
///
/// Returns `StorageError` only when the backend itself fails.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!(key, error = %err, "stored value has unexpected shape; ignoring");
            Ok(None)
        }
    }
}

/// Like [`read_json`], but backend failures also degrade to absent.
pub async fn read_json_lossy<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    match read_json(store, key).await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read slot; treating as absent");
            None
        }
    }
}

/// Encode and write a slot.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails, or the backend error.
pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn SessionStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw =
        serde_json::to_string(value).map_err(|err| StorageError::Serialization(err.to_string()))?;
    store.put(key, &raw).await
}
