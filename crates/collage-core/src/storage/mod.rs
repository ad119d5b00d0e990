//! Key-value persistence for editor state.
//!
//! The editor never touches a concrete backend directly. Everything it keeps
//! between runs goes through a [`StateStore`]: the persisted session, the
//! pending-import inbox and the external collection each live under their own
//! string key, serialized as JSON.

mod autosave;
mod file;
mod memory;
mod records;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_DELAY_MS};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::{
    CollectionItem, LayerRecord, SessionRecord, ViewportRecord, read_json, remove_collection_item,
};

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A string-keyed store of string values.
///
/// `get` yields `Ok(None)` for a missing key; `remove` of a missing key is
/// not an error.
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete the value under `key`.
    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;
}
