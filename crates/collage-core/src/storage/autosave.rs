//! Debounced persistence of the editing session.
//!
//! Every change reschedules the pending write, so only the last state of a
//! burst of edits reaches the store.

use super::records::SessionRecord;
use super::{StateStore, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default debounce delay in milliseconds.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 500;

/// Schedules and performs debounced session writes.
pub struct AutoSaveManager<S: StateStore + ?Sized> {
    store: Arc<S>,
    key: String,
    delay: Duration,
    /// When the pending write becomes due, if one is scheduled.
    deadline: Option<Instant>,
}

impl<S: StateStore + ?Sized> AutoSaveManager<S> {
    /// Create a manager writing the session under `key`.
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
            deadline: None,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a write `delay` after `now`, replacing any pending one.
    pub fn mark_dirty_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Schedule a write relative to the current time.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    /// Whether a write is scheduled.
    pub fn is_dirty(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the pending write is due at `now`.
    pub fn should_save_at(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Drop the pending write without performing it.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Write the session now, or clear it when there is nothing to keep.
    pub async fn save(&mut self, session: Option<&SessionRecord>) -> StorageResult<()> {
        match session.filter(|record| !record.layers.is_empty()) {
            Some(record) => {
                let json = record.to_json()?;
                log::debug!(
                    "Persisting session: {} layers ({} bytes)",
                    record.layers.len(),
                    json.len()
                );
                self.store.set(&self.key, json).await?;
            }
            None => {
                log::debug!("Session has no layers, clearing '{}'", self.key);
                self.store.remove(&self.key).await?;
            }
        }
        self.deadline = None;
        Ok(())
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
