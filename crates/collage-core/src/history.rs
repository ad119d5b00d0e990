//! Bounded undo history of full editor snapshots.

use crate::layer::Layer;
use crate::viewport::Viewport;
use std::collections::VecDeque;

/// Maximum number of undo states to keep.
pub const MAX_HISTORY: usize = 20;

/// Layers and viewport at a point in time.
///
/// Layers share their pixel buffers with the live state; buffers are never
/// mutated in place, so sharing them is a value copy.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    pub layers: Vec<Layer>,
    pub viewport: Viewport,
}

/// Undo stack. The oldest snapshot is evicted first when the limit is hit.
/// There is no redo.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<HistorySnapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(limit.min(MAX_HISTORY)),
            limit: limit.max(1),
        }
    }

    /// Push a snapshot, evicting the oldest on overflow.
    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
    }

    /// Remove and return the most recent snapshot.
    pub fn pop(&mut self) -> Option<HistorySnapshot> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty()
    }
}
