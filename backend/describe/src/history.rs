//! Bounded per-session history of past descriptions.

use std::collections::VecDeque;
use std::sync::Arc;

use blindspot_core::{DescriptionResult, HistoryEntry};
use tokio::sync::Mutex;

/// FIFO store of the most recent descriptions, capped at `capacity`.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry, evicting the oldest ones beyond capacity.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Owned copy of the entries, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Shared handle to one session's history.
///
/// The lock is only taken to snapshot or append, so model calls for the same
/// session may overlap while appends stay serialized.
#[derive(Debug, Clone)]
pub struct HistoryHandle {
    inner: Arc<Mutex<HistoryStore>>,
}

impl HistoryHandle {
    pub fn new(capacity: usize) -> Self {
        Self::from_store(HistoryStore::new(capacity))
    }

    pub fn from_store(store: HistoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn snapshot(&self) -> Vec<HistoryEntry> {
        self.inner.lock().await.snapshot()
    }

    pub async fn record(&self, result: &DescriptionResult, source_id: &str) {
        self.inner
            .lock()
            .await
            .append(HistoryEntry::new(result, source_id));
    }

    /// Append previously recorded entries, e.g. history loaded from disk.
    pub async fn extend(&self, entries: impl IntoIterator<Item = HistoryEntry>) {
        let mut store = self.inner.lock().await;
        for entry in entries {
            store.append(entry);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}
