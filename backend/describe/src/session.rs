//! Per-session history registry.
//!
//! Each session owns exactly one history; nothing is shared across sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::history::HistoryHandle;

pub type SessionId = String;

/// Creates histories at first use and hands out handles to them.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, HistoryHandle>>>,
    max_history: usize,
}

impl SessionRegistry {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_history,
        }
    }

    /// Handle for `session_id`, creating an empty history on first use.
    pub async fn get_or_create(&self, session_id: &str) -> HistoryHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return handle.clone();
        }

        let mut w = self.sessions.write().await;
        w.entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, capacity = self.max_history, "Created session history");
                HistoryHandle::new(self.max_history)
            })
            .clone()
    }

    pub async fn get(&self, session_id: &str) -> Option<HistoryHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Empty a session's history. Unknown sessions are a no-op.
    pub async fn clear(&self, session_id: &str) {
        if let Some(handle) = self.get(session_id).await {
            handle.clear().await;
        }
    }

    /// Drop a session entirely, e.g. when its connection closes.
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use blindspot_core::DescriptionResult;

    use super::*;

    fn result() -> DescriptionResult {
        DescriptionResult {
            description: "Curb 1 meter ahead.".into(),
            importance: 6,
        }
    }

    #[tokio::test]
    async fn same_id_shares_history() {
        let registry = SessionRegistry::new(10);
        registry.get_or_create("a").await.record(&result(), "x.jpg").await;
        assert_eq!(registry.get_or_create("a").await.len().await, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = SessionRegistry::new(10);
        registry.get_or_create("a").await.record(&result(), "x.jpg").await;
        assert!(registry.get_or_create("b").await.is_empty().await);
    }

    #[tokio::test]
    async fn clear_and_remove() {
        let registry = SessionRegistry::new(10);
        let handle = registry.get_or_create("a").await;
        handle.record(&result(), "x.jpg").await;

        registry.clear("a").await;
        registry.clear("a").await;
        registry.clear("missing").await;
        assert!(handle.is_empty().await);

        assert!(registry.remove("a").await);
        assert!(!registry.remove("a").await);
        assert!(registry.get("a").await.is_none());
        assert!(registry.is_empty().await);
    }
}
