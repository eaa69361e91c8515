//! Session histories kept on disk between runs.
//!
//! One JSON file per session under `<config dir>/sessions/`, holding the
//! history entries oldest first.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blindspot_config::{config_dir, BlindSpotConfig};
use blindspot_core::HistoryEntry;
use blindspot_describe::{HistoryHandle, SessionRegistry};
use tracing::{debug, info};

pub struct SessionFiles {
    dir: PathBuf,
}

impl SessionFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn in_config_dir() -> Self {
        Self::new(config_dir().join("sessions"))
    }

    fn path(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id.len() <= 128
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            bail!("invalid session id '{session_id}': use letters, digits, '-' or '_'");
        }
        Ok(self.dir.join(format!("{session_id}.json")))
    }

    /// Handle for `session_id` in `registry`, seeded from its saved file.
    pub async fn load(&self, registry: &SessionRegistry, session_id: &str) -> Result<HistoryHandle> {
        let path = self.path(session_id)?;
        let handle = registry.get_or_create(session_id).await;

        if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let entries: Vec<HistoryEntry> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse session file {}", path.display()))?;
            debug!(session_id, entries = entries.len(), "Loaded session history");
            handle.extend(entries).await;
        }
        Ok(handle)
    }

    pub async fn save(&self, session_id: &str, history: &HistoryHandle) -> Result<()> {
        let path = self.path(session_id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let json = serde_json::to_string_pretty(&history.snapshot().await)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(session_id, path = %path.display(), "Saved session history");
        Ok(())
    }

    /// Empty the session's history and delete its file. Idempotent.
    pub async fn clear(&self, registry: &SessionRegistry, session_id: &str) -> Result<()> {
        let path = self.path(session_id)?;
        registry.clear(session_id).await;

        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// `clear-history`: forget everything a session has described.
pub async fn run_clear(config: &BlindSpotConfig, session_id: &str) -> Result<()> {
    let registry = SessionRegistry::new(config.pipeline.max_history);
    SessionFiles::in_config_dir().clear(&registry, session_id).await?;
    info!(session_id, "Session history cleared");
    println!("{}", serde_json::json!({ "message": "History cleared", "session": session_id }));
    Ok(())
}
