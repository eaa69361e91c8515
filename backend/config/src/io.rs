//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the BlindSpot config directory.
/// Priority: `BLINDSPOT_CONFIG_DIR` env > `~/.blindspot/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BLINDSPOT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".blindspot"))
        .unwrap_or_else(|| PathBuf::from(".blindspot"))
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped value tree.
///
/// Returns an empty object if the file doesn't exist (first run), so every
/// section falls back to its defaults.
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = if raw.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?
    };

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}
