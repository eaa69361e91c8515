//! BlindSpot runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional in the
//! file; missing values are filled by `defaults::apply_all_defaults`.

use std::path::PathBuf;
use std::time::Duration;

use blindspot_core::ImportanceRange;
use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for BlindSpot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindSpotConfig {
    /// Vision model provider and call settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Retry, history and scoring settings for the description pipeline
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Which uploads are accepted
    #[serde(default)]
    pub uploads: UploadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Which vision backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    /// In-process scripted replies; no network, no credentials.
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model identifier; defaults per provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// API key; falls back to the provider's conventional env var
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider endpoint (proxies, local gateways)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "defaults::temperature")]
    pub temperature: f32,

    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in seconds
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            name: None,
            api_key: None,
            base_url: None,
            temperature: defaults::temperature(),
            max_tokens: defaults::max_tokens(),
            timeout_secs: defaults::timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts, in milliseconds
    #[serde(default = "defaults::retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Number of past descriptions kept per session
    #[serde(default = "defaults::max_history")]
    pub max_history: usize,

    #[serde(default)]
    pub importance: ImportanceRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            retry_delay_ms: defaults::retry_delay_ms(),
            max_history: defaults::max_history(),
            importance: ImportanceRange::default(),
        }
    }
}

impl PipelineConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(default = "defaults::allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    #[serde(default = "defaults::max_upload_bytes")]
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: defaults::allowed_extensions(),
            max_bytes: defaults::max_upload_bytes(),
        }
    }
}

impl UploadConfig {
    /// Case-insensitive extension check on a file name.
    pub fn is_allowed(&self, file_name: &str) -> bool {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Level directive when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Emit JSON lines on the console instead of plain text
    #[serde(default)]
    pub json: bool,

    /// Directory for daily-rolling NDJSON logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            json: false,
            dir: None,
        }
    }
}
