//! Config defaults: serde field defaults plus provider-specific fill-ins.

use std::collections::HashMap;

use crate::schema::{BlindSpotConfig, ProviderKind};

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default OpenAI-compatible model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Model name reported by the scripted provider.
pub const DEFAULT_MOCK_MODEL: &str = "scripted";

/// Default max upload size: 16 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

pub fn temperature() -> f32 {
    0.2
}

pub fn max_tokens() -> u32 {
    512
}

pub fn timeout_secs() -> u64 {
    30
}

pub fn max_attempts() -> u32 {
    3
}

pub fn retry_delay_ms() -> u64 {
    1000
}

pub fn max_history() -> usize {
    10
}

pub fn allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg"].iter().map(|s| s.to_string()).collect()
}

pub fn max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

pub fn log_level() -> String {
    "info".to_string()
}

/// Env var conventionally holding the provider's API key.
pub fn api_key_env_var(provider: ProviderKind) -> Option<&'static str> {
    match provider {
        ProviderKind::Gemini => Some("GOOGLE_API_KEY"),
        ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
        ProviderKind::Mock => None,
    }
}

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: BlindSpotConfig, env: &HashMap<String, String>) -> BlindSpotConfig {
    let config = apply_model_name_default(config);
    apply_api_key_default(config, env)
}

/// Pick the provider's default model when none is configured.
fn apply_model_name_default(mut config: BlindSpotConfig) -> BlindSpotConfig {
    if config.model.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
        let name = match config.model.provider {
            ProviderKind::Gemini => DEFAULT_GEMINI_MODEL,
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL,
            ProviderKind::Mock => DEFAULT_MOCK_MODEL,
        };
        config.model.name = Some(name.to_string());
    }
    config
}

/// Fall back to the provider's conventional env var for the API key.
fn apply_api_key_default(
    mut config: BlindSpotConfig,
    env: &HashMap<String, String>,
) -> BlindSpotConfig {
    if config.model.api_key.is_none() {
        config.model.api_key = api_key_env_var(config.model.provider)
            .and_then(|var| env.get(var))
            .filter(|v| !v.is_empty())
            .cloned();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_gemini_model_and_key() {
        let env = HashMap::from([("GOOGLE_API_KEY".to_string(), "AIza-test".to_string())]);
        let cfg = apply_all_defaults(BlindSpotConfig::default(), &env);
        assert_eq!(cfg.model.name.as_deref(), Some(DEFAULT_GEMINI_MODEL));
        assert_eq!(cfg.model.api_key.as_deref(), Some("AIza-test"));
    }

    #[test]
    fn does_not_override_user_set_values() {
        let mut cfg = BlindSpotConfig::default();
        cfg.model.provider = ProviderKind::OpenAi;
        cfg.model.name = Some("gpt-4o".into());
        cfg.model.api_key = Some("sk-configured".into());
        let env = HashMap::from([("OPENAI_API_KEY".to_string(), "sk-env".to_string())]);

        let cfg = apply_all_defaults(cfg, &env);
        assert_eq!(cfg.model.name.as_deref(), Some("gpt-4o"));
        assert_eq!(cfg.model.api_key.as_deref(), Some("sk-configured"));
    }

    #[test]
    fn mock_provider_needs_no_key() {
        let mut cfg = BlindSpotConfig::default();
        cfg.model.provider = ProviderKind::Mock;
        let cfg = apply_all_defaults(cfg, &HashMap::new());
        assert_eq!(cfg.model.name.as_deref(), Some(DEFAULT_MOCK_MODEL));
        assert!(cfg.model.api_key.is_none());
    }
}
