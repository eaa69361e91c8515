//! `blindspot-config` — BlindSpot runtime configuration.
//!
//! Provides:
//! - Typed config schema (model provider, pipeline, uploads, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - `BLINDSPOT_*` environment overrides
//! - Default value application
//! - Validation that fails fast with a configuration error
//! - Config redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, invalid_overrides, process_env, resolve_env_vars, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use redact::redact;
pub use schema::{
    BlindSpotConfig, LoggingConfig, ModelConfig, PipelineConfig, ProviderKind, UploadConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use blindspot_core::BlindSpotError;

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at startup. Any failure
/// is a `Configuration` error: the service must not start with it.
pub async fn load_and_prepare(path: &Path) -> Result<BlindSpotConfig, BlindSpotError> {
    let env = process_env();
    let raw = load_raw_config(path)
        .await
        .map_err(|e| BlindSpotError::Configuration(format!("{e:#}")))?;
    prepare(raw, &env)
}

/// The synchronous half of [`load_and_prepare`], with an explicit environment.
pub fn prepare(
    raw: serde_json::Value,
    env: &HashMap<String, String>,
) -> Result<BlindSpotConfig, BlindSpotError> {
    let (config, report) = inspect(raw, env)?;
    report.log();
    report.into_result()?;

    Ok(config)
}

/// Build the effective config and its validation report without failing on
/// validation errors. Only unreadable input is an error here.
pub fn inspect(
    raw: serde_json::Value,
    env: &HashMap<String, String>,
) -> Result<(BlindSpotConfig, ValidationReport), BlindSpotError> {
    let to_config_error = |e: anyhow::Error| BlindSpotError::Configuration(format!("{e:#}"));

    let value = resolve_env_vars(&raw, env).map_err(to_config_error)?;
    let config: BlindSpotConfig = serde_json::from_value(value)
        .context("Failed to deserialize config")
        .map_err(to_config_error)?;

    let config = apply_env_overrides(config, env);
    let config = apply_all_defaults(config, env);
    let mut report = validate(&config);
    report.warnings.extend(invalid_overrides(env));

    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn prepares_config_from_env_key() {
        let cfg = prepare(json!({}), &env(&[("GOOGLE_API_KEY", "AIza-from-env")])).unwrap();
        assert_eq!(cfg.model.api_key.as_deref(), Some("AIza-from-env"));
        assert_eq!(cfg.model.name.as_deref(), Some(defaults::DEFAULT_GEMINI_MODEL));
    }

    #[test]
    fn missing_credentials_fail_fast() {
        let err = prepare(json!({}), &HashMap::new()).unwrap_err();
        assert!(matches!(err, BlindSpotError::Configuration(_)));
    }

    #[test]
    fn unresolved_reference_is_a_configuration_error() {
        let raw = json!({ "model": { "apiKey": "${NOT_SET_ANYWHERE}" } });
        let err = prepare(raw, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("NOT_SET_ANYWHERE"));
    }

    #[test]
    fn mistyped_field_is_a_configuration_error() {
        let raw = json!({ "model": { "provider": "mock" }, "pipeline": { "maxHistory": "ten" } });
        let err = prepare(raw, &HashMap::new()).unwrap_err();
        assert!(matches!(err, BlindSpotError::Configuration(_)));
    }

    #[test]
    fn inspect_reports_instead_of_failing() {
        let (cfg, report) = inspect(json!({ "pipeline": { "maxAttempts": 0 } }), &HashMap::new()).unwrap();
        assert_eq!(cfg.pipeline.max_attempts, 0);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.path == "pipeline.maxAttempts"));
    }

    #[test]
    fn inspect_surfaces_ignored_overrides_as_warnings() {
        let raw = json!({ "model": { "provider": "mock" } });
        let (cfg, report) = inspect(raw, &env(&[("BLINDSPOT_MAX_HISTORY", "lots")])).unwrap();
        assert_eq!(cfg.pipeline.max_history, 10);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.path == "env.BLINDSPOT_MAX_HISTORY"));
    }

    #[tokio::test]
    async fn loads_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        tokio::fs::write(&path, "model:\n  provider: mock\npipeline:\n  maxAttempts: 2\n")
            .await
            .unwrap();

        let cfg = load_and_prepare(&path).await.unwrap();
        assert_eq!(cfg.model.provider, ProviderKind::Mock);
        assert_eq!(cfg.pipeline.max_attempts, 2);
    }
}
