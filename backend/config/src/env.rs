//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time
//!   (`$${VAR}` escapes to a literal `${VAR}`);
//! - well-known `BLINDSPOT_*` / provider variables that override file values.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::schema::{BlindSpotConfig, ProviderKind};
use crate::validation::ConfigValidationError;

/// A reference, optionally escaped with a leading `$`.
static ENV_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references in a config value tree.
///
/// Only string leaves are processed. Fails on the first reference whose
/// variable is unset or empty.
pub fn resolve_env_vars(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let replaced = ENV_REF_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[1];
        if caps[0].starts_with("$$") {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(replaced.into_owned())
}

/// Apply well-known environment overrides on top of the file config.
///
/// Unparseable values are skipped; [`invalid_overrides`] reports them.
pub fn apply_env_overrides(mut config: BlindSpotConfig, env: &HashMap<String, String>) -> BlindSpotConfig {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(provider) = get("BLINDSPOT_PROVIDER") {
        match provider.parse::<ProviderKind>() {
            Ok(kind) => config.model.provider = kind,
            Err(e) => debug!(error = %e, "Ignoring BLINDSPOT_PROVIDER"),
        }
    }
    let is_gemini = config.model.provider == ProviderKind::Gemini;
    if let Some(name) = get("BLINDSPOT_MODEL")
        .or_else(|| if is_gemini { get("GEMINI_MODEL_NAME") } else { None })
    {
        config.model.name = Some(name.to_string());
    }
    if let Some(attempts) = parse_override::<u32>(get("BLINDSPOT_MAX_ATTEMPTS"), "BLINDSPOT_MAX_ATTEMPTS") {
        config.pipeline.max_attempts = attempts;
    }
    if let Some(history) = parse_override::<usize>(get("BLINDSPOT_MAX_HISTORY"), "BLINDSPOT_MAX_HISTORY") {
        config.pipeline.max_history = history;
    }
    if let Some(secs) = parse_override::<u64>(get("BLINDSPOT_TIMEOUT_SECS"), "BLINDSPOT_TIMEOUT_SECS") {
        config.model.timeout_secs = secs;
    }
    if let Some(level) = get("BLINDSPOT_LOG") {
        config.logging.level = level.to_string();
    }

    config
}

fn parse_override<T: std::str::FromStr>(raw: Option<&str>, var: &str) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => {
            debug!(var, value = raw, "Applied env override");
            Some(v)
        }
        Err(_) => {
            debug!(var, value = raw, "Ignoring unparseable env override");
            None
        }
    }
}

/// Overrides that are set but could not be parsed, as config warnings.
pub fn invalid_overrides(env: &HashMap<String, String>) -> Vec<ConfigValidationError> {
    fn check<T: std::str::FromStr>(raw: Option<&String>) -> bool {
        raw.map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .is_some_and(|v| v.parse::<T>().is_err())
    }

    [
        ("BLINDSPOT_PROVIDER", check::<ProviderKind>(env.get("BLINDSPOT_PROVIDER"))),
        ("BLINDSPOT_MAX_ATTEMPTS", check::<u32>(env.get("BLINDSPOT_MAX_ATTEMPTS"))),
        ("BLINDSPOT_MAX_HISTORY", check::<usize>(env.get("BLINDSPOT_MAX_HISTORY"))),
        ("BLINDSPOT_TIMEOUT_SECS", check::<u64>(env.get("BLINDSPOT_TIMEOUT_SECS"))),
    ]
    .into_iter()
    .filter(|(_, invalid)| *invalid)
    .map(|(var, _)| ConfigValidationError {
        path: format!("env.{var}"),
        message: format!("Ignoring unparseable value '{}'", env[var].trim()),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"model": {"apiKey": "${GOOGLE_API_KEY}"}});
        let result = resolve_env_vars(&v, &env(&[("GOOGLE_API_KEY", "AIza-abc")])).unwrap();
        assert_eq!(result["model"]["apiKey"], "AIza-abc");
    }

    #[test]
    fn error_names_missing_var_and_path() {
        let v = json!({"model": {"apiKey": "${MISSING_KEY}"}});
        let err = resolve_env_vars(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_KEY"));
        assert!(err.contains("model.apiKey"));
    }

    #[test]
    fn escaped_reference_stays_literal() {
        let v = json!({"note": "use $${HOME_DIR} literally"});
        let result = resolve_env_vars(&v, &HashMap::new()).unwrap();
        assert_eq!(result["note"], "use ${HOME_DIR} literally");
    }

    #[test]
    fn overrides_apply_on_top_of_file_values() {
        let cfg = apply_env_overrides(
            BlindSpotConfig::default(),
            &env(&[
                ("BLINDSPOT_PROVIDER", "openai"),
                ("BLINDSPOT_MAX_HISTORY", "4"),
                ("BLINDSPOT_MAX_ATTEMPTS", "not-a-number"),
            ]),
        );
        assert_eq!(cfg.model.provider, ProviderKind::OpenAi);
        assert_eq!(cfg.pipeline.max_history, 4);
        assert_eq!(cfg.pipeline.max_attempts, 3);
    }

    #[test]
    fn unparseable_overrides_are_reported() {
        let issues = invalid_overrides(&env(&[
            ("BLINDSPOT_MAX_ATTEMPTS", "not-a-number"),
            ("BLINDSPOT_PROVIDER", "gemini"),
            ("BLINDSPOT_TIMEOUT_SECS", " "),
        ]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "env.BLINDSPOT_MAX_ATTEMPTS");
        assert!(issues[0].message.contains("not-a-number"));
    }

    #[test]
    fn gemini_model_name_env_only_applies_to_gemini() {
        let gemini = apply_env_overrides(
            BlindSpotConfig::default(),
            &env(&[("GEMINI_MODEL_NAME", "gemini-1.5-pro")]),
        );
        assert_eq!(gemini.model.name.as_deref(), Some("gemini-1.5-pro"));

        let openai = apply_env_overrides(
            BlindSpotConfig::default(),
            &env(&[("BLINDSPOT_PROVIDER", "openai"), ("GEMINI_MODEL_NAME", "gemini-1.5-pro")]),
        );
        assert!(openai.model.name.is_none());
    }
}
