//! Config validation: deep checks with user-friendly error messages.
//!
//! Errors are fatal at startup; warnings are only logged.

use blindspot_core::BlindSpotError;
use thiserror::Error;

use crate::defaults::api_key_env_var;
use crate::schema::{BlindSpotConfig, ProviderKind};

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit every warning and error as a `tracing` event.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    /// Collapse the errors into one `Configuration` error.
    pub fn into_result(self) -> Result<(), BlindSpotError> {
        if self.is_valid() {
            return Ok(());
        }
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(BlindSpotError::Configuration(joined))
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &BlindSpotConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_model(config, &mut report);
    validate_pipeline(config, &mut report);
    validate_uploads(config, &mut report);
    report
}

fn validate_model(config: &BlindSpotConfig, report: &mut ValidationReport) {
    let model = &config.model;

    if model.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.error("model.name", "A model identifier is required");
    }

    if model.provider != ProviderKind::Mock
        && model.api_key.as_deref().map(str::is_empty).unwrap_or(true)
    {
        let hint = api_key_env_var(model.provider)
            .map(|var| format!(" (set model.apiKey or {var})"))
            .unwrap_or_default();
        report.error(
            "model.apiKey",
            format!("No API key configured for provider '{}'{hint}", model.provider.as_str()),
        );
    }

    if let Some(url) = &model.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("model.baseUrl", format!("'{url}' must be an http(s) URL"));
        }
    }

    if model.timeout_secs == 0 {
        report.error("model.timeoutSecs", "timeoutSecs must be > 0");
    }

    if !(0.0..=2.0).contains(&model.temperature) {
        report.warn(
            "model.temperature",
            format!("temperature {} is outside the usual 0.0-2.0 range", model.temperature),
        );
    }
}

fn validate_pipeline(config: &BlindSpotConfig, report: &mut ValidationReport) {
    let pipeline = &config.pipeline;

    if pipeline.max_attempts == 0 {
        report.error("pipeline.maxAttempts", "maxAttempts must be >= 1");
    }

    if pipeline.max_history == 0 {
        report.warn(
            "pipeline.maxHistory",
            "maxHistory is 0; prompts will never include previous descriptions",
        );
    }

    if pipeline.retry_delay_ms > 60_000 {
        report.warn(
            "pipeline.retryDelayMs",
            format!("retryDelayMs {} exceeds one minute", pipeline.retry_delay_ms),
        );
    }

    let range = pipeline.importance;
    if range.min == 0 || range.min > range.max {
        report.error(
            "pipeline.importance",
            format!("importance range {range} must satisfy 1 <= min <= max"),
        );
    }
}

fn validate_uploads(config: &BlindSpotConfig, report: &mut ValidationReport) {
    if config.uploads.allowed_extensions.is_empty() {
        report.error("uploads.allowedExtensions", "At least one extension is required");
    }
    if config.uploads.max_bytes == 0 {
        report.error("uploads.maxBytes", "maxBytes must be > 0");
    }
}
