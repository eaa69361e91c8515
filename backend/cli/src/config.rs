use std::path::{Path, PathBuf};

use anyhow::Result;
use blindspot_config::{
    config_dir, config_file_path, inspect, load_raw_config, process_env, BlindSpotConfig,
    ValidationReport,
};
use blindspot_logging::init_logger;
use tracing::info;

/// `--config` if given, otherwise the default file in the config directory.
pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| config_file_path(&config_dir()))
}

/// Load the config, install the logger it describes, then report and
/// enforce its validation result.
pub async fn load(path: &Path) -> Result<BlindSpotConfig> {
    let (config, report) = load_report(path).await?;
    report.into_result()?;

    info!(
        path = %path.display(),
        provider = config.model.provider.as_str(),
        model = config.model.name.as_deref().unwrap_or_default(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Like [`load`], but validation errors are only logged. For commands that
/// never call the model, such as `clear-history`.
pub async fn load_unchecked(path: &Path) -> Result<BlindSpotConfig> {
    Ok(load_report(path).await?.0)
}

async fn load_report(path: &Path) -> Result<(BlindSpotConfig, ValidationReport)> {
    let raw = load_raw_config(path).await?;
    let (config, report) = inspect(raw, &process_env())?;

    // Warnings must go through the configured subscriber.
    init_logger(&config.logging);
    report.log();
    Ok((config, report))
}
