//! `check-config`: show what the service would run with.

use std::path::Path;

use anyhow::{bail, Result};
use blindspot_config::{inspect, load_raw_config, process_env, redact, ValidationReport};
use serde_json::{json, Value};

pub async fn run(path: &Path) -> Result<()> {
    let raw = load_raw_config(path).await?;
    let (config, report) = inspect(raw, &process_env())?;

    let output = json!({
        "path": path.display().to_string(),
        "config": redact(&serde_json::to_value(&config)?),
        "valid": report.is_valid(),
        "errors": issues(&report, true),
        "warnings": issues(&report, false),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.is_valid() {
        bail!("configuration has {} error(s)", report.errors.len());
    }
    Ok(())
}

fn issues(report: &ValidationReport, errors: bool) -> Value {
    let list = if errors { &report.errors } else { &report.warnings };
    list.iter()
        .map(|issue| json!({ "path": issue.path, "message": issue.message }))
        .collect()
}
