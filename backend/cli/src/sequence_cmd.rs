use std::path::PathBuf;

use anyhow::Result;
use blindspot_config::BlindSpotConfig;
use blindspot_describe::{DescriptionPipeline, PipelineSettings, SessionRegistry};
use blindspot_understanding::build_provider;
use tracing::{info, warn};

use crate::upload::read_image;

/// Describe images in order through one fresh session and print the report.
pub async fn run(config: &BlindSpotConfig, paths: &[PathBuf]) -> Result<()> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match read_image(path, &config.uploads).await {
            Ok(image) => images.push(image),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping file"),
        }
    }
    info!(accepted = images.len(), given = paths.len(), "Processing sequence");

    let model = build_provider(&config.model)?;
    let pipeline = DescriptionPipeline::new(model, PipelineSettings::from_config(config));
    let sessions = SessionRegistry::new(config.pipeline.max_history);
    let history = sessions.get_or_create(&uuid::Uuid::new_v4().to_string()).await;

    let report = pipeline.process_sequence(images, &history).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
