use std::path::Path;

use anyhow::Result;
use blindspot_config::BlindSpotConfig;
use blindspot_core::PipelineOutcome;
use blindspot_describe::{DescriptionPipeline, ImageInput, PipelineSettings, SessionRegistry};
use blindspot_understanding::build_provider;
use tracing::info;

use crate::sessions::SessionFiles;
use crate::upload::read_image;

/// Describe one image and print the response JSON.
pub async fn run(config: &BlindSpotConfig, path: &Path, session: Option<String>) -> Result<()> {
    let image = read_image(path, &config.uploads).await?;

    let model = build_provider(&config.model)?;
    let pipeline = DescriptionPipeline::new(model, PipelineSettings::from_config(config));
    let sessions = SessionRegistry::new(config.pipeline.max_history);

    let outcome = describe(
        &pipeline,
        &sessions,
        &SessionFiles::in_config_dir(),
        session.as_deref(),
        image,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&outcome.to_response())?);
    Ok(())
}

/// Run one image through the pipeline.
///
/// A named session is loaded from disk first and saved again after a
/// success; without one the history lives only for this call.
pub async fn describe(
    pipeline: &DescriptionPipeline,
    sessions: &SessionRegistry,
    files: &SessionFiles,
    session: Option<&str>,
    image: ImageInput,
) -> Result<PipelineOutcome> {
    let Some(session_id) = session else {
        let history = sessions.get_or_create(&uuid::Uuid::new_v4().to_string()).await;
        return Ok(pipeline.process(image, &history).await);
    };

    let history = files.load(sessions, session_id).await?;
    info!(session_id, source_id = %image.source_id, "Describing image");

    let outcome = pipeline.process(image, &history).await;
    if outcome.is_success() {
        files.save(session_id, &history).await?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blindspot_understanding::MockVisionProvider;

    use super::*;

    const CROWD: &str = r#"{"description":"Crowd 5 meters ahead.","importance":5}"#;

    fn jpeg(name: &str) -> ImageInput {
        ImageInput::from_upload(vec![0xFF, 0xD8, 0xFF, 0xE0], name)
    }

    fn pipeline(mock: Arc<MockVisionProvider>) -> DescriptionPipeline {
        let settings = PipelineSettings {
            model: "scripted".into(),
            ..Default::default()
        };
        DescriptionPipeline::new(mock, settings)
    }

    #[tokio::test]
    async fn same_session_carries_history_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let files = SessionFiles::new(dir.path());
        let mock = Arc::new(MockVisionProvider::new("mock").with_response(CROWD));

        // Each run starts from a fresh registry, as separate processes do.
        for name in ["1.jpg", "2.jpg"] {
            let outcome = describe(
                &pipeline(mock.clone()),
                &SessionRegistry::new(10),
                &files,
                Some("walk"),
                jpeg(name),
            )
            .await
            .unwrap();
            assert!(outcome.is_success());
        }

        let prompts = mock.prompts();
        assert!(!prompts[0].contains("Previous description"));
        assert!(prompts[1].contains("Previous description 1: Crowd 5 meters ahead. (Importance: 5)"));
    }

    #[tokio::test]
    async fn cleared_session_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let files = SessionFiles::new(dir.path());
        let mock = Arc::new(MockVisionProvider::new("mock").with_response(CROWD));

        describe(&pipeline(mock.clone()), &SessionRegistry::new(10), &files, Some("walk"), jpeg("1.jpg"))
            .await
            .unwrap();
        files.clear(&SessionRegistry::new(10), "walk").await.unwrap();
        describe(&pipeline(mock.clone()), &SessionRegistry::new(10), &files, Some("walk"), jpeg("2.jpg"))
            .await
            .unwrap();

        assert!(!mock.prompts()[1].contains("Previous description"));
    }

    #[tokio::test]
    async fn anonymous_runs_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = SessionFiles::new(dir.path().join("sessions"));
        let mock = Arc::new(MockVisionProvider::new("mock").with_response(CROWD));

        describe(&pipeline(mock), &SessionRegistry::new(10), &files, None, jpeg("1.jpg"))
            .await
            .unwrap();

        assert!(!dir.path().join("sessions").exists());
    }
}
