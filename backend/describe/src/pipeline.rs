//! The description pipeline: frame the image, then render, call, validate
//! and retry until a result is recorded or the fallback is returned.

use std::sync::Arc;
use std::time::Duration;

use blindspot_config::BlindSpotConfig;
use blindspot_core::{
    BlindSpotError, DescribeResponse, DescriptionResult, ErrorKind, FailureRecord, HistoryEntry,
    ImportanceRange, InlineImage, PipelineOutcome, VisionModel, VisionRequest,
};
use blindspot_understanding::frame_image;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::history::HistoryHandle;
use crate::prompt::PromptBuilder;
use crate::retry::{RetryOrchestrator, RetryPolicy};
use crate::schema::OutputSchema;
use crate::source::ImageInput;

/// Stages of one invocation, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Rendering,
    Calling,
    Validating,
    Retrying,
    Succeeded,
    Failed,
}

/// Everything the pipeline needs to know besides the model itself.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    pub importance: ImportanceRange,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.2,
            max_tokens: 512,
            call_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            importance: ImportanceRange::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &BlindSpotConfig) -> Self {
        Self {
            model: config.model.name.clone().unwrap_or_default(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            call_timeout: config.model.timeout(),
            retry: RetryPolicy {
                max_attempts: config.pipeline.max_attempts,
                delay: config.pipeline.retry_delay(),
            },
            importance: config.pipeline.importance,
        }
    }
}

/// One image's entry in a sequence report.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceResult {
    pub source_id: String,
    #[serde(flatten)]
    pub response: DescribeResponse,
}

/// Outcome of a sequence call plus the history it left behind.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub results: Vec<SequenceResult>,
    pub history: Vec<HistoryEntry>,
}

/// Composes prompt rendering, the model call, validation and retry.
///
/// The model is injected at construction; the history is passed per call.
pub struct DescriptionPipeline {
    model: Arc<dyn VisionModel>,
    settings: PipelineSettings,
    schema: OutputSchema,
    prompts: PromptBuilder,
    retry: RetryOrchestrator,
}

impl DescriptionPipeline {
    pub fn new(model: Arc<dyn VisionModel>, settings: PipelineSettings) -> Self {
        Self {
            model,
            schema: OutputSchema::new(settings.importance),
            prompts: PromptBuilder::new(settings.importance),
            retry: RetryOrchestrator::new(settings.retry, settings.importance),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Describe one image, using and then extending the session history.
    ///
    /// Never fails: exhaustion comes back as a `Failure` carrying the fallback.
    #[instrument(skip_all, fields(source_id = %image.source_id))]
    pub async fn process(&self, image: ImageInput, history: &HistoryHandle) -> PipelineOutcome {
        enter(PipelineState::Idle);

        if image.bytes.is_empty() {
            enter(PipelineState::Failed);
            return PipelineOutcome::Failure(FailureRecord {
                kind: ErrorKind::CallError,
                message: "image is empty".to_string(),
                attempts: 0,
                fallback: DescriptionResult::fallback(self.settings.importance),
            });
        }

        let framed = frame_image(&image.bytes, image.file_name.as_deref());
        let format_instructions = self.schema.format_instructions();

        let outcome = self
            .retry
            .execute(|n| self.attempt(n, &framed, &format_instructions, history))
            .await;

        match &outcome {
            PipelineOutcome::Success(result) => {
                history.record(result, &image.source_id).await;
                enter(PipelineState::Succeeded);
                info!(importance = result.importance, "Image described");
            }
            PipelineOutcome::Failure(_) => enter(PipelineState::Failed),
        }
        outcome
    }

    /// Describe images in order, threading one history through them.
    pub async fn process_sequence(
        &self,
        images: Vec<ImageInput>,
        history: &HistoryHandle,
    ) -> SequenceReport {
        let mut results = Vec::with_capacity(images.len());
        for image in images {
            let source_id = image.source_id.clone();
            let outcome = self.process(image, history).await;
            results.push(SequenceResult {
                source_id,
                response: outcome.to_response(),
            });
        }

        SequenceReport {
            results,
            history: history.snapshot().await,
        }
    }

    async fn attempt(
        &self,
        n: u32,
        image: &InlineImage,
        format_instructions: &str,
        history: &HistoryHandle,
    ) -> Result<DescriptionResult, BlindSpotError> {
        if n > 1 {
            enter(PipelineState::Retrying);
        }

        enter(PipelineState::Rendering);
        let snapshot = history.snapshot().await;
        let prompt = self.prompts.build(&snapshot, format_instructions, image);

        enter(PipelineState::Calling);
        let request = VisionRequest {
            model: self.settings.model.clone(),
            system_prompt: prompt.system_prompt,
            user_prompt: prompt.user_prompt,
            image: prompt.image,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response =
            match tokio::time::timeout(self.settings.call_timeout, self.model.describe(&request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(BlindSpotError::call(self.model.name(), format!("{e:#}"))),
                Err(_) => {
                    return Err(BlindSpotError::Timeout {
                        after: self.settings.call_timeout,
                    })
                }
            };
        debug!(attempt = n, latency_ms = response.latency_ms, "Model responded");

        enter(PipelineState::Validating);
        Ok(self.schema.parse(&response.content)?)
    }
}

fn enter(state: PipelineState) {
    debug!(state = ?state, "Pipeline state");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use blindspot_core::{VisionResponse, FALLBACK_DESCRIPTION};
    use blindspot_understanding::{MockReply, MockVisionProvider};

    use super::*;

    const CLEAR_PATH: &str =
        r#"{"description":"Clear path, no obstacles within 2 meters.","importance":1}"#;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            model: "scripted".into(),
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
            ..Default::default()
        }
    }

    fn jpeg(name: &str) -> ImageInput {
        ImageInput::from_upload(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00], name)
    }

    fn pipeline(mock: Arc<MockVisionProvider>) -> DescriptionPipeline {
        DescriptionPipeline::new(mock, settings())
    }

    #[tokio::test]
    async fn valid_reply_succeeds_and_extends_history() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_response(CLEAR_PATH));
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock.clone()).process(jpeg("walk 1.jpg"), &history).await;

        assert_eq!(
            outcome,
            PipelineOutcome::Success(DescriptionResult {
                description: "Clear path, no obstacles within 2 meters.".into(),
                importance: 1,
            })
        );
        assert_eq!(mock.calls(), 1);
        let entries = history.snapshot().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_id, "walk_1.jpg");
    }

    #[tokio::test]
    async fn malformed_replies_exhaust_into_parse_error_fallback() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_response("not json at all"));
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock.clone()).process(jpeg("a.jpg"), &history).await;

        let failure = outcome.failure().expect("should fail");
        assert_eq!(failure.kind, ErrorKind::ParseError);
        assert_eq!(failure.attempts, 3);
        assert_eq!(outcome.result().description, FALLBACK_DESCRIPTION);
        assert_eq!(outcome.result().importance, 1);
        assert_eq!(mock.calls(), 3);
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn transient_call_error_is_retried() {
        let mock = Arc::new(
            MockVisionProvider::new("mock")
                .with_script([MockReply::Error("503 Service Unavailable".into())])
                .with_response(CLEAR_PATH),
        );
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock.clone()).process(jpeg("a.jpg"), &history).await;

        assert!(outcome.is_success());
        assert_eq!(mock.calls(), 2);
        assert_eq!(history.len().await, 1);
    }

    #[tokio::test]
    async fn persistent_call_errors_surface_as_call_error() {
        let mock = Arc::new(MockVisionProvider::new("mock"));
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock.clone()).process(jpeg("a.jpg"), &history).await;

        assert_eq!(outcome.failure().unwrap().kind, ErrorKind::CallError);
        assert_eq!(mock.calls(), 3);
        assert!(history.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_and_counts_as_attempt() {
        let mock = Arc::new(
            MockVisionProvider::new("mock")
                .with_script([MockReply::Hang])
                .with_response(CLEAR_PATH),
        );
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock.clone()).process(jpeg("a.jpg"), &history).await;

        assert!(outcome.is_success());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_on_every_attempt_fail_with_call_error() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_script([
            MockReply::Hang,
            MockReply::Hang,
            MockReply::Hang,
        ]));
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock).process(jpeg("a.jpg"), &history).await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::CallError);
        assert!(failure.message.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_is_reported_precisely() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_script([MockReply::Hang]));
        let settings = PipelineSettings {
            call_timeout: Duration::from_millis(250),
            retry: RetryPolicy {
                max_attempts: 1,
                delay: Duration::ZERO,
            },
            ..settings()
        };
        let history = HistoryHandle::new(10);

        let outcome = DescriptionPipeline::new(mock, settings)
            .process(jpeg("a.jpg"), &history)
            .await;

        let message = &outcome.failure().unwrap().message;
        assert!(message.ends_with("timed out after 250ms"), "{message}");
    }

    #[tokio::test]
    async fn empty_image_fails_without_calling_the_model() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_response(CLEAR_PATH));
        let history = HistoryHandle::new(10);

        let outcome = pipeline(mock.clone())
            .process(ImageInput::new(Vec::new(), "empty"), &history)
            .await;

        assert_eq!(outcome.failure().unwrap().attempts, 0);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn later_frames_see_earlier_descriptions() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_script([
            MockReply::Text(r#"{"description":"Crowd 5 meters ahead.","importance":5}"#.into()),
            MockReply::Text("garbage".into()),
            MockReply::Text(r#"{"description":"Crowd thinning to your right.","importance":3}"#.into()),
        ]));
        let history = HistoryHandle::new(10);
        let pipeline = pipeline(mock.clone());

        pipeline.process(jpeg("1.jpg"), &history).await;
        pipeline.process(jpeg("2.jpg"), &history).await;

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(!prompts[0].contains("Previous description"));
        assert!(prompts[1].contains("Previous description 1: Crowd 5 meters ahead. (Importance: 5)"));
        assert!(!prompts[1].contains("Previous description 2"));
        assert!(prompts[2].contains("Previous description 1: Crowd 5 meters ahead."));
        assert_eq!(history.len().await, 2);
    }

    #[tokio::test]
    async fn sequence_records_successes_in_order() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_script([
            MockReply::Text(r#"{"description":"Door ahead.","importance":4}"#.into()),
            MockReply::Text("oops".into()),
            MockReply::Text("oops".into()),
            MockReply::Text("oops".into()),
            MockReply::Text(r#"{"description":"Stairs down.","importance":9}"#.into()),
        ]));
        let history = HistoryHandle::new(10);

        let report = pipeline(mock)
            .process_sequence(vec![jpeg("1.jpg"), jpeg("2.jpg"), jpeg("3.jpg")], &history)
            .await;

        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].response.success);
        assert!(!report.results[1].response.success);
        assert_eq!(report.results[1].response.description, FALLBACK_DESCRIPTION);
        assert!(report.results[2].response.success);

        let ids: Vec<_> = report.history.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, ["1.jpg", "3.jpg"]);
        assert_eq!(history.len().await, 2);
    }

    /// Holds each call until both have started, proving calls overlap.
    struct Rendezvous {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl VisionModel for Rendezvous {
        fn name(&self) -> &str {
            "rendezvous"
        }

        async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse> {
            self.barrier.wait().await;
            Ok(VisionResponse {
                content: CLEAR_PATH.to_string(),
                provider: "rendezvous".into(),
                model: request.model.clone(),
                latency_ms: 0,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_calls_on_one_session_both_append() {
        let model = Arc::new(Rendezvous {
            barrier: tokio::sync::Barrier::new(2),
        });
        let pipeline = DescriptionPipeline::new(model, settings());
        let history = HistoryHandle::new(10);

        let (a, b) = tokio::join!(
            pipeline.process(jpeg("left.jpg"), &history),
            pipeline.process(jpeg("right.jpg"), &history),
        );

        assert!(a.is_success() && b.is_success());
        assert_eq!(history.len().await, 2);
    }

    #[tokio::test]
    async fn history_stays_bounded_across_many_frames() {
        let mock = Arc::new(MockVisionProvider::new("mock").with_response(CLEAR_PATH));
        let history = HistoryHandle::new(3);
        let pipeline = pipeline(mock);

        for i in 0..5 {
            pipeline.process(jpeg(&format!("{i}.jpg")), &history).await;
        }

        let ids: Vec<_> = history
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.source_id)
            .collect();
        assert_eq!(ids, ["2.jpg", "3.jpg", "4.jpg"]);
    }
}
