use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for vision-language model backends used by the description pipeline.
///
/// Implementations are stateless from the pipeline's point of view and carry
/// no retry logic of their own.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send the rendered prompt and image, return the raw reply text.
    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse>;
}

/// An image framed for transport: MIME type plus base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl InlineImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

/// Request to a vision model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: InlineImage,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from a vision model.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}
