use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use blindspot_core::{VisionModel, VisionRequest, VisionResponse};
use blindspot_logging::redact_sensitive_data;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn build_body(request: &VisionRequest) -> GenerateContentRequest {
    let text_part = |text: &str| Part {
        text: Some(text.to_string()),
        inline_data: None,
    };

    let mut parts = Vec::with_capacity(2);
    if !request.user_prompt.is_empty() {
        parts.push(text_part(&request.user_prompt));
    }
    parts.push(Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: request.image.mime_type.clone(),
            data: request.image.data_base64.clone(),
        }),
    });

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![text_part(&request.system_prompt)],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            response_mime_type: "application/json",
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        bail!("Gemini returned no content: {reason}");
    };

    Ok(candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}

#[async_trait]
impl VisionModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse> {
        let start = Instant::now();
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );

        debug!(model = %request.model, mime = %request.image.mime_type, "Sending request to Gemini");

        let response = self
            .client
            .post(&url)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| anyhow!("Gemini HTTP request failed: {}", redact_sensitive_data(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Gemini returned {}: {}", status, redact_sensitive_data(&error_body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Gemini response: {}", redact_sensitive_data(&e.to_string())))?;

        Ok(VisionResponse {
            content: extract_text(parsed)?,
            provider: "gemini".to_string(),
            model: request.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
