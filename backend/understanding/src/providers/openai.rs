use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use blindspot_core::{VisionModel, VisionRequest, VisionResponse};
use blindspot_logging::redact_sensitive_data;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions provider with image input.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
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

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn build_body(request: &VisionRequest) -> Value {
    let mut user_content = Vec::with_capacity(2);
    if !request.user_prompt.is_empty() {
        user_content.push(json!({ "type": "text", "text": request.user_prompt }));
    }
    user_content.push(json!({
        "type": "image_url",
        "image_url": { "url": request.image.data_url() }
    }));

    json!({
        "model": request.model,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": user_content }
        ],
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "response_format": { "type": "json_object" }
    })
}

#[async_trait]
impl VisionModel for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse> {
        let start = Instant::now();

        debug!(model = %request.model, "Sending request to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| anyhow!("OpenAI HTTP request failed: {}", redact_sensitive_data(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("OpenAI returned {}: {}", status, redact_sensitive_data(&error_body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {e}"))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no message content"))?;

        Ok(VisionResponse {
            content,
            provider: "openai".to_string(),
            model: request.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
