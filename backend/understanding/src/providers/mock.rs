use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use blindspot_core::{VisionModel, VisionRequest, VisionResponse};

/// One canned outcome of a mock call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw reply text, returned as-is.
    Text(String),
    /// A transport-style failure with this message.
    Error(String),
    /// Never answers; only a caller-side timeout ends the call.
    Hang,
}

/// A mock vision provider that replays scripted replies in order.
///
/// Once the script is exhausted it answers with the fixed response, if any.
pub struct MockVisionProvider {
    name: String,
    script: Mutex<VecDeque<MockReply>>,
    fixed_response: Option<String>,
    latency: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockVisionProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fixed_response: None,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(replies);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `describe` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// System prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .or_else(|| self.fixed_response.clone().map(MockReply::Text))
    }
}

#[async_trait]
impl VisionModel for MockVisionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.system_prompt.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let content = match self.next_reply() {
            Some(MockReply::Text(text)) => text,
            Some(MockReply::Error(message)) => bail!(message),
            Some(MockReply::Hang) => std::future::pending::<String>().await,
            None => return Err(anyhow!("mock provider '{}' has no reply scripted", self.name)),
        };

        Ok(VisionResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            latency_ms: self.latency.as_millis() as u64,
        })
    }
}
