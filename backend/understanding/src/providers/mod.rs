pub mod gemini;
pub mod mock;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use blindspot_config::{ModelConfig, ProviderKind};
use blindspot_core::{BlindSpotError, VisionModel};
use reqwest::Client;
use tracing::info;

pub use gemini::GeminiProvider;
pub use mock::{MockReply, MockVisionProvider};
pub use openai::OpenAiProvider;

/// Reply of the `mock` provider when run from config (dry runs, demos).
pub const MOCK_DRY_RUN_REPLY: &str =
    r#"{"description":"Clear path ahead, no obstacles within 2 meters.","importance":1}"#;

/// HTTP client whose own timeout matches the per-call budget.
fn http_client(timeout: Duration) -> Result<Client, BlindSpotError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BlindSpotError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Build the configured vision provider once, at bootstrap.
///
/// Missing credentials are a configuration error, never a per-request one.
pub fn build_provider(config: &ModelConfig) -> Result<Arc<dyn VisionModel>, BlindSpotError> {
    let require_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                BlindSpotError::Configuration(format!(
                    "provider '{}' requires an API key",
                    config.provider.as_str()
                ))
            })
    };

    let provider: Arc<dyn VisionModel> = match config.provider {
        ProviderKind::Gemini => {
            let mut provider =
                GeminiProvider::new(require_key()?).with_http_client(http_client(config.timeout())?);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAi => {
            let mut provider =
                OpenAiProvider::new(require_key()?).with_http_client(http_client(config.timeout())?);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderKind::Mock => Arc::new(MockVisionProvider::new("mock").with_response(MOCK_DRY_RUN_REPLY)),
    };

    info!(provider = provider.name(), "Registered vision provider");
    Ok(provider)
}
