//! OpenAI-compatible chat-completions provider.
//!
//! [`OpenAiGenerator`] sends each instruction as a single user message and
//! returns the first choice's content. Any endpoint that accepts the OpenAI
//! request format works by changing [`OpenAiConfig::base_url`].

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{ApiKey, GenerationError, ProviderFailure, Temperature, TextGenerator};
use provider_http::{body_failure, status_failure, transport_failure};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "openai";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for [`OpenAiGenerator`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    pub temperature: Temperature,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a configuration with the default endpoint, model and
    /// temperature.
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            temperature: Temperature::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// A [`TextGenerator`] backed by an OpenAI-compatible endpoint.
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] if the HTTP client cannot be constructed
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GenerationError::new(PROVIDER, transport_failure(e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    async fn request(&self, instruction: &str) -> Result<String, ProviderFailure> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature.as_f32(),
            messages: [ChatMessage {
                role: "user",
                content: instruction,
            }],
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        if !response.status().is_success() {
            let failure = status_failure(response).await;
            debug!(provider = PROVIDER, error = %failure, "chat completion rejected");
            return Err(failure);
        }

        let parsed: ChatResponse = response.json().await.map_err(body_failure)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderFailure::InvalidResponse("response contained no message content".into())
            })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            temperature = %self.config.temperature,
            "sending chat completion request"
        );
        self.request(instruction)
            .await
            .map_err(|failure| GenerationError::new(PROVIDER, failure))
    }
}
