//! Text-generation backend abstraction.
//!
//! The planner, title resolver and verifier all talk to the LLM through the
//! [`TextGenerator`] trait so tests can inject scripted backends. The
//! production implementation wraps OpenAI chat completions and retries on
//! rate-limit signals with exponential backoff, failing fast on anything
//! else.

use crate::error::{KinoError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Opaque prompt-in, text-out generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Maximum attempts when the backend signals rate limiting.
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff before retrying a rate-limited request.
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Request timeout (2 minutes) to prevent hung API calls.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// OpenAI-backed text generator.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Create a generator for the given model.
    pub fn new(model: &str, temperature: f32) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client: Client::with_config(OpenAIConfig::default()).with_http_client(http_client),
            model: model.to_string(),
            temperature,
        }
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| KinoError::Llm(e.to_string()))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(messages)
            .build()
            .map_err(|e| KinoError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| KinoError::Llm(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(KinoError::Llm("Empty response from backend".to_string()));
        }

        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request(prompt).await {
                Ok(text) => {
                    debug!("Generation succeeded on attempt {}", attempt);
                    return Ok(text);
                }
                Err(e) if is_rate_limited(&e) && attempt < MAX_ATTEMPTS => {
                    warn!("Rate limit hit, waiting {:?} before retry", backoff);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) if is_rate_limited(&e) => {
                    return Err(KinoError::Llm(
                        "Max retries exceeded. The API is too busy right now.".to_string(),
                    ));
                }
                // Real failures are not worth retrying.
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop always returns")
    }
}

/// Whether an error looks like a rate-limit signal worth backing off on.
fn is_rate_limited(error: &KinoError) -> bool {
    let msg = error.to_string();
    msg.contains("429") || msg.to_lowercase().contains("rate limit")
}
