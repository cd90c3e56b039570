//! Vision model client for document analysis.
//!
//! Talks to an OpenAI-compatible chat completions endpoint with
//! multimodal message content (text plus base64 image payloads).

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::ImageFormat;

/// Configuration for the vision model client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base, including the version prefix
    /// (default: http://localhost:6002/v1)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer credential passed through to the endpoint.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in a completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_base() -> String {
    "http://localhost:6002/v1".to_string()
}
fn default_api_key() -> String {
    "fake-key".to_string()
}
fn default_model() -> String {
    "qwen".to_string()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: default_api_key(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

/// Errors that can occur during a completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to reach the endpoint (network, timeout).
    #[error("connection error: {0}")]
    Connection(String),
    /// Endpoint returned a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    /// Response body could not be decoded.
    #[error("response parse error: {0}")]
    Parse(String),
    /// Endpoint answered with no completion text.
    #[error("empty completion response")]
    Empty,
}

impl LlmError {
    /// Whether a caller could reasonably retry the same request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::Empty => false,
        }
    }
}

/// The seam between the pipeline and the inference endpoint.
///
/// One outbound call per invocation; no caching, no internal retries.
/// The backend transports content without interpreting it.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion: an instruction, optional grounding text from
    /// an earlier stage, and an optional image payload.
    async fn complete(
        &self,
        prompt: &str,
        context: Option<&str>,
        image: Option<(&[u8], ImageFormat)>,
    ) -> Result<String, LlmError>;
}

/// HTTP client for an OpenAI-compatible completion service.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 min timeout for slow models
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Encode an image as a `data:` URL for inline transport.
    fn data_url(bytes: &[u8], format: ImageFormat) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        format!("data:{};base64,{}", format.mime_type(), encoded)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        context: Option<&str>,
        image: Option<(&[u8], ImageFormat)>,
    ) -> Result<String, LlmError> {
        let mut content = Vec::with_capacity(3);
        if let Some(context) = context {
            content.push(ContentPart::Text {
                text: format!("Prior analysis for reference:\n{context}"),
            });
        }
        content.push(ContentPart::Text {
            text: prompt.to_string(),
        });
        if let Some((bytes, format)) = image {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: Self::data_url(bytes, format),
                },
            });
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        debug!("Calling completion endpoint at {}", url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::Empty);
        }

        Ok(text)
    }
}
