//! Client for an OpenAI-compatible chat-completions endpoint in JSON mode.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wortschatz_core::generate::{ContentGenerator, GenerationError, Prompt};

/// Connection and sampling settings for the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
  #[serde(default = "default_base_url")]
  pub base_url:          String,
  /// Without a key every completion fails with
  /// [`GenerationError::NotConfigured`].
  #[serde(default)]
  pub api_key:           Option<String>,
  #[serde(default = "default_model")]
  pub model:             String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
  #[serde(default = "default_max_output_tokens")]
  pub max_output_tokens: u32,
  #[serde(default = "default_temperature")]
  pub temperature:       f32,
}

fn default_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_model() -> String { "gpt-4.1-mini".into() }
fn default_timeout_secs() -> u64 { 20 }
fn default_max_output_tokens() -> u32 { 400 }
fn default_temperature() -> f32 { 0.2 }

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      base_url:          default_base_url(),
      api_key:           None,
      model:             default_model(),
      timeout_secs:      default_timeout_secs(),
      max_output_tokens: default_max_output_tokens(),
      temperature:       default_temperature(),
    }
  }
}

impl GeneratorConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
  r#type: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:           &'a str,
  messages:        [ChatMessage<'a>; 2],
  response_format: ResponseFormat,
  max_tokens:      u32,
  temperature:     f32,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
  client: Client,
  config: GeneratorConfig,
}

impl HttpGenerator {
  pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
    let client = Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(|e| GenerationError::Connection(e.to_string()))?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &GeneratorConfig { &self.config }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
  }
}

fn transport_error(err: reqwest::Error) -> GenerationError {
  if err.is_timeout() {
    GenerationError::Timeout
  } else if let Some(status) = err.status() {
    status_error(status)
  } else {
    GenerationError::Connection(err.to_string())
  }
}

fn status_error(status: StatusCode) -> GenerationError {
  match status {
    StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited,
    other => GenerationError::Status(other.as_u16()),
  }
}

impl ContentGenerator for HttpGenerator {
  async fn complete<'a>(
    &'a self,
    prompt: &'a Prompt,
  ) -> Result<String, GenerationError> {
    let Some(api_key) = self.config.api_key.as_deref() else {
      return Err(GenerationError::NotConfigured);
    };

    let body = ChatRequest {
      model:           &self.config.model,
      messages:        [
        ChatMessage { role: "system", content: &prompt.system },
        ChatMessage { role: "user", content: &prompt.user },
      ],
      response_format: ResponseFormat { r#type: "json_object" },
      max_tokens:      self.config.max_output_tokens,
      temperature:     self.config.temperature,
    };

    let resp = self
      .client
      .post(self.url())
      .bearer_auth(api_key)
      .json(&body)
      .send()
      .await
      .map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(status_error(status));
    }

    let chat: ChatResponse = resp.json().await.map_err(|e| {
      if e.is_timeout() {
        GenerationError::Timeout
      } else {
        GenerationError::Malformed(e.to_string())
      }
    })?;

    let content = chat
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|c| !c.trim().is_empty())
      .ok_or_else(|| GenerationError::Malformed("empty completion".into()))?;
    debug!(bytes = content.len(), model = %self.config.model, "completion received");
    Ok(content)
  }
}
