//! The content-generator seam and the typed payloads that cross it.
//!
//! Generator output is untrusted text. It is parsed into explicit records
//! at this boundary; a malformed or schema-invalid reply earns exactly one
//! repair attempt before surfacing as a [`GenerationError`].

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

/// Default serialized-size budget of one [`StudyContent`].
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1200;

/// Most examples a [`StudyContent`] keeps.
pub const MAX_EXAMPLES: usize = 3;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
  #[error("generator timed out")]
  Timeout,

  #[error("generator rate limit exceeded")]
  RateLimited,

  #[error("could not reach generator: {0}")]
  Connection(String),

  #[error("generator returned status {0}")]
  Status(u16),

  #[error("generator returned malformed JSON: {0}")]
  Malformed(String),

  #[error("generator output does not match the schema: {0}")]
  Schema(String),

  #[error("generator is not configured")]
  NotConfigured,

  #[error("could not encode the generator request: {0}")]
  Encode(String),
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

/// A two-message chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
  pub system: String,
  pub user:   String,
}

impl Prompt {
  /// Serialise `payload` as the user message.
  pub fn json<T: Serialize>(
    system: impl Into<String>,
    payload: &T,
  ) -> Result<Self, GenerationError> {
    let user = serde_json::to_string(payload)
      .map_err(|e| GenerationError::Encode(e.to_string()))?;
    Ok(Self { system: system.into(), user })
  }

  /// The follow-up prompt sent after `invalid` failed validation.
  pub fn repair(&self, invalid: &str, problem: &GenerationError) -> Self {
    Self {
      system: self.system.clone(),
      user:   format!(
        "A resposta anterior foi rejeitada ({problem}).\n\
         Resposta inválida:\n{invalid}\n\n\
         Pedido original:\n{}\n\n\
         Devolva apenas o JSON corrigido, sem markdown e sem texto extra.",
        self.user
      ),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the external text-generation service.
///
/// Implementations return the raw assistant message. They must map every
/// transport failure onto a [`GenerationError`] variant.
pub trait ContentGenerator: Send + Sync {
  fn complete<'a>(
    &'a self,
    prompt: &'a Prompt,
  ) -> impl Future<Output = Result<String, GenerationError>> + Send + 'a;
}

// ─── Parsing & retry ─────────────────────────────────────────────────────────

/// Models sometimes wrap JSON in a markdown fence despite being told not to.
fn strip_fences(raw: &str) -> &str {
  let trimmed = raw.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse generator output into `T`. Text that is not a JSON object is
/// [`GenerationError::Malformed`]; an object of the wrong shape is
/// [`GenerationError::Schema`].
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, GenerationError> {
  let value: serde_json::Value = serde_json::from_str(strip_fences(raw))
    .map_err(|e| GenerationError::Malformed(e.to_string()))?;
  if !value.is_object() {
    return Err(GenerationError::Malformed("expected a JSON object".into()));
  }
  serde_json::from_value(value).map_err(|e| GenerationError::Schema(e.to_string()))
}

async fn attempt<G: ContentGenerator>(
  generator: &G,
  prompt: &Prompt,
  timeout: Duration,
) -> Result<String, GenerationError> {
  tokio::time::timeout(timeout, generator.complete(prompt))
    .await
    .map_err(|_| GenerationError::Timeout)?
}

/// Ask `generator` for a JSON object of type `T`.
///
/// Each call is bounded by `timeout`. At most one retry happens in total:
/// invalid output is retried with a repair prompt that quotes it, a
/// transport failure is retried with the same prompt. Whatever the second
/// attempt yields is final.
pub async fn request_json<G, T>(
  generator: &G,
  prompt: &Prompt,
  timeout: Duration,
) -> Result<T, GenerationError>
where
  G: ContentGenerator,
  T: DeserializeOwned,
{
  let retry = match attempt(generator, prompt, timeout).await {
    Ok(raw) => match parse_payload(&raw) {
      Ok(value) => return Ok(value),
      Err(problem) => {
        warn!(error = %problem, "generator output rejected, requesting repair");
        prompt.repair(&raw, &problem)
      }
    },
    Err(error) => {
      warn!(%error, "generator call failed, retrying once");
      prompt.clone()
    }
  };

  let raw = attempt(generator, &retry, timeout).await?;
  parse_payload(&raw)
}

// ─── Study content ───────────────────────────────────────────────────────────

/// Pedagogical content for one study item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyContent {
  /// Short German example sentences using the word.
  pub examples:      Vec<String>,
  pub useful_phrase: String,
  /// A Portuguese sentence for the learner to translate.
  pub desafio:       String,
}

impl StudyContent {
  pub fn serialized_len(&self) -> usize {
    serde_json::to_vec(self).map_or(0, |bytes| bytes.len())
  }

  /// Trim every string, drop blank examples, keep at most
  /// [`MAX_EXAMPLES`], then shorten until the serialized form fits in
  /// `max_bytes`.
  ///
  /// Shortening removes one character at a time from the end of `desafio`,
  /// then `useful_phrase`, then the last example (which is removed once
  /// empty). Fields are never reordered.
  pub fn normalize(mut self, max_bytes: usize) -> Self {
    self.desafio = self.desafio.trim().to_owned();
    self.useful_phrase = self.useful_phrase.trim().to_owned();
    self.examples = self
      .examples
      .into_iter()
      .map(|e| e.trim().to_owned())
      .filter(|e| !e.is_empty())
      .take(MAX_EXAMPLES)
      .collect();

    while self.serialized_len() > max_bytes {
      if self.desafio.pop().is_some() {
        continue;
      }
      if self.useful_phrase.pop().is_some() {
        continue;
      }
      let Some(last) = self.examples.last_mut() else {
        break;
      };
      last.pop();
      if last.is_empty() {
        self.examples.pop();
      }
    }
    self
  }
}

// ─── Translation verdict ─────────────────────────────────────────────────────

/// The generator's assessment of a learner's translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationVerdict {
  pub correct:       bool,
  /// One-sentence correction.
  pub feedback:      String,
  /// The best native phrasing.
  pub ideal_version: String,
}

impl TranslationVerdict {
  pub fn normalize(self) -> Self {
    Self {
      correct:       self.correct,
      feedback:      self.feedback.trim().to_owned(),
      ideal_version: self.ideal_version.trim().to_owned(),
    }
  }
}
