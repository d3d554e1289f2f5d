//! Client for the NLP annotation service.

use std::{sync::OnceLock, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wortschatz_core::annotate::{
  AnnotateError, Annotation, Annotator, WireAnnotation,
};

/// Connection settings for the annotation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorConfig {
  /// Full URL of the annotate endpoint.
  #[serde(default = "default_url")]
  pub url:          String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_url() -> String { "http://127.0.0.1:8001/annotate".into() }
fn default_timeout_secs() -> u64 { 60 }

impl Default for AnnotatorConfig {
  fn default() -> Self {
    Self { url: default_url(), timeout_secs: default_timeout_secs() }
  }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
  text: &'a str,
}

/// Async HTTP client for the annotation service.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpAnnotator {
  client: Client,
  url:    String,
}

static SHARED: OnceLock<HttpAnnotator> = OnceLock::new();

impl HttpAnnotator {
  pub fn new(config: &AnnotatorConfig) -> Result<Self, AnnotateError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| AnnotateError::Unavailable(e.to_string()))?;
    Ok(Self { client, url: config.url.clone() })
  }

  /// The process-wide annotator, built from `config` on first use.
  ///
  /// Later calls return the existing handle and ignore their `config`.
  pub fn shared(
    config: &AnnotatorConfig,
  ) -> Result<&'static Self, AnnotateError> {
    if let Some(annotator) = SHARED.get() {
      return Ok(annotator);
    }
    let built = Self::new(config)?;
    let annotator = SHARED.get_or_init(|| built);
    info!(url = %annotator.url, "annotator client initialised");
    Ok(annotator)
  }
}

impl Annotator for HttpAnnotator {
  async fn annotate<'a>(
    &'a self,
    raw_text: &'a str,
  ) -> Result<Annotation, AnnotateError> {
    let resp = self
      .client
      .post(&self.url)
      .json(&AnnotateRequest { text: raw_text })
      .send()
      .await
      .map_err(|e| AnnotateError::Unavailable(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(AnnotateError::Status(status.as_u16()));
    }

    let wire: WireAnnotation = resp
      .json()
      .await
      .map_err(|e| AnnotateError::InvalidResponse(e.to_string()))?;
    debug!(sentences = wire.sentences.len(), "text annotated");
    Ok(wire.into())
  }
}

/// Lets the [`HttpAnnotator::shared`] handle be injected directly.
impl Annotator for &'static HttpAnnotator {
  async fn annotate<'a>(
    &'a self,
    raw_text: &'a str,
  ) -> Result<Annotation, AnnotateError> {
    HttpAnnotator::annotate(*self, raw_text).await
  }
}
