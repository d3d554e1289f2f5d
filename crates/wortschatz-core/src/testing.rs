//! Deterministic doubles for the external collaborators, shared by the test
//! suites of this workspace (enable the `test-util` feature).

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use crate::{
  annotate::{
    AnnotateError, Annotation, Annotator, WireAnnotation, WireSentence,
    WireToken,
  },
  generate::{ContentGenerator, GenerationError, Prompt},
};

/// The clinical sample sentence.
pub const CLINICAL_SENTENCE: &str =
  "Der Notarzt verabreicht dem Patienten intravenös das starke Schmerzmittel.";

fn wire(
  text: &str,
  lemma: &str,
  pos: &str,
  gender: Option<&str>,
  case: Option<&str>,
  dep: &str,
) -> WireToken {
  let punct = pos == "PUNCT";
  WireToken {
    text:     text.into(),
    lemma:    lemma.into(),
    pos:      pos.into(),
    gender:   gender.map(Into::into),
    case:     case.map(Into::into),
    dep:      dep.into(),
    is_alpha: !punct,
    is_space: false,
    is_punct: punct,
  }
}

/// Annotation of [`CLINICAL_SENTENCE`]: nine word tokens (eight distinct
/// signatures, `der` occurring twice as a masculine determiner) followed by
/// the final full stop.
pub fn clinical_annotation() -> Annotation {
  let tokens = vec![
    wire("Der", "der", "DET", Some("Masc"), Some("Nom"), "nk"),
    wire("Notarzt", "Notarzt", "NOUN", Some("Masc"), Some("Nom"), "sb"),
    wire("verabreicht", "verabreichen", "VERB", None, None, "ROOT"),
    wire("dem", "der", "DET", Some("Masc"), Some("Dat"), "nk"),
    wire("Patienten", "Patient", "NOUN", Some("Masc"), Some("Dat"), "da"),
    wire("intravenös", "intravenös", "ADV", None, None, "mo"),
    wire("das", "der", "DET", Some("Neut"), Some("Acc"), "nk"),
    wire("starke", "stark", "ADJ", Some("Neut"), Some("Acc"), "nk"),
    wire("Schmerzmittel", "Schmerzmittel", "NOUN", Some("Neut"), Some("Acc"), "oa"),
    wire(".", "--", "PUNCT", None, None, "punct"),
  ];
  Annotation::from(WireAnnotation {
    sentences: vec![WireSentence { text: CLINICAL_SENTENCE.into(), tokens }],
  })
}

/// A generator reply that satisfies the study-content schema.
pub fn study_json(lemma: &str) -> String {
  serde_json::json!({
    "examples": [format!("Bitte {lemma} sofort vorbereiten.")],
    "useful_phrase": format!("{lemma} verabreichen"),
    "desafio": "O enfermeiro preparou o medicamento.",
  })
  .to_string()
}

// ─── Annotator ───────────────────────────────────────────────────────────────

/// Returns canned annotations keyed by exact text.
#[derive(Debug, Default)]
pub struct StaticAnnotator {
  annotations: HashMap<String, Annotation>,
  unavailable: bool,
  calls:       AtomicUsize,
}

impl StaticAnnotator {
  pub fn new() -> Self { Self::default() }

  /// Knows [`CLINICAL_SENTENCE`].
  pub fn clinical() -> Self {
    Self::new().with(CLINICAL_SENTENCE, clinical_annotation())
  }

  /// Fails every call with [`AnnotateError::Unavailable`].
  pub fn unavailable() -> Self {
    Self { unavailable: true, ..Self::default() }
  }

  pub fn with(mut self, text: &str, annotation: Annotation) -> Self {
    self.annotations.insert(text.to_owned(), annotation);
    self
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Annotator for StaticAnnotator {
  async fn annotate<'a>(
    &'a self,
    raw_text: &'a str,
  ) -> Result<Annotation, AnnotateError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.unavailable {
      return Err(AnnotateError::Unavailable("model not loaded".into()));
    }
    self.annotations.get(raw_text).cloned().ok_or_else(|| {
      AnnotateError::InvalidResponse(format!("no annotation for {raw_text:?}"))
    })
  }
}

// ─── Generator ───────────────────────────────────────────────────────────────

/// Replays a fixed script of replies and records every prompt it receives.
/// Once the script runs out every call fails with a connection error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
  script:  Mutex<VecDeque<Result<String, GenerationError>>>,
  prompts: Mutex<Vec<Prompt>>,
  calls:   AtomicUsize,
  delay:   Option<Duration>,
}

impl ScriptedGenerator {
  pub fn new(
    script: impl IntoIterator<Item = Result<String, GenerationError>>,
  ) -> Self {
    Self { script: Mutex::new(script.into_iter().collect()), ..Self::default() }
  }

  /// Sleep for `delay` before every reply.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  pub fn prompts(&self) -> Vec<Prompt> {
    self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
  }
}

impl ContentGenerator for ScriptedGenerator {
  async fn complete<'a>(
    &'a self,
    prompt: &'a Prompt,
  ) -> Result<String, GenerationError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut prompts) = self.prompts.lock() {
      prompts.push(prompt.clone());
    }
    let reply = match self.script.lock() {
      Ok(mut script) => script.pop_front(),
      Err(_) => None,
    };
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    reply.unwrap_or_else(|| {
      Err(GenerationError::Connection("script exhausted".into()))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clinical_fixture_shape() {
    let ann = clinical_annotation();
    assert_eq!(ann.sentences, vec![CLINICAL_SENTENCE]);
    assert_eq!(ann.tokens.len(), 10);
    assert_eq!(ann.word_tokens().count(), 9);
    assert_eq!(ann.tokens[4].lemma, "patient");
  }
}
