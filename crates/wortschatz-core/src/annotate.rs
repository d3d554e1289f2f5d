//! The annotator seam: an external NLP service that turns raw German text
//! into a position-indexed token stream.
//!
//! Tag strings on the wire are mapped onto the closed enums of this crate
//! here, so nothing downstream ever sees an unrecognised tag.

use std::{collections::HashMap, future::Future};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  document::GrammaticalCase,
  vocabulary::{Gender, PartOfSpeech},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AnnotateError {
  #[error("annotator unavailable: {0}")]
  Unavailable(String),

  #[error("annotator returned status {0}")]
  Status(u16),

  #[error("invalid annotator response: {0}")]
  InvalidResponse(String),
}

// ─── Annotated tokens ────────────────────────────────────────────────────────

/// One token of the annotator's stream, already mapped onto closed enums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedToken {
  /// 0-based index into the token stream.
  pub position:   usize,
  pub surface:    String,
  /// Lowercase lemma as reported by the annotator (not yet trimmed).
  pub lemma:      String,
  pub pos:        PartOfSpeech,
  pub gender:     Gender,
  pub case:       GrammaticalCase,
  /// Dependency label, e.g. `sb` (subject) or `da` (dative object).
  pub dependency: String,
  /// Index into [`Annotation::sentences`].
  pub sentence:   usize,
  /// Alphabetic, not whitespace, not punctuation.
  pub is_word:    bool,
}

/// The full annotation of one raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
  /// Trimmed text of each sentence, in order.
  pub sentences: Vec<String>,
  pub tokens:    Vec<AnnotatedToken>,
}

/// What the study planner needs to know about one stream position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContext {
  pub surface:    String,
  pub sentence:   String,
  pub dependency: String,
}

impl Annotation {
  pub fn word_tokens(&self) -> impl Iterator<Item = &AnnotatedToken> {
    self.tokens.iter().filter(|t| t.is_word)
  }

  /// Map every stream position onto its surface form, sentence text and
  /// dependency label.
  pub fn contexts(&self) -> HashMap<usize, TokenContext> {
    self
      .tokens
      .iter()
      .map(|t| {
        let sentence = self.sentences.get(t.sentence).cloned().unwrap_or_default();
        (t.position, TokenContext {
          surface: t.surface.clone(),
          sentence,
          dependency: t.dependency.clone(),
        })
      })
      .collect()
  }
}

// ─── Wire format ─────────────────────────────────────────────────────────────

/// A token exactly as the annotation service reports it (spaCy-style fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToken {
  pub text:     String,
  pub lemma:    String,
  pub pos:      String,
  /// Morphological `Gender` feature, if any.
  #[serde(default)]
  pub gender:   Option<String>,
  /// Morphological `Case` feature, if any.
  #[serde(default)]
  pub case:     Option<String>,
  #[serde(default)]
  pub dep:      String,
  pub is_alpha: bool,
  #[serde(default)]
  pub is_space: bool,
  #[serde(default)]
  pub is_punct: bool,
}

/// One sentence of the service response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSentence {
  pub text:   String,
  pub tokens: Vec<WireToken>,
}

/// Body returned by the annotation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAnnotation {
  pub sentences: Vec<WireSentence>,
}

impl From<WireAnnotation> for Annotation {
  /// Positions are assigned in stream order across sentence boundaries.
  fn from(wire: WireAnnotation) -> Self {
    let mut sentences = Vec::with_capacity(wire.sentences.len());
    let mut tokens = Vec::new();

    for (sentence_idx, sentence) in wire.sentences.into_iter().enumerate() {
      sentences.push(sentence.text.trim().to_owned());
      for tok in sentence.tokens {
        let is_word = tok.is_alpha && !tok.is_space && !tok.is_punct;
        tokens.push(AnnotatedToken {
          position: tokens.len(),
          surface: tok.text,
          lemma: tok.lemma.to_lowercase(),
          pos: PartOfSpeech::from_tag(&tok.pos),
          gender: Gender::from_feature(tok.gender.as_deref()),
          case: GrammaticalCase::from_feature(tok.case.as_deref()),
          dependency: tok.dep,
          sentence: sentence_idx,
          is_word,
        });
      }
    }

    Self { sentences, tokens }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the NLP annotation service.
///
/// Annotation of a given text is a pure function of that text, so callers
/// may memoise results keyed by the exact input.
pub trait Annotator: Send + Sync {
  fn annotate<'a>(
    &'a self,
    raw_text: &'a str,
  ) -> impl Future<Output = Result<Annotation, AnnotateError>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn wire_token(text: &str, lemma: &str, pos: &str, alpha: bool) -> WireToken {
    WireToken {
      text:     text.into(),
      lemma:    lemma.into(),
      pos:      pos.into(),
      gender:   None,
      case:     None,
      dep:      String::new(),
      is_alpha: alpha,
      is_space: false,
      is_punct: !alpha,
    }
  }

  #[test]
  fn positions_run_across_sentences() {
    let mut arzt = wire_token("Arzt", "Arzt", "NOUN", true);
    arzt.gender = Some("Masc".into());
    arzt.case = Some("Nom".into());
    let wire = WireAnnotation {
      sentences: vec![
        WireSentence {
          text:   " Der Arzt. ".into(),
          tokens: vec![
            wire_token("Der", "der", "DET", true),
            arzt,
            wire_token(".", ".", "PUNCT", false),
          ],
        },
        WireSentence {
          text:   "Gut!".into(),
          tokens: vec![
            wire_token("Gut", "gut", "ADJ", true),
            wire_token("!", "!", "PUNCT", false),
          ],
        },
      ],
    };

    let ann = Annotation::from(wire);
    assert_eq!(ann.sentences, vec!["Der Arzt.", "Gut!"]);
    assert_eq!(ann.tokens.len(), 5);
    assert_eq!(ann.tokens[3].position, 3);
    assert_eq!(ann.tokens[3].sentence, 1);
    assert_eq!(ann.tokens[1].lemma, "arzt");
    assert_eq!(ann.tokens[1].gender, Gender::Masculine);
    assert_eq!(ann.tokens[1].case, GrammaticalCase::Nominative);
    assert!(!ann.tokens[2].is_word);
    assert_eq!(ann.word_tokens().count(), 3);

    let ctx = ann.contexts();
    assert_eq!(ctx[&4].sentence, "Gut!");
    assert_eq!(ctx[&1].surface, "Arzt");
  }
}
