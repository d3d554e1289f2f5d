//! Documents and their position-indexed token relations.
//!
//! A document is immutable after creation. Its relations are written once,
//! in bulk, in the same transaction as the document row, and cascade when
//! the document is deleted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  annotate::Annotation,
  vocabulary::{Signature, VocabularyItem},
};

/// Upper bound of the complexity scale.
pub const MAX_COMPLEXITY: f64 = 99.99;

// ─── Grammatical case ────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GrammaticalCase {
  Nominative,
  Accusative,
  Dative,
  Genitive,
  #[default]
  None,
}

impl GrammaticalCase {
  /// Map a morphological `Case` feature value (`Nom`, `Acc`, `Dat`, `Gen`).
  pub fn from_feature(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      Some("Nom") => Self::Nominative,
      Some("Acc") => Self::Accusative,
      Some("Dat") => Self::Dative,
      Some("Gen") => Self::Genitive,
      _ => Self::None,
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub id:               i64,
  pub title:            String,
  pub raw_text:         String,
  /// In `[0, 99.99]`, two decimal places.
  pub complexity_score: f64,
  pub created_at:       DateTime<Utc>,
  pub owner:            Option<i64>,
}

/// Input to [`crate::store::LearningStore::persist_document`].
/// `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub title:            String,
  pub raw_text:         String,
  pub complexity_score: f64,
  pub owner:            Option<i64>,
}

/// A word token ready for persistence: its signature plus where it occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
  pub signature: Signature,
  pub position:  usize,
  pub case:      GrammaticalCase,
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// Links one document position to exactly one vocabulary item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRelation {
  pub id:          i64,
  pub document_id: i64,
  pub position:    usize,
  pub case:        GrammaticalCase,
  pub word:        VocabularyItem,
}

/// A document together with its relations, ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetail {
  pub document: Document,
  pub tokens:   Vec<TokenRelation>,
}

// ─── Complexity ──────────────────────────────────────────────────────────────

/// `clamp(0.7 × mean word tokens per sentence + 30 × lexical diversity)`,
/// rounded to two decimals.
///
/// Lexical diversity is distinct lemmas over word tokens. Either term is 0
/// when there are no sentences or no word tokens.
pub fn complexity_score(annotation: &Annotation) -> f64 {
  let sentence_count = annotation.sentences.len();
  let words: Vec<_> = annotation.word_tokens().collect();

  let mean_sentence_length = if sentence_count == 0 {
    0.0
  } else {
    words.len() as f64 / sentence_count as f64
  };

  let lexical_diversity = if words.is_empty() {
    0.0
  } else {
    let distinct: HashSet<String> =
      words.iter().map(|t| t.lemma.trim().to_lowercase()).collect();
    distinct.len() as f64 / words.len() as f64
  };

  let score = (0.7 * mean_sentence_length + 30.0 * lexical_diversity)
    .clamp(0.0, MAX_COMPLEXITY);
  (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::annotate::AnnotatedToken;
  use crate::vocabulary::{Gender, PartOfSpeech};

  fn tok(position: usize, lemma: &str, sentence: usize, is_word: bool) -> AnnotatedToken {
    AnnotatedToken {
      position,
      surface: lemma.into(),
      lemma: lemma.into(),
      pos: PartOfSpeech::Noun,
      gender: Gender::None,
      case: GrammaticalCase::None,
      dependency: String::new(),
      sentence,
      is_word,
    }
  }

  #[test]
  fn empty_annotation_scores_zero() {
    assert_eq!(complexity_score(&Annotation::default()), 0.0);
  }

  #[test]
  fn punctuation_only_scores_zero() {
    let ann = Annotation {
      sentences: vec!["...".into()],
      tokens:    vec![tok(0, ".", 0, false), tok(1, ".", 0, false)],
    };
    assert_eq!(complexity_score(&ann), 0.0);
  }

  #[test]
  fn mixes_sentence_length_and_diversity() {
    // 2 sentences, 4 words, 3 distinct lemmas:
    // 0.7 × 2 + 30 × 0.75 = 23.9
    let ann = Annotation {
      sentences: vec!["a b.".into(), "a c.".into()],
      tokens:    vec![
        tok(0, "a", 0, true),
        tok(1, "b", 0, true),
        tok(2, ".", 0, false),
        tok(3, "a", 1, true),
        tok(4, "c", 1, true),
        tok(5, ".", 1, false),
      ],
    };
    assert_eq!(complexity_score(&ann), 23.9);
  }

  #[test]
  fn long_sentences_clamp_at_upper_bound() {
    let tokens = (0..200).map(|i| tok(i, &format!("w{i}"), 0, true)).collect();
    let ann = Annotation { sentences: vec!["long".into()], tokens };
    assert_eq!(complexity_score(&ann), MAX_COMPLEXITY);
  }

  #[test]
  fn cases_map_from_features() {
    assert_eq!(GrammaticalCase::from_feature(Some("Dat")), GrammaticalCase::Dative);
    assert_eq!(GrammaticalCase::from_feature(Some("Voc")), GrammaticalCase::None);
    assert_eq!(GrammaticalCase::from_feature(None), GrammaticalCase::None);
  }
}
