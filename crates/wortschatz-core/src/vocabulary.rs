//! Vocabulary items: the deduplicated catalog of (lemma, part of speech,
//! gender) triples.
//!
//! Items are created lazily the first time ingestion meets a new triple and
//! are never updated or deleted afterwards; review history references them.

use serde::{Deserialize, Serialize};

// ─── Part of speech ──────────────────────────────────────────────────────────

/// Coarse part-of-speech tag (Universal Dependencies tag set).
///
/// Tags outside the set map to [`PartOfSpeech::Other`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartOfSpeech {
  Noun,
  Verb,
  Adj,
  Adv,
  Pron,
  Adp,
  Aux,
  Cconj,
  Sconj,
  Det,
  Intj,
  Num,
  Part,
  Propn,
  Punct,
  Sym,
  #[serde(rename = "X")]
  Other,
}

impl PartOfSpeech {
  /// Map an annotator tag onto the closed set. Unknown tags become `Other`.
  pub fn from_tag(tag: &str) -> Self {
    match tag.trim().to_ascii_uppercase().as_str() {
      "NOUN" => Self::Noun,
      "VERB" => Self::Verb,
      "ADJ" => Self::Adj,
      "ADV" => Self::Adv,
      "PRON" => Self::Pron,
      "ADP" => Self::Adp,
      "AUX" => Self::Aux,
      "CCONJ" => Self::Cconj,
      "SCONJ" => Self::Sconj,
      "DET" => Self::Det,
      "INTJ" => Self::Intj,
      "NUM" => Self::Num,
      "PART" => Self::Part,
      "PROPN" => Self::Propn,
      "PUNCT" => Self::Punct,
      "SYM" => Self::Sym,
      _ => Self::Other,
    }
  }

  /// The tag string stored in the `pos_tag` column.
  pub fn as_tag(self) -> &'static str {
    match self {
      Self::Noun => "NOUN",
      Self::Verb => "VERB",
      Self::Adj => "ADJ",
      Self::Adv => "ADV",
      Self::Pron => "PRON",
      Self::Adp => "ADP",
      Self::Aux => "AUX",
      Self::Cconj => "CCONJ",
      Self::Sconj => "SCONJ",
      Self::Det => "DET",
      Self::Intj => "INTJ",
      Self::Num => "NUM",
      Self::Part => "PART",
      Self::Propn => "PROPN",
      Self::Punct => "PUNCT",
      Self::Sym => "SYM",
      Self::Other => "X",
    }
  }
}

// ─── Gender ──────────────────────────────────────────────────────────────────

/// Morphological gender. Absent or unrecognised values map to `None`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Masculine,
  Feminine,
  Neuter,
  #[default]
  None,
}

impl Gender {
  /// Map a morphological feature value (`Masc`, `Fem`, `Neut`).
  pub fn from_feature(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      Some("Masc") => Self::Masculine,
      Some("Fem") => Self::Feminine,
      Some("Neut") => Self::Neuter,
      _ => Self::None,
    }
  }

  /// German definite article for nouns, used when building study prompts.
  pub fn article(self) -> Option<&'static str> {
    match self {
      Self::Masculine => Some("der"),
      Self::Feminine => Some("die"),
      Self::Neuter => Some("das"),
      Self::None => None,
    }
  }
}

// ─── Signature & item ────────────────────────────────────────────────────────

/// The identity of a vocabulary item. Unique across the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
  /// Lowercase, trimmed dictionary form.
  pub lemma:  String,
  pub pos:    PartOfSpeech,
  pub gender: Gender,
}

/// A persisted vocabulary item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
  pub id:     i64,
  pub lemma:  String,
  pub pos:    PartOfSpeech,
  pub gender: Gender,
}

impl VocabularyItem {
  pub fn signature(&self) -> Signature {
    Signature {
      lemma:  self.lemma.clone(),
      pos:    self.pos,
      gender: self.gender,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_pos_tags_map_to_other() {
    assert_eq!(PartOfSpeech::from_tag("NOUN"), PartOfSpeech::Noun);
    assert_eq!(PartOfSpeech::from_tag("propn"), PartOfSpeech::Propn);
    assert_eq!(PartOfSpeech::from_tag("SPACE"), PartOfSpeech::Other);
    assert_eq!(PartOfSpeech::from_tag(""), PartOfSpeech::Other);
  }

  #[test]
  fn gender_features() {
    assert_eq!(Gender::from_feature(Some("Masc")), Gender::Masculine);
    assert_eq!(Gender::from_feature(Some("Neut")), Gender::Neuter);
    assert_eq!(Gender::from_feature(Some("Masc,Fem")), Gender::None);
    assert_eq!(Gender::from_feature(None), Gender::None);
  }

  #[test]
  fn tag_round_trip_is_stable() {
    for pos in [PartOfSpeech::Noun, PartOfSpeech::Cconj, PartOfSpeech::Other] {
      assert_eq!(PartOfSpeech::from_tag(pos.as_tag()), pos);
    }
  }
}
