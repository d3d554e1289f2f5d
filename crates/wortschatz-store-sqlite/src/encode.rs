//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that SQL string comparison orders them
//! chronologically. Enums are stored as lowercase words or tag strings.

use chrono::{DateTime, SecondsFormat, Utc};
use wortschatz_core::{
  activity::{Scenario, TranslationAttempt, WordClickEvent},
  document::{Document, GrammaticalCase, TokenRelation},
  knowledge::{
    DueCard, KnowledgeState, ProficiencyLevel, ReviewEvent, ReviewScore,
    UserProfile,
  },
  planner::CandidateRow,
  vocabulary::{Gender, PartOfSpeech, VocabularyItem},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Gender ──────────────────────────────────────────────────────────────────

pub fn encode_gender(g: Gender) -> &'static str {
  match g {
    Gender::Masculine => "masculine",
    Gender::Feminine => "feminine",
    Gender::Neuter => "neuter",
    Gender::None => "none",
  }
}

pub fn decode_gender(s: &str) -> Result<Gender> {
  match s {
    "masculine" => Ok(Gender::Masculine),
    "feminine" => Ok(Gender::Feminine),
    "neuter" => Ok(Gender::Neuter),
    "none" => Ok(Gender::None),
    other => Err(Error::Decode(format!("unknown gender: {other:?}"))),
  }
}

// ─── GrammaticalCase ─────────────────────────────────────────────────────────

pub fn encode_case(c: GrammaticalCase) -> &'static str {
  match c {
    GrammaticalCase::Nominative => "nominative",
    GrammaticalCase::Accusative => "accusative",
    GrammaticalCase::Dative => "dative",
    GrammaticalCase::Genitive => "genitive",
    GrammaticalCase::None => "none",
  }
}

pub fn decode_case(s: &str) -> Result<GrammaticalCase> {
  match s {
    "nominative" => Ok(GrammaticalCase::Nominative),
    "accusative" => Ok(GrammaticalCase::Accusative),
    "dative" => Ok(GrammaticalCase::Dative),
    "genitive" => Ok(GrammaticalCase::Genitive),
    "none" => Ok(GrammaticalCase::None),
    other => Err(Error::Decode(format!("unknown case: {other:?}"))),
  }
}

// ─── Small integers ──────────────────────────────────────────────────────────

pub fn decode_level(v: i64) -> Result<u8> {
  u8::try_from(v).map_err(|_| Error::Decode(format!("retention level {v}")))
}

pub fn decode_position(v: i64) -> Result<usize> {
  usize::try_from(v).map_err(|_| Error::Decode(format!("position {v}")))
}

fn decode_proficiency(s: &str) -> Result<ProficiencyLevel> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawDocument`], for `d`-aliased `documents`.
pub const DOCUMENT_COLUMNS: &str =
  "d.id, d.title, d.raw_text, d.complexity_score, d.created_at, d.owner_id";

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub id:               i64,
  pub title:            String,
  pub raw_text:         String,
  pub complexity_score: f64,
  pub created_at:       String,
  pub owner_id:         Option<i64>,
}

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(at)?,
      title:            row.get(at + 1)?,
      raw_text:         row.get(at + 2)?,
      complexity_score: row.get(at + 3)?,
      created_at:       row.get(at + 4)?,
      owner_id:         row.get(at + 5)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      id:               self.id,
      title:            self.title,
      raw_text:         self.raw_text,
      complexity_score: self.complexity_score,
      created_at:       decode_dt(&self.created_at)?,
      owner:            self.owner_id,
    })
  }
}

/// Column list matching [`RawVocabulary`], for `v`-aliased
/// `vocabulary_items`.
pub const VOCABULARY_COLUMNS: &str = "v.id, v.lemma, v.pos_tag, v.gender";

pub struct RawVocabulary {
  pub id:      i64,
  pub lemma:   String,
  pub pos_tag: String,
  pub gender:  String,
}

impl RawVocabulary {
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:      row.get(at)?,
      lemma:   row.get(at + 1)?,
      pos_tag: row.get(at + 2)?,
      gender:  row.get(at + 3)?,
    })
  }

  pub fn into_item(self) -> Result<VocabularyItem> {
    Ok(VocabularyItem {
      id:     self.id,
      lemma:  self.lemma,
      pos:    PartOfSpeech::from_tag(&self.pos_tag),
      gender: decode_gender(&self.gender)?,
    })
  }
}

/// Column list matching [`RawKnowledge`], for `k`-aliased
/// `knowledge_states`.
pub const KNOWLEDGE_COLUMNS: &str = "k.id, k.user_id, k.vocabulary_id, \
                                     k.retention_level, k.next_review_at, \
                                     k.updated_at";

pub struct RawKnowledge {
  pub id:              i64,
  pub user_id:         i64,
  pub vocabulary_id:   i64,
  pub retention_level: i64,
  pub next_review_at:  String,
  pub updated_at:      String,
}

impl RawKnowledge {
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(at)?,
      user_id:         row.get(at + 1)?,
      vocabulary_id:   row.get(at + 2)?,
      retention_level: row.get(at + 3)?,
      next_review_at:  row.get(at + 4)?,
      updated_at:      row.get(at + 5)?,
    })
  }

  /// Read the same columns from a LEFT JOIN, where a missing row shows up
  /// as a NULL id.
  pub fn from_optional_row(
    row: &rusqlite::Row<'_>,
    at: usize,
  ) -> rusqlite::Result<Option<Self>> {
    let id: Option<i64> = row.get(at)?;
    match id {
      Some(_) => Self::from_row(row, at).map(Some),
      None => Ok(None),
    }
  }

  pub fn into_state(self) -> Result<KnowledgeState> {
    Ok(KnowledgeState {
      id:              self.id,
      user_id:         self.user_id,
      vocabulary_id:   self.vocabulary_id,
      retention_level: decode_level(self.retention_level)?,
      next_review_at:  decode_dt(&self.next_review_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// A relation joined with its vocabulary item.
pub struct RawRelation {
  pub id:          i64,
  pub document_id: i64,
  pub position:    i64,
  pub case:        String,
  pub word:        RawVocabulary,
}

impl RawRelation {
  pub fn into_relation(self) -> Result<TokenRelation> {
    Ok(TokenRelation {
      id:          self.id,
      document_id: self.document_id,
      position:    decode_position(self.position)?,
      case:        decode_case(&self.case)?,
      word:        self.word.into_item()?,
    })
  }
}

/// A relation joined with its vocabulary item and the user's knowledge row.
pub struct RawCandidate {
  pub relation_id: i64,
  pub position:    i64,
  pub case:        String,
  pub word:        RawVocabulary,
  pub knowledge:   Option<RawKnowledge>,
}

impl RawCandidate {
  pub fn into_row(self) -> Result<CandidateRow> {
    Ok(CandidateRow {
      relation_id: self.relation_id,
      position:    decode_position(self.position)?,
      case:        decode_case(&self.case)?,
      word:        self.word.into_item()?,
      knowledge:   self.knowledge.map(RawKnowledge::into_state).transpose()?,
    })
  }
}

pub struct RawDueCard {
  pub knowledge: RawKnowledge,
  pub word:      RawVocabulary,
}

impl RawDueCard {
  pub fn into_card(self) -> Result<DueCard> {
    Ok(DueCard {
      knowledge: self.knowledge.into_state()?,
      word:      self.word.into_item()?,
    })
  }
}

pub const REVIEW_EVENT_COLUMNS: &str = "id, user_id, knowledge_id, score, \
                                        previous_retention_level, \
                                        new_retention_level, \
                                        previous_next_review_at, \
                                        new_next_review_at, created_at";

pub struct RawReviewEvent {
  pub id:                       i64,
  pub user_id:                  i64,
  pub knowledge_id:             i64,
  pub score:                    i64,
  pub previous_retention_level: i64,
  pub new_retention_level:      i64,
  pub previous_next_review_at:  String,
  pub new_next_review_at:       String,
  pub created_at:               String,
}

impl RawReviewEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                       row.get(0)?,
      user_id:                  row.get(1)?,
      knowledge_id:             row.get(2)?,
      score:                    row.get(3)?,
      previous_retention_level: row.get(4)?,
      new_retention_level:      row.get(5)?,
      previous_next_review_at:  row.get(6)?,
      new_next_review_at:       row.get(7)?,
      created_at:               row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<ReviewEvent> {
    Ok(ReviewEvent {
      id:                       self.id,
      user_id:                  self.user_id,
      knowledge_id:             self.knowledge_id,
      score:                    ReviewScore::try_from(self.score)?,
      previous_retention_level: decode_level(self.previous_retention_level)?,
      new_retention_level:      decode_level(self.new_retention_level)?,
      previous_next_review_at:  decode_dt(&self.previous_next_review_at)?,
      new_next_review_at:       decode_dt(&self.new_next_review_at)?,
      created_at:               decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawProfile {
  pub user_id:           i64,
  pub proficiency_level: String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<UserProfile> {
    Ok(UserProfile {
      user_id:           self.user_id,
      proficiency_level: decode_proficiency(&self.proficiency_level)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawWordClick {
  pub id:            i64,
  pub user_id:       i64,
  pub document_id:   i64,
  pub vocabulary_id: i64,
  pub created_at:    String,
}

impl RawWordClick {
  pub fn into_event(self) -> Result<WordClickEvent> {
    Ok(WordClickEvent {
      id:            self.id,
      user_id:       self.user_id,
      document_id:   self.document_id,
      vocabulary_id: self.vocabulary_id,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawTranslationAttempt {
  pub id:               i64,
  pub user_id:          i64,
  pub challenge_pt:     String,
  pub attempt_de:       String,
  pub context_original: String,
  pub is_correct:       bool,
  pub feedback:         String,
  pub suggested_de:     String,
  pub created_at:       String,
}

impl RawTranslationAttempt {
  pub fn into_attempt(self) -> Result<TranslationAttempt> {
    Ok(TranslationAttempt {
      id:               self.id,
      user_id:          self.user_id,
      challenge_pt:     self.challenge_pt,
      attempt_de:       self.attempt_de,
      context_original: self.context_original,
      is_correct:       self.is_correct,
      feedback:         self.feedback,
      suggested_de:     self.suggested_de,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawScenario {
  pub id:                i64,
  pub text:              String,
  pub proficiency_level: String,
  pub is_active:         bool,
  pub created_at:        String,
}

impl RawScenario {
  pub fn into_scenario(self) -> Result<Scenario> {
    Ok(Scenario {
      id:                self.id,
      text:              self.text,
      proficiency_level: decode_proficiency(&self.proficiency_level)?,
      is_active:         self.is_active,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let early = Utc.with_ymd_and_hms(2025, 1, 9, 23, 59, 59).unwrap();
    let late = early + chrono::Duration::microseconds(1);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
    assert!(encode_dt(early).ends_with('Z'));
  }

  #[test]
  fn unknown_enum_values_are_rejected() {
    assert!(matches!(decode_gender("other"), Err(Error::Decode(_))));
    assert!(matches!(decode_case("vocative"), Err(Error::Decode(_))));
    assert!(matches!(decode_level(-1), Err(Error::Decode(_))));
  }
}
