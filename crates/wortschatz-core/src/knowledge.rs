//! The knowledge ledger: per-user retention state for each vocabulary item,
//! the append-only review audit trail, and the user's proficiency profile.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, vocabulary::VocabularyItem};

/// Highest retention level a card can hold.
pub const MAX_RETENTION_LEVEL: u8 = 5;

// ─── Knowledge state ─────────────────────────────────────────────────────────

/// One row per (user, vocabulary item).
///
/// Created with `retention_level = 0` and `next_review_at = now` the first
/// time the item is surfaced to the user; afterwards mutated only by the
/// review scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeState {
  pub id:              i64,
  pub user_id:         i64,
  pub vocabulary_id:   i64,
  /// 0 = never reviewed.
  pub retention_level: u8,
  pub next_review_at:  DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl KnowledgeState {
  /// Level 0 cards are always due; others once `next_review_at` has passed.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.retention_level == 0 || self.next_review_at <= now
  }
}

/// A knowledge state joined with its vocabulary item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueCard {
  pub knowledge: KnowledgeState,
  pub word:      VocabularyItem,
}

// ─── Review score ────────────────────────────────────────────────────────────

/// A validated review score in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ReviewScore(u8);

impl ReviewScore {
  pub fn value(self) -> u8 { self.0 }

  /// Days until the next review: 1 → 1, 2 → 2, 3 → 3, 4 → 7.
  pub fn interval(self) -> Duration {
    let days = match self.0 {
      1 => 1,
      2 => 2,
      3 => 3,
      _ => 7,
    };
    Duration::days(days)
  }
}

impl TryFrom<i64> for ReviewScore {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> {
    match value {
      1..=4 => Ok(Self(value as u8)),
      other => Err(Error::InvalidScore(other)),
    }
  }
}

impl From<ReviewScore> for i64 {
  fn from(score: ReviewScore) -> Self { i64::from(score.0) }
}

impl fmt::Display for ReviewScore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Review event ────────────────────────────────────────────────────────────

/// Append-only audit row for one scheduling transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
  pub id:                       i64,
  pub user_id:                  i64,
  pub knowledge_id:             i64,
  pub score:                    ReviewScore,
  pub previous_retention_level: u8,
  pub new_retention_level:      u8,
  pub previous_next_review_at:  DateTime<Utc>,
  pub new_next_review_at:       DateTime<Utc>,
  pub created_at:               DateTime<Utc>,
}

/// The mutation a review applies, computed before touching storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
  pub score:               ReviewScore,
  pub new_retention_level: u8,
  pub new_next_review_at:  DateTime<Utc>,
  pub reviewed_at:         DateTime<Utc>,
}

impl Transition {
  /// The new level is the score itself (an overwrite, not an increment);
  /// the interval is measured from `now`, not from the old due date.
  pub fn for_score(score: ReviewScore, now: DateTime<Utc>) -> Self {
    Self {
      score,
      new_retention_level: score.value().min(MAX_RETENTION_LEVEL),
      new_next_review_at: now + score.interval(),
      reviewed_at: now,
    }
  }
}

// ─── Proficiency ─────────────────────────────────────────────────────────────

/// CEFR level the learner studies at.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum ProficiencyLevel {
  A1,
  #[default]
  B1,
  C1,
}

impl ProficiencyLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::A1 => "A1",
      Self::B1 => "B1",
      Self::C1 => "C1",
    }
  }
}

impl std::str::FromStr for ProficiencyLevel {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_uppercase().as_str() {
      "A1" => Ok(Self::A1),
      "B1" => Ok(Self::B1),
      "C1" => Ok(Self::C1),
      other => Err(Error::InvalidInput(format!(
        "unknown proficiency level {other:?}; use A1, B1 or C1"
      ))),
    }
  }
}

impl fmt::Display for ProficiencyLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:           i64,
  pub proficiency_level: ProficiencyLevel,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn scores_outside_range_are_rejected() {
    for bad in [-1, 0, 5, 100] {
      assert!(matches!(
        ReviewScore::try_from(bad),
        Err(Error::InvalidScore(v)) if v == bad
      ));
    }
  }

  #[test]
  fn transition_table() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let expected = [(1, 1), (2, 2), (3, 3), (4, 7)];
    for (score, days) in expected {
      let t = Transition::for_score(ReviewScore::try_from(score).unwrap(), now);
      assert_eq!(t.new_retention_level as i64, score);
      assert_eq!(t.new_next_review_at, now + Duration::days(days));
    }
  }

  #[test]
  fn level_zero_is_always_due() {
    let now = Utc::now();
    let mut state = KnowledgeState {
      id:              1,
      user_id:         1,
      vocabulary_id:   1,
      retention_level: 0,
      next_review_at:  now + Duration::days(30),
      updated_at:      now,
    };
    assert!(state.is_due(now));
    state.retention_level = 2;
    assert!(!state.is_due(now));
    state.next_review_at = now;
    assert!(state.is_due(now));
  }

  #[test]
  fn score_deserialises_with_validation() {
    let ok: ReviewScore = serde_json::from_str("4").unwrap();
    assert_eq!(ok.value(), 4);
    assert!(serde_json::from_str::<ReviewScore>("7").is_err());
  }

  #[test]
  fn levels_parse_case_insensitively() {
    assert_eq!("c1".parse::<ProficiencyLevel>().unwrap(), ProficiencyLevel::C1);
    assert!("B2".parse::<ProficiencyLevel>().is_err());
  }
}
