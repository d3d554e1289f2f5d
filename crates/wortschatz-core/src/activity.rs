//! Learner activity records and the clinical scenario catalog.
//!
//! Click events and translation attempts are append-only; they exist for
//! later analysis and are never read back by the scheduling logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::ProficiencyLevel;

/// A focus-word study request: the user clicked a word in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordClickEvent {
  pub id:            i64,
  pub user_id:       i64,
  pub document_id:   i64,
  pub vocabulary_id: i64,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::LearningStore::record_translation_attempt`].
#[derive(Debug, Clone)]
pub struct NewTranslationAttempt {
  pub user_id:          i64,
  /// Portuguese prompt the learner had to translate.
  pub challenge_pt:     String,
  /// The learner's German answer.
  pub attempt_de:       String,
  pub context_original: String,
  pub is_correct:       bool,
  pub feedback:         String,
  pub suggested_de:     String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationAttempt {
  pub id:               i64,
  pub user_id:          i64,
  pub challenge_pt:     String,
  pub attempt_de:       String,
  pub context_original: String,
  pub is_correct:       bool,
  pub feedback:         String,
  pub suggested_de:     String,
  pub created_at:       DateTime<Utc>,
}

/// A short practice text, graded by CEFR level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
  pub id:                i64,
  pub text:              String,
  pub proficiency_level: ProficiencyLevel,
  pub is_active:         bool,
  pub created_at:        DateTime<Utc>,
}

/// One entry of a scenario seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScenario {
  pub text:              String,
  pub proficiency_level: ProficiencyLevel,
}
