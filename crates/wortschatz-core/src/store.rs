//! The `LearningStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `wortschatz-store-sqlite`). The pipeline, planner and scheduler in this
//! crate, and the HTTP layer above them, depend on this abstraction only.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  activity::{
    NewScenario, NewTranslationAttempt, Scenario, TranslationAttempt,
    WordClickEvent,
  },
  document::{Document, NewDocument, TokenPayload, TokenRelation},
  knowledge::{
    DueCard, KnowledgeState, ProficiencyLevel, ReviewEvent, Transition,
    UserProfile,
  },
  planner::CandidateRow,
  vocabulary::VocabularyItem,
};

/// Abstraction over a Wortschatz storage backend.
///
/// Documents, relations, vocabulary items and review events are never
/// updated once written. Knowledge states are the only mutable rows and are
/// changed exclusively through [`LearningStore::apply_review`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LearningStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Documents & vocabulary ────────────────────────────────────────────

  /// Atomically create the document, reconcile the vocabulary catalog
  /// against the token signatures, and bulk-insert one relation per token.
  ///
  /// Concurrent calls introducing the same signature must converge on a
  /// single vocabulary item. If any step fails nothing is persisted.
  fn persist_document(
    &self,
    document: NewDocument,
    tokens: Vec<TokenPayload>,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Retrieve a document by id. Returns `None` if not found.
  fn get_document(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// All relations of a document with their vocabulary items, ordered by
  /// position.
  fn document_relations(
    &self,
    document_id: i64,
  ) -> impl Future<Output = Result<Vec<TokenRelation>, Self::Error>> + Send + '_;

  /// All vocabulary items sharing `lemma` (any part of speech or gender).
  fn find_vocabulary(
    &self,
    lemma: String,
  ) -> impl Future<Output = Result<Vec<VocabularyItem>, Self::Error>> + Send + '_;

  /// The most recently created document containing the vocabulary item.
  fn latest_document_with(
    &self,
    vocabulary_id: i64,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  // ── Knowledge ledger ──────────────────────────────────────────────────

  /// Relations of a document joined with the user's knowledge state (if
  /// any), ordered by `(vocabulary id, position)`. With `focus` set, only
  /// relations of that vocabulary item are returned.
  fn candidate_rows(
    &self,
    document_id: i64,
    user_id: i64,
    focus: Option<i64>,
  ) -> impl Future<Output = Result<Vec<CandidateRow>, Self::Error>> + Send + '_;

  /// Get-or-create knowledge states for the given items. Defaults
  /// (`retention_level = 0`, `next_review_at = now`) apply only on first
  /// creation; existing rows are returned untouched.
  fn ensure_knowledge(
    &self,
    user_id: i64,
    vocabulary_ids: Vec<i64>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<KnowledgeState>, Self::Error>> + Send + '_;

  /// A knowledge state owned by `user_id`. Returns `None` if it does not
  /// exist or belongs to someone else.
  fn get_knowledge(
    &self,
    id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<KnowledgeState>, Self::Error>> + Send + '_;

  /// Cards with `next_review_at <= now`, soonest first.
  fn due_cards(
    &self,
    user_id: i64,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DueCard>, Self::Error>> + Send + '_;

  /// In one transaction: capture the previous level and due date, apply
  /// `transition`, and append the matching [`ReviewEvent`]. Returns `None`
  /// (and writes nothing) if no state matches `(knowledge_id, user_id)`.
  fn apply_review(
    &self,
    knowledge_id: i64,
    user_id: i64,
    transition: Transition,
  ) -> impl Future<
    Output = Result<Option<(KnowledgeState, ReviewEvent)>, Self::Error>,
  > + Send
  + '_;

  /// Audit trail of one card, newest first.
  fn review_events(
    &self,
    knowledge_id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<ReviewEvent>, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn get_or_create_profile(
    &self,
    user_id: i64,
    default_level: ProficiencyLevel,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  fn set_proficiency_level(
    &self,
    user_id: i64,
    level: ProficiencyLevel,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  // ── Activity & scenarios ──────────────────────────────────────────────

  fn record_word_click(
    &self,
    user_id: i64,
    document_id: i64,
    vocabulary_id: i64,
  ) -> impl Future<Output = Result<WordClickEvent, Self::Error>> + Send + '_;

  fn record_translation_attempt(
    &self,
    attempt: NewTranslationAttempt,
  ) -> impl Future<Output = Result<TranslationAttempt, Self::Error>> + Send + '_;

  /// Insert scenarios, skipping texts that already exist. Returns the number
  /// of rows actually inserted.
  fn add_scenarios(
    &self,
    scenarios: Vec<NewScenario>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Active scenarios of one level, in insertion order.
  fn list_scenarios(
    &self,
    level: ProficiencyLevel,
  ) -> impl Future<Output = Result<Vec<Scenario>, Self::Error>> + Send + '_;
}
