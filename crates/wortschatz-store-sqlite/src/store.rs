//! [`SqliteStore`], the SQLite implementation of [`LearningStore`].

use std::{
  collections::{BTreeSet, HashMap},
  path::Path,
  time::Duration,
};

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use wortschatz_core::{
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
  store::LearningStore,
  vocabulary::{Signature, VocabularyItem},
};

use crate::{
  Result,
  encode::{
    DOCUMENT_COLUMNS, KNOWLEDGE_COLUMNS, REVIEW_EVENT_COLUMNS,
    RawCandidate, RawDocument, RawDueCard, RawKnowledge, RawProfile,
    RawRelation, RawReviewEvent, RawScenario, RawTranslationAttempt,
    RawVocabulary, RawWordClick, VOCABULARY_COLUMNS, encode_case, encode_dt,
    encode_gender,
  },
  schema::SCHEMA,
};

/// How long a writer waits for a competing transaction before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Current time at the precision the timestamp columns keep.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// Key of the signature → vocabulary id map built during ingestion.
type SignatureKey = (String, &'static str, &'static str);

fn signature_key(sig: &Signature) -> SignatureKey {
  (sig.lemma.clone(), sig.pos.as_tag(), encode_gender(sig.gender))
}

/// Vocabulary ids as read back from the catalog, keyed by column values.
type IdMap = HashMap<(String, String, String), i64>;

fn lookup(ids: &IdMap, (lemma, pos, gender): &SignatureKey) -> Option<i64> {
  ids
    .get(&(lemma.clone(), (*pos).to_owned(), (*gender).to_owned()))
    .copied()
}

fn profile_row(
  conn: &rusqlite::Connection,
  user_id: i64,
) -> rusqlite::Result<RawProfile> {
  conn.query_row(
    "SELECT user_id, proficiency_level, created_at, updated_at
     FROM user_profiles WHERE user_id = ?1",
    rusqlite::params![user_id],
    |row| {
      Ok(RawProfile {
        user_id:           row.get(0)?,
        proficiency_level: row.get(1)?,
        created_at:        row.get(2)?,
        updated_at:        row.get(3)?,
      })
    },
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Wortschatz learning store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of vocabulary items with the given signature (0 or 1).
  pub async fn count_signature(&self, signature: &Signature) -> Result<usize> {
    let (lemma, pos, gender) = signature_key(signature);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM vocabulary_items
           WHERE lemma = ?1 AND pos_tag = ?2 AND gender = ?3",
          rusqlite::params![lemma, pos, gender],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as usize)
  }

  /// Number of documents stored.
  pub async fn count_documents(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?)
      })
      .await?;
    Ok(count as usize)
  }
}

// ─── LearningStore impl ──────────────────────────────────────────────────────

impl LearningStore for SqliteStore {
  type Error = crate::Error;

  // ── Documents & vocabulary ────────────────────────────────────────────────

  async fn persist_document(
    &self,
    document: NewDocument,
    tokens: Vec<TokenPayload>,
  ) -> Result<Document> {
    let created_at = now();
    let created_at_str = encode_dt(created_at);
    let title = document.title.clone();
    let raw_text = document.raw_text.clone();
    let score = document.complexity_score;
    let owner = document.owner;

    let signatures: BTreeSet<SignatureKey> =
      tokens.iter().map(|t| signature_key(&t.signature)).collect();
    let relations: Vec<(SignatureKey, i64, &'static str)> = tokens
      .iter()
      .map(|t| (signature_key(&t.signature), t.position as i64, encode_case(t.case)))
      .collect();

    let (id, inserted_words, inserted_relations) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
          "INSERT INTO documents (title, raw_text, complexity_score, created_at, owner_id)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![title, raw_text, score, created_at_str, owner],
        )?;
        let document_id = tx.last_insert_rowid();

        let lemmas: BTreeSet<&str> =
          signatures.iter().map(|(lemma, ..)| lemma.as_str()).collect();
        let read_ids = |tx: &rusqlite::Transaction<'_>| -> rusqlite::Result<IdMap> {
          let mut ids = IdMap::new();
          let mut stmt = tx.prepare_cached(
            "SELECT id, lemma, pos_tag, gender FROM vocabulary_items WHERE lemma = ?1",
          )?;
          for lemma in &lemmas {
            let rows = stmt.query_map(rusqlite::params![lemma], |row| {
              Ok((row.get::<_, i64>(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            for row in rows {
              let (id, lemma, pos, gender) = row?;
              ids.insert((lemma, pos, gender), id);
            }
          }
          Ok(ids)
        };

        // Signatures already in the catalog are reused; the rest are inserted.
        // A concurrent writer may win the race for a new signature, in which
        // case the UNIQUE constraint turns our insert into a no-op.
        let mut ids = read_ids(&tx)?;
        let missing: Vec<&SignatureKey> =
          signatures.iter().filter(|k| lookup(&ids, *k).is_none()).collect();
        let mut inserted_words = 0;
        if !missing.is_empty() {
          let mut insert = tx.prepare_cached(
            "INSERT OR IGNORE INTO vocabulary_items (lemma, pos_tag, gender)
             VALUES (?1, ?2, ?3)",
          )?;
          for key in missing {
            inserted_words += insert.execute(rusqlite::params![key.0, key.1, key.2])?;
          }
          drop(insert);
          ids = read_ids(&tx)?;
        }

        let mut inserted_relations = 0;
        {
          let mut insert = tx.prepare_cached(
            "INSERT INTO token_relations (document_id, vocabulary_id, position, grammatical_case)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (key, position, case) in &relations {
            let Some(vocabulary_id) = lookup(&ids, key) else {
              continue;
            };
            inserted_relations += insert.execute(rusqlite::params![
              document_id,
              vocabulary_id,
              position,
              case
            ])?;
          }
        }

        tx.commit()?;
        Ok((document_id, inserted_words, inserted_relations))
      })
      .await?;

    debug!(
      document_id = id,
      new_words = inserted_words,
      relations = inserted_relations,
      "persisted document"
    );

    Ok(Document {
      id,
      title: document.title,
      raw_text: document.raw_text,
      complexity_score: document.complexity_score,
      created_at,
      owner: document.owner,
    })
  }

  async fn get_document(&self, id: i64) -> Result<Option<Document>> {
    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.id = ?1"),
            rusqlite::params![id],
            |row| RawDocument::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn document_relations(&self, document_id: i64) -> Result<Vec<TokenRelation>> {
    let raws: Vec<RawRelation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT r.id, r.document_id, r.position, r.grammatical_case, {VOCABULARY_COLUMNS}
           FROM token_relations r
           JOIN vocabulary_items v ON v.id = r.vocabulary_id
           WHERE r.document_id = ?1
           ORDER BY r.position"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![document_id], |row| {
            Ok(RawRelation {
              id:          row.get(0)?,
              document_id: row.get(1)?,
              position:    row.get(2)?,
              case:        row.get(3)?,
              word:        RawVocabulary::from_row(row, 4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelation::into_relation).collect()
  }

  async fn find_vocabulary(&self, lemma: String) -> Result<Vec<VocabularyItem>> {
    let lemma = lemma.trim().to_lowercase();
    let raws: Vec<RawVocabulary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VOCABULARY_COLUMNS} FROM vocabulary_items v
           WHERE v.lemma = ?1 ORDER BY v.id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![lemma], |row| RawVocabulary::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVocabulary::into_item).collect()
  }

  async fn latest_document_with(&self, vocabulary_id: i64) -> Result<Option<Document>> {
    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {DOCUMENT_COLUMNS}
               FROM documents d
               JOIN token_relations r ON r.document_id = d.id
               WHERE r.vocabulary_id = ?1
               ORDER BY d.created_at DESC, d.id DESC
               LIMIT 1"
            ),
            rusqlite::params![vocabulary_id],
            |row| RawDocument::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  // ── Knowledge ledger ──────────────────────────────────────────────────────

  async fn candidate_rows(
    &self,
    document_id: i64,
    user_id: i64,
    focus: Option<i64>,
  ) -> Result<Vec<CandidateRow>> {
    let raws: Vec<RawCandidate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT r.id, r.position, r.grammatical_case, {VOCABULARY_COLUMNS}, {KNOWLEDGE_COLUMNS}
           FROM token_relations r
           JOIN vocabulary_items v ON v.id = r.vocabulary_id
           LEFT JOIN knowledge_states k
             ON k.vocabulary_id = v.id AND k.user_id = ?2
           WHERE r.document_id = ?1
             AND (?3 IS NULL OR v.id = ?3)
           ORDER BY v.id, r.position"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![document_id, user_id, focus], |row| {
            Ok(RawCandidate {
              relation_id: row.get(0)?,
              position:    row.get(1)?,
              case:        row.get(2)?,
              word:        RawVocabulary::from_row(row, 3)?,
              knowledge:   RawKnowledge::from_optional_row(row, 7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCandidate::into_row).collect()
  }

  async fn ensure_knowledge(
    &self,
    user_id: i64,
    vocabulary_ids: Vec<i64>,
    now: DateTime<Utc>,
  ) -> Result<Vec<KnowledgeState>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawKnowledge> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut rows = Vec::with_capacity(vocabulary_ids.len());
        {
          let mut insert = tx.prepare_cached(
            "INSERT OR IGNORE INTO knowledge_states
               (user_id, vocabulary_id, retention_level, next_review_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?3)",
          )?;
          let mut select = tx.prepare_cached(&format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_states k
             WHERE k.user_id = ?1 AND k.vocabulary_id = ?2"
          ))?;
          for vocabulary_id in vocabulary_ids {
            insert.execute(rusqlite::params![user_id, vocabulary_id, now_str])?;
            rows.push(select.query_row(rusqlite::params![user_id, vocabulary_id], |row| {
              RawKnowledge::from_row(row, 0)
            })?);
          }
        }
        tx.commit()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawKnowledge::into_state).collect()
  }

  async fn get_knowledge(&self, id: i64, user_id: i64) -> Result<Option<KnowledgeState>> {
    let raw: Option<RawKnowledge> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_states k
               WHERE k.id = ?1 AND k.user_id = ?2"
            ),
            rusqlite::params![id, user_id],
            |row| RawKnowledge::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawKnowledge::into_state).transpose()
  }

  async fn due_cards(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<DueCard>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawDueCard> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {KNOWLEDGE_COLUMNS}, {VOCABULARY_COLUMNS}
           FROM knowledge_states k
           JOIN vocabulary_items v ON v.id = k.vocabulary_id
           WHERE k.user_id = ?1 AND k.next_review_at <= ?2
           ORDER BY k.next_review_at, k.id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, now_str], |row| {
            Ok(RawDueCard {
              knowledge: RawKnowledge::from_row(row, 0)?,
              word:      RawVocabulary::from_row(row, 6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDueCard::into_card).collect()
  }

  async fn apply_review(
    &self,
    knowledge_id: i64,
    user_id: i64,
    transition: Transition,
  ) -> Result<Option<(KnowledgeState, ReviewEvent)>> {
    let score = i64::from(transition.score);
    let level = i64::from(transition.new_retention_level);
    let next_str = encode_dt(transition.new_next_review_at);
    let at_str = encode_dt(transition.reviewed_at);

    let raws: Option<(RawKnowledge, RawReviewEvent)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous: Option<(i64, String)> = tx
          .query_row(
            "SELECT retention_level, next_review_at FROM knowledge_states
             WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![knowledge_id, user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((previous_level, previous_next)) = previous else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE knowledge_states
           SET retention_level = ?1, next_review_at = ?2, updated_at = ?3
           WHERE id = ?4",
          rusqlite::params![level, next_str, at_str, knowledge_id],
        )?;
        tx.execute(
          "INSERT INTO review_events (
             user_id, knowledge_id, score,
             previous_retention_level, new_retention_level,
             previous_next_review_at, new_next_review_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            user_id,
            knowledge_id,
            score,
            previous_level,
            level,
            previous_next,
            next_str,
            at_str,
          ],
        )?;
        let event_id = tx.last_insert_rowid();

        let state = tx.query_row(
          &format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_states k WHERE k.id = ?1"),
          rusqlite::params![knowledge_id],
          |row| RawKnowledge::from_row(row, 0),
        )?;
        let event = tx.query_row(
          &format!("SELECT {REVIEW_EVENT_COLUMNS} FROM review_events WHERE id = ?1"),
          rusqlite::params![event_id],
          RawReviewEvent::from_row,
        )?;

        tx.commit()?;
        Ok(Some((state, event)))
      })
      .await?;

    raws
      .map(|(state, event)| Ok((state.into_state()?, event.into_event()?)))
      .transpose()
  }

  async fn review_events(&self, knowledge_id: i64, user_id: i64) -> Result<Vec<ReviewEvent>> {
    let raws: Vec<RawReviewEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_EVENT_COLUMNS} FROM review_events
           WHERE knowledge_id = ?1 AND user_id = ?2
           ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![knowledge_id, user_id], RawReviewEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReviewEvent::into_event).collect()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_or_create_profile(
    &self,
    user_id: i64,
    default_level: ProficiencyLevel,
  ) -> Result<UserProfile> {
    let level = default_level.as_str();
    let now_str = encode_dt(now());

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO user_profiles (user_id, proficiency_level, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)",
          rusqlite::params![user_id, level, now_str],
        )?;
        Ok(profile_row(conn, user_id)?)
      })
      .await?;

    raw.into_profile()
  }

  async fn set_proficiency_level(
    &self,
    user_id: i64,
    level: ProficiencyLevel,
  ) -> Result<UserProfile> {
    let level = level.as_str();
    let now_str = encode_dt(now());

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_profiles (user_id, proficiency_level, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)
           ON CONFLICT (user_id) DO UPDATE
             SET proficiency_level = excluded.proficiency_level,
                 updated_at        = excluded.updated_at",
          rusqlite::params![user_id, level, now_str],
        )?;
        Ok(profile_row(conn, user_id)?)
      })
      .await?;

    raw.into_profile()
  }

  // ── Activity & scenarios ──────────────────────────────────────────────────

  async fn record_word_click(
    &self,
    user_id: i64,
    document_id: i64,
    vocabulary_id: i64,
  ) -> Result<WordClickEvent> {
    let at_str = encode_dt(now());

    let raw: RawWordClick = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO word_click_events (user_id, document_id, vocabulary_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![user_id, document_id, vocabulary_id, at_str],
        )?;
        Ok(RawWordClick {
          id: conn.last_insert_rowid(),
          user_id,
          document_id,
          vocabulary_id,
          created_at: at_str,
        })
      })
      .await?;

    raw.into_event()
  }

  async fn record_translation_attempt(
    &self,
    attempt: NewTranslationAttempt,
  ) -> Result<TranslationAttempt> {
    let at_str = encode_dt(now());

    let raw: RawTranslationAttempt = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO translation_attempts (
             user_id, challenge_pt, attempt_de, context_original,
             is_correct, feedback, suggested_de, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            attempt.user_id,
            attempt.challenge_pt,
            attempt.attempt_de,
            attempt.context_original,
            attempt.is_correct,
            attempt.feedback,
            attempt.suggested_de,
            at_str,
          ],
        )?;
        Ok(RawTranslationAttempt {
          id:               conn.last_insert_rowid(),
          user_id:          attempt.user_id,
          challenge_pt:     attempt.challenge_pt,
          attempt_de:       attempt.attempt_de,
          context_original: attempt.context_original,
          is_correct:       attempt.is_correct,
          feedback:         attempt.feedback,
          suggested_de:     attempt.suggested_de,
          created_at:       at_str,
        })
      })
      .await?;

    raw.into_attempt()
  }

  async fn add_scenarios(&self, scenarios: Vec<NewScenario>) -> Result<usize> {
    let at_str = encode_dt(now());

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut insert = tx.prepare_cached(
            "INSERT OR IGNORE INTO scenarios (text, proficiency_level, is_active, created_at)
             VALUES (?1, ?2, 1, ?3)",
          )?;
          for scenario in &scenarios {
            let text = scenario.text.trim();
            if text.is_empty() {
              continue;
            }
            inserted += insert.execute(rusqlite::params![
              text,
              scenario.proficiency_level.as_str(),
              at_str
            ])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted)
  }

  async fn list_scenarios(&self, level: ProficiencyLevel) -> Result<Vec<Scenario>> {
    let level = level.as_str();

    let raws: Vec<RawScenario> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, text, proficiency_level, is_active, created_at
           FROM scenarios
           WHERE is_active = 1 AND proficiency_level = ?1
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![level], |row| {
            Ok(RawScenario {
              id:                row.get(0)?,
              text:              row.get(1)?,
              proficiency_level: row.get(2)?,
              is_active:         row.get(3)?,
              created_at:        row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawScenario::into_scenario).collect()
  }
}
