//! The study session planner.
//!
//! For one document and user: select the vocabulary items that need study,
//! attach their sentence context, and obtain pedagogical content from the
//! generator. Surfacing an item (creating its knowledge state) is committed
//! before generation starts and is not undone if generation fails.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  annotate::Annotator,
  cache::{
    ContextMap, ContextMemo, DEFAULT_CACHE_TTL, StudyCache, effective_ttl,
    study_key,
  },
  document::{Document, GrammaticalCase},
  generate::{
    ContentGenerator, DEFAULT_MAX_PAYLOAD_BYTES, GenerationError, MAX_EXAMPLES,
    Prompt, StudyContent, request_json,
  },
  knowledge::{KnowledgeState, ProficiencyLevel},
  store::LearningStore,
  vocabulary::{Gender, PartOfSpeech, VocabularyItem},
};

const STUDY_SYSTEM_PROMPT: &str = "Você é um Chefarzt (médico chefe) em um \
  hospital de Zurique treinando um médico que aprende alemão. Foco em jargão \
  clínico e nuances, sem explicações gramaticais longas. Para cada item de \
  estudo devolva UM objeto JSON com as chaves: 'examples' (até 3 frases \
  curtas em alemão usando a palavra), 'useful_phrase' (uma expressão clínica \
  natural com a palavra) e 'desafio' (uma frase curta em português, \
  contexto de plantão, com a mesma estrutura gramatical, para o aluno \
  traduzir mentalmente). Retorne APENAS o JSON puro, sem markdown.";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StudyConfig {
  /// Hard bound on each generator call.
  pub attempt_timeout:   Duration,
  /// Lifetime of cached focus-word content; raised to the cache floor.
  pub cache_ttl:         Duration,
  pub max_payload_bytes: usize,
  /// Level given to users without a profile.
  pub default_level:     ProficiencyLevel,
}

impl Default for StudyConfig {
  fn default() -> Self {
    Self {
      attempt_timeout:   Duration::from_secs(20),
      cache_ttl:         DEFAULT_CACHE_TTL,
      max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
      default_level:     ProficiencyLevel::default(),
    }
  }
}

// ─── Candidate selection ─────────────────────────────────────────────────────

/// A token relation of a document joined with the user's knowledge state of
/// its vocabulary item, if one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
  pub relation_id: i64,
  pub position:    usize,
  pub case:        GrammaticalCase,
  pub word:        VocabularyItem,
  pub knowledge:   Option<KnowledgeState>,
}

/// One distinct word of a document selected for study.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCandidate {
  pub relation_id: i64,
  pub position:    usize,
  pub case:        GrammaticalCase,
  pub word:        VocabularyItem,
}

/// Pick the study candidates among `rows`.
///
/// With a `focus` item only that item is kept, due or not. Otherwise an item
/// is kept when it has no knowledge state yet or its state is due. Each
/// vocabulary item yields at most one candidate, at its lowest position.
pub fn select_candidates(
  mut rows: Vec<CandidateRow>,
  now: DateTime<Utc>,
  focus: Option<i64>,
) -> Vec<StudyCandidate> {
  rows.sort_by_key(|row| (row.word.id, row.position));

  let mut seen = HashSet::new();
  let mut candidates = Vec::new();
  for row in rows {
    if focus.is_some_and(|id| id != row.word.id) || seen.contains(&row.word.id)
    {
      continue;
    }
    let due = row.knowledge.as_ref().is_none_or(|k| k.is_due(now));
    if focus.is_none() && !due {
      continue;
    }
    seen.insert(row.word.id);
    candidates.push(StudyCandidate {
      relation_id: row.relation_id,
      position:    row.position,
      case:        row.case,
      word:        row.word,
    });
  }
  candidates
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A study candidate with its context, as sent to the generator and
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyItem {
  pub relation_id:      i64,
  pub vocabulary_id:    i64,
  pub lemma:            String,
  pub pos:              PartOfSpeech,
  pub gender:           Gender,
  pub article:          Option<String>,
  pub case:             GrammaticalCase,
  pub surface:          String,
  pub dependency:       String,
  pub context_sentence: String,
}

impl StudyItem {
  fn new(candidate: StudyCandidate, contexts: &ContextMap) -> Self {
    let context = contexts.get(&candidate.position);
    let article = match candidate.word.pos {
      PartOfSpeech::Noun => candidate.word.gender.article().map(str::to_owned),
      _ => None,
    };
    Self {
      relation_id: candidate.relation_id,
      vocabulary_id: candidate.word.id,
      surface: context
        .map_or_else(|| candidate.word.lemma.clone(), |c| c.surface.clone()),
      dependency: context.map(|c| c.dependency.clone()).unwrap_or_default(),
      context_sentence: context.map(|c| c.sentence.clone()).unwrap_or_default(),
      lemma: candidate.word.lemma,
      pos: candidate.word.pos,
      gender: candidate.word.gender,
      article,
      case: candidate.case,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
  pub document_id:       i64,
  pub proficiency_level: ProficiencyLevel,
  pub items:             Vec<StudyItem>,
  /// `None` when nothing was due.
  pub content:           Option<StudyContent>,
  /// Whether `content` came from the cache.
  pub cached:            bool,
}

impl StudyPlan {
  fn empty(document_id: i64, level: ProficiencyLevel) -> Self {
    Self {
      document_id,
      proficiency_level: level,
      items: Vec::new(),
      content: None,
      cached: false,
    }
  }
}

#[derive(Serialize)]
struct OutputContract {
  r#type:        &'static str,
  required_keys: [&'static str; 3],
  max_examples:  usize,
  max_bytes:     usize,
}

#[derive(Serialize)]
struct StudyRequest<'a> {
  task:              &'static str,
  language:          &'static str,
  document_id:       i64,
  proficiency_level: ProficiencyLevel,
  output_contract:   OutputContract,
  study_items:       &'a [StudyItem],
}

fn study_prompt(
  document_id: i64,
  level: ProficiencyLevel,
  items: &[StudyItem],
  max_bytes: usize,
) -> Result<Prompt, GenerationError> {
  Prompt::json(STUDY_SYSTEM_PROMPT, &StudyRequest {
    task: "german_medical_training",
    language: "pt-BR",
    document_id,
    proficiency_level: level,
    output_contract: OutputContract {
      r#type: "json_object",
      required_keys: ["examples", "useful_phrase", "desafio"],
      max_examples: MAX_EXAMPLES,
      max_bytes,
    },
    study_items: items,
  })
}

fn study_items(candidates: Vec<StudyCandidate>, contexts: &ContextMap) -> Vec<StudyItem> {
  candidates
    .into_iter()
    .map(|c| StudyItem::new(c, contexts))
    .collect()
}

// ─── Planner ─────────────────────────────────────────────────────────────────

/// Everything the study and review paths need, shared across requests.
pub struct StudyPlanner<S, A, G, C> {
  store:     Arc<S>,
  annotator: Arc<A>,
  generator: Arc<G>,
  cache:     Arc<C>,
  contexts:  ContextMemo,
  config:    StudyConfig,
}

impl<S, A, G, C> StudyPlanner<S, A, G, C>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  pub fn new(
    store: Arc<S>,
    annotator: Arc<A>,
    generator: Arc<G>,
    cache: Arc<C>,
    config: StudyConfig,
  ) -> Self {
    Self {
      store,
      annotator,
      generator,
      cache,
      contexts: ContextMemo::default(),
      config,
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn annotator(&self) -> &A { &self.annotator }

  pub fn generator(&self) -> &G { &self.generator }

  pub fn config(&self) -> &StudyConfig { &self.config }

  /// Plan a study session. With `focus` set, the request is also recorded
  /// as a word click.
  pub async fn plan(
    &self,
    user_id: i64,
    document_id: i64,
    focus: Option<i64>,
  ) -> Result<StudyPlan> {
    self.plan_at(user_id, document_id, focus, Utc::now(), true).await
  }

  pub(crate) async fn plan_at(
    &self,
    user_id: i64,
    document_id: i64,
    focus: Option<i64>,
    now: DateTime<Utc>,
    record_click: bool,
  ) -> Result<StudyPlan> {
    let document = self
      .store
      .get_document(document_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::DocumentNotFound(document_id))?;
    let level = self
      .store
      .get_or_create_profile(user_id, self.config.default_level)
      .await
      .map_err(Error::persistence)?
      .proficiency_level;

    let rows = self
      .store
      .candidate_rows(document_id, user_id, focus)
      .await
      .map_err(Error::persistence)?;
    let candidates = select_candidates(rows, now, focus);
    if candidates.is_empty() {
      debug!(document_id, user_id, ?focus, "nothing due");
      return Ok(StudyPlan::empty(document_id, level));
    }

    let vocabulary_ids = candidates.iter().map(|c| c.word.id).collect();
    self
      .store
      .ensure_knowledge(user_id, vocabulary_ids, now)
      .await
      .map_err(Error::persistence)?;
    if let Some(word_id) = focus.filter(|_| record_click) {
      self
        .store
        .record_word_click(user_id, document_id, word_id)
        .await
        .map_err(Error::persistence)?;
    }

    let cache_key = match (focus, candidates.first()) {
      (Some(_), Some(c)) => Some(study_key(&c.word.lemma, level)),
      _ => None,
    };
    if let Some(key) = &cache_key
      && let Some(content) = self.cache.get(key).await
    {
      debug!(%key, "study content cache hit");
      // No prompt to build, so the annotator is not consulted.
      let contexts = self.contexts.get(&document.raw_text).unwrap_or_default();
      return Ok(StudyPlan {
        document_id,
        proficiency_level: level,
        items: study_items(candidates, &contexts),
        content: Some(content),
        cached: true,
      });
    }

    let contexts = self.contexts_for(&document).await?;
    let items = study_items(candidates, &contexts);

    let prompt =
      study_prompt(document_id, level, &items, self.config.max_payload_bytes)?;
    let content: StudyContent =
      request_json(&*self.generator, &prompt, self.config.attempt_timeout)
        .await?;
    let content = content.normalize(self.config.max_payload_bytes);

    if let Some(key) = cache_key {
      self
        .cache
        .set(key, content.clone(), effective_ttl(self.config.cache_ttl))
        .await;
    }

    info!(document_id, user_id, items = items.len(), %level, "generated study plan");
    Ok(StudyPlan {
      document_id,
      proficiency_level: level,
      items,
      content: Some(content),
      cached: false,
    })
  }

  async fn contexts_for(&self, document: &Document) -> Result<Arc<ContextMap>> {
    if let Some(contexts) = self.contexts.get(&document.raw_text) {
      return Ok(contexts);
    }
    let annotation = self
      .annotator
      .annotate(&document.raw_text)
      .await
      .map_err(Error::Ingestion)?;
    Ok(self.contexts.insert(&document.raw_text, annotation.contexts()))
  }
}
