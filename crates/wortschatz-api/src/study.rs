//! Handlers for `/study` generation and translation grading.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use wortschatz_core::{
  annotate::Annotator,
  cache::StudyCache,
  evaluate::{TranslationSubmission, evaluate_translation},
  generate::ContentGenerator,
  planner::StudyPlan,
  store::LearningStore,
};

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::JsonBody,
};

// ─── Generate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
  pub document_id: i64,
  /// Focus word; bypasses the due filter and is cached.
  #[serde(default)]
  pub word_id:     Option<i64>,
}

/// `POST /study/generate`
pub async fn generate<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  JsonBody(body): JsonBody<GenerateBody>,
) -> Result<Json<StudyPlan>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let plan = state
    .planner
    .plan(user_id, body.document_id, body.word_id)
    .await?;
  Ok(Json(plan))
}

// ─── Evaluate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EvaluateBody {
  pub challenge_pt:     String,
  pub attempt_de:       String,
  #[serde(default)]
  pub context_original: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Evaluation {
  pub attempt_id:    i64,
  pub correct:       bool,
  pub feedback:      String,
  pub ideal_version: String,
}

/// `POST /study/evaluate`
pub async fn evaluate<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  JsonBody(body): JsonBody<EvaluateBody>,
) -> Result<Json<Evaluation>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let planner = &state.planner;
  let (verdict, attempt) = evaluate_translation(
    planner.store(),
    planner.generator(),
    user_id,
    TranslationSubmission {
      challenge_pt:     body.challenge_pt,
      attempt_de:       body.attempt_de,
      context_original: body.context_original,
    },
    planner.config().attempt_timeout,
  )
  .await?;
  Ok(Json(Evaluation {
    attempt_id:    attempt.id,
    correct:       verdict.correct,
    feedback:      verdict.feedback,
    ideal_version: verdict.ideal_version,
  }))
}
