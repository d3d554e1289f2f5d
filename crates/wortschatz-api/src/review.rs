//! Handlers for the review queue.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/study/review` | Due cards, soonest first |
//! | `POST` | `/study/review/{id}` | Body: `{"score": 3}`; 400 outside 1..=4 |
//! | `GET`  | `/study/review/{id}/events` | 404 for someone else's card |

use axum::{
  Json,
  extract::State,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use wortschatz_core::{
  Error,
  annotate::Annotator,
  cache::StudyCache,
  generate::ContentGenerator,
  knowledge::{KnowledgeState, ReviewEvent},
  review::{ReviewCard, list_due_cards, submit_review},
  store::LearningStore,
};

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::{IdPath, JsonBody},
};

/// `GET /study/review`
pub async fn list<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<ReviewCard>>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let cards = list_due_cards(&state.planner, user_id, Utc::now()).await?;
  Ok(Json(cards))
}

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScoreBody {
  /// Range-checked by the scheduler.
  pub score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Reviewed {
  pub knowledge: KnowledgeState,
  pub event:     ReviewEvent,
}

/// `POST /study/review/{id}`
pub async fn submit<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  IdPath(id): IdPath<i64>,
  JsonBody(body): JsonBody<ScoreBody>,
) -> Result<Json<Reviewed>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let (knowledge, event) =
    submit_review(state.planner.store(), id, user_id, body.score).await?;
  Ok(Json(Reviewed { knowledge, event }))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /study/review/{id}/events`
pub async fn events<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  IdPath(id): IdPath<i64>,
) -> Result<Json<Vec<ReviewEvent>>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let store = state.planner.store();
  store
    .get_knowledge(id, user_id)
    .await
    .map_err(Error::persistence)?
    .ok_or(Error::KnowledgeNotFound(id))?;
  let events = store
    .review_events(id, user_id)
    .await
    .map_err(Error::persistence)?;
  Ok(Json(events))
}
