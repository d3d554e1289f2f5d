//! Handlers for `/documents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/documents` | Body: `{"text": "...", "title": "..."}`; 201 |
//! | `GET`  | `/documents/{id}` | 404 if not found |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use wortschatz_core::{
  Error,
  annotate::Annotator,
  cache::StudyCache,
  document::DocumentDetail,
  generate::ContentGenerator,
  ingest::ingest,
  store::LearningStore,
};

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::{IdPath, JsonBody},
};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub text:  String,
  #[serde(default)]
  pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
  pub document_id:      i64,
  pub title:            String,
  pub complexity_score: f64,
}

/// `POST /documents`
pub async fn create<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let planner = &state.planner;
  let document = ingest(
    planner.store(),
    planner.annotator(),
    Some(user_id),
    &body.text,
    body.title.as_deref(),
  )
  .await?;
  Ok((
    StatusCode::CREATED,
    Json(Created {
      document_id:      document.id,
      title:            document.title,
      complexity_score: document.complexity_score,
    }),
  ))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /documents/{id}`
pub async fn get_one<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(_): CurrentUser,
  IdPath(id): IdPath<i64>,
) -> Result<Json<DocumentDetail>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let store = state.planner.store();
  let document = store
    .get_document(id)
    .await
    .map_err(Error::persistence)?
    .ok_or(Error::DocumentNotFound(id))?;
  let tokens = store
    .document_relations(id)
    .await
    .map_err(Error::persistence)?;
  Ok(Json(DocumentDetail { document, tokens }))
}
