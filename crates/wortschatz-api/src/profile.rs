//! Handlers for `/profile`.

use axum::{Json, extract::State};
use serde::Deserialize;
use wortschatz_core::{
  Error,
  annotate::Annotator,
  cache::StudyCache,
  generate::ContentGenerator,
  knowledge::{ProficiencyLevel, UserProfile},
  store::LearningStore,
};

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::JsonBody,
};

/// `GET /profile`; created with the default level on first access.
pub async fn get_one<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserProfile>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let planner = &state.planner;
  let profile = planner
    .store()
    .get_or_create_profile(user_id, planner.config().default_level)
    .await
    .map_err(Error::persistence)?;
  Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub proficiency_level: String,
}

/// `PUT /profile`, body: `{"proficiency_level": "C1"}`
pub async fn update<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  JsonBody(body): JsonBody<UpdateBody>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let level: ProficiencyLevel = body.proficiency_level.parse()?;
  let profile = state
    .planner
    .store()
    .set_proficiency_level(user_id, level)
    .await
    .map_err(Error::persistence)?;
  Ok(Json(profile))
}
