//! Handler for `/scenarios`.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use wortschatz_core::{
  Error,
  activity::Scenario,
  annotate::Annotator,
  cache::StudyCache,
  generate::ContentGenerator,
  knowledge::ProficiencyLevel,
  store::LearningStore,
};

use crate::{AppState, CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub level: Option<String>,
}

/// `GET /scenarios[?level=<level>]`
///
/// Without `level`, the caller's profile level is used.
pub async fn list<S, A, G, C>(
  State(state): State<AppState<S, A, G, C>>,
  CurrentUser(user_id): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Scenario>>, ApiError>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let planner = &state.planner;
  let store = planner.store();
  let level: ProficiencyLevel = match params.level.as_deref() {
    Some(level) => level.parse()?,
    None => {
      store
        .get_or_create_profile(user_id, planner.config().default_level)
        .await
        .map_err(Error::persistence)?
        .proficiency_level
    }
  };
  let scenarios = store
    .list_scenarios(level)
    .await
    .map_err(Error::persistence)?;
  Ok(Json(scenarios))
}
