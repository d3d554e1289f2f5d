//! JSON REST API for Wortschatz.
//!
//! Exposes an axum [`Router`] over a [`StudyPlanner`], which carries the
//! store, the annotator, the generator and the study-content cache. TLS and
//! authentication are the caller's responsibility; handlers trust the
//! `x-user-id` header (see [`identity`]).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/documents` | Body: `{"text": "...", "title": "..."}` |
//! | `GET`  | `/documents/{id}` | Document with its token relations |
//! | `POST` | `/study/generate` | Body: `{"document_id": 1, "word_id": 2}` |
//! | `POST` | `/study/evaluate` | Grade a translation attempt |
//! | `GET`  | `/study/review` | Due cards with content |
//! | `POST` | `/study/review/{id}` | Body: `{"score": 1..=4}` |
//! | `GET`  | `/study/review/{id}/events` | Review history, newest first |
//! | `GET`/`PUT` | `/profile` | Proficiency level |
//! | `GET`  | `/scenarios` | Optional `?level=A1\|B1\|C1` |

pub mod documents;
pub mod error;
pub mod extract;
pub mod identity;
pub mod profile;
pub mod review;
pub mod scenarios;
pub mod study;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use wortschatz_core::{
  annotate::Annotator, cache::StudyCache, generate::ContentGenerator,
  planner::StudyPlanner, store::LearningStore,
};

pub use error::ApiError;
pub use identity::CurrentUser;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, A, G, C> {
  pub planner: Arc<StudyPlanner<S, A, G, C>>,
}

impl<S, A, G, C> AppState<S, A, G, C> {
  pub fn new(planner: StudyPlanner<S, A, G, C>) -> Self {
    Self { planner: Arc::new(planner) }
  }
}

impl<S, A, G, C> Clone for AppState<S, A, G, C> {
  fn clone(&self) -> Self { Self { planner: Arc::clone(&self.planner) } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, A, G, C>(state: AppState<S, A, G, C>) -> Router<()>
where
  S: LearningStore + 'static,
  A: Annotator + 'static,
  G: ContentGenerator + 'static,
  C: StudyCache + 'static,
{
  Router::new()
    // Documents
    .route("/documents", post(documents::create::<S, A, G, C>))
    .route("/documents/{id}", get(documents::get_one::<S, A, G, C>))
    // Study
    .route("/study/generate", post(study::generate::<S, A, G, C>))
    .route("/study/evaluate", post(study::evaluate::<S, A, G, C>))
    // Review
    .route("/study/review", get(review::list::<S, A, G, C>))
    .route("/study/review/{id}", post(review::submit::<S, A, G, C>))
    .route("/study/review/{id}/events", get(review::events::<S, A, G, C>))
    // Profile & scenarios
    .route(
      "/profile",
      get(profile::get_one::<S, A, G, C>).put(profile::update::<S, A, G, C>),
    )
    .route("/scenarios", get(scenarios::list::<S, A, G, C>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
