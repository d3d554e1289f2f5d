//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use wortschatz_core::ErrorKind;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or malformed `x-user-id` header.
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Core(#[from] wortschatz_core::Error),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::Core(wortschatz_core::Error::InvalidInput(rejection.body_text()))
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::Core(wortschatz_core::Error::InvalidInput(rejection.body_text()))
  }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Core(e) => match e.kind() {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Generation => StatusCode::BAD_GATEWAY,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(error = %self, "request failed");
      "internal error".to_owned()
    } else {
      self.to_string()
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
