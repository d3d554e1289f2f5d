//! Trusted caller identity.
//!
//! Authentication happens upstream; this layer only reads the numeric user
//! id the gateway forwards in the `x-user-id` header.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Present in a handler means the header parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

impl<St: Send + Sync> FromRequestParts<St> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<i64>().ok())
      .filter(|id| *id > 0)
      .map(CurrentUser)
      .ok_or(ApiError::Unauthorized)
  }
}
