//! Extractors whose rejections go through [`ApiError`].
//!
//! axum's stock `Json` and `Path` answer malformed input with their own
//! plain-text bodies (and 422 for JSON that doesn't match the body type).
//! These wrappers report it as a 400 `{"error": ...}` like every other input
//! error.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Typed path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct IdPath<T>(pub T);
