//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Bodies are `{"error": message, "code": code}` where `code` is the
//! [`campus_core::Error::code`] of the failure.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use campus_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Repository(#[from] Error),

  /// The request body or query string could not be decoded.
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Repository(Error::NotFound { .. }) => StatusCode::NOT_FOUND,
      ApiError::Repository(Error::Validation(_)) => {
        StatusCode::UNPROCESSABLE_ENTITY
      }
      ApiError::Repository(Error::Conflict(_)) => StatusCode::CONFLICT,
      ApiError::Repository(Error::Transport(_)) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }

  /// The message without the category prefix; `code` carries the category.
  fn message(&self) -> String {
    match self {
      ApiError::Repository(
        Error::Validation(m) | Error::Conflict(m) | Error::Transport(m),
      ) => m.clone(),
      other => other.to_string(),
    }
  }

  fn code(&self) -> &'static str {
    match self {
      ApiError::Repository(e) => e.code(),
      ApiError::BadRequest(_) => "validation",
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::warn!(error = %self, "request failed");
    }
    let body = json!({ "error": self.message(), "code": self.code() });
    (status, Json(body)).into_response()
  }
}
