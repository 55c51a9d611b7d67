//! Error taxonomy shared by the store, the generator and the HTTP layer.
//!
//! Collaborator failures keep their own enums; `AppError` is what handlers
//! return and what gets rendered as the `{ "error": message }` payload.

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;

/// Failures of the key-value document store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store unavailable: {0}")]
  Unavailable(String),

  #[error("document {key} could not be decoded: {source}")]
  Corrupt {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Failures of the text generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation unavailable: {0}")]
  Unavailable(String),

  /// Model output was not JSON, or lacked a required key.
  #[error("generation parse error: {0}")]
  Parse(String),
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Generation(#[from] GenerationError),

  #[error("unauthenticated")]
  Unauthenticated,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
  fn status(&self) -> StatusCode {
    match self {
      AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Generation(_) => StatusCode::BAD_GATEWAY,
      AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
    }
  }
}

/// Malformed or mistyped request bodies are the caller's fault.
impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self {
    AppError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(target: "skillboost_backend", error = %self, "Request failed");
    }
    (status, Json(crate::protocol::ErrorOut { error: self.to_string() })).into_response()
  }
}
