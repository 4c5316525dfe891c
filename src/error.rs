//! API error type shared by every handler. Errors render as
//! `{ "error": message }` with a status matching the failure class.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::DraftError;
use crate::ingest::IngestError;
use crate::session::SessionError;
use crate::store::StoreError;
use crate::streak::StreakError;

#[derive(Debug, Error)]
pub enum ApiError {
  /// Bad input: submission drafts, CSV uploads, session plans, answers.
  #[error("{0}")]
  Validation(String),
  /// Unknown session id or an empty question bank.
  #[error("{0}")]
  NotFound(String),
  /// The remote store misbehaved; we surface it as a bad gateway.
  #[error("{0}")]
  Store(#[from] StoreError),
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Store(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = Json(json!({ "error": self.to_string() }));
    (status, body).into_response()
  }
}

impl From<DraftError> for ApiError {
  fn from(e: DraftError) -> Self {
    ApiError::Validation(e.to_string())
  }
}

impl From<IngestError> for ApiError {
  fn from(e: IngestError) -> Self {
    ApiError::Validation(e.to_string())
  }
}

impl From<SessionError> for ApiError {
  fn from(e: SessionError) -> Self {
    ApiError::Validation(e.to_string())
  }
}

impl From<StreakError> for ApiError {
  fn from(e: StreakError) -> Self {
    ApiError::Internal(format!("could not persist streak ledger: {e}"))
  }
}
