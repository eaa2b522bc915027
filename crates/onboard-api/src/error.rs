//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or unknown user")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("spreadsheet error: {0}")]
  Upstream(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<onboard_core::Error> for ApiError {
  fn from(err: onboard_core::Error) -> Self {
    use onboard_core::Error as E;
    match err {
      E::Validation(v) => Self::BadRequest(v.to_string()),
      e @ E::EmptyPatch => Self::BadRequest(e.to_string()),
      E::NotFound(id) => Self::NotFound(format!("onboarding {id} not found")),
      e @ (E::IllegalTransition { .. } | E::NotNoShow(_)) => Self::Conflict(e.to_string()),
      e @ E::Forbidden { .. } => Self::Forbidden(e.to_string()),
      e @ E::ExportNotConfigured => Self::Unavailable(e.to_string()),
      E::Export(e) => Self::Upstream(e.to_string()),
      E::Store(e) => Self::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
