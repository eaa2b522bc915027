//! Error type for `onboard-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain failure (validation, not found, wrong status).
  #[error(transparent)]
  Core(#[from] onboard_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types cannot represent.
  #[error("corrupt column {column}: {value:?}")]
  Decode {
    column: &'static str,
    value:  String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for onboard_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(inner) => inner,
      other => Self::Store(Box::new(other)),
    }
  }
}

impl From<onboard_core::ValidationError> for Error {
  fn from(err: onboard_core::ValidationError) -> Self { Self::Core(err.into()) }
}
