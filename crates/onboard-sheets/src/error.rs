//! Error type for `onboard-sheets`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("web app returned {status}: {body}")]
  Status { status: u16, body: String },

  /// The web app answered and said it did not write anything.
  #[error("web app rejected the request: {0}")]
  Rejected(String),

  #[error("invalid web app url {0:?}")]
  InvalidUrl(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
