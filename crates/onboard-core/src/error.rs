//! Error types for `onboard-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  attendance::{Attendance, AttendanceAction},
  directory::Role,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid onboarding record: {0}")]
  Validation(#[from] ValidationError),

  #[error("onboarding record not found: {0}")]
  NotFound(Uuid),

  #[error("cannot {action} a session that is {from}")]
  IllegalTransition {
    from:   Attendance,
    action: AttendanceAction,
  },

  #[error("{role} users may not {action}")]
  Forbidden {
    role:   Role,
    action: AttendanceAction,
  },

  #[error("onboarding record {0} is not marked no-show")]
  NotNoShow(Uuid),

  #[error("no fields to update")]
  EmptyPatch,

  #[error("no spreadsheet exporter is configured")]
  ExportNotConfigured,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("export error: {0}")]
  Export(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Validation ──────────────────────────────────────────────────────────────

/// Every reason a submitted record was refused. Collected in one pass so the
/// caller can report all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct ValidationError {
  /// Required fields that were absent or blank.
  pub missing:   Vec<&'static str>,
  /// Fields that were present but could not be understood, with the
  /// offending input.
  pub malformed: Vec<(&'static str, String)>,
}

impl ValidationError {
  pub fn is_empty(&self) -> bool {
    self.missing.is_empty() && self.malformed.is_empty()
  }

  /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }

  fn describe(&self) -> String {
    let mut parts = Vec::new();
    if !self.missing.is_empty() {
      parts.push(format!("missing {}", self.missing.join(", ")));
    }
    for (field, value) in &self.malformed {
      parts.push(format!("malformed {field} {value:?}"));
    }
    parts.join("; ")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validation_message_lists_every_problem() {
    let err = ValidationError {
      missing:   vec!["client_name", "account_number"],
      malformed: vec![("date", "31/31/2024".into())],
    };
    assert_eq!(
      err.to_string(),
      "missing client_name, account_number; malformed date \"31/31/2024\""
    );
  }

  #[test]
  fn empty_validation_is_ok() {
    assert!(ValidationError::default().into_result().is_ok());
  }
}
