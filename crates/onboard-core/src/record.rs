//! Onboarding records, the one entity the tracker stores.
//!
//! A record says that an employee ran an onboarding session for a client
//! account on a calendar date. Its `session_number` is never authoritative:
//! it is a cached rank that the numbering engine can always rebuild from the
//! `(account_number, date)` pairs of the full record set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{attendance::Attendance, error::ValidationError};

/// Durable employee key. Display names are denormalised copies.
pub type EmployeeId = i64;

// ─── No-show follow-up ───────────────────────────────────────────────────────

/// Whether someone reached out to a client who missed their session.
/// Only meaningful while the record's attendance is `no-show`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoShowFollowUp {
  pub reached_out:    bool,
  pub reached_out_at: Option<DateTime<Utc>>,
  pub notes:          Option<String>,
}

// ─── OnboardingRecord ────────────────────────────────────────────────────────

/// A persisted onboarding session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
  /// Assigned by the store; never changes.
  pub id:             Uuid,
  pub employee_id:    EmployeeId,
  pub employee_name:  String,
  pub client_name:    String,
  /// Partition key for session numbering (compared trimmed).
  pub account_number: String,
  /// ISO `YYYY-MM-DD` for every record accepted through the normal path.
  /// Legacy imports may carry something unparseable here.
  pub date:           String,
  /// Always `date[..7]`.
  pub month:          String,
  pub session_number: u32,
  pub attendance:     Attendance,
  pub notes:          Option<String>,
  pub no_show:        Option<NoShowFollowUp>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

// ─── NewOnboarding ───────────────────────────────────────────────────────────

/// Input to [`crate::store::OnboardingStore::create_record`].
///
/// `id`, `month` and the timestamps are always set by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOnboarding {
  pub employee_id:    EmployeeId,
  pub employee_name:  String,
  pub client_name:    String,
  pub account_number: String,
  pub date:           String,
  #[serde(default = "first_session")]
  pub session_number: u32,
  #[serde(default)]
  pub attendance:     Attendance,
  #[serde(default)]
  pub notes:          Option<String>,
}

fn first_session() -> u32 { 1 }

impl NewOnboarding {
  /// Convenience constructor: session 1, pending, no notes.
  pub fn new(
    employee_id: EmployeeId,
    employee_name: impl Into<String>,
    client_name: impl Into<String>,
    account_number: impl Into<String>,
    date: impl Into<String>,
  ) -> Self {
    Self {
      employee_id,
      employee_name: employee_name.into(),
      client_name: client_name.into(),
      account_number: account_number.into(),
      date: date.into(),
      session_number: 1,
      attendance: Attendance::default(),
      notes: None,
    }
  }

  /// Presence check for the fields a store refuses to persist without.
  pub fn validate(&self) -> Result<(), ValidationError> {
    let mut err = ValidationError::default();
    if self.employee_name.trim().is_empty() {
      err.missing.push("employee_name");
    }
    if self.client_name.trim().is_empty() {
      err.missing.push("client_name");
    }
    if self.account_number.trim().is_empty() {
      err.missing.push("account_number");
    }
    if self.date.trim().is_empty() {
      err.missing.push("date");
    }
    err.into_result()
  }

  /// The denormalised month for this input's date.
  pub fn month(&self) -> String { month_of(&self.date) }
}

// ─── RecordPatch ─────────────────────────────────────────────────────────────

/// A normalised partial edit. `None` leaves the field unchanged.
///
/// Session numbers and attendance are never edited directly: the first is
/// derived, the second moves only through [`crate::attendance::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
  pub client_name:    Option<String>,
  pub account_number: Option<String>,
  pub date:           Option<String>,
  /// `Some(None)` clears the notes.
  pub notes:          Option<Option<String>>,
}

impl RecordPatch {
  pub fn is_empty(&self) -> bool {
    self.client_name.is_none()
      && self.account_number.is_none()
      && self.date.is_none()
      && self.notes.is_none()
  }

  /// Apply the edit, keeping `month` in step with `date`.
  pub fn apply_to(&self, record: &mut OnboardingRecord) {
    if let Some(client) = &self.client_name {
      record.client_name = client.clone();
    }
    if let Some(account) = &self.account_number {
      record.account_number = account.clone();
    }
    if let Some(date) = &self.date {
      record.date = date.clone();
      record.month = month_of(date);
    }
    if let Some(notes) = &self.notes {
      record.notes = notes.clone();
    }
  }
}

/// `YYYY-MM` prefix of a date string; the whole string if it is shorter.
pub fn month_of(date: &str) -> String {
  date.get(..7).unwrap_or(date).to_owned()
}
