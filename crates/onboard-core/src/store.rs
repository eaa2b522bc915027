//! The `OnboardingStore` trait and supporting query types.
//!
//! Storage backends (e.g. `onboard-store-sqlite`) implement the trait; the
//! [`Tracker`](crate::tracker::Tracker) and the API depend only on it.
//!
//! A store persists exactly what it is given. It never computes session
//! numbers itself: callers derive them with [`crate::session`] and write them
//! back through [`OnboardingStore::set_session_numbers`].

use std::future::Future;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  attendance::Attendance,
  feed::Subscription,
  record::{EmployeeId, NewOnboarding, OnboardingRecord, RecordPatch},
  session::normalize_account_key,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`OnboardingStore::query`]. Every filter is optional and
/// they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordQuery {
  pub employee_id:    Option<EmployeeId>,
  /// `YYYY-MM`.
  pub month:          Option<String>,
  pub attendance:     Option<Attendance>,
  /// Inclusive lower bound on `date`.
  pub start_date:     Option<String>,
  /// Inclusive upper bound on `date`.
  pub end_date:       Option<String>,
  /// Compared trimmed.
  pub account_number: Option<String>,
}

impl RecordQuery {
  pub fn for_employee(employee_id: EmployeeId) -> Self {
    Self { employee_id: Some(employee_id), ..Default::default() }
  }

  pub fn for_account(account_number: impl Into<String>) -> Self {
    Self { account_number: Some(account_number.into()), ..Default::default() }
  }

  /// Whether `record` passes every filter. Backends that cannot push a filter
  /// down can apply this in memory.
  pub fn matches(&self, record: &OnboardingRecord) -> bool {
    if self.employee_id.is_some_and(|id| id != record.employee_id) {
      return false;
    }
    if self.month.as_deref().is_some_and(|m| m != record.month) {
      return false;
    }
    if self.attendance.is_some_and(|a| a != record.attendance) {
      return false;
    }
    if self
      .start_date
      .as_deref()
      .is_some_and(|d| record.date.as_str() < d)
    {
      return false;
    }
    if self
      .end_date
      .as_deref()
      .is_some_and(|d| record.date.as_str() > d)
    {
      return false;
    }
    if let Some(account) = self.account_number.as_deref() {
      let wanted = normalize_account_key(Some(account));
      if normalize_account_key(Some(&record.account_number)) != wanted {
        return false;
      }
    }
    true
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an onboarding store backend.
///
/// Writes are last-writer-wins; there is no version token. Every committed
/// write is announced on the [`subscribe`](Self::subscribe) feed.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait OnboardingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new record. Fails with a validation error if a required
  /// field is blank. `id`, `month` and the timestamps are set by the store.
  fn create_record(
    &self,
    input: NewOnboarding,
  ) -> impl Future<Output = Result<OnboardingRecord, Self::Error>> + Send + '_;

  /// Append many records in one transaction. All or nothing.
  fn insert_many(
    &self,
    inputs: Vec<NewOnboarding>,
  ) -> impl Future<Output = Result<Vec<OnboardingRecord>, Self::Error>> + Send + '_;

  /// Clear the store and write `inputs` in their given order, in one
  /// transaction.
  fn replace_all(
    &self,
    inputs: Vec<NewOnboarding>,
  ) -> impl Future<Output = Result<Vec<OnboardingRecord>, Self::Error>> + Send + '_;

  /// Set the attendance of a record. Moving away from `no-show` clears any
  /// follow-up details. Fails with not-found for an unknown id.
  fn update_attendance(
    &self,
    id: Uuid,
    attendance: Attendance,
  ) -> impl Future<Output = Result<OnboardingRecord, Self::Error>> + Send + '_;

  /// Apply a normalised edit, recomputing `month` when the date changes.
  /// Session numbers are left for the caller to rederive. Fails with
  /// not-found for an unknown id.
  fn update_record(
    &self,
    id: Uuid,
    patch: RecordPatch,
  ) -> impl Future<Output = Result<OnboardingRecord, Self::Error>> + Send + '_;

  /// Record whether a no-show client was contacted. Fails unless the record
  /// is currently `no-show`.
  fn mark_no_show_follow_up(
    &self,
    id: Uuid,
    reached_out: bool,
    notes: Option<String>,
  ) -> impl Future<Output = Result<OnboardingRecord, Self::Error>> + Send + '_;

  /// Write engine output: `(id, session_number)` pairs, in one transaction.
  /// Returns how many rows were touched.
  fn set_session_numbers(
    &self,
    changes: Vec<(Uuid, u32)>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Remove a record and return it. Fails with not-found for an unknown id.
  fn delete_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<OnboardingRecord, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<OnboardingRecord>, Self::Error>> + Send + '_;

  /// Every record in arrival order (creation time, then insertion order).
  /// This is the tie-break order the numbering engine relies on.
  fn list_all_records(
    &self,
  ) -> impl Future<Output = Result<Vec<OnboardingRecord>, Self::Error>> + Send + '_;

  /// One employee's records, newest session first.
  fn list_records_by_employee(
    &self,
    employee_id: EmployeeId,
  ) -> impl Future<Output = Result<Vec<OnboardingRecord>, Self::Error>> + Send + '_;

  /// Filtered listing, ordered by `date` then `created_at`, both descending.
  fn query<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<OnboardingRecord>, Self::Error>> + Send + 'a;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Start receiving [`ChangeEvent`](crate::feed::ChangeEvent)s. Drop the
  /// handle or call [`Subscription::unsubscribe`] to stop.
  fn subscribe(&self) -> Subscription;
}
