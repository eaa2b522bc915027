//! One-way push of records to a human-facing spreadsheet.
//!
//! The far end often cannot say whether it accepted anything, so a push that
//! did not fail outright is either [`Delivered`] (the target confirmed) or
//! [`Uncertain`] (the request went out and nothing contradicted it). Callers
//! decide how to present the difference.

use std::future::Future;

use serde::Serialize;

use crate::record::OnboardingRecord;

/// The target confirmed it wrote `rows` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivered {
  pub rows: usize,
}

/// The request completed but the response could not be read as a
/// confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uncertain {
  pub rows:   usize,
  pub reason: String,
}

/// Outcome of a push that did not fail outright.
pub type Delivery = Result<Delivered, Uncertain>;

/// A write-only spreadsheet target.
///
/// Records must already carry final session numbers: `push_all` expects the
/// output of [`recompute_all_session_numbers`](crate::session::recompute_all_session_numbers),
/// and the target overwrites its whole sheet with it.
pub trait Exporter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Replace the sheet's contents with `records`, in the given order.
  fn push_all<'a>(
    &'a self,
    records: &'a [OnboardingRecord],
  ) -> impl Future<Output = Result<Delivery, Self::Error>> + Send + 'a;

  /// Append a single row.
  fn push_one<'a>(
    &'a self,
    record: &'a OnboardingRecord,
  ) -> impl Future<Output = Result<Delivery, Self::Error>> + Send + 'a;
}

/// An exporter for deployments without a spreadsheet. It is never called;
/// it only fills the type parameter.
#[derive(Debug, Clone, Copy)]
pub enum NoExporter {}

impl Exporter for NoExporter {
  type Error = std::convert::Infallible;

  async fn push_all(&self, _records: &[OnboardingRecord]) -> Result<Delivery, Self::Error> {
    match *self {}
  }

  async fn push_one(&self, _record: &OnboardingRecord) -> Result<Delivery, Self::Error> {
    match *self {}
  }
}
