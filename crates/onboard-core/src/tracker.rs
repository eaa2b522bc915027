//! The tracker: the one place onboarding records are written.
//!
//! Every write path (logging a session, editing, importing, deleting,
//! syncing) goes through here so that session numbers are always derived by
//! [`crate::session`] and persisted back to the store in the same step.
//!
//! Writes that read a partition and write numbers back hold one lock shared
//! by every clone of the [`Tracker`], so concurrent requests never reserve
//! the same session number.

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
  Error, Result,
  attendance::{self, AttendanceAction},
  directory::Role,
  export::{Delivery, Exporter, NoExporter},
  feed::Subscription,
  normalize::{RawOnboarding, RawPatch, normalize, normalize_lenient, normalize_patch},
  record::OnboardingRecord,
  session::{
    normalize_account_key, recompute_all_session_numbers, renumber_in_place, renumbering,
    reserve_session_number,
  },
  stats::MonthlyStats,
  store::{OnboardingStore, RecordQuery},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What happened to the spreadsheet copy of a single write. Export problems
/// never fail the write itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportStatus {
  Delivered { rows: usize },
  Uncertain { rows: usize, reason: String },
  Failed { error: String },
}

impl From<Delivery> for ExportStatus {
  fn from(delivery: Delivery) -> Self {
    match delivery {
      Ok(d) => Self::Delivered { rows: d.rows },
      Err(u) => Self::Uncertain { rows: u.rows, reason: u.reason },
    }
  }
}

/// Result of [`Tracker::log_session`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Logged {
  pub record:      OnboardingRecord,
  /// Later-dated records in the same account whose number moved up.
  pub renumbered:  usize,
  /// `None` when no push was attempted.
  pub export:      Option<ExportStatus>,
}

/// Result of [`Tracker::import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
  pub imported:   usize,
  /// Rows missing a required field.
  pub skipped:    usize,
  pub renumbered: usize,
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct Tracker<S, E = NoExporter> {
  store:          Arc<S>,
  exporter:       Option<Arc<E>>,
  sync_on_create: bool,
  /// Held across every read-renumber-write sequence.
  numbering:      Arc<Mutex<()>>,
}

impl<S, E> Clone for Tracker<S, E> {
  fn clone(&self) -> Self {
    Self {
      store:          Arc::clone(&self.store),
      exporter:       self.exporter.clone(),
      sync_on_create: self.sync_on_create,
      numbering:      Arc::clone(&self.numbering),
    }
  }
}

fn store_err<E: Into<Error>>(err: E) -> Error { err.into() }

impl<S: OnboardingStore> Tracker<S, NoExporter> {
  /// A tracker with no spreadsheet behind it.
  pub fn new(store: S) -> Self {
    Self::from_parts(Arc::new(store), None, false)
  }
}

impl<S, E> Tracker<S, E>
where
  S: OnboardingStore,
  E: Exporter,
{
  pub fn with_exporter(store: S, exporter: E, sync_on_create: bool) -> Self {
    Self::from_parts(Arc::new(store), Some(Arc::new(exporter)), sync_on_create)
  }

  /// Wrap already-shared parts.
  pub fn from_parts(store: Arc<S>, exporter: Option<Arc<E>>, sync_on_create: bool) -> Self {
    Self {
      store,
      exporter,
      sync_on_create,
      numbering: Arc::new(Mutex::new(())),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn has_exporter(&self) -> bool { self.exporter.is_some() }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get(&self, id: Uuid) -> Result<OnboardingRecord> {
    self
      .store
      .get_record(id)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))
  }

  pub async fn list(&self, query: &RecordQuery) -> Result<Vec<OnboardingRecord>> {
    self.store.query(query).await.map_err(store_err)
  }

  pub async fn stats(&self, month: &str) -> Result<MonthlyStats> {
    let records = self.store.list_all_records().await.map_err(store_err)?;
    Ok(MonthlyStats::compute(&records, month))
  }

  pub fn subscribe(&self) -> Subscription { self.store.subscribe() }

  /// The records sharing `account`'s partition, in arrival order.
  async fn partition(&self, account: &str) -> Result<Vec<OnboardingRecord>> {
    let key = normalize_account_key(Some(account));
    let mut records = self.store.list_all_records().await.map_err(store_err)?;
    records.retain(|r| normalize_account_key(Some(&r.account_number)) == key);
    Ok(records)
  }

  async fn persist_numbers(&self, changes: Vec<(Uuid, u32)>) -> Result<usize> {
    if changes.is_empty() {
      return Ok(0);
    }
    self.store.set_session_numbers(changes).await.map_err(store_err)
  }

  /// Renumber the partition `account` belongs to. Caller holds `numbering`.
  async fn renumber_partition(&self, account: &str) -> Result<usize> {
    let partition = self.partition(account).await?;
    self.persist_numbers(renumbering(&partition)).await
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate and store a new session, numbering it against its account.
  pub async fn log_session(&self, raw: RawOnboarding) -> Result<Logged> {
    let mut input = normalize(raw)?;

    let guard = self.numbering.lock().await;
    let mut partition = self.partition(&input.account_number).await?;
    let stored: Vec<u32> = partition.iter().map(|r| r.session_number).collect();
    let healed = renumber_in_place(&mut partition);
    if healed > 0 {
      tracing::warn!(
        account = %input.account_number,
        healed,
        "partition had stale session numbers"
      );
    }
    input.session_number = reserve_session_number(&mut partition, &input);

    let record = self.store.create_record(input).await.map_err(store_err)?;

    let shifts: Vec<(Uuid, u32)> = partition
      .iter()
      .zip(stored)
      .filter(|(r, before)| r.session_number != *before)
      .map(|(r, _)| (r.id, r.session_number))
      .collect();
    let renumbered = self.persist_numbers(shifts).await?;
    drop(guard);

    tracing::info!(
      id = %record.id,
      account = %record.account_number,
      session = record.session_number,
      renumbered,
      "logged onboarding session"
    );

    let export = if self.sync_on_create {
      self.push_one(&record).await
    } else {
      None
    };

    Ok(Logged { record, renumbered, export })
  }

  /// Bulk-insert rows from a legacy source. Rows missing a required field are
  /// skipped; every account that received rows is renumbered afterwards.
  pub async fn import(&self, rows: Vec<RawOnboarding>) -> Result<ImportReport> {
    let mut accepted = Vec::with_capacity(rows.len());
    let mut report = ImportReport::default();

    for (row, raw) in rows.into_iter().enumerate() {
      match normalize_lenient(raw) {
        Ok(input) => accepted.push(input),
        Err(err) => {
          tracing::warn!(row, error = %err, "skipping import row");
          report.skipped += 1;
        }
      }
    }

    if accepted.is_empty() {
      return Ok(report);
    }

    let _guard = self.numbering.lock().await;
    let touched: HashSet<String> = accepted
      .iter()
      .map(|r| normalize_account_key(Some(&r.account_number)).to_owned())
      .collect();
    report.imported = self
      .store
      .insert_many(accepted)
      .await
      .map_err(store_err)?
      .len();

    let mut records = self.store.list_all_records().await.map_err(store_err)?;
    records.retain(|r| touched.contains(normalize_account_key(Some(&r.account_number))));
    report.renumbered = self.persist_numbers(renumbering(&records)).await?;

    tracing::info!(
      imported = report.imported,
      skipped = report.skipped,
      renumbered = report.renumbered,
      "import finished"
    );
    Ok(report)
  }

  /// Edit the identifying fields of a record. A new date or account moves it
  /// within or between partitions; both the old and new partition are
  /// renumbered.
  pub async fn edit(&self, id: Uuid, raw: RawPatch) -> Result<OnboardingRecord> {
    let patch = normalize_patch(raw)?;
    if patch.is_empty() {
      return Err(Error::EmptyPatch);
    }

    let _guard = self.numbering.lock().await;
    let before = self.get(id).await?;
    let edited = self
      .store
      .update_record(id, patch)
      .await
      .map_err(store_err)?;

    let old_key = normalize_account_key(Some(&before.account_number));
    let new_key = normalize_account_key(Some(&edited.account_number));
    let mut renumbered = self.renumber_partition(&edited.account_number).await?;
    if old_key != new_key {
      renumbered += self.renumber_partition(&before.account_number).await?;
    }

    tracing::info!(
      %id,
      from_account = %before.account_number,
      to_account = %edited.account_number,
      date = %edited.date,
      renumbered,
      "edited onboarding"
    );
    if renumbered == 0 {
      return Ok(edited);
    }
    self.get(id).await
  }

  /// Delete a record and close the gap it leaves in its account.
  pub async fn delete(&self, id: Uuid) -> Result<OnboardingRecord> {
    let _guard = self.numbering.lock().await;
    let removed = self.store.delete_record(id).await.map_err(store_err)?;
    let renumbered = self.renumber_partition(&removed.account_number).await?;
    tracing::info!(%id, account = %removed.account_number, renumbered, "deleted onboarding");
    Ok(removed)
  }

  /// Apply an attendance action on behalf of a user with `role`.
  pub async fn transition(
    &self,
    id: Uuid,
    action: AttendanceAction,
    role: Role,
  ) -> Result<OnboardingRecord> {
    let current = self.get(id).await?;
    let next = attendance::apply(current.attendance, action, role)?;
    let updated = self
      .store
      .update_attendance(id, next)
      .await
      .map_err(store_err)?;
    tracing::info!(%id, %action, from = %current.attendance, to = %next, "attendance changed");
    Ok(updated)
  }

  pub async fn follow_up_no_show(
    &self,
    id: Uuid,
    reached_out: bool,
    notes: Option<String>,
  ) -> Result<OnboardingRecord> {
    self
      .store
      .mark_no_show_follow_up(id, reached_out, notes)
      .await
      .map_err(store_err)
  }

  /// Re-derive every session number and persist the ones that were wrong.
  pub async fn renumber_all(&self) -> Result<usize> {
    let _guard = self.numbering.lock().await;
    self.renumber_everything().await
  }

  async fn renumber_everything(&self) -> Result<usize> {
    let records = self.store.list_all_records().await.map_err(store_err)?;
    let changed = self.persist_numbers(renumbering(&records)).await?;
    tracing::info!(records = records.len(), changed, "renumbered all sessions");
    Ok(changed)
  }

  /// Renumber, then overwrite the spreadsheet with the full record set.
  pub async fn sync_all(&self) -> Result<Delivery> {
    let exporter = self.exporter.as_ref().ok_or(Error::ExportNotConfigured)?;

    let rows = {
      let _guard = self.numbering.lock().await;
      self.renumber_everything().await?;
      let records = self.store.list_all_records().await.map_err(store_err)?;
      recompute_all_session_numbers(records)
    };

    let delivery = exporter
      .push_all(&rows)
      .await
      .map_err(|e| Error::Export(Box::new(e)))?;
    match &delivery {
      Ok(d) => tracing::info!(rows = d.rows, "spreadsheet sync delivered"),
      Err(u) => tracing::warn!(rows = u.rows, reason = %u.reason, "spreadsheet sync unconfirmed"),
    }
    Ok(delivery)
  }

  async fn push_one(&self, record: &OnboardingRecord) -> Option<ExportStatus> {
    let exporter = self.exporter.as_ref()?;
    let status = match exporter.push_one(record).await {
      Ok(delivery) => ExportStatus::from(delivery),
      Err(err) => ExportStatus::Failed { error: err.to_string() },
    };
    if !matches!(status, ExportStatus::Delivered { .. }) {
      tracing::warn!(id = %record.id, ?status, "spreadsheet append not confirmed");
    }
    Some(status)
  }
}
