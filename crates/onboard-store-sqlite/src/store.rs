//! [`SqliteStore`], the SQLite implementation of [`OnboardingStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use onboard_core::{
  attendance::Attendance,
  feed::{ChangeEvent, ChangeFeed, Subscription},
  record::{EmployeeId, NewOnboarding, NoShowFollowUp, OnboardingRecord, RecordPatch},
  store::{OnboardingStore, RecordQuery},
};

use crate::{
  Error, Result,
  encode::{COLUMNS, RawRecord, encode_attendance, encode_dt, encode_no_show, encode_uuid},
  schema::SCHEMA,
};

const ARRIVAL_ORDER: &str = "ORDER BY created_at, seq";
const LISTING_ORDER: &str = "ORDER BY date DESC, created_at DESC, seq DESC";

/// The current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// An onboarding store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and change feed are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  feed: ChangeFeed,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, feed: ChangeFeed::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, feed: ChangeFeed::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Turn validated input into a full record stamped with `now`.
  fn materialize(input: NewOnboarding, now: DateTime<Utc>) -> Result<OnboardingRecord> {
    input.validate()?;
    Ok(OnboardingRecord {
      id:             Uuid::new_v4(),
      month:          input.month(),
      employee_id:    input.employee_id,
      employee_name:  input.employee_name,
      client_name:    input.client_name,
      account_number: input.account_number,
      date:           input.date,
      session_number: input.session_number.max(1),
      attendance:     input.attendance,
      notes:          input.notes,
      no_show:        None,
      created_at:     now,
      updated_at:     now,
    })
  }

  /// Insert `inputs` in one transaction, optionally clearing the table first.
  async fn write_batch(
    &self,
    inputs: Vec<NewOnboarding>,
    clear: bool,
  ) -> Result<Vec<OnboardingRecord>> {
    let stamp = now();
    let records = inputs
      .into_iter()
      .map(|input| Self::materialize(input, stamp))
      .collect::<Result<Vec<_>>>()?;
    let raws = records
      .iter()
      .map(RawRecord::encode)
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if clear {
          tx.execute("DELETE FROM onboardings", [])?;
        }
        for raw in &raws {
          raw.insert(&tx)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(records)
  }

  /// Run `SELECT <COLUMNS> FROM onboardings <tail>` with positional params.
  async fn select(
    &self,
    tail: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<OnboardingRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM onboardings {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn fetch(&self, id: Uuid) -> Result<Option<OnboardingRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COLUMNS} FROM onboardings WHERE id = ?1"),
            rusqlite::params![id_str],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn fetch_existing(&self, id: Uuid) -> Result<OnboardingRecord> {
    self
      .fetch(id)
      .await?
      .ok_or(Error::Core(onboard_core::Error::NotFound(id)))
  }
}

// ─── OnboardingStore impl ────────────────────────────────────────────────────

impl OnboardingStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────

  async fn create_record(&self, input: NewOnboarding) -> Result<OnboardingRecord> {
    let record = Self::materialize(input, now())?;
    let raw = RawRecord::encode(&record)?;

    self
      .conn
      .call(move |conn| {
        raw.insert(conn)?;
        Ok(())
      })
      .await?;

    tracing::debug!(id = %record.id, account = %record.account_number, "inserted onboarding");
    self.feed.publish(ChangeEvent::Inserted(record.clone()));
    Ok(record)
  }

  async fn insert_many(&self, inputs: Vec<NewOnboarding>) -> Result<Vec<OnboardingRecord>> {
    let records = self.write_batch(inputs, false).await?;
    for record in &records {
      self.feed.publish(ChangeEvent::Inserted(record.clone()));
    }
    Ok(records)
  }

  async fn replace_all(&self, inputs: Vec<NewOnboarding>) -> Result<Vec<OnboardingRecord>> {
    let records = self.write_batch(inputs, true).await?;
    self.feed.publish(ChangeEvent::Replaced { count: records.len() });
    Ok(records)
  }

  async fn update_attendance(&self, id: Uuid, attendance: Attendance) -> Result<OnboardingRecord> {
    let id_str = encode_uuid(id);
    let status = encode_attendance(attendance);
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE onboardings
           SET attendance = ?2,
               no_show    = CASE WHEN ?2 = 'no-show' THEN no_show ELSE NULL END,
               updated_at = ?3
           WHERE id = ?1",
          rusqlite::params![id_str, status, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(onboard_core::Error::NotFound(id).into());
    }

    let record = self.fetch_existing(id).await?;
    self.feed.publish(ChangeEvent::Updated(record.clone()));
    Ok(record)
  }

  async fn update_record(&self, id: Uuid, patch: RecordPatch) -> Result<OnboardingRecord> {
    let mut record = self.fetch_existing(id).await?;
    patch.apply_to(&mut record);
    record.updated_at = now();

    let raw = RawRecord::encode(&record)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE onboardings
           SET client_name    = ?2,
               account_number = ?3,
               date           = ?4,
               month          = ?5,
               notes          = ?6,
               updated_at     = ?7
           WHERE id = ?1",
          rusqlite::params![
            raw.id,
            raw.client_name,
            raw.account_number,
            raw.date,
            raw.month,
            raw.notes,
            raw.updated_at
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      %id,
      account = %record.account_number,
      date = %record.date,
      "edited onboarding"
    );
    self.feed.publish(ChangeEvent::Updated(record.clone()));
    Ok(record)
  }

  async fn mark_no_show_follow_up(
    &self,
    id: Uuid,
    reached_out: bool,
    notes: Option<String>,
  ) -> Result<OnboardingRecord> {
    let mut record = self.fetch_existing(id).await?;
    if record.attendance != Attendance::NoShow {
      return Err(onboard_core::Error::NotNoShow(id).into());
    }

    let stamp = now();
    record.no_show = Some(NoShowFollowUp {
      reached_out,
      reached_out_at: reached_out.then_some(stamp),
      notes,
    });
    record.updated_at = stamp;

    let id_str = encode_uuid(id);
    let follow_up = encode_no_show(record.no_show.as_ref())?;
    let at_str = encode_dt(stamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE onboardings SET no_show = ?2, updated_at = ?3 WHERE id = ?1",
          rusqlite::params![id_str, follow_up, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.feed.publish(ChangeEvent::Updated(record.clone()));
    Ok(record)
  }

  async fn set_session_numbers(&self, changes: Vec<(Uuid, u32)>) -> Result<usize> {
    if changes.is_empty() {
      return Ok(0);
    }

    let rows: Vec<(String, i64)> = changes
      .iter()
      .map(|(id, n)| (encode_uuid(*id), i64::from(*n)))
      .collect();
    let at_str = encode_dt(now());

    let touched = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut touched = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE onboardings SET session_number = ?2, updated_at = ?3 WHERE id = ?1",
          )?;
          for (id, n) in &rows {
            touched += stmt.execute(rusqlite::params![id, n, at_str])?;
          }
        }
        tx.commit()?;
        Ok(touched)
      })
      .await?;

    tracing::debug!(requested = changes.len(), touched, "wrote session numbers");
    self.feed.publish(ChangeEvent::Renumbered { changes });
    Ok(touched)
  }

  async fn delete_record(&self, id: Uuid) -> Result<OnboardingRecord> {
    let record = self.fetch_existing(id).await?;
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM onboardings WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;

    self.feed.publish(ChangeEvent::Deleted { id });
    Ok(record)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  async fn get_record(&self, id: Uuid) -> Result<Option<OnboardingRecord>> {
    self.fetch(id).await
  }

  async fn list_all_records(&self) -> Result<Vec<OnboardingRecord>> {
    self.select(ARRIVAL_ORDER.to_owned(), Vec::new()).await
  }

  async fn list_records_by_employee(
    &self,
    employee_id: EmployeeId,
  ) -> Result<Vec<OnboardingRecord>> {
    self.query(&RecordQuery::for_employee(employee_id)).await
  }

  async fn query(&self, query: &RecordQuery) -> Result<Vec<OnboardingRecord>> {
    use rusqlite::types::Value;

    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(id) = query.employee_id {
      conds.push("employee_id = ?");
      params.push(Value::Integer(id));
    }
    if let Some(month) = &query.month {
      conds.push("month = ?");
      params.push(Value::Text(month.clone()));
    }
    if let Some(attendance) = query.attendance {
      conds.push("attendance = ?");
      params.push(Value::Text(encode_attendance(attendance).to_owned()));
    }
    if let Some(start) = &query.start_date {
      conds.push("date >= ?");
      params.push(Value::Text(start.clone()));
    }
    if let Some(end) = &query.end_date {
      conds.push("date <= ?");
      params.push(Value::Text(end.clone()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let mut records = self
      .select(format!("{where_clause} {LISTING_ORDER}"), params)
      .await?;

    // Account numbers are compared trimmed, which SQL `TRIM` only
    // approximates.
    if query.account_number.is_some() {
      records.retain(|r| query.matches(r));
    }
    Ok(records)
  }

  // ── Notifications ─────────────────────────────────────────────────────

  fn subscribe(&self) -> Subscription { self.feed.subscribe() }
}
