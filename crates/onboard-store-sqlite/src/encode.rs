//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so they sort lexically. The no-show follow-up is stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use onboard_core::{
  attendance::Attendance,
  record::{NoShowFollowUp, OnboardingRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Attendance ──────────────────────────────────────────────────────────────

pub fn encode_attendance(a: Attendance) -> &'static str { a.as_str() }

pub fn decode_attendance(s: &str) -> Result<Attendance> {
  s.parse().map_err(|_| Error::Decode { column: "attendance", value: s.to_owned() })
}

// ─── No-show follow-up ───────────────────────────────────────────────────────

pub fn encode_no_show(f: Option<&NoShowFollowUp>) -> Result<Option<String>> {
  f.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_no_show(s: Option<&str>) -> Result<Option<NoShowFollowUp>> {
  s.map(serde_json::from_str).transpose().map_err(Error::from)
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`], in order.
pub const COLUMNS: &str = "id, employee_id, employee_name, client_name, account_number, date, \
                           month, session_number, attendance, notes, no_show, created_at, \
                           updated_at";

/// Raw values read directly from (or about to be written to) an
/// `onboardings` row.
pub struct RawRecord {
  pub id:             String,
  pub employee_id:    i64,
  pub employee_name:  String,
  pub client_name:    String,
  pub account_number: String,
  pub date:           String,
  pub month:          String,
  pub session_number: i64,
  pub attendance:     String,
  pub notes:          Option<String>,
  pub no_show:        Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      employee_id:    row.get(1)?,
      employee_name:  row.get(2)?,
      client_name:    row.get(3)?,
      account_number: row.get(4)?,
      date:           row.get(5)?,
      month:          row.get(6)?,
      session_number: row.get(7)?,
      attendance:     row.get(8)?,
      notes:          row.get(9)?,
      no_show:        row.get(10)?,
      created_at:     row.get(11)?,
      updated_at:     row.get(12)?,
    })
  }

  pub fn encode(record: &OnboardingRecord) -> Result<Self> {
    Ok(Self {
      id:             encode_uuid(record.id),
      employee_id:    record.employee_id,
      employee_name:  record.employee_name.clone(),
      client_name:    record.client_name.clone(),
      account_number: record.account_number.clone(),
      date:           record.date.clone(),
      month:          record.month.clone(),
      session_number: i64::from(record.session_number),
      attendance:     encode_attendance(record.attendance).to_owned(),
      notes:          record.notes.clone(),
      no_show:        encode_no_show(record.no_show.as_ref())?,
      created_at:     encode_dt(record.created_at),
      updated_at:     encode_dt(record.updated_at),
    })
  }

  /// Insert this row. Runs inside a `call` closure, possibly within a
  /// transaction.
  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO onboardings (
         id, employee_id, employee_name, client_name, account_number, date,
         month, session_number, attendance, notes, no_show, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
      rusqlite::params![
        self.id,
        self.employee_id,
        self.employee_name,
        self.client_name,
        self.account_number,
        self.date,
        self.month,
        self.session_number,
        self.attendance,
        self.notes,
        self.no_show,
        self.created_at,
        self.updated_at,
      ],
    )?;
    Ok(())
  }

  pub fn into_record(self) -> Result<OnboardingRecord> {
    let session_number = u32::try_from(self.session_number).map_err(|_| Error::Decode {
      column: "session_number",
      value:  self.session_number.to_string(),
    })?;

    Ok(OnboardingRecord {
      id: decode_uuid(&self.id)?,
      employee_id: self.employee_id,
      employee_name: self.employee_name,
      client_name: self.client_name,
      account_number: self.account_number,
      date: self.date,
      month: self.month,
      session_number,
      attendance: decode_attendance(&self.attendance)?,
      notes: self.notes,
      no_show: decode_no_show(self.no_show.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
