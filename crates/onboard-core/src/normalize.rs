//! Coercing inbound rows into [`NewOnboarding`].
//!
//! Form submissions go through [`normalize`], which refuses anything it
//! cannot turn into a clean record. Spreadsheet and legacy imports go through
//! [`normalize_lenient`], which still requires the identifying fields but
//! keeps an unreadable date as-is so the numbering engine can push it to the
//! end of its partition. Edits to existing records go through
//! [`normalize_patch`].

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
  attendance::Attendance,
  error::ValidationError,
  record::{EmployeeId, NewOnboarding, RecordPatch},
};

const ISO_FORMAT: &str = "%Y-%m-%d";
const US_FORMAT: &str = "%m/%d/%Y";

/// A row as it arrives, with nothing guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOnboarding {
  pub employee_id:    Option<EmployeeId>,
  pub employee_name:  Option<String>,
  pub client_name:    Option<String>,
  pub account_number: Option<String>,
  pub date:           Option<String>,
  pub session_number: Option<u32>,
  pub attendance:     Option<String>,
  pub notes:          Option<String>,
}

/// An edit as it arrives. Absent fields are left alone; an empty `notes`
/// clears the notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPatch {
  pub client_name:    Option<String>,
  pub account_number: Option<String>,
  pub date:           Option<String>,
  pub notes:          Option<String>,
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(date: &str) -> Option<NaiveDate> {
  let date = date.trim();
  if date.len() != 10 {
    return None;
  }
  NaiveDate::parse_from_str(date, ISO_FORMAT).ok()
}

/// Canonical ISO form of `raw`, accepting ISO dates, `MM/DD/YYYY` and
/// timestamps that start with an ISO date.
pub fn normalize_date(raw: &str) -> Option<String> {
  let raw = raw.trim();
  let parsed = parse_iso_date(raw)
    .or_else(|| NaiveDate::parse_from_str(raw, US_FORMAT).ok())
    .or_else(|| raw.get(..10).and_then(parse_iso_date));
  parsed.map(|d| d.format(ISO_FORMAT).to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// Strict normalization for records created interactively.
pub fn normalize(raw: RawOnboarding) -> Result<NewOnboarding, ValidationError> {
  build(raw, false)
}

/// Normalization for imported rows: an unreadable date is kept verbatim
/// instead of failing the row.
pub fn normalize_lenient(raw: RawOnboarding) -> Result<NewOnboarding, ValidationError> {
  build(raw, true)
}

fn build(raw: RawOnboarding, keep_bad_dates: bool) -> Result<NewOnboarding, ValidationError> {
  let mut err = ValidationError::default();

  let employee_name = trimmed(raw.employee_name);
  let client_name = trimmed(raw.client_name);
  let account_number = trimmed(raw.account_number);
  let raw_date = trimmed(raw.date);

  if raw.employee_id.is_none() {
    err.missing.push("employee_id");
  }
  if employee_name.is_none() {
    err.missing.push("employee_name");
  }
  if client_name.is_none() {
    err.missing.push("client_name");
  }
  if account_number.is_none() {
    err.missing.push("account_number");
  }

  let date = match raw_date {
    None => {
      err.missing.push("date");
      None
    }
    Some(d) => match normalize_date(&d) {
      Some(iso) => Some(iso),
      None if keep_bad_dates => {
        tracing::warn!(date = %d, "keeping unparseable date on imported row");
        Some(d)
      }
      None => {
        err.malformed.push(("date", d));
        None
      }
    },
  };

  err.into_result()?;

  let attendance = raw
    .attendance
    .as_deref()
    .map(Attendance::parse_lenient)
    .unwrap_or_default();

  Ok(NewOnboarding {
    employee_id: raw.employee_id.unwrap_or_default(),
    employee_name: employee_name.unwrap_or_default(),
    client_name: client_name.unwrap_or_default(),
    account_number: account_number.unwrap_or_default(),
    date: date.unwrap_or_default(),
    session_number: raw.session_number.filter(|n| *n >= 1).unwrap_or(1),
    attendance,
    notes: trimmed(raw.notes),
  })
}

/// Strict normalization for edits. A field that is present must be usable:
/// blanking a required field or sending an unreadable date is refused.
pub fn normalize_patch(raw: RawPatch) -> Result<RecordPatch, ValidationError> {
  let mut err = ValidationError::default();

  let mut required = |field: &'static str, value: Option<String>| match value {
    None => None,
    Some(v) if v.trim().is_empty() => {
      err.missing.push(field);
      None
    }
    Some(v) => Some(v.trim().to_owned()),
  };
  let client_name = required("client_name", raw.client_name);
  let account_number = required("account_number", raw.account_number);
  let raw_date = required("date", raw.date);

  let date = raw_date.and_then(|d| {
    let iso = normalize_date(&d);
    if iso.is_none() {
      err.malformed.push(("date", d));
    }
    iso
  });

  err.into_result()?;

  Ok(RecordPatch {
    client_name,
    account_number,
    date,
    notes: raw.notes.map(|n| trimmed(Some(n))),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(date: &str) -> RawOnboarding {
    RawOnboarding {
      employee_id: Some(7),
      employee_name: Some(" Jim ".into()),
      client_name: Some("  Acme Dental ".into()),
      account_number: Some(" ACC-1 ".into()),
      date: Some(date.into()),
      ..Default::default()
    }
  }

  #[test]
  fn trims_and_defaults() {
    let rec = normalize(raw("2024-02-03")).unwrap();
    assert_eq!(rec.client_name, "Acme Dental");
    assert_eq!(rec.account_number, "ACC-1");
    assert_eq!(rec.employee_name, "Jim");
    assert_eq!(rec.session_number, 1);
    assert_eq!(rec.attendance, Attendance::Pending);
    assert_eq!(rec.month(), "2024-02");
  }

  #[test]
  fn us_dates_become_iso() {
    assert_eq!(normalize(raw("3/7/2024")).unwrap().date, "2024-03-07");
    assert_eq!(normalize(raw("12/31/2023")).unwrap().date, "2023-12-31");
  }

  #[test]
  fn timestamps_keep_their_date() {
    assert_eq!(
      normalize_date("2024-05-06T14:00:00.000Z").as_deref(),
      Some("2024-05-06")
    );
  }

  #[test]
  fn unknown_attendance_becomes_pending() {
    let mut input = raw("2024-02-03");
    input.attendance = Some("showed up".into());
    assert_eq!(normalize(input).unwrap().attendance, Attendance::Pending);
  }

  #[test]
  fn strict_rejects_bad_dates() {
    let err = normalize(raw("next tuesday")).unwrap_err();
    assert_eq!(err.malformed, vec![("date", "next tuesday".to_owned())]);
  }

  #[test]
  fn lenient_keeps_bad_dates() {
    let rec = normalize_lenient(raw("next tuesday")).unwrap();
    assert_eq!(rec.date, "next tuesday");
  }

  #[test]
  fn both_modes_require_identifying_fields() {
    let input = RawOnboarding { date: Some("2024-01-01".into()), ..Default::default() };
    for result in [normalize(input.clone()), normalize_lenient(input)] {
      let err = result.unwrap_err();
      assert_eq!(
        err.missing,
        vec!["employee_id", "employee_name", "client_name", "account_number"]
      );
    }
  }

  #[test]
  fn patch_normalizes_present_fields_only() {
    let patch = normalize_patch(RawPatch {
      account_number: Some(" ACC-9 ".into()),
      date: Some("2/1/2024".into()),
      notes: Some("   ".into()),
      ..Default::default()
    })
    .unwrap();
    assert_eq!(patch.client_name, None);
    assert_eq!(patch.account_number.as_deref(), Some("ACC-9"));
    assert_eq!(patch.date.as_deref(), Some("2024-02-01"));
    assert_eq!(patch.notes, Some(None));
  }

  #[test]
  fn patch_refuses_blanks_and_bad_dates() {
    let err = normalize_patch(RawPatch {
      client_name: Some(" ".into()),
      date: Some("soon".into()),
      ..Default::default()
    })
    .unwrap_err();
    assert_eq!(err.missing, vec!["client_name"]);
    assert_eq!(err.malformed, vec![("date", "soon".to_owned())]);
  }

  #[test]
  fn iso_parse_is_strict() {
    assert!(parse_iso_date("2024-02-30").is_none());
    assert!(parse_iso_date("2024-2-3").is_none());
    assert!(parse_iso_date("2024-02-03").is_some());
  }
}
