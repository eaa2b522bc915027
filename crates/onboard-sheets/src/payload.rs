//! Request and reply shapes understood by the sheet's web app.

use onboard_core::record::OnboardingRecord;
use serde::{Deserialize, Serialize};

use crate::Result;

/// The `action` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  /// Append one row.
  Append,
  /// Clear the sheet and write every row.
  SyncAll,
  /// Connectivity check; writes nothing.
  Test,
}

impl Action {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Append => "append",
      Self::SyncAll => "syncAll",
      Self::Test => "test",
    }
  }
}

/// One sheet row. Column order on the sheet is fixed by the web app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow<'a> {
  pub date:           &'a str,
  pub employee_name:  &'a str,
  pub client_name:    &'a str,
  pub account_number: &'a str,
  pub session_number: u32,
  /// As the sales team sees it.
  pub attendance:     &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:          Option<&'a str>,
}

impl<'a> From<&'a OnboardingRecord> for SheetRow<'a> {
  fn from(r: &'a OnboardingRecord) -> Self {
    Self {
      date:           &r.date,
      employee_name:  &r.employee_name,
      client_name:    &r.client_name,
      account_number: r.account_number.trim(),
      session_number: r.session_number,
      attendance:     r.attendance.sales_view().as_str(),
      notes:          r.notes.as_deref(),
    }
  }
}

#[derive(Serialize)]
struct AppendData<'a> {
  onboarding: SheetRow<'a>,
}

#[derive(Serialize)]
struct SyncAllData<'a> {
  onboardings: Vec<SheetRow<'a>>,
}

#[derive(Serialize)]
struct TestData {
  ping: bool,
}

/// The urlencoded body for `action`.
pub(crate) fn form_fields(
  action: Action,
  records: &[OnboardingRecord],
) -> Result<Vec<(&'static str, String)>> {
  let data = match action {
    Action::Append => match records.first() {
      Some(record) => serde_json::to_string(&AppendData { onboarding: record.into() })?,
      None => "{}".to_owned(),
    },
    Action::SyncAll => serde_json::to_string(&SyncAllData {
      onboardings: records.iter().map(SheetRow::from).collect(),
    })?,
    Action::Test => serde_json::to_string(&TestData { ping: true })?,
  };
  Ok(vec![("action", action.as_str().to_owned()), ("data", data)])
}

/// A JSON reply from the web app. Anything else is not a confirmation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Reply {
  pub success:      bool,
  #[serde(default)]
  pub message:      Option<String>,
  #[serde(default)]
  pub error:        Option<String>,
  #[serde(default)]
  pub synced_count: Option<usize>,
}
