//! Per-month roll-ups for the admin dashboard.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
  attendance::Attendance,
  normalize::parse_iso_date,
  record::{EmployeeId, OnboardingRecord, month_of},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStats {
  pub employee_id:   EmployeeId,
  pub employee_name: String,
  pub total:         usize,
  pub completed:     usize,
  /// `pending` and `pending_approval`.
  pub pending:       usize,
  pub other:         usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
  pub month:            String,
  pub total:            usize,
  pub by_attendance:    BTreeMap<&'static str, usize>,
  /// Sorted by employee id.
  pub employees:        Vec<EmployeeStats>,
  /// Records in the month whose date is not a valid ISO date.
  pub invalid_dates:    usize,
  /// Records whose stored month disagrees with their date.
  pub month_mismatches: usize,
}

impl MonthlyStats {
  /// Tally `records` that belong to `month` (`YYYY-MM`), either by their
  /// stored month or by their date.
  pub fn compute<'a>(
    records: impl IntoIterator<Item = &'a OnboardingRecord>,
    month: &str,
  ) -> Self {
    let mut stats = Self { month: month.to_owned(), ..Default::default() };
    let mut employees: BTreeMap<EmployeeId, EmployeeStats> = BTreeMap::new();

    for record in records {
      let derived = month_of(&record.date);
      if record.month != month && derived != month {
        continue;
      }

      stats.total += 1;
      *stats.by_attendance.entry(record.attendance.as_str()).or_default() += 1;
      if parse_iso_date(&record.date).is_none() {
        stats.invalid_dates += 1;
      }
      if record.month != derived {
        stats.month_mismatches += 1;
      }

      let entry = employees
        .entry(record.employee_id)
        .or_insert_with(|| EmployeeStats {
          employee_id: record.employee_id,
          employee_name: record.employee_name.clone(),
          ..Default::default()
        });
      entry.total += 1;
      match record.attendance {
        Attendance::Completed => entry.completed += 1,
        Attendance::Pending | Attendance::PendingApproval => entry.pending += 1,
        _ => entry.other += 1,
      }
    }

    stats.employees = employees.into_values().collect();
    stats
  }
}
