//! Attendance status and the transitions users may apply to it.
//!
//! Every transition is one explicit user action persisted immediately.
//! There are no timers and nothing moves a record on its own.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

use crate::{Error, Result, directory::Role};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Whether a scheduled onboarding session actually happened.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Attendance {
  #[default]
  Pending,
  /// A team member has asked for completion credit; an admin must decide.
  PendingApproval,
  Completed,
  Cancelled,
  Rescheduled,
  #[serde(rename = "no-show")]
  #[strum(serialize = "no-show")]
  NoShow,
}

impl Attendance {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse an inbound status, falling back to `Pending` for anything
  /// unrecognised instead of rejecting the row.
  pub fn parse_lenient(raw: &str) -> Self {
    let cleaned = raw.trim().to_ascii_lowercase();
    if cleaned.is_empty() {
      return Self::Pending;
    }
    if let Ok(status) = cleaned.parse() {
      return status;
    }
    if cleaned == "no_show" {
      return Self::NoShow;
    }
    tracing::warn!(status = %raw, "unrecognised attendance status, using pending");
    Self::Pending
  }

  /// The status as the sales team sees it: approval-in-progress is still
  /// just pending to them.
  pub fn sales_view(self) -> Self {
    match self {
      Self::PendingApproval => Self::Pending,
      other => other,
    }
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// A user-initiated change to a record's attendance.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceAction {
  /// Team member asks for completion credit.
  RequestCompletion,
  /// Admin accepts a completion request.
  Approve,
  /// Admin turns a completion request down.
  Reject,
  /// Back out of a request, a no-show or a reschedule.
  Undo,
  MarkNoShow,
  Reschedule,
  Cancel,
}

impl AttendanceAction {
  /// Whether `role` may perform this action at all.
  pub fn permitted_for(self, role: Role) -> bool {
    match role {
      Role::Admin => true,
      Role::Team => !matches!(self, Self::Approve | Self::Reject),
      Role::Sales => false,
    }
  }

  /// The status this action leads to from `from`, or `None` if the action
  /// does not apply there.
  pub fn target(self, from: Attendance) -> Option<Attendance> {
    use Attendance::*;
    match (self, from) {
      (Self::RequestCompletion, Pending) => Some(PendingApproval),
      (Self::Approve, PendingApproval) => Some(Completed),
      (Self::Reject, PendingApproval) => Some(Pending),
      (Self::Undo, PendingApproval | NoShow | Rescheduled) => Some(Pending),
      (Self::MarkNoShow, Pending) => Some(NoShow),
      (Self::Reschedule, Pending) => Some(Rescheduled),
      (Self::Cancel, Pending) => Some(Cancelled),
      _ => None,
    }
  }
}

/// Validate and apply `action` to a record currently in `from`.
pub fn apply(from: Attendance, action: AttendanceAction, role: Role) -> Result<Attendance> {
  if !action.permitted_for(role) {
    return Err(Error::Forbidden { role, action });
  }
  action
    .target(from)
    .ok_or(Error::IllegalTransition { from, action })
}

/// Actions `role` could take on a record in `from`.
pub fn available_actions(from: Attendance, role: Role) -> Vec<AttendanceAction> {
  AttendanceAction::iter()
    .filter(|a| a.permitted_for(role) && a.target(from).is_some())
    .collect()
}

/// Every status reachable in one step from `from`, ignoring roles.
pub fn allowed_transitions(from: Attendance) -> Vec<Attendance> {
  let mut out = Vec::new();
  for to in AttendanceAction::iter().filter_map(|a| a.target(from)) {
    if !out.contains(&to) {
      out.push(to);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn wire_names_match_enumeration() {
    let names: Vec<&str> = Attendance::iter().map(Attendance::as_str).collect();
    assert_eq!(
      names,
      ["pending", "pending_approval", "completed", "cancelled", "rescheduled", "no-show"]
    );
    assert_eq!(
      serde_json::to_string(&Attendance::NoShow).unwrap(),
      "\"no-show\""
    );
    assert_eq!("no-show".parse::<Attendance>().unwrap(), Attendance::NoShow);
  }

  #[test]
  fn lenient_parse_falls_back_to_pending() {
    assert_eq!(Attendance::parse_lenient(" Completed "), Attendance::Completed);
    assert_eq!(Attendance::parse_lenient("no_show"), Attendance::NoShow);
    assert_eq!(Attendance::parse_lenient("attended"), Attendance::Pending);
    assert_eq!(Attendance::parse_lenient(""), Attendance::Pending);
  }

  #[test]
  fn approval_workflow() {
    let requested =
      apply(Attendance::Pending, AttendanceAction::RequestCompletion, Role::Team).unwrap();
    assert_eq!(requested, Attendance::PendingApproval);
    let done = apply(requested, AttendanceAction::Approve, Role::Admin).unwrap();
    assert_eq!(done, Attendance::Completed);
    let rejected = apply(requested, AttendanceAction::Reject, Role::Admin).unwrap();
    assert_eq!(rejected, Attendance::Pending);
  }

  #[test]
  fn team_cannot_approve() {
    let err = apply(Attendance::PendingApproval, AttendanceAction::Approve, Role::Team)
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden { role: Role::Team, .. }));
  }

  #[test]
  fn sales_is_read_only() {
    for action in AttendanceAction::iter() {
      assert!(!action.permitted_for(Role::Sales), "{action}");
    }
  }

  #[test]
  fn undo_returns_to_pending() {
    for from in [Attendance::NoShow, Attendance::Rescheduled, Attendance::PendingApproval] {
      assert_eq!(
        apply(from, AttendanceAction::Undo, Role::Team).unwrap(),
        Attendance::Pending
      );
    }
  }

  #[test]
  fn completed_is_terminal_for_team() {
    assert!(available_actions(Attendance::Completed, Role::Team).is_empty());
    assert!(allowed_transitions(Attendance::Completed).is_empty());
    let err = apply(Attendance::Completed, AttendanceAction::Undo, Role::Team).unwrap_err();
    assert!(matches!(err, Error::IllegalTransition { from: Attendance::Completed, .. }));
  }

  #[test]
  fn pending_fans_out() {
    let next = allowed_transitions(Attendance::Pending);
    for status in [
      Attendance::PendingApproval,
      Attendance::NoShow,
      Attendance::Rescheduled,
      Attendance::Cancelled,
    ] {
      assert!(next.contains(&status), "{status}");
    }
    assert!(!next.contains(&Attendance::Completed));
  }

  #[test]
  fn sales_view_hides_approval() {
    assert_eq!(Attendance::PendingApproval.sales_view(), Attendance::Pending);
    assert_eq!(Attendance::NoShow.sales_view(), Attendance::NoShow);
  }
}
