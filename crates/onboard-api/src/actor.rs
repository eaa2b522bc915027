//! Resolving the calling user from the `X-Onboard-User` header.
//!
//! Whatever sits in front of the API (a proxy doing SSO, a test harness) is
//! trusted to set the header; this layer only maps it to a role.

use axum::{extract::FromRequestParts, http::request::Parts};
use onboard_core::{
  directory::{Role, UserProfile},
  export::Exporter,
  record::{EmployeeId, OnboardingRecord},
  store::OnboardingStore,
};

use crate::{AppState, error::ApiError};

pub const USER_HEADER: &str = "x-onboard-user";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Actor(pub UserProfile);

impl Actor {
  pub fn role(&self) -> Role { self.0.role }

  /// Fail with 403 unless the caller has one of `roles`.
  pub fn require(&self, roles: &[Role], what: &str) -> Result<(), ApiError> {
    if roles.contains(&self.0.role) {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!("{} users may not {what}", self.0.role)))
    }
  }

  /// The employee a team member acts as. Admin and sales are unscoped.
  pub fn scope(&self) -> Result<Option<EmployeeId>, ApiError> {
    match self.0.role {
      Role::Team => self.0.employee_id.map(Some).ok_or_else(|| {
        ApiError::Forbidden(format!("{} has no employee id configured", self.0.identity))
      }),
      Role::Admin | Role::Sales => Ok(None),
    }
  }

  /// Fail with 403 if a team member reaches for someone else's record.
  pub fn check_owns(&self, record: &OnboardingRecord) -> Result<(), ApiError> {
    match self.scope()? {
      Some(id) if id != record.employee_id => Err(ApiError::Forbidden(format!(
        "onboarding {} belongs to another employee",
        record.id
      ))),
      _ => Ok(()),
    }
  }

  /// Shape a record for this caller's dashboard.
  pub fn present(&self, mut record: OnboardingRecord) -> OnboardingRecord {
    if self.0.role == Role::Sales {
      record.attendance = record.attendance.sales_view();
    }
    record
  }
}

impl<S, E> FromRequestParts<AppState<S, E>> for Actor
where
  S: OnboardingStore + 'static,
  E: Exporter + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, E>,
  ) -> Result<Self, Self::Rejection> {
    let identity = parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .ok_or(ApiError::Unauthorized)?;

    let profile = state.directory.lookup_user(identity).ok_or_else(|| {
      tracing::debug!(%identity, "rejecting unknown user");
      ApiError::Unauthorized
    })?;
    Ok(Actor(profile))
  }
}
