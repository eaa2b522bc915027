//! Handlers for `/onboardings` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/onboardings` | [`RecordQuery`] params; team members only see their own |
//! | `GET`    | `/onboardings/{id}` | Single record |
//! | `POST`   | `/onboardings` | Body: [`RawOnboarding`]; returns 201 + [`Logged`] |
//! | `POST`   | `/onboardings/import` | Admin; body: `[RawOnboarding]` |
//! | `PATCH`  | `/onboardings/{id}` | Body: [`RawPatch`]; renumbers affected accounts |
//! | `DELETE` | `/onboardings/{id}` | Admin; renumbers the account |
//! | `POST`   | `/onboardings/{id}/attendance` | Body: `{"action":"approve"}` |
//! | `POST`   | `/onboardings/{id}/no-show` | Body: `{"reached_out":true,"notes":"..."}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use onboard_core::{
  attendance::{Attendance, AttendanceAction},
  directory::Role,
  export::Exporter,
  normalize::{RawOnboarding, RawPatch},
  record::OnboardingRecord,
  store::{OnboardingStore, RecordQuery},
  tracker::{ImportReport, Logged},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /onboardings`
///
/// Accepts the [`RecordQuery`] filters `employee_id`, `month`, `attendance`,
/// `start_date`, `end_date` and `account_number`. Sales filter on the status
/// they are shown, so `pending` includes records awaiting approval.
pub async fn list<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Query(mut query): Query<RecordQuery>,
) -> Result<Json<Vec<OnboardingRecord>>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  if let Some(own) = actor.scope()? {
    query.employee_id = Some(own);
  }
  let sales_pending = actor.role() == Role::Sales && query.attendance == Some(Attendance::Pending);
  if sales_pending {
    query.attendance = None;
  }

  let mut records = state.tracker.list(&query).await?;
  if sales_pending {
    records.retain(|r| r.attendance.sales_view() == Attendance::Pending);
  }
  Ok(Json(records.into_iter().map(|r| actor.present(r)).collect()))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /onboardings/{id}`
pub async fn get_one<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<OnboardingRecord>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  let record = state.tracker.get(id).await?;
  actor.check_owns(&record)?;
  Ok(Json(actor.present(record)))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /onboardings`: returns 201 + the stored record and export outcome.
///
/// Team members always log as themselves; admins must name the employee.
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Json(mut body): Json<RawOnboarding>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin, Role::Team], "log sessions")?;

  if let Some(own) = actor.scope()? {
    if body.employee_id.is_some_and(|id| id != own) {
      return Err(ApiError::Forbidden("team members log sessions for themselves".into()));
    }
    body.employee_id = Some(own);
    if let Some(name) = &actor.0.employee_name {
      body.employee_name = Some(name.clone());
    }
  }

  let logged: Logged = state.tracker.log_session(body).await?;
  Ok((StatusCode::CREATED, Json(logged)))
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// `POST /onboardings/import`: lenient bulk import.
pub async fn import<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Json(rows): Json<Vec<RawOnboarding>>,
) -> Result<Json<ImportReport>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin], "import sessions")?;
  Ok(Json(state.tracker.import(rows).await?))
}

// ─── Edit ────────────────────────────────────────────────────────────────────

/// `PATCH /onboardings/{id}`: change the client, account, date or notes.
///
/// Team members may only edit their own records.
pub async fn edit<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<RawPatch>,
) -> Result<Json<OnboardingRecord>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin, Role::Team], "edit sessions")?;
  actor.check_owns(&state.tracker.get(id).await?)?;
  let record = state.tracker.edit(id, body).await?;
  Ok(Json(actor.present(record)))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /onboardings/{id}`: returns 204.
pub async fn delete_one<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin], "delete sessions")?;
  state.tracker.delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AttendanceBody {
  pub action: AttendanceAction,
}

/// `POST /onboardings/{id}/attendance`
pub async fn attendance<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<AttendanceBody>,
) -> Result<Json<OnboardingRecord>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  if actor.role() == Role::Team {
    actor.check_owns(&state.tracker.get(id).await?)?;
  }
  let record = state.tracker.transition(id, body.action, actor.role()).await?;
  Ok(Json(record))
}

// ─── No-show follow-up ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NoShowBody {
  pub reached_out: bool,
  pub notes:       Option<String>,
}

/// `POST /onboardings/{id}/no-show`
pub async fn no_show<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<NoShowBody>,
) -> Result<Json<OnboardingRecord>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin, Role::Team], "record no-show follow-ups")?;
  actor.check_owns(&state.tracker.get(id).await?)?;
  let record = state
    .tracker
    .follow_up_no_show(id, body.reached_out, body.notes)
    .await?;
  Ok(Json(record))
}
