//! Whole-dataset endpoints: `/me`, `/renumber`, `/sync` and `/stats`.

use axum::{
  Json,
  extract::{Query, State},
};
use onboard_core::{
  directory::{Role, UserProfile},
  export::Exporter,
  stats::MonthlyStats,
  store::OnboardingStore,
  tracker::ExportStatus,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, actor::Actor, error::ApiError};

/// `GET /me`
pub async fn me(actor: Actor) -> Json<UserProfile> { Json(actor.0) }

#[derive(Debug, Serialize)]
pub struct Renumbered {
  pub changed: usize,
}

/// `POST /renumber`: recompute every session number.
pub async fn renumber<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
) -> Result<Json<Renumbered>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin], "renumber sessions")?;
  let changed = state.tracker.renumber_all().await?;
  Ok(Json(Renumbered { changed }))
}

/// `POST /sync`: push everything to the spreadsheet.
///
/// Responds `{"status":"delivered","rows":n}` or
/// `{"status":"uncertain","rows":n,"reason":"..."}`.
pub async fn sync<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
) -> Result<Json<ExportStatus>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin, Role::Sales], "sync the spreadsheet")?;
  let delivery = state.tracker.sync_all().await?;
  Ok(Json(ExportStatus::from(delivery)))
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
  /// `YYYY-MM`.
  pub month: String,
}

/// `GET /stats?month=YYYY-MM`
pub async fn stats<S, E>(
  State(state): State<AppState<S, E>>,
  actor: Actor,
  Query(params): Query<StatsParams>,
) -> Result<Json<MonthlyStats>, ApiError>
where
  S: OnboardingStore,
  E: Exporter,
{
  actor.require(&[Role::Admin], "view team statistics")?;
  let month = params.month.trim();
  if month.len() != 7 || month.as_bytes()[4] != b'-' {
    return Err(ApiError::BadRequest(format!("month must be YYYY-MM, got {month:?}")));
  }
  Ok(Json(state.tracker.stats(month).await?))
}
