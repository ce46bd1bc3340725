//! Handlers for `/dashboard` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dashboard/weekly-winner` | Bearer; optional `?date=YYYY-MM-DD`; scoped to the caller |

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use roster_core::{
  role::Capability,
  store::RegistrationStore,
  week::{WeekWindow, WeeklyWinner, weekly_winner},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Backend, auth::SignedIn, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct WinnerParams {
  /// Any day of the week to report on. Defaults to today (UTC).
  pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct WinnerBody {
  pub window:        WeekWindow,
  pub winner:        Option<WeeklyWinner>,
  /// Registrations in the window that the caller is allowed to see.
  pub registrations: usize,
}

/// `GET /dashboard/weekly-winner[?date=YYYY-MM-DD]`
pub async fn winner<B: Backend>(
  State(state): State<AppState<B>>,
  signed_in: SignedIn<B>,
  params: Result<Query<WinnerParams>, QueryRejection>,
) -> Result<Json<WinnerBody>, ApiError> {
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let identity = signed_in.identity()?;
  if !identity.can(Capability::ViewDashboard) {
    return Err(ApiError::Forbidden(Capability::ViewDashboard));
  }

  let window = params
    .date
    .map(WeekWindow::containing)
    .unwrap_or_else(WeekWindow::current);

  let mut registrations = state
    .backend
    .list_registrations(signed_in.access_token()?, &window)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let scope = identity.scope();
  registrations.retain(|r| scope.admits(r.organisation_id.as_deref(), r.registered_by));

  Ok(Json(WinnerBody {
    window,
    winner: weekly_winner(&registrations, window),
    registrations: registrations.len(),
  }))
}
