//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"email","password"}`; returns [`SessionBody`] |
//! | `GET`  | `/auth/session` | Bearer; silent resume |
//! | `POST` | `/auth/refresh` | Bearer; re-resolve the identity |
//! | `POST` | `/auth/logout` | Bearer; 204 |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
};
use chrono::{DateTime, Utc};
use roster_core::{
  identity::Identity,
  principal::Credentials,
  resolver::ProfileLookup,
  role::Capability,
  session::Session,
};
use serde::Serialize;

use crate::{AppState, Backend, auth::SignedIn, error::ApiError};

/// What every successful session endpoint returns.
#[derive(Debug, Serialize)]
pub struct SessionBody {
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<DateTime<Utc>>,
  pub identity:      Identity,
  pub capabilities:  Vec<Capability>,
  /// Whether the identity came from the profile row or from fallbacks.
  pub profile:       ProfileLookup,
}

impl SessionBody {
  fn from_session<B: Backend>(session: &Session<B, B>) -> Result<Self, ApiError> {
    let (Some(tokens), Some(identity), Some(lookup)) =
      (session.tokens(), session.identity(), session.lookup())
    else {
      return Err(ApiError::NoSession);
    };
    Ok(Self {
      access_token:  tokens.access_token.clone(),
      refresh_token: tokens.refresh_token.clone(),
      expires_at:    tokens.expires_at,
      identity:      identity.clone(),
      capabilities:  identity.role.capabilities(),
      profile:       lookup.clone(),
    })
  }
}

// ─── Login ────────────────────────────────────────────────────────────────────

/// `POST /auth/login`
pub async fn login<B: Backend>(
  State(state): State<AppState<B>>,
  payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<SessionBody>, ApiError> {
  let Json(credentials) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  if credentials.email.trim().is_empty() || credentials.password.is_empty() {
    return Err(ApiError::BadRequest("email and password are required".into()));
  }

  let mut session = state.session();
  session.login(&credentials).await?;
  Ok(Json(SessionBody::from_session(&session)?))
}

// ─── Resume ───────────────────────────────────────────────────────────────────

/// `GET /auth/session`
pub async fn current<B: Backend>(
  SignedIn(session): SignedIn<B>,
) -> Result<Json<SessionBody>, ApiError> {
  Ok(Json(SessionBody::from_session(&session)?))
}

/// `POST /auth/refresh`
pub async fn refresh<B: Backend>(
  SignedIn(mut session): SignedIn<B>,
) -> Result<Json<SessionBody>, ApiError> {
  session.refresh().await?;
  Ok(Json(SessionBody::from_session(&session)?))
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<B: Backend>(SignedIn(mut session): SignedIn<B>) -> StatusCode {
  session.logout().await;
  StatusCode::NO_CONTENT
}
