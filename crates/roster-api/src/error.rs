//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use roster_core::{AuthError, role::Capability};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or malformed bearer token")]
  MissingToken,

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("signed in, but the account could not be synchronised")]
  SyncFailed,

  #[error("no active session")]
  NoSession,

  #[error("requires the {0} capability")]
  Forbidden(Capability),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<roster_core::Error> for ApiError {
  fn from(e: roster_core::Error) -> Self {
    match e {
      roster_core::Error::Auth(e) => Self::Auth(e),
      roster_core::Error::SyncFailed => Self::SyncFailed,
      roster_core::Error::NoSession => Self::NoSession,
    }
  }
}

impl ApiError {
  /// HTTP status and stable machine-readable code.
  pub fn status_and_code(&self) -> (StatusCode, &'static str) {
    match self {
      Self::MissingToken | Self::NoSession => (StatusCode::UNAUTHORIZED, "unauthorized"),
      Self::Auth(e) => match e {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
        AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, "user_not_found"),
        AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired"),
        AuthError::EmailNotConfirmed => (StatusCode::FORBIDDEN, "email_not_confirmed"),
        AuthError::Unavailable(_) => (StatusCode::BAD_GATEWAY, "provider_unavailable"),
        AuthError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
      },
      Self::SyncFailed => (StatusCode::BAD_GATEWAY, "sync_failed"),
      Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
      Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      Self::Store(_) => (StatusCode::BAD_GATEWAY, "store_error"),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    if status.is_server_error() {
      tracing::warn!(error = %self, code, "request failed upstream");
    }

    let mut res = (status, Json(json!({ "error": self.to_string(), "code": code })))
      .into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"roster\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn auth_failures_map_to_distinct_codes() {
    let cases = [
      (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
      (AuthError::UserNotFound, StatusCode::UNAUTHORIZED),
      (AuthError::EmailNotConfirmed, StatusCode::FORBIDDEN),
      (AuthError::Unavailable("down".into()), StatusCode::BAD_GATEWAY),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status_and_code().0, status);
    }
  }

  #[test]
  fn sync_failure_is_not_an_auth_failure() {
    let (status, code) = ApiError::from(roster_core::Error::SyncFailed).status_and_code();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(code, "sync_failed");
  }

  #[test]
  fn unauthorized_responses_challenge_for_bearer() {
    let res = ApiError::MissingToken.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers()[header::WWW_AUTHENTICATE],
      "Bearer realm=\"roster\""
    );
  }
}
