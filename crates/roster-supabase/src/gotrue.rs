//! GoTrue endpoints: password sign-in, current user, sign-out.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Response, StatusCode};
use roster_core::{
  AuthError,
  principal::{AuthSession, Credentials, Principal},
  store::AuthProvider,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{SupabaseClient, claims::TokenClaims};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PasswordGrant<'a> {
  email:    &'a str,
  password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token:  String,
  #[serde(default)]
  refresh_token: Option<String>,
  /// Seconds since the Unix epoch.
  #[serde(default)]
  expires_at:    Option<i64>,
  #[serde(default)]
  expires_in:    Option<i64>,
  #[serde(default)]
  user:          Option<GoTrueUser>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
  id:            Uuid,
  #[serde(default)]
  email:         Option<String>,
  #[serde(default)]
  user_metadata: Option<Map<String, Value>>,
}

impl GoTrueUser {
  fn into_principal(self) -> Principal {
    Principal {
      subject_id: self.id,
      email:      self.email.unwrap_or_default(),
      metadata:   self.user_metadata.unwrap_or_default(),
    }
  }
}

/// Error bodies differ between GoTrue versions; every known field is optional.
#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
  error_code:        Option<String>,
  msg:               Option<String>,
  message:           Option<String>,
  error:             Option<String>,
  error_description: Option<String>,
}

// ─── Conversion ──────────────────────────────────────────────────────────────

impl TokenResponse {
  /// Fill in the principal and expiry from the token's own claims when the
  /// response omits them. A token that cannot be read leaves `user` empty.
  fn into_session(self, now: DateTime<Utc>) -> AuthSession {
    let stated = self
      .expires_at
      .and_then(|secs| DateTime::from_timestamp(secs, 0))
      .or_else(|| self.expires_in.and_then(|secs| seconds_after(now, secs)));

    let claims = match (&self.user, stated) {
      (Some(_), Some(_)) => None,
      _ => match TokenClaims::decode(&self.access_token) {
        Ok(claims) => Some(claims),
        Err(e) => {
          tracing::debug!(error = %e, "access token claims unreadable");
          None
        }
      },
    };

    let expires_at = stated.or_else(|| claims.as_ref().and_then(TokenClaims::expires_at));

    let user = match self.user {
      Some(user) => Some(user.into_principal()),
      None => claims.map(TokenClaims::into_principal),
    };

    AuthSession {
      access_token: self.access_token,
      refresh_token: self.refresh_token,
      expires_at,
      user,
    }
  }
}

/// `now + secs`, or `None` when the sum leaves chrono's range.
fn seconds_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
  Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d))
}

/// Map a GoTrue error response to the provider-agnostic [`AuthError`].
fn classify(status: StatusCode, body: &str) -> AuthError {
  let parsed: GoTrueErrorBody = serde_json::from_str(body).unwrap_or_default();

  match parsed.error_code.as_deref() {
    Some("invalid_credentials") => return AuthError::InvalidCredentials,
    Some("email_not_confirmed") => return AuthError::EmailNotConfirmed,
    Some("user_not_found") => return AuthError::UserNotFound,
    _ => {}
  }

  let message = parsed
    .msg
    .or(parsed.message)
    .or(parsed.error_description)
    .or(parsed.error)
    .unwrap_or_else(|| body.trim().to_owned());
  let lowered = message.to_lowercase();

  if lowered.contains("invalid login credentials") {
    AuthError::InvalidCredentials
  } else if lowered.contains("email not confirmed") {
    AuthError::EmailNotConfirmed
  } else if lowered.contains("user not found") {
    AuthError::UserNotFound
  } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
    AuthError::Unavailable(format!("{status}: {message}"))
  } else {
    AuthError::Provider(format!("{status}: {message}"))
  }
}

fn transport(e: reqwest::Error) -> AuthError { AuthError::Unavailable(e.to_string()) }

async fn error_from(resp: Response) -> AuthError {
  let status = resp.status();
  let body = resp.text().await.unwrap_or_default();
  classify(status, &body)
}

/// GoTrue answers an expired or revoked token with one of these.
fn is_rejected_token(status: StatusCode) -> bool {
  matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

// ─── AuthProvider impl ───────────────────────────────────────────────────────

impl AuthProvider for SupabaseClient {
  /// `POST /auth/v1/token?grant_type=password`
  async fn sign_in_with_password(
    &self,
    credentials: &Credentials,
  ) -> Result<AuthSession, AuthError> {
    tracing::debug!(email = %credentials.email, "GoTrue password grant");
    let resp = self
      .authorize(self.http.post(self.auth_url("/token")), None)
      .query(&[("grant_type", "password")])
      .json(&PasswordGrant {
        email:    credentials.email.trim(),
        password: &credentials.password,
      })
      .send()
      .await
      .map_err(transport)?;

    if !resp.status().is_success() {
      return Err(error_from(resp).await);
    }
    let body: TokenResponse = resp
      .json()
      .await
      .map_err(|e| AuthError::Provider(format!("unreadable token response: {e}")))?;
    Ok(body.into_session(Utc::now()))
  }

  /// `GET /auth/v1/user`
  async fn get_user(&self, access_token: &str) -> Result<Option<Principal>, AuthError> {
    if access_token.is_empty() {
      return Ok(None);
    }
    tracing::debug!("GoTrue get user");
    let resp = self
      .authorize(self.http.get(self.auth_url("/user")), Some(access_token))
      .send()
      .await
      .map_err(transport)?;

    let status = resp.status();
    if is_rejected_token(status) {
      return Ok(None);
    }
    if !status.is_success() {
      return Err(error_from(resp).await);
    }
    let user: GoTrueUser = resp
      .json()
      .await
      .map_err(|e| AuthError::Provider(format!("unreadable user response: {e}")))?;
    Ok(Some(user.into_principal()))
  }

  /// `GET /auth/v1/user`, with the expiry read from the token's `exp` claim.
  async fn current_session(
    &self,
    access_token: &str,
  ) -> Result<Option<AuthSession>, AuthError> {
    let Some(user) = self.get_user(access_token).await? else {
      return Ok(None);
    };
    let expires_at = TokenClaims::decode(access_token)
      .ok()
      .and_then(|claims| claims.expires_at());
    Ok(Some(AuthSession {
      access_token: access_token.to_owned(),
      refresh_token: None,
      expires_at,
      user: Some(user),
    }))
  }

  /// `POST /auth/v1/logout`
  async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
    tracing::debug!("GoTrue logout");
    let resp = self
      .authorize(self.http.post(self.auth_url("/logout")), Some(access_token))
      .send()
      .await
      .map_err(transport)?;

    let status = resp.status();
    // A token that is already gone counts as signed out.
    if status.is_success() || is_rejected_token(status) || status == StatusCode::NOT_FOUND {
      return Ok(());
    }
    Err(error_from(resp).await)
  }
}
