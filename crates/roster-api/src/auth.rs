//! Bearer-token extractor that resumes a [`Session`] for each request.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use roster_core::{identity::Identity, session::Session};

use crate::{AppState, Backend, error::ApiError};

/// A resumed session; present in a handler means the bearer token was valid.
pub struct SignedIn<B: Backend>(pub Session<B, B>);

impl<B: Backend> SignedIn<B> {
  pub fn identity(&self) -> Result<&Identity, ApiError> {
    self.0.identity().ok_or(ApiError::NoSession)
  }

  pub fn access_token(&self) -> Result<&str, ApiError> {
    self.0.access_token().ok_or(ApiError::NoSession)
  }
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::MissingToken)?;

  let (scheme, token) = value.split_once(' ').ok_or(ApiError::MissingToken)?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return Err(ApiError::MissingToken);
  }
  let token = token.trim();
  if token.is_empty() {
    return Err(ApiError::MissingToken);
  }
  Ok(token)
}

impl<B: Backend> FromRequestParts<AppState<B>> for SignedIn<B> {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<B>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    let mut session = state.session();
    session.resume(token).await?;
    Ok(SignedIn(session))
  }
}
