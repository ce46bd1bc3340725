//! Error types for `roster-core`.

use thiserror::Error;

/// Why the identity provider refused or failed a request.
///
/// Messages are shown to the operator as-is, so they read as sentences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("email address has not been confirmed")]
  EmailNotConfirmed,

  #[error("no account exists for this email")]
  UserNotFound,

  #[error("session has expired, sign in again")]
  SessionExpired,

  #[error("identity provider unavailable: {0}")]
  Unavailable(String),

  #[error("identity provider error: {0}")]
  Provider(String),
}

/// Errors raised while establishing or maintaining a [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Auth(#[from] AuthError),

  /// Authentication succeeded but no principal came back to resolve.
  #[error("signed in, but the account could not be synchronised")]
  SyncFailed,

  #[error("no active session")]
  NoSession,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
