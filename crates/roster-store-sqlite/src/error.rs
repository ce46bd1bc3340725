//! Error type for `roster-store-sqlite`.

use roster_core::store::{ClassifyFailure, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("an account already exists for {0}")]
  DuplicateEmail(String),
}

impl ClassifyFailure for Error {
  fn failure_kind(&self) -> FailureKind {
    match self {
      Error::Database(_) => FailureKind::Unavailable,
      _ => FailureKind::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
