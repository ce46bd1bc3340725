use roster_core::store::{ClassifyFailure, FailureKind};
use serde::Deserialize;
use thiserror::Error;

/// Postgres error code raised when a row-level security policy re-enters
/// itself.
pub const POLICY_RECURSION_CODE: &str = "42P17";

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP transport error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("backend returned {status}: {message}")]
  Status {
    status:  u16,
    code:    Option<String>,
    message: String,
  },

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("malformed access token: {0}")]
  Claims(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ClassifyFailure for Error {
  fn failure_kind(&self) -> FailureKind {
    match self {
      Self::Status { code: Some(code), .. } if code == POLICY_RECURSION_CODE => {
        FailureKind::PolicyRecursion
      }
      Self::Http(_) => FailureKind::Unavailable,
      Self::Status { status, .. } if *status >= 500 => FailureKind::Unavailable,
      _ => FailureKind::Other,
    }
  }
}

/// Body PostgREST sends with a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PostgrestErrorBody {
  pub code:    Option<String>,
  pub message: Option<String>,
  pub details: Option<String>,
}

impl Error {
  /// Build a [`Error::Status`] from a PostgREST error response body.
  pub(crate) fn from_postgrest(status: u16, body: &str) -> Self {
    let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
      .message
      .or(parsed.details)
      .unwrap_or_else(|| body.trim().to_owned());
    Self::Status {
      status,
      code: parsed.code,
      message,
    }
  }
}
