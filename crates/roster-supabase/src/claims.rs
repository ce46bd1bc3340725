//! Reading the payload of a GoTrue access token.
//!
//! The signature is not checked. PostgREST validates the token on every row
//! read.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use roster_core::principal::Principal;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// The subset of GoTrue JWT claims Roster cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
  pub sub:           Uuid,
  #[serde(default)]
  pub email:         Option<String>,
  /// Seconds since the Unix epoch.
  #[serde(default)]
  pub exp:           Option<i64>,
  #[serde(default)]
  pub user_metadata: Map<String, Value>,
}

impl TokenClaims {
  /// Decode the payload segment of `token`.
  pub fn decode(token: &str) -> Result<Self> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
      (Some(_), Some(payload), Some(_), None) => payload,
      _ => return Err(Error::Claims("expected three dot-separated segments".into())),
    };
    // Some encoders leave padding in place.
    let bytes = URL_SAFE_NO_PAD
      .decode(payload.trim_end_matches('='))
      .map_err(|e| Error::Claims(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Claims(e.to_string()))
  }

  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
  }

  pub fn into_principal(self) -> Principal {
    Principal {
      subject_id: self.sub,
      email:      self.email.unwrap_or_default(),
      metadata:   self.user_metadata,
    }
  }
}
