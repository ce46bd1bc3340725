//! What the identity provider hands back after a successful sign-in.
//!
//! A [`Principal`] carries only what the provider guarantees: a stable subject
//! id, an email, and a free-form metadata bag. Hints pulled from that bag are
//! provisional until reconciled with the profile row.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

const ROLE_KEYS: &[&str] = &["role", "user_role"];
const ORGANISATION_KEYS: &[&str] =
  &["organisation_id", "organization_id", "org_id"];
const NAME_KEYS: &[&str] = &["full_name", "name", "display_name"];
const MOBILE_KEYS: &[&str] = &["mobile", "phone"];

// ─── Principal ───────────────────────────────────────────────────────────────

/// An authenticated user as seen by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
  pub subject_id: Uuid,
  pub email:      String,
  /// Claims attached at signup or sign-in time.
  #[serde(default)]
  pub metadata:   Map<String, Value>,
}

impl Principal {
  pub fn new(subject_id: Uuid, email: impl Into<String>) -> Self {
    Self {
      subject_id,
      email: email.into(),
      metadata: Map::new(),
    }
  }

  /// Builder-style helper for attaching a metadata claim.
  pub fn with_claim(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.metadata.insert(key.to_owned(), value.into());
    self
  }

  pub fn hints(&self) -> MetadataHints { MetadataHints::from_bag(&self.metadata) }
}

// ─── Metadata hints ──────────────────────────────────────────────────────────

/// Role, organisation and contact hints found in a metadata bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataHints {
  pub role:            Option<String>,
  pub organisation_id: Option<String>,
  pub display_name:    Option<String>,
  pub mobile:          Option<String>,
}

impl MetadataHints {
  pub fn from_bag(bag: &Map<String, Value>) -> Self {
    Self {
      role:            first_text(bag, ROLE_KEYS),
      organisation_id: first_text(bag, ORGANISATION_KEYS),
      display_name:    first_text(bag, NAME_KEYS),
      mobile:          first_text(bag, MOBILE_KEYS),
    }
  }
}

/// The first key holding a non-blank string or a number, as trimmed text.
fn first_text(bag: &Map<String, Value>, keys: &[&str]) -> Option<String> {
  keys.iter().find_map(|key| value_text(bag.get(*key)?))
}

/// A non-blank string or a number, as trimmed text.
pub fn value_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => non_blank(s),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// `Some(trimmed)` unless the string is empty after trimming.
pub fn non_blank(s: &str) -> Option<String> {
  let trimmed = s.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

// ─── Session and credentials ─────────────────────────────────────────────────

/// A token pair issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<DateTime<Utc>>,
  /// The signed-in user; absent when the provider could not supply one.
  pub user:          Option<Principal>,
}

/// Email and password as typed by the operator.
#[derive(Clone, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      email:    email.into(),
      password: password.into(),
    }
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &self.email)
      .field("password", &"<redacted>")
      .finish()
  }
}
