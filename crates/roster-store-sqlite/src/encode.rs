//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! comparison in SQL matches chronological order. UUIDs are stored as
//! hyphenated lowercase strings. The metadata bag is compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use roster_core::{
  principal::Principal,
  profile::{OrganisationRef, ProfileRecord},
  week::Registration,
};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ──────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_metadata(bag: &Map<String, Value>) -> Result<String> {
  Ok(serde_json::to_string(bag)?)
}

pub fn decode_metadata(s: &str) -> Result<Map<String, Value>> {
  Ok(serde_json::from_str(s)?)
}

/// Hex SHA-256 of an access token; the only form persisted.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from an `accounts` row.
pub struct RawAccount {
  pub subject_id:      String,
  pub email:           String,
  pub password_hash:   String,
  pub email_confirmed: bool,
  pub metadata:        String,
}

impl RawAccount {
  pub fn to_principal(&self) -> Result<Principal> {
    Ok(Principal {
      subject_id: decode_uuid(&self.subject_id)?,
      email:      self.email.clone(),
      metadata:   decode_metadata(&self.metadata)?,
    })
  }
}

/// Raw strings read from a `profiles` row left-joined with `organisations`.
pub struct RawProfile {
  pub subject_id:        String,
  pub full_name:         Option<String>,
  pub email:             Option<String>,
  pub role:              Option<String>,
  pub organisation_id:   Option<String>,
  pub mobile:            Option<String>,
  pub status:            Option<String>,
  // organisations join
  pub organisation_name: Option<String>,
}

impl RawProfile {
  pub fn into_record(self) -> Result<ProfileRecord> {
    // The join only matches when the organisation row exists.
    let organisation = match (&self.organisation_id, self.organisation_name) {
      (Some(id), Some(name)) => Some(OrganisationRef {
        id:   id.clone(),
        name: Some(name),
      }),
      _ => None,
    };

    Ok(ProfileRecord {
      id: decode_uuid(&self.subject_id)?,
      full_name: self.full_name,
      email: self.email,
      role: self.role,
      organisation_id: self.organisation_id,
      organisation,
      mobile: self.mobile,
      status: self.status,
    })
  }
}

/// Raw strings read from a `members` row left-joined with `profiles`.
pub struct RawRegistration {
  pub member_id:          String,
  pub registered_by:      String,
  pub registered_by_name: Option<String>,
  pub organisation_id:    Option<String>,
  pub registered_at:      String,
}

impl RawRegistration {
  pub fn into_registration(self) -> Result<Registration> {
    Ok(Registration {
      member_id:          decode_uuid(&self.member_id)?,
      registered_by:      decode_uuid(&self.registered_by)?,
      registered_by_name: self.registered_by_name,
      organisation_id:    self.organisation_id,
      registered_at:      decode_dt(&self.registered_at)?,
    })
  }
}
