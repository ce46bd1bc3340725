//! Reconciles a signed-in [`Principal`] with its profile row.
//!
//! Three sources may disagree: the profile row, the provider's metadata bag,
//! and the session token the principal was decoded from. The row wins where
//! it has a value; metadata fills the gaps. When the row cannot be read or
//! does not exist the identity is built from metadata alone. Resolution never
//! fails for an authenticated principal: the worst case is a
//! [`Role::Volunteer`] identity with minimal fields.

use serde::Serialize;
use uuid::Uuid;

use crate::{
  identity::{AccountStatus, Identity},
  principal::{MetadataHints, Principal, non_blank},
  profile::ProfileRecord,
  role::Role,
  store::{ClassifyFailure, FailureKind, ProfileStore},
};

/// How the profile read went.
///
/// [`ProfileLookup::NotProvisioned`] and [`ProfileLookup::Failed`] produce the
/// same identity; they are kept apart so logs and callers can tell missing
/// data from a broken store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProfileLookup {
  Found,
  NotProvisioned,
  Failed {
    #[serde(skip)]
    kind:    FailureKind,
    /// Backend error text; logged, never serialized.
    #[serde(skip)]
    message: String,
  },
}

impl ProfileLookup {
  pub fn used_fallback(&self) -> bool { !matches!(self, Self::Found) }
}

/// A resolved identity plus the record of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  pub identity: Identity,
  pub lookup:   ProfileLookup,
}

/// Resolve the canonical identity for `principal`.
pub async fn resolve_identity<P>(
  profiles: &P,
  access_token: &str,
  principal: &Principal,
) -> Resolution
where
  P: ProfileStore,
{
  let hints = principal.hints();

  match profiles.fetch_profile(access_token, principal.subject_id).await {
    Ok(Some(row)) => Resolution {
      identity: from_profile(principal, &hints, row),
      lookup:   ProfileLookup::Found,
    },
    Ok(None) => {
      tracing::info!(
        subject_id = %principal.subject_id,
        "no profile row provisioned; using session metadata"
      );
      Resolution {
        identity: from_metadata(principal, &hints),
        lookup:   ProfileLookup::NotProvisioned,
      }
    }
    Err(e) => {
      let kind = e.failure_kind();
      tracing::warn!(
        subject_id = %principal.subject_id,
        ?kind,
        error = %e,
        "profile read failed; using session metadata"
      );
      Resolution {
        identity: from_metadata(principal, &hints),
        lookup:   ProfileLookup::Failed {
          kind,
          message: e.to_string(),
        },
      }
    }
  }
}

/// Identity built from metadata hints only. Status is always active and no
/// organisation name is known.
pub fn from_metadata(principal: &Principal, hints: &MetadataHints) -> Identity {
  Identity {
    subject_id:        principal.subject_id,
    display_name:      display_name(None, hints, &principal.email),
    email:             principal.email.clone(),
    role:              Role::normalize(hints.role.as_deref()),
    organisation_id:   hints.organisation_id.clone(),
    organisation_name: None,
    mobile:            hints.mobile.clone(),
    status:            AccountStatus::Active,
  }
}

/// Identity built from a profile row, with metadata filling blank columns.
pub fn from_profile(
  principal: &Principal,
  hints: &MetadataHints,
  row: ProfileRecord,
) -> Identity {
  let role_text = row
    .role
    .as_deref()
    .and_then(non_blank)
    .or_else(|| hints.role.clone());

  let organisation_id = row
    .organisation_id
    .as_deref()
    .and_then(non_blank)
    .or_else(|| hints.organisation_id.clone());

  let organisation_name = row
    .organisation
    .as_ref()
    .and_then(|org| org.name.as_deref())
    .and_then(non_blank);

  let email = row
    .email
    .as_deref()
    .and_then(non_blank)
    .unwrap_or_else(|| principal.email.clone());

  Identity {
    subject_id: subject_id(principal, &row),
    display_name: display_name(row.full_name.as_deref(), hints, &email),
    role: Role::normalize(role_text.as_deref()),
    organisation_id,
    organisation_name,
    mobile: row
      .mobile
      .as_deref()
      .and_then(non_blank)
      .or_else(|| hints.mobile.clone()),
    status: AccountStatus::parse(row.status.as_deref()),
    email,
  }
}

/// The principal's id is authoritative; a mismatching row id is logged.
fn subject_id(principal: &Principal, row: &ProfileRecord) -> Uuid {
  if row.id != principal.subject_id {
    tracing::warn!(
      subject_id = %principal.subject_id,
      row_id = %row.id,
      "profile row id does not match the signed-in subject"
    );
  }
  principal.subject_id
}

fn display_name(
  stored: Option<&str>,
  hints: &MetadataHints,
  email: &str,
) -> String {
  stored
    .and_then(non_blank)
    .or_else(|| hints.display_name.clone())
    .unwrap_or_else(|| email.to_owned())
}

#[cfg(test)]
pub(crate) mod tests {
  use std::{
    collections::HashMap,
    sync::{
      Mutex,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use thiserror::Error;

  use super::*;
  use crate::profile::OrganisationRef;

  #[derive(Debug, Clone, Error)]
  pub enum StubError {
    #[error("infinite recursion detected in policy for relation \"profiles\"")]
    Recursion,
    #[error("connection refused")]
    Offline,
  }

  impl ClassifyFailure for StubError {
    fn failure_kind(&self) -> FailureKind {
      match self {
        Self::Recursion => FailureKind::PolicyRecursion,
        Self::Offline => FailureKind::Unavailable,
      }
    }
  }

  /// An in-memory profile store that can be told to fail.
  #[derive(Default)]
  pub struct StubProfiles {
    pub rows:    Mutex<HashMap<Uuid, ProfileRecord>>,
    pub failure: Mutex<Option<StubError>>,
    pub reads:   AtomicUsize,
  }

  impl StubProfiles {
    pub fn with_row(row: ProfileRecord) -> Self {
      let stub = Self::default();
      stub.rows.lock().unwrap().insert(row.id, row);
      stub
    }

    pub fn failing(error: StubError) -> Self {
      let stub = Self::default();
      *stub.failure.lock().unwrap() = Some(error);
      stub
    }
  }

  impl ProfileStore for StubProfiles {
    type Error = StubError;

    async fn fetch_profile(
      &self,
      _access_token: &str,
      subject_id: Uuid,
    ) -> Result<Option<ProfileRecord>, StubError> {
      self.reads.fetch_add(1, Ordering::SeqCst);
      if let Some(e) = self.failure.lock().unwrap().clone() {
        return Err(e);
      }
      Ok(self.rows.lock().unwrap().get(&subject_id).cloned())
    }
  }

  fn subject() -> Uuid { Uuid::from_u128(0xA11CE) }

  #[tokio::test]
  async fn row_role_used_with_metadata_organisation_fallback() {
    let row = ProfileRecord {
      id: subject(),
      full_name: Some("Alice Admin".into()),
      role: Some("org_admin".into()),
      ..Default::default()
    };
    let profiles = StubProfiles::with_row(row);
    let principal = Principal::new(subject(), "alice@example.com")
      .with_claim("organisation_id", "org-42");

    let res = resolve_identity(&profiles, "token", &principal).await;
    assert_eq!(res.lookup, ProfileLookup::Found);
    assert_eq!(res.identity.role, Role::Organisation);
    assert_eq!(res.identity.organisation_id.as_deref(), Some("org-42"));
    assert_eq!(res.identity.display_name, "Alice Admin");
  }

  #[tokio::test]
  async fn recursion_failure_falls_back_to_metadata() {
    let profiles = StubProfiles::failing(StubError::Recursion);
    let principal = Principal::new(subject(), "root@example.com")
      .with_claim("role", "MasterAdmin");

    let res = resolve_identity(&profiles, "token", &principal).await;
    assert_eq!(res.identity.role, Role::MasterAdmin);
    assert_eq!(res.identity.status, AccountStatus::Active);
    assert_eq!(res.identity.organisation_name, None);
    assert!(matches!(
      res.lookup,
      ProfileLookup::Failed { kind: FailureKind::PolicyRecursion, .. }
    ));
  }

  #[tokio::test]
  async fn missing_row_without_hints_defaults_to_volunteer() {
    let profiles = StubProfiles::default();
    let principal = Principal::new(subject(), "new@example.com");

    let res = resolve_identity(&profiles, "token", &principal).await;
    assert_eq!(res.lookup, ProfileLookup::NotProvisioned);
    assert_eq!(res.identity.role, Role::Volunteer);
    assert_eq!(res.identity.display_name, "new@example.com");
    assert_eq!(res.identity.organisation_id, None);
  }

  #[tokio::test]
  async fn missing_row_and_failure_yield_the_same_identity() {
    let principal = Principal::new(subject(), "v@example.com")
      .with_claim("role", "admin")
      .with_claim("org_id", "org-1")
      .with_claim("full_name", "Vera");

    let missing = resolve_identity(&StubProfiles::default(), "t", &principal).await;
    let offline =
      resolve_identity(&StubProfiles::failing(StubError::Offline), "t", &principal)
        .await;

    assert_eq!(missing.identity, offline.identity);
    assert_ne!(missing.lookup, offline.lookup);
    assert_eq!(missing.identity.role, Role::Organisation);
    assert_eq!(missing.identity.display_name, "Vera");
  }

  #[tokio::test]
  async fn blank_row_role_falls_back_to_metadata_role() {
    let row = ProfileRecord {
      id: subject(),
      role: Some("   ".into()),
      ..Default::default()
    };
    let principal = Principal::new(subject(), "m@example.com")
      .with_claim("role", "superadmin");

    let res = resolve_identity(&StubProfiles::with_row(row), "t", &principal).await;
    assert_eq!(res.identity.role, Role::MasterAdmin);
  }

  #[tokio::test]
  async fn row_role_beats_metadata_role() {
    let row = ProfileRecord {
      id: subject(),
      role: Some("Volunteer".into()),
      ..Default::default()
    };
    let principal = Principal::new(subject(), "m@example.com")
      .with_claim("role", "master_admin");

    let res = resolve_identity(&StubProfiles::with_row(row), "t", &principal).await;
    assert_eq!(res.identity.role, Role::Volunteer);
  }

  #[tokio::test]
  async fn row_fields_carry_through() {
    let row = ProfileRecord {
      id: subject(),
      full_name: Some("Olu Org".into()),
      email: Some("olu@org.example".into()),
      role: Some("Organisation".into()),
      organisation_id: Some("org-9".into()),
      organisation: Some(OrganisationRef {
        id:   "org-9".into(),
        name: Some("Harbour Trust".into()),
      }),
      mobile: Some("+44 7700 900000".into()),
      status: Some("Deactivated".into()),
    };
    let principal = Principal::new(subject(), "login@example.com")
      .with_claim("organisation_id", "org-ignored");

    let id = resolve_identity(&StubProfiles::with_row(row), "t", &principal)
      .await
      .identity;
    assert_eq!(id.email, "olu@org.example");
    assert_eq!(id.organisation_id.as_deref(), Some("org-9"));
    assert_eq!(id.organisation_name.as_deref(), Some("Harbour Trust"));
    assert_eq!(id.mobile.as_deref(), Some("+44 7700 900000"));
    assert_eq!(id.status, AccountStatus::Deactivated);
  }

  #[test]
  fn failed_lookup_serializes_without_backend_text() {
    let lookup = ProfileLookup::Failed {
      kind:    FailureKind::PolicyRecursion,
      message: StubError::Recursion.to_string(),
    };
    assert_eq!(
      serde_json::to_value(&lookup).unwrap(),
      serde_json::json!({ "outcome": "failed" })
    );
  }
}
