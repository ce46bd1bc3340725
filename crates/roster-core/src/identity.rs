//! The canonical, resolved representation of the signed-in actor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::{Capability, Role};

/// Whether the account may still be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
  #[default]
  Active,
  Deactivated,
}

impl AccountStatus {
  /// Parse a stored status column. Only explicit deactivation markers
  /// disable an account; blank or unknown values read as active.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      Some("deactivated" | "inactive" | "disabled") => Self::Deactivated,
      _ => Self::Active,
    }
  }
}

/// The identity every page and route works from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub subject_id:        Uuid,
  pub display_name:      String,
  pub email:             String,
  pub role:              Role,
  pub organisation_id:   Option<String>,
  pub organisation_name: Option<String>,
  pub mobile:            Option<String>,
  pub status:            AccountStatus,
}

impl Identity {
  pub fn is_active(&self) -> bool { self.status == AccountStatus::Active }

  pub fn can(&self, capability: Capability) -> bool { self.role.can(capability) }

  /// Which registry rows this identity may see.
  pub fn scope(&self) -> RegistryScope {
    match (self.role, &self.organisation_id) {
      (Role::MasterAdmin, _) => RegistryScope::All,
      (_, Some(org)) => RegistryScope::Organisation(org.clone()),
      (_, None) => RegistryScope::OwnOnly(self.subject_id),
    }
  }
}

/// The slice of the registry visible to an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryScope {
  All,
  Organisation(String),
  /// No organisation is linked; only rows the subject created.
  OwnOnly(Uuid),
}

impl RegistryScope {
  pub fn admits(&self, organisation_id: Option<&str>, created_by: Uuid) -> bool {
    match self {
      Self::All => true,
      Self::Organisation(org) => organisation_id == Some(org.as_str()),
      Self::OwnOnly(id) => *id == created_by,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity(role: Role, org: Option<&str>) -> Identity {
    Identity {
      subject_id: Uuid::from_u128(7),
      display_name: "Sam".into(),
      email: "sam@example.com".into(),
      role,
      organisation_id: org.map(str::to_owned),
      organisation_name: None,
      mobile: None,
      status: AccountStatus::Active,
    }
  }

  #[test]
  fn status_parsing() {
    assert_eq!(AccountStatus::parse(Some(" Deactivated ")), AccountStatus::Deactivated);
    assert_eq!(AccountStatus::parse(Some("INACTIVE")), AccountStatus::Deactivated);
    assert_eq!(AccountStatus::parse(Some("Active")), AccountStatus::Active);
    assert_eq!(AccountStatus::parse(Some("")), AccountStatus::Active);
    assert_eq!(AccountStatus::parse(None), AccountStatus::Active);
  }

  #[test]
  fn scope_follows_role_and_organisation() {
    assert_eq!(identity(Role::MasterAdmin, Some("o1")).scope(), RegistryScope::All);
    assert_eq!(
      identity(Role::Organisation, Some("o1")).scope(),
      RegistryScope::Organisation("o1".into())
    );
    assert_eq!(
      identity(Role::Volunteer, None).scope(),
      RegistryScope::OwnOnly(Uuid::from_u128(7))
    );
  }

  #[test]
  fn organisation_scope_admits_only_its_rows() {
    let scope = RegistryScope::Organisation("o1".into());
    assert!(scope.admits(Some("o1"), Uuid::nil()));
    assert!(!scope.admits(Some("o2"), Uuid::nil()));
    assert!(!scope.admits(None, Uuid::nil()));
  }
}
