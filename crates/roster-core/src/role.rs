//! The closed role classification and its normalization from free-form text.
//!
//! Neither the profile table nor the identity provider enforce an enum, so a
//! role arrives as whatever string was written at signup or by an operator.
//! [`Role::normalize`] is the only way such a string becomes a [`Role`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

/// Who the signed-in actor is, for navigation and authorization purposes.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  /// Platform operator; sees every organisation.
  MasterAdmin,
  /// Administrator of a single organisation.
  Organisation,
  /// Registers members on behalf of an organisation. Least privileged.
  #[default]
  Volunteer,
}

impl Role {
  /// Map a raw role string onto a [`Role`].
  ///
  /// Case, surrounding whitespace, hyphens and inner spaces are ignored.
  /// Absent, blank and unrecognized values all yield [`Role::Volunteer`].
  pub fn normalize(raw: Option<&str>) -> Self {
    raw.and_then(Self::recognize).unwrap_or_default()
  }

  /// Like [`Role::normalize`], but `None` when the value is not one of the
  /// known synonyms.
  pub fn recognize(raw: &str) -> Option<Self> {
    let key: String = raw
      .trim()
      .chars()
      .map(|c| match c {
        '-' | ' ' => '_',
        c => c.to_ascii_lowercase(),
      })
      .collect();

    match key.as_str() {
      "masteradmin" | "master_admin" | "superadmin" | "super_admin" => {
        Some(Self::MasterAdmin)
      }
      "organisation"
      | "organization"
      | "org"
      | "admin"
      | "org_admin"
      | "orgadmin"
      | "organisation_admin"
      | "organization_admin" => Some(Self::Organisation),
      "volunteer" => Some(Self::Volunteer),
      _ => None,
    }
  }

  /// Canonical wire form, e.g. `"master_admin"`.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn can(self, capability: Capability) -> bool {
    use Capability::*;
    match self {
      Self::MasterAdmin => true,
      Self::Organisation => matches!(
        capability,
        ManageVolunteers | RegisterMembers | ViewDashboard
      ),
      Self::Volunteer => matches!(capability, RegisterMembers),
    }
  }

  /// Every capability this role holds, in declaration order.
  pub fn capabilities(self) -> Vec<Capability> {
    use strum::IntoEnumIterator;
    Capability::iter().filter(|c| self.can(*c)).collect()
  }
}

/// A coarse permission used to gate navigation and API routes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
  ManageOrganisations,
  ManageVolunteers,
  RegisterMembers,
  ViewDashboard,
}
