//! Profile rows as stored by the backend.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the profile collection joined with its organisation.
///
/// Every column is kept as the raw string the backend returned; nothing here
/// is trusted until the resolver has normalized it. Organisation ids may
/// arrive as numbers and are kept as their decimal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
  pub id:              Uuid,
  #[serde(default)]
  pub full_name:       Option<String>,
  #[serde(default)]
  pub email:           Option<String>,
  #[serde(default)]
  pub role:            Option<String>,
  #[serde(default, deserialize_with = "text_or_number::optional")]
  pub organisation_id: Option<String>,
  /// The joined organisation row, when the foreign key resolves.
  #[serde(default)]
  pub organisation:    Option<OrganisationRef>,
  #[serde(default)]
  pub mobile:          Option<String>,
  #[serde(default)]
  pub status:          Option<String>,
}

/// The slice of an organisation row that identity needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationRef {
  #[serde(deserialize_with = "text_or_number::required")]
  pub id:   String,
  #[serde(default)]
  pub name: Option<String>,
}

/// Serde helpers for key columns that are `text` in one schema and `bigint`
/// in another.
pub mod text_or_number {
  use serde::{Deserialize, Deserializer, de::Error as _};
  use serde_json::Value;

  use crate::principal::value_text;

  pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
      None | Some(Value::Null) => Ok(None),
      Some(v @ (Value::String(_) | Value::Number(_))) => Ok(value_text(&v)),
      Some(other) => Err(D::Error::custom(format!(
        "expected a string or number, got {other}"
      ))),
    }
  }

  pub fn required<'de, D>(deserializer: D) -> Result<String, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    value_text(&value).ok_or_else(|| {
      D::Error::custom(format!("expected a non-blank string or number, got {value}"))
    })
  }
}
