//! PostgREST row reads: profiles with their organisation, and member
//! registrations for the dashboard.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Response;
use roster_core::{
  profile::{ProfileRecord, text_or_number},
  store::{ProfileStore, RegistrationStore},
  week::{Registration, WeekWindow},
};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result, SupabaseClient};

const PROFILE_SELECT: &str = "*,organisation:organisations(id,name)";
const MEMBER_SELECT: &str =
  "id,created_by,organisation_id,created_at,registrar:profiles!created_by(full_name)";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MemberRow {
  id:              Uuid,
  created_by:      Uuid,
  #[serde(default, deserialize_with = "text_or_number::optional")]
  organisation_id: Option<String>,
  created_at:      DateTime<Utc>,
  #[serde(default)]
  registrar:       Option<Registrar>,
}

#[derive(Debug, Deserialize)]
struct Registrar {
  full_name: Option<String>,
}

impl From<MemberRow> for Registration {
  fn from(row: MemberRow) -> Self {
    Registration {
      member_id:          row.id,
      registered_by:      row.created_by,
      registered_by_name: row.registrar.and_then(|r| r.full_name),
      organisation_id:    row.organisation_id,
      registered_at:      row.created_at,
    }
  }
}

fn timestamp(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Secs, true) }

// ─── Requests ────────────────────────────────────────────────────────────────

impl SupabaseClient {
  async fn read_rows<T: DeserializeOwned>(
    &self,
    table: &str,
    access_token: &str,
    query: &[(&str, String)],
  ) -> Result<Vec<T>> {
    tracing::debug!(table, "PostgREST select");
    let resp = self
      .authorize(self.http.get(self.rest_url(table)), Some(access_token))
      .query(query)
      .send()
      .await?;
    decode_rows(resp).await
  }
}

async fn decode_rows<T: DeserializeOwned>(resp: Response) -> Result<Vec<T>> {
  let status = resp.status();
  let body = resp.text().await?;
  if !status.is_success() {
    return Err(Error::from_postgrest(status.as_u16(), &body));
  }
  Ok(serde_json::from_str(&body)?)
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SupabaseClient {
  type Error = Error;

  /// `GET /rest/v1/profiles?id=eq.<id>&select=*,organisation:organisations(id,name)`
  async fn fetch_profile(
    &self,
    access_token: &str,
    subject_id: Uuid,
  ) -> Result<Option<ProfileRecord>> {
    let rows: Vec<ProfileRecord> = self
      .read_rows(
        "profiles",
        access_token,
        &[
          ("id", format!("eq.{subject_id}")),
          ("select", PROFILE_SELECT.to_owned()),
          ("limit", "1".to_owned()),
        ],
      )
      .await?;
    Ok(rows.into_iter().next())
  }
}

// ─── RegistrationStore impl ──────────────────────────────────────────────────

impl RegistrationStore for SupabaseClient {
  type Error = Error;

  /// `GET /rest/v1/members?created_at=gte.<start>&created_at=lt.<end>`
  async fn list_registrations(
    &self,
    access_token: &str,
    window: &WeekWindow,
  ) -> Result<Vec<Registration>> {
    let rows: Vec<MemberRow> = self
      .read_rows("members", access_token, &member_query(window))
      .await?;
    Ok(rows.into_iter().map(Registration::from).collect())
  }
}

fn member_query(window: &WeekWindow) -> Vec<(&'static str, String)> {
  vec![
    ("select", MEMBER_SELECT.to_owned()),
    ("created_at", format!("gte.{}", timestamp(window.starts_at()))),
    ("created_at", format!("lt.{}", timestamp(window.ends_before()))),
    ("order", "created_at.asc".to_owned()),
  ]
}
