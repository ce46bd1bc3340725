//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use roster_core::{
  AuthError, Error as CoreError,
  identity::AccountStatus,
  principal::Credentials,
  profile::ProfileRecord,
  resolver::{ProfileLookup, resolve_identity},
  role::Role,
  session::Session,
  store::{AuthProvider, ProfileStore, RegistrationStore},
  week::{WeekWindow, weekly_winner},
};
use uuid::Uuid;

use crate::{Error, NewAccount, NewMember, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn creds(email: &str, password: &str) -> Credentials {
  Credentials::new(email, password)
}

// ─── Accounts and sign-in ────────────────────────────────────────────────────

#[tokio::test]
async fn sign_in_returns_principal_with_metadata() {
  let s = store().await;
  let created = s
    .create_account(NewAccount::new("vera@example.com", "pw").with_claim("role", "admin"))
    .await
    .unwrap();

  let session = s
    .sign_in_with_password(&creds("vera@example.com", "pw"))
    .await
    .unwrap();
  let user = session.user.expect("principal");
  assert_eq!(user.subject_id, created.subject_id);
  assert_eq!(user.hints().role.as_deref(), Some("admin"));
  assert!(session.expires_at.unwrap() > Utc::now());
  assert_eq!(session.access_token.len(), 64);
}

#[tokio::test]
async fn email_lookup_ignores_case() {
  let s = store().await;
  s.create_account(NewAccount::new("Vera@Example.com", "pw")).await.unwrap();
  assert!(s.sign_in_with_password(&creds("vera@example.com", "pw")).await.is_ok());
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
  let s = store().await;
  s.create_account(NewAccount::new("a@example.com", "pw")).await.unwrap();
  let err = s
    .sign_in_with_password(&creds("a@example.com", "nope"))
    .await
    .unwrap_err();
  assert_eq!(err, AuthError::InvalidCredentials);
}

#[tokio::test]
async fn unknown_email_is_user_not_found() {
  let s = store().await;
  let err = s
    .sign_in_with_password(&creds("ghost@example.com", "pw"))
    .await
    .unwrap_err();
  assert_eq!(err, AuthError::UserNotFound);
}

#[tokio::test]
async fn unconfirmed_email_is_rejected_after_password_check() {
  let s = store().await;
  let mut account = NewAccount::new("new@example.com", "pw");
  account.email_confirmed = false;
  s.create_account(account).await.unwrap();

  let wrong = s.sign_in_with_password(&creds("new@example.com", "x")).await;
  assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredentials);
  let right = s.sign_in_with_password(&creds("new@example.com", "pw")).await;
  assert_eq!(right.unwrap_err(), AuthError::EmailNotConfirmed);
}

#[tokio::test]
async fn duplicate_email_is_refused() {
  let s = store().await;
  s.create_account(NewAccount::new("dup@example.com", "pw")).await.unwrap();
  let err = s
    .create_account(NewAccount::new("DUP@example.com", "pw2"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateEmail(_)));
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_resolves_until_signed_out() {
  let s = store().await;
  let created = s.create_account(NewAccount::new("t@example.com", "pw")).await.unwrap();
  let session = s.sign_in_with_password(&creds("t@example.com", "pw")).await.unwrap();

  let user = s.get_user(&session.access_token).await.unwrap().unwrap();
  assert_eq!(user.subject_id, created.subject_id);

  s.sign_out(&session.access_token).await.unwrap();
  assert!(s.get_user(&session.access_token).await.unwrap().is_none());
  // Signing out twice is harmless.
  s.sign_out(&session.access_token).await.unwrap();
}

#[tokio::test]
async fn expired_tokens_do_not_resolve_and_are_purged() {
  let s = store().await.with_session_ttl(Duration::seconds(-1));
  s.create_account(NewAccount::new("e@example.com", "pw")).await.unwrap();
  let session = s.sign_in_with_password(&creds("e@example.com", "pw")).await.unwrap();

  assert!(s.get_user(&session.access_token).await.unwrap().is_none());
  assert_eq!(s.purge_expired_sessions().await.unwrap(), 1);
}

#[tokio::test]
async fn unknown_token_is_none() {
  let s = store().await;
  assert!(s.get_user("not-a-token").await.unwrap().is_none());
}

#[tokio::test]
async fn current_session_reports_the_stored_expiry() {
  let s = store().await;
  s.create_account(NewAccount::new("c@example.com", "pw")).await.unwrap();
  let issued = s.sign_in_with_password(&creds("c@example.com", "pw")).await.unwrap();

  let live = s
    .current_session(&issued.access_token)
    .await
    .unwrap()
    .expect("live session");
  assert_eq!(live.access_token, issued.access_token);
  assert_eq!(live.user, issued.user);
  assert_eq!(
    live.expires_at.map(|t| t.timestamp_micros()),
    issued.expires_at.map(|t| t.timestamp_micros())
  );

  s.sign_out(&issued.access_token).await.unwrap();
  assert!(s.current_session(&issued.access_token).await.unwrap().is_none());
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_joins_organisation_name() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.add_organisation("org-1", "Harbour Trust").await.unwrap();
  s.put_profile(&ProfileRecord {
    id,
    full_name: Some("Olu".into()),
    role: Some("Organisation".into()),
    organisation_id: Some("org-1".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  let row = s.fetch_profile("", id).await.unwrap().unwrap();
  assert_eq!(row.organisation.unwrap().name.as_deref(), Some("Harbour Trust"));
  assert_eq!(row.role.as_deref(), Some("Organisation"));
}

#[tokio::test]
async fn profile_with_unknown_organisation_has_no_join() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.put_profile(&ProfileRecord {
    id,
    organisation_id: Some("org-missing".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  let row = s.fetch_profile("", id).await.unwrap().unwrap();
  assert_eq!(row.organisation_id.as_deref(), Some("org-missing"));
  assert!(row.organisation.is_none());
}

#[tokio::test]
async fn missing_profile_is_none() {
  let s = store().await;
  assert!(s.fetch_profile("", Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn put_profile_replaces_existing_row() {
  let s = store().await;
  let id = Uuid::new_v4();
  let mut record = ProfileRecord {
    id,
    role: Some("volunteer".into()),
    ..Default::default()
  };
  s.put_profile(&record).await.unwrap();
  record.role = Some("org_admin".into());
  s.put_profile(&record).await.unwrap();

  let row = s.fetch_profile("", id).await.unwrap().unwrap();
  assert_eq!(row.role.as_deref(), Some("org_admin"));
}

// ─── Resolver and session over SQLite ────────────────────────────────────────

#[tokio::test]
async fn resolver_merges_row_and_metadata() {
  let s = store().await;
  let principal = s
    .create_account(
      NewAccount::new("ola@example.com", "pw").with_claim("organisation_id", "org-42"),
    )
    .await
    .unwrap();
  s.put_profile(&ProfileRecord {
    id: principal.subject_id,
    role: Some("org_admin".into()),
    status: Some("Active".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  let res = resolve_identity(&s, "", &principal).await;
  assert_eq!(res.lookup, ProfileLookup::Found);
  assert_eq!(res.identity.role, Role::Organisation);
  assert_eq!(res.identity.organisation_id.as_deref(), Some("org-42"));
  assert_eq!(res.identity.status, AccountStatus::Active);
}

#[tokio::test]
async fn session_login_refresh_logout() {
  let s = Arc::new(store().await);
  let principal = s
    .create_account(NewAccount::new("m@example.com", "pw").with_claim("role", "MasterAdmin"))
    .await
    .unwrap();

  let mut session = Session::new(s.clone(), s.clone());
  let identity = session.login(&creds("m@example.com", "pw")).await.unwrap().clone();
  assert_eq!(identity.role, Role::MasterAdmin);
  assert_eq!(session.lookup(), Some(&ProfileLookup::NotProvisioned));

  s.put_profile(&ProfileRecord {
    id: principal.subject_id,
    full_name: Some("Mo".into()),
    role: Some("master_admin".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  let refreshed = session.refresh().await.unwrap().clone();
  assert_eq!(refreshed.display_name, "Mo");
  assert_eq!(session.refresh().await.unwrap(), &refreshed);

  let token = session.access_token().unwrap().to_owned();
  session.logout().await;
  assert!(s.get_user(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn resumed_session_carries_the_token_expiry() {
  let s = Arc::new(store().await);
  s.create_account(NewAccount::new("r@example.com", "pw")).await.unwrap();
  let issued = s.sign_in_with_password(&creds("r@example.com", "pw")).await.unwrap();

  let mut session = Session::new(s.clone(), s);
  session.resume(&issued.access_token).await.unwrap();
  let expires_at = session.tokens().and_then(|t| t.expires_at).expect("expiry");
  assert_eq!(
    expires_at.timestamp_micros(),
    issued.expires_at.unwrap().timestamp_micros()
  );

  session.refresh().await.unwrap();
  assert_eq!(session.tokens().and_then(|t| t.expires_at), Some(expires_at));
}

#[tokio::test]
async fn session_login_with_bad_password_surfaces_auth_error() {
  let s = Arc::new(store().await);
  s.create_account(NewAccount::new("x@example.com", "pw")).await.unwrap();
  let mut session = Session::new(s.clone(), s);
  let err = session.login(&creds("x@example.com", "bad")).await.unwrap_err();
  assert!(matches!(err, CoreError::Auth(AuthError::InvalidCredentials)));
}

// ─── Registrations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn registrations_are_windowed_and_named() {
  let s = store().await;
  let vol = Uuid::new_v4();
  s.put_profile(&ProfileRecord {
    id: vol,
    full_name: Some("Vic".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  for (day, hour) in [(19, 9), (25, 23), (26, 0), (18, 23)] {
    s.record_member(NewMember {
      full_name:       format!("member {day}-{hour}"),
      organisation_id: Some("org-1".into()),
      registered_by:   vol,
      registered_at:   Some(Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()),
    })
    .await
    .unwrap();
  }

  let window = WeekWindow::containing(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
  let regs = s.list_registrations("", &window).await.unwrap();
  assert_eq!(regs.len(), 2);
  assert!(regs.iter().all(|r| r.registered_by_name.as_deref() == Some("Vic")));

  let winner = weekly_winner(&regs, window).unwrap();
  assert_eq!(winner.subject_id, vol);
  assert_eq!(winner.registrations, 2);
}
