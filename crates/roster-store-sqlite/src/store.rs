//! [`SqliteStore`], the SQLite implementation of every Roster backend trait.

use std::path::Path;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use roster_core::{
  AuthError,
  principal::{AuthSession, Credentials, Principal},
  profile::ProfileRecord,
  store::{AuthProvider, ProfileStore, RegistrationStore},
  week::{Registration, WeekWindow},
};
use rusqlite::OptionalExtension as _;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawProfile, RawRegistration, decode_dt, encode_dt,
    encode_metadata, encode_uuid, hash_token,
  },
  schema::SCHEMA,
};

/// Access tokens live this long unless configured otherwise.
const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`SqliteStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:           String,
  pub password:        String,
  pub email_confirmed: bool,
  /// Claims returned with every sign-in, e.g. `{"role": "volunteer"}`.
  pub metadata:        Map<String, Value>,
}

impl NewAccount {
  /// A confirmed account with an empty metadata bag.
  pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      email:           email.into(),
      password:        password.into(),
      email_confirmed: true,
      metadata:        Map::new(),
    }
  }

  pub fn with_claim(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.metadata.insert(key.to_owned(), value.into());
    self
  }
}

/// Input to [`SqliteStore::record_member`].
#[derive(Debug, Clone)]
pub struct NewMember {
  pub full_name:       String,
  pub organisation_id: Option<String>,
  pub registered_by:   Uuid,
  /// Defaults to now.
  pub registered_at:   Option<DateTime<Utc>>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster backend stored in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:        tokio_rusqlite::Connection,
  session_ttl: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
    })
  }

  /// Override how long issued access tokens stay valid.
  pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
    self.session_ttl = ttl;
    self
  }

  // ── Provisioning ──────────────────────────────────────────────────────────

  /// Create a sign-in account and return its principal.
  pub async fn create_account(&self, input: NewAccount) -> Result<Principal> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
      .hash_password(input.password.as_bytes(), &salt)
      .map_err(|e| Error::PasswordHash(e.to_string()))?
      .to_string();

    let principal = Principal {
      subject_id: Uuid::new_v4(),
      email:      input.email.trim().to_owned(),
      metadata:   input.metadata,
    };

    let id_str       = encode_uuid(principal.subject_id);
    let email        = principal.email.clone();
    let metadata_str = encode_metadata(&principal.metadata)?;
    let confirmed    = input.email_confirmed;
    let at_str       = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO accounts
             (subject_id, email, password_hash, email_confirmed, metadata, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, password_hash, confirmed, metadata_str, at_str],
        )?;
        Ok(n)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::DuplicateEmail(principal.email));
    }
    Ok(principal)
  }

  pub async fn add_organisation(&self, id: &str, name: &str) -> Result<()> {
    let id     = id.to_owned();
    let name   = name.to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO organisations (organisation_id, name, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (organisation_id) DO UPDATE SET name = excluded.name",
          rusqlite::params![id, name, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or replace the profile row for `record.id`.
  ///
  /// The joined `organisation` field is ignored; only `organisation_id` is
  /// stored.
  pub async fn put_profile(&self, record: &ProfileRecord) -> Result<()> {
    let id_str = encode_uuid(record.id);
    let r      = record.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO profiles
             (subject_id, full_name, email, role, organisation_id, mobile, status)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            r.full_name,
            r.email,
            r.role,
            r.organisation_id,
            r.mobile,
            r.status,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn record_member(&self, input: NewMember) -> Result<Registration> {
    let registration = Registration {
      member_id:          Uuid::new_v4(),
      registered_by:      input.registered_by,
      registered_by_name: None,
      organisation_id:    input.organisation_id,
      registered_at:      input.registered_at.unwrap_or_else(Utc::now),
    };

    let member_str = encode_uuid(registration.member_id);
    let by_str     = encode_uuid(registration.registered_by);
    let org        = registration.organisation_id.clone();
    let at_str     = encode_dt(registration.registered_at);
    let full_name  = input.full_name;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO members
             (member_id, full_name, organisation_id, registered_by, registered_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![member_str, full_name, org, by_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(registration)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn account_by_email(&self, email: &str) -> Result<Option<RawAccount>> {
    let email = email.trim().to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subject_id, email, password_hash, email_confirmed, metadata
               FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok(RawAccount {
                subject_id:      row.get(0)?,
                email:           row.get(1)?,
                password_hash:   row.get(2)?,
                email_confirmed: row.get(3)?,
                metadata:        row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;
    Ok(raw)
  }

  /// Store a fresh token for `subject_id` and return it with its expiry.
  async fn issue_token(&self, subject_id: Uuid) -> Result<(String, DateTime<Utc>)> {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    let issued_at  = Utc::now();
    let expires_at = issued_at + self.session_ttl;

    let hash_str    = hash_token(&token);
    let subject_str = encode_uuid(subject_id);
    let issued_str  = encode_dt(issued_at);
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, subject_id, issued_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![hash_str, subject_str, issued_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok((token, expires_at))
  }

  /// The account behind a live token, with the token's expiry.
  async fn session_for_token(
    &self,
    token: &str,
  ) -> Result<Option<(Principal, DateTime<Utc>)>> {
    let hash_str = hash_token(token);
    let now_str  = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT a.subject_id, a.email, a.password_hash, a.email_confirmed, a.metadata,
                    s.expires_at
               FROM sessions s
               JOIN accounts a ON a.subject_id = s.subject_id
              WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            rusqlite::params![hash_str, now_str],
            |row| {
              let account = RawAccount {
                subject_id:      row.get(0)?,
                email:           row.get(1)?,
                password_hash:   row.get(2)?,
                email_confirmed: row.get(3)?,
                metadata:        row.get(4)?,
              };
              Ok((account, row.get::<_, String>(5)?))
            },
          )
          .optional()?)
      })
      .await?;

    let Some((account, expires_at)) = raw else {
      return Ok(None);
    };
    Ok(Some((account.to_principal()?, decode_dt(&expires_at)?)))
  }

  async fn revoke_token(&self, token: &str) -> Result<()> {
    let hash_str = hash_token(token);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![hash_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Drop every expired token. Returns how many were removed.
  pub async fn purge_expired_sessions(&self) -> Result<usize> {
    let now_str = encode_dt(Utc::now());
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    Ok(n)
  }
}

fn unavailable(e: Error) -> AuthError { AuthError::Unavailable(e.to_string()) }

// ─── AuthProvider impl ───────────────────────────────────────────────────────

impl AuthProvider for SqliteStore {
  async fn sign_in_with_password(
    &self,
    credentials: &Credentials,
  ) -> Result<AuthSession, AuthError> {
    let account = self
      .account_by_email(&credentials.email)
      .await
      .map_err(unavailable)?
      .ok_or(AuthError::UserNotFound)?;

    let parsed_hash = PasswordHash::new(&account.password_hash)
      .map_err(|e| AuthError::Provider(format!("stored hash unreadable: {e}")))?;
    Argon2::default()
      .verify_password(credentials.password.as_bytes(), &parsed_hash)
      .map_err(|_| AuthError::InvalidCredentials)?;

    if !account.email_confirmed {
      return Err(AuthError::EmailNotConfirmed);
    }

    let principal = account.to_principal().map_err(unavailable)?;
    let (access_token, expires_at) = self
      .issue_token(principal.subject_id)
      .await
      .map_err(unavailable)?;

    tracing::debug!(subject_id = %principal.subject_id, "issued access token");
    Ok(AuthSession {
      access_token,
      refresh_token: None,
      expires_at: Some(expires_at),
      user: Some(principal),
    })
  }

  async fn get_user(&self, access_token: &str) -> Result<Option<Principal>, AuthError> {
    let session = self.session_for_token(access_token).await.map_err(unavailable)?;
    Ok(session.map(|(principal, _)| principal))
  }

  async fn current_session(
    &self,
    access_token: &str,
  ) -> Result<Option<AuthSession>, AuthError> {
    let session = self.session_for_token(access_token).await.map_err(unavailable)?;
    Ok(session.map(|(principal, expires_at)| AuthSession {
      access_token:  access_token.to_owned(),
      refresh_token: None,
      expires_at:    Some(expires_at),
      user:          Some(principal),
    }))
  }

  async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
    self.revoke_token(access_token).await.map_err(unavailable)
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  async fn fetch_profile(
    &self,
    _access_token: &str,
    subject_id: Uuid,
  ) -> Result<Option<ProfileRecord>> {
    let id_str = encode_uuid(subject_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT p.subject_id, p.full_name, p.email, p.role, p.organisation_id,
                    p.mobile, p.status, o.name
               FROM profiles p
               LEFT JOIN organisations o ON o.organisation_id = p.organisation_id
              WHERE p.subject_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawProfile {
                subject_id:        row.get(0)?,
                full_name:         row.get(1)?,
                email:             row.get(2)?,
                role:              row.get(3)?,
                organisation_id:   row.get(4)?,
                mobile:            row.get(5)?,
                status:            row.get(6)?,
                organisation_name: row.get(7)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_record).transpose()
  }
}

// ─── RegistrationStore impl ──────────────────────────────────────────────────

impl RegistrationStore for SqliteStore {
  type Error = Error;

  /// Row-level security is not modelled locally; every row in the window is
  /// returned and scoping is left to the caller.
  async fn list_registrations(
    &self,
    _access_token: &str,
    window: &WeekWindow,
  ) -> Result<Vec<Registration>> {
    let from_str  = encode_dt(window.starts_at());
    let until_str = encode_dt(window.ends_before());

    let raws: Vec<RawRegistration> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT m.member_id, m.registered_by, p.full_name, m.organisation_id,
                  m.registered_at
             FROM members m
             LEFT JOIN profiles p ON p.subject_id = m.registered_by
            WHERE m.registered_at >= ?1 AND m.registered_at < ?2
            ORDER BY m.registered_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![from_str, until_str], |row| {
            Ok(RawRegistration {
              member_id:          row.get(0)?,
              registered_by:      row.get(1)?,
              registered_by_name: row.get(2)?,
              organisation_id:    row.get(3)?,
              registered_at:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRegistration::into_registration).collect()
  }
}
