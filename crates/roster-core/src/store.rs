//! Backend traits: the identity provider, the profile store, and the member
//! registrations read used by the dashboard.
//!
//! Implemented by `roster-store-sqlite` (local) and `roster-supabase`
//! (hosted). Higher layers depend on these abstractions only.

use std::future::Future;

use uuid::Uuid;

use crate::{
  error::AuthError,
  principal::{AuthSession, Credentials, Principal},
  profile::ProfileRecord,
  week::{Registration, WeekWindow},
};

// ─── Failure classification ──────────────────────────────────────────────────

/// Coarse class of a profile-store failure, kept for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// An access-control policy re-entered itself while being evaluated.
  PolicyRecursion,
  /// The store could not be reached or did not answer.
  Unavailable,
  Other,
}

/// Implemented by store error types so the resolver can tell failure classes
/// apart without knowing the concrete backend.
pub trait ClassifyFailure {
  fn failure_kind(&self) -> FailureKind;
}

impl ClassifyFailure for std::convert::Infallible {
  fn failure_kind(&self) -> FailureKind { match *self {} }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The hosted (or local) identity provider.
pub trait AuthProvider: Send + Sync {
  /// Exchange an email and password for a session.
  fn sign_in_with_password<'a>(
    &'a self,
    credentials: &'a Credentials,
  ) -> impl Future<Output = Result<AuthSession, AuthError>> + Send + 'a;

  /// The principal behind `access_token`, or `None` if the token is no longer
  /// valid.
  fn get_user<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<Option<Principal>, AuthError>> + Send + 'a;

  /// The live session behind `access_token`: its principal and, where the
  /// provider knows it, the token's expiry. `None` if the token is no longer
  /// valid.
  ///
  /// The default asks [`AuthProvider::get_user`] and reports no expiry.
  fn current_session<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<Option<AuthSession>, AuthError>> + Send + 'a {
    async move {
      let user = self.get_user(access_token).await?;
      Ok(user.map(|user| AuthSession {
        access_token:  access_token.to_owned(),
        refresh_token: None,
        expires_at:    None,
        user:          Some(user),
      }))
    }
  }

  /// Revoke `access_token`.
  fn sign_out<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<(), AuthError>> + Send + 'a;
}

/// Read access to persisted profile rows.
///
/// `access_token` is the caller's token; row-level security is evaluated
/// against it by backends that enforce it.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + ClassifyFailure + Send + Sync + 'static;

  /// Read one profile by subject id, joined with its organisation.
  /// Returns `None` if no row has been provisioned yet.
  fn fetch_profile<'a>(
    &'a self,
    access_token: &'a str,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<ProfileRecord>, Self::Error>> + Send + 'a;
}

/// Read access to member registrations.
pub trait RegistrationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All registrations recorded inside `window`, visible to `access_token`.
  fn list_registrations<'a>(
    &'a self,
    access_token: &'a str,
    window: &'a WeekWindow,
  ) -> impl Future<Output = Result<Vec<Registration>, Self::Error>> + Send + 'a;
}
