//! The explicitly owned session: sign-in, silent resume, refresh, sign-out.
//!
//! A [`Session`] is created by whoever needs the current identity and handed
//! around by reference. Nothing is global; dropping or invalidating the
//! session discards the identity.

use std::sync::Arc;

use crate::{
  error::{AuthError, Error, Result},
  identity::Identity,
  principal::{AuthSession, Credentials, Principal},
  resolver::{ProfileLookup, Resolution, resolve_identity},
  store::{AuthProvider, ProfileStore},
};

struct Established {
  tokens:   AuthSession,
  identity: Identity,
  lookup:   ProfileLookup,
}

/// Holds at most one signed-in identity.
pub struct Session<A, P> {
  auth:     Arc<A>,
  profiles: Arc<P>,
  current:  Option<Established>,
}

impl<A, P> Session<A, P>
where
  A: AuthProvider,
  P: ProfileStore,
{
  pub fn new(auth: Arc<A>, profiles: Arc<P>) -> Self {
    Self {
      auth,
      profiles,
      current: None,
    }
  }

  // ── Establishment ─────────────────────────────────────────────────────────

  /// Sign in with email and password and resolve the identity.
  ///
  /// Provider errors are returned unchanged. A provider response without a
  /// user yields [`Error::SyncFailed`] and leaves the session empty.
  pub async fn login(&mut self, credentials: &Credentials) -> Result<&Identity> {
    self.current = None;

    let tokens = self.auth.sign_in_with_password(credentials).await?;
    let Some(principal) = tokens.user.clone() else {
      tracing::warn!(email = %credentials.email, "sign-in returned no user");
      return Err(Error::SyncFailed);
    };

    let resolution =
      resolve_identity(&*self.profiles, &tokens.access_token, &principal).await;
    tracing::info!(
      subject_id = %principal.subject_id,
      role = %resolution.identity.role,
      "signed in"
    );
    Ok(self.establish(tokens, resolution))
  }

  /// Resume a session from an access token issued earlier.
  pub async fn resume(&mut self, access_token: &str) -> Result<&Identity> {
    self.current = None;

    let (tokens, principal) = self.live_session(access_token).await?;
    let resolution =
      resolve_identity(&*self.profiles, access_token, &principal).await;
    Ok(self.establish(tokens, resolution))
  }

  /// Re-resolve the identity of the active session without signing in again.
  ///
  /// Idempotent: with no profile change in between, two calls produce equal
  /// identities. A token the provider no longer accepts ends the session.
  pub async fn refresh(&mut self) -> Result<&Identity> {
    let access_token = self
      .current
      .as_ref()
      .map(|c| c.tokens.access_token.clone())
      .ok_or(Error::NoSession)?;

    let (live, principal) = match self.live_session(&access_token).await {
      Ok(found) => found,
      Err(e) => {
        if matches!(e, Error::Auth(AuthError::SessionExpired)) {
          self.invalidate();
        }
        return Err(e);
      }
    };

    let resolution =
      resolve_identity(&*self.profiles, &access_token, &principal).await;
    let Some(current) = self.current.as_mut() else {
      return Err(Error::NoSession);
    };
    if live.expires_at.is_some() {
      current.tokens.expires_at = live.expires_at;
    }
    current.tokens.user = Some(principal);
    current.identity = resolution.identity;
    current.lookup = resolution.lookup;
    Ok(&current.identity)
  }

  /// Revoke the token with the provider and drop the identity.
  ///
  /// The local session is cleared even if the provider call fails.
  pub async fn logout(&mut self) {
    let Some(current) = self.current.take() else {
      return;
    };
    match self.auth.sign_out(&current.tokens.access_token).await {
      Ok(()) => tracing::info!(
        subject_id = %current.identity.subject_id,
        "signed out"
      ),
      Err(e) => tracing::warn!(
        subject_id = %current.identity.subject_id,
        error = %e,
        "sign-out failed at the provider; local session cleared"
      ),
    }
  }

  /// Drop the identity without contacting the provider.
  pub fn invalidate(&mut self) { self.current = None; }

  // ── Accessors ─────────────────────────────────────────────────────────────

  pub fn identity(&self) -> Option<&Identity> {
    self.current.as_ref().map(|c| &c.identity)
  }

  pub fn tokens(&self) -> Option<&AuthSession> {
    self.current.as_ref().map(|c| &c.tokens)
  }

  pub fn access_token(&self) -> Option<&str> {
    self.tokens().map(|t| t.access_token.as_str())
  }

  /// How the profile read went for the current identity.
  pub fn lookup(&self) -> Option<&ProfileLookup> {
    self.current.as_ref().map(|c| &c.lookup)
  }

  pub fn is_authenticated(&self) -> bool { self.current.is_some() }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// The provider's view of `access_token`, split into the token record and
  /// its principal.
  async fn live_session(&self, access_token: &str) -> Result<(AuthSession, Principal)> {
    let expired = || Error::Auth(AuthError::SessionExpired);
    let tokens = self
      .auth
      .current_session(access_token)
      .await?
      .ok_or_else(expired)?;
    let principal = tokens.user.clone().ok_or_else(expired)?;
    Ok((tokens, principal))
  }

  fn establish(&mut self, tokens: AuthSession, resolution: Resolution) -> &Identity {
    let current = self.current.insert(Established {
      tokens,
      identity: resolution.identity,
      lookup: resolution.lookup,
    });
    &current.identity
  }
}
