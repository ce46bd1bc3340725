//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] backed by any type implementing the three
//! `roster-core` backend traits. Every request that carries a bearer token
//! resumes its own [`Session`]; nothing is shared between requests except the
//! backend handle.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(roster_api::router(AppState::new(backend)))
//! ```

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod session;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use roster_core::{
  session::Session,
  store::{AuthProvider, ProfileStore, RegistrationStore},
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Backend ──────────────────────────────────────────────────────────────────

/// Everything the API needs from a backend.
pub trait Backend:
  AuthProvider + ProfileStore + RegistrationStore + Send + Sync + 'static
{
}

impl<T> Backend for T where
  T: AuthProvider + ProfileStore + RegistrationStore + Send + Sync + 'static
{
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<B> {
  pub backend: Arc<B>,
}

impl<B> AppState<B> {
  pub fn new(backend: Arc<B>) -> Self { Self { backend } }
}

impl<B> Clone for AppState<B> {
  fn clone(&self) -> Self {
    Self {
      backend: Arc::clone(&self.backend),
    }
  }
}

impl<B: Backend> AppState<B> {
  /// A fresh, empty session over this backend.
  pub fn session(&self) -> Session<B, B> {
    Session::new(self.backend.clone(), self.backend.clone())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<B: Backend>(state: AppState<B>) -> Router {
  Router::new()
    // Session
    .route("/auth/login", post(session::login::<B>))
    .route("/auth/session", get(session::current::<B>))
    .route("/auth/refresh", post(session::refresh::<B>))
    .route("/auth/logout", post(session::logout::<B>))
    // Dashboard
    .route("/dashboard/weekly-winner", get(dashboard::winner::<B>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
