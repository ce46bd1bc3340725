//! Core types and trait definitions for the Roster membership registry.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the closed [`role::Role`] type, the canonical [`identity::Identity`], the
//! backend traits, and the resolver that reconciles a signed-in principal
//! with its profile row.

// Backend traits return `impl Future + Send`; implementors write `async fn`.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod identity;
pub mod principal;
pub mod profile;
pub mod resolver;
pub mod role;
pub mod session;
pub mod store;
pub mod week;

pub use error::{AuthError, Error, Result};
