//! SQLite backend for the Roster registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] plays every
//! backend role: identity provider, profile store and registrations source.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{NewAccount, NewMember, SqliteStore};

#[cfg(test)]
mod tests;
