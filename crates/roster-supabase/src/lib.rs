//! Hosted backend for Roster: Supabase GoTrue for sign-in and PostgREST for
//! profile and member rows.
//!
//! [`SupabaseClient`] implements every `roster-core` backend trait. Row reads
//! carry the caller's access token so row-level security is evaluated as that
//! user.

mod claims;
mod client;
mod gotrue;
mod postgrest;

pub mod error;

pub use claims::TokenClaims;
pub use client::{SupabaseClient, SupabaseConfig};
pub use error::{Error, Result};
