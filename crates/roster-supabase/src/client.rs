//! Connection settings and the shared HTTP client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use crate::Result;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the hosted project lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
  /// Project URL, e.g. `https://abcd.supabase.co`.
  pub url:      String,
  /// The public anon key; sent as `apikey` on every request.
  pub anon_key: String,
  pub timeout:  Duration,
}

impl SupabaseConfig {
  pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
    Self {
      url:      url.into(),
      anon_key: anon_key.into(),
      timeout:  Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
  }
}

/// Async client for one Supabase project.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SupabaseClient {
  pub(crate) http:   Client,
  pub(crate) config: SupabaseConfig,
}

impl SupabaseClient {
  pub fn new(config: SupabaseConfig) -> Result<Self> {
    let http = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { http, config })
  }

  pub fn config(&self) -> &SupabaseConfig { &self.config }

  /// `{url}/auth/v1{path}`
  pub(crate) fn auth_url(&self, path: &str) -> String {
    format!("{}/auth/v1{}", self.base(), path)
  }

  /// `{url}/rest/v1/{table}`
  pub(crate) fn rest_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base(), table)
  }

  /// Attach the project key and, for user calls, the caller's token.
  pub(crate) fn authorize(
    &self,
    req: RequestBuilder,
    access_token: Option<&str>,
  ) -> RequestBuilder {
    let req = req.header("apikey", &self.config.anon_key);
    match access_token {
      Some(token) if !token.is_empty() => req.bearer_auth(token),
      // PostgREST falls back to the anon role.
      _ => req.bearer_auth(&self.config.anon_key),
    }
  }

  fn base(&self) -> &str { self.config.url.trim_end_matches('/') }
}
