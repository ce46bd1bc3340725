//! Layered server configuration: an optional TOML file overridden by
//! `ROSTER_*` environment variables.
//!
//! Nested keys use a double underscore, e.g.
//! `ROSTER_BACKEND__KIND=supabase ROSTER_BACKEND__URL=https://…`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:    String,
  #[serde(default = "default_port")]
  pub port:    u16,
  #[serde(default)]
  pub backend: BackendConfig,
}

/// Which backend serves sign-in and rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
  Sqlite {
    #[serde(default = "default_store_path")]
    store_path:       PathBuf,
    #[serde(default = "default_session_ttl_secs")]
    session_ttl_secs: i64,
  },
  Supabase {
    url:          String,
    anon_key:     String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
  },
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self::Sqlite {
      store_path:       default_store_path(),
      session_ttl_secs: default_session_ttl_secs(),
    }
  }
}

impl BackendConfig {
  pub fn timeout(&self) -> Option<Duration> {
    match self {
      Self::Supabase { timeout_secs, .. } => Some(Duration::from_secs(*timeout_secs)),
      Self::Sqlite { .. } => None,
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/roster/roster.db") }

fn default_session_ttl_secs() -> i64 { 60 * 60 }

fn default_timeout_secs() -> u64 { 30 }

impl ServerConfig {
  /// Read `path` (if it exists) and then the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::from_builder(
      config::Config::builder().add_source(config::File::from(path).required(false)),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    builder
      .add_source(
        config::Environment::with_prefix("ROSTER")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
