//! Roster server binary.
//!
//! Reads `roster.toml` (or the path given with `--config`) plus `ROSTER_*`
//! environment overrides, connects the configured backend, and serves the
//! JSON API over HTTP.
//!
//! # Local accounts
//!
//! With the SQLite backend, sign-in accounts are created from the command
//! line; the password is read from stdin:
//!
//! ```text
//! roster add-account --email ada@example.com --role organisation --org org-1
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use roster_api::{AppState, Backend};
use roster_core::{profile::ProfileRecord, role::Role};
use roster_store_sqlite::{NewAccount, SqliteStore};
use roster_supabase::{SupabaseClient, SupabaseConfig};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{BackendConfig, ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Roster membership registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create a sign-in account in the SQLite store.
  AddAccount(AddAccount),
}

#[derive(Args)]
struct AddAccount {
  #[arg(long)]
  email: String,

  /// Role claim stored in the account metadata, e.g. `volunteer`.
  #[arg(long, default_value = "volunteer")]
  role: String,

  /// Organisation id claim.
  #[arg(long)]
  org: Option<String>,

  /// Display name claim.
  #[arg(long)]
  name: Option<String>,

  /// Also write a profile row with the same values.
  #[arg(long)]
  with_profile: bool,

  /// Leave the email unconfirmed; sign-in is refused until it is confirmed.
  #[arg(long)]
  unconfirmed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve_configured(&server_cfg).await,
    Command::AddAccount(args) => add_account(&server_cfg, args).await,
  }
}

// ─── Serve ────────────────────────────────────────────────────────────────────

async fn serve_configured(server_cfg: &ServerConfig) -> anyhow::Result<()> {
  match &server_cfg.backend {
    BackendConfig::Sqlite { .. } => {
      let store = open_sqlite(&server_cfg.backend).await?;
      let purged = store
        .purge_expired_sessions()
        .await
        .context("failed to purge expired sessions")?;
      if purged > 0 {
        tracing::info!(purged, "dropped expired sessions");
      }
      serve(store, server_cfg).await
    }
    BackendConfig::Supabase { url, anon_key, .. } => {
      let mut supabase_cfg = SupabaseConfig::new(url.clone(), anon_key.clone());
      if let Some(timeout) = server_cfg.backend.timeout() {
        supabase_cfg.timeout = timeout;
      }
      let client =
        SupabaseClient::new(supabase_cfg).context("failed to build HTTP client")?;
      tracing::info!(%url, "using hosted backend");
      serve(client, server_cfg).await
    }
  }
}

async fn serve<B: Backend>(backend: B, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = roster_api::router(AppState::new(Arc::new(backend)));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn open_sqlite(backend: &BackendConfig) -> anyhow::Result<SqliteStore> {
  let BackendConfig::Sqlite {
    store_path,
    session_ttl_secs,
  } = backend
  else {
    bail!("the configured backend is not sqlite");
  };

  let store_path = expand_tilde(store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  Ok(store.with_session_ttl(chrono::Duration::seconds(*session_ttl_secs)))
}

// ─── Add account ──────────────────────────────────────────────────────────────

async fn add_account(server_cfg: &ServerConfig, args: AddAccount) -> anyhow::Result<()> {
  if Role::recognize(&args.role).is_none() {
    tracing::warn!(role = %args.role, "unrecognised role; it will resolve to volunteer");
  }

  let store = open_sqlite(&server_cfg.backend).await?;
  let password = read_password()?;
  if password.is_empty() {
    bail!("password must not be empty");
  }

  let mut account =
    NewAccount::new(args.email.clone(), password).with_claim("role", args.role.as_str());
  account.email_confirmed = !args.unconfirmed;
  if let Some(org) = &args.org {
    account = account.with_claim("organisation_id", org.as_str());
  }
  if let Some(name) = &args.name {
    account = account.with_claim("full_name", name.as_str());
  }

  let principal = store
    .create_account(account)
    .await
    .with_context(|| format!("failed to create account for {}", args.email))?;

  if args.with_profile {
    store
      .put_profile(&ProfileRecord {
        id: principal.subject_id,
        full_name: args.name,
        email: Some(principal.email.clone()),
        role: Some(args.role),
        organisation_id: args.org,
        ..Default::default()
      })
      .await
      .context("failed to write profile row")?;
  }

  println!("{}", principal.subject_id);
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
