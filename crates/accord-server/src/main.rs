//! accord server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `ACCORD_*`
//! environment overrides, opens an in-process SQLite store, and serves the
//! API over HTTP.
//!
//! # Administration
//!
//! ```text
//! cargo run -p accord-server --bin server -- hash-password
//! cargo run -p accord-server --bin server -- seed-terms
//! cargo run -p accord-server --bin server -- publish-terms 2.0.0 legal/v2.md
//! cargo run -p accord-server --bin server -- list-terms
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use accord_api::credentials::hash_password;
use accord_core::store::AccordStore;
use accord_server::{
  AppState, ServerConfig,
  auth::LogLinkSender,
  terms::{self, DEFAULT_TERMS_FILE, SeedOutcome},
};
use accord_store_sqlite::SqliteStore;
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Accord terms-of-service server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Create terms version 1.0.0 from a markdown file unless it exists.
  SeedTerms {
    #[arg(default_value = DEFAULT_TERMS_FILE)]
    file: PathBuf,
  },
  /// Publish a markdown file as the new current terms version.
  PublishTerms {
    /// Semantic version, e.g. `1.1.0`.
    version:        String,
    file:           PathBuf,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long)]
    effective_date: Option<DateTime<Utc>>,
  },
  /// List every terms version, newest first.
  ListTerms,
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

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?;
      println!("{hash}");
      Ok(())
    }
    Command::Serve => {
      let server_cfg = load_config(&cli.config)?;
      let store = open_store(&server_cfg).await?;
      serve(store, server_cfg).await
    }
    Command::SeedTerms { file } => {
      let store = open_store(&load_config(&cli.config)?).await?;
      match terms::seed(&store, &file).await.context("seeding terms failed")? {
        SeedOutcome::Created(t) => println!("Seeded terms v{} ({})", t.version, t.id),
        SeedOutcome::Skipped => println!("Terms v{} already exist, skipping", terms::SEED_VERSION),
      }
      Ok(())
    }
    Command::PublishTerms { file, version, effective_date } => {
      let store = open_store(&load_config(&cli.config)?).await?;
      let effective_date = effective_date.unwrap_or_else(Utc::now);
      let t = terms::publish(&store, &file, &version, effective_date)
        .await
        .context("publishing terms failed")?;
      println!("Published terms v{} ({})", t.version, t.id);
      Ok(())
    }
    Command::ListTerms => {
      let store = open_store(&load_config(&cli.config)?).await?;
      for t in store.list_terms().await.context("listing terms failed")? {
        let marker = if t.is_current { "*" } else { " " };
        println!("{marker} {:<12} {}  {}", t.version, t.effective_date.to_rfc3339(), t.id);
      }
      Ok(())
    }
  }
}

/// `config.toml` (optional) overlaid with `ACCORD_*` environment variables.
fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("ACCORD"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn open_store(server_cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&server_cfg.store_path);
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  anyhow::ensure!(
    !server_cfg.session_secret.is_empty(),
    "session_secret must be set (config.toml or ACCORD_SESSION_SECRET)"
  );
  if server_cfg.dev_login {
    tracing::warn!("dev login is enabled; do not expose this server publicly");
  }
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  // Build application state.
  let state = AppState::new(Arc::new(store), server_cfg, Arc::new(LogLinkSender));
  let app = accord_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn hash_password_needs_no_config() {
    let cli = Cli::try_parse_from(["server", "--config", "/nonexistent/accord.toml", "hash-password"])
      .unwrap();
    assert!(matches!(cli.command, Some(Command::HashPassword)));
  }

  #[test]
  fn missing_config_file_falls_back_to_defaults() {
    let cfg = load_config(Path::new("/nonexistent/accord.toml")).unwrap();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.store_path, PathBuf::from("accord.db"));
  }

  #[test]
  fn config_file_values_are_read() {
    let path = std::env::temp_dir().join(format!("accord-config-{}.toml", std::process::id()));
    std::fs::write(&path, "port = 8081\ndev_login = true\n").unwrap();
    let cfg = load_config(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(cfg.port, 8081);
    assert!(cfg.dev_login);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/accord.db")), PathBuf::from(home).join("accord.db"));
    assert_eq!(expand_tilde(Path::new("/var/accord.db")), PathBuf::from("/var/accord.db"));
  }
}
