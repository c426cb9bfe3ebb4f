//! `accord`: terminal client that walks a user through the terms gate.
//!
//! # Usage
//!
//! ```text
//! accord --url http://localhost:3000 --email alice@example.com --password '…'
//! accord --dev                       # server must have dev_login = true
//! accord --magic-link alice@example.com   # then rerun with the link:
//! accord --magic-token 'http://localhost:3000/auth/magic-link/verify?token=…'
//! accord --config ~/.config/accord/config.toml --log-file /tmp/accord.log
//! ```

mod app;
mod client;
mod gate;
mod ui;

use std::{fs::File, io, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use app::App;
use clap::Parser;
use client::{ApiClient, ApiConfig, token_from_link};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "accord", about = "Terminal client for the Accord terms gate")]
struct Args {
  /// Path to a TOML config file (url, email, password, token).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the accord server (default: http://localhost:3000).
  #[arg(long, env = "ACCORD_URL")]
  url: Option<String>,

  /// Account email for password sign-in.
  #[arg(long, env = "ACCORD_EMAIL")]
  email: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "ACCORD_PASSWORD")]
  password: Option<String>,

  /// An existing session token; skips sign-in.
  #[arg(long, env = "ACCORD_TOKEN")]
  token: Option<String>,

  /// Ask the server to send a sign-in link to this address, then exit.
  #[arg(long, value_name = "EMAIL")]
  magic_link: Option<String>,

  /// Sign in with a magic-link token, or the whole link.
  #[arg(long, value_name = "TOKEN")]
  magic_token: Option<String>,

  /// Sign in through the server's dev bypass.
  #[arg(long)]
  dev: bool,

  /// Write logs to this file. Nothing is logged otherwise.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  email:    String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  token:    String,
}

/// CLI value, else non-empty file value.
fn pick(flag: Option<String>, file: &str) -> Option<String> {
  flag.or_else(|| (!file.is_empty()).then(|| file.to_string()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // The TUI owns stdout, so logs only go to a file when asked for.
  if let Some(path) = &args.log_file {
    let file = File::create(path)
      .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .with_ansi(false)
      .with_writer(Mutex::new(file))
      .init();
  }

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let mut client = ApiClient::new(ApiConfig {
    base_url: pick(args.url, &file_cfg.url)
      .unwrap_or_else(|| "http://localhost:3000".to_string()),
    token:    pick(args.token, &file_cfg.token),
  })?;

  if let Some(email) = &args.magic_link {
    client
      .request_magic_link(email)
      .await
      .context("requesting sign-in link failed")?;
    println!("Sign-in link sent to {email}. Run again with --magic-token <LINK>.");
    return Ok(());
  }

  // Sign in before touching the terminal so errors print normally.
  if !client.has_token() {
    let user = if let Some(link) = &args.magic_token {
      let token = token_from_link(link).ok_or_else(|| anyhow!("malformed sign-in link"))?;
      client
        .verify_magic_link(token)
        .await
        .context("magic link sign-in failed")?
    } else if args.dev {
      client.dev_login().await.context("dev login failed")?
    } else {
      let (Some(email), Some(password)) = (
        pick(args.email, &file_cfg.email),
        pick(args.password, &file_cfg.password),
      ) else {
        bail!("no credentials: pass --token, --magic-token, --dev, or --email and --password");
      };
      client.login(&email, &password).await.context("sign-in failed")?
    };
    tracing::info!(user_id = %user.id, "signed in");
  }

  let mut app = App::new(client);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Queued work runs after the frame that shows it is pending.
    if let Some(action) = app.take_action() {
      app.run(action).await;
      continue;
    }

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && key.kind == KeyEventKind::Press
      && !app.handle_key(key)
    {
      break;
    }
  }

  Ok(())
}
