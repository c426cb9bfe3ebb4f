//! HTTP server for Accord.
//!
//! Composes the [`accord_api`] router under `/api` with the sign-in endpoints
//! and a health check, backed by any [`AccordStore`].

pub mod auth;
pub mod error;
pub mod terms;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use accord_api::{ApiState, SessionKeys, api_router};
use accord_core::store::AccordStore;
use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::LinkSender;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ACCORD_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                   String,
  #[serde(default = "defaults::port")]
  pub port:                   u16,
  /// Public origin used to build magic links.
  #[serde(default = "defaults::base_url")]
  pub base_url:               String,
  #[serde(default = "defaults::store_path")]
  pub store_path:             PathBuf,
  /// HS256 key for session tokens. Required to serve.
  #[serde(default)]
  pub session_secret:         String,
  #[serde(default = "defaults::session_ttl_hours")]
  pub session_ttl_hours:      i64,
  /// Enables `POST /auth/dev-login`. Never turn this on in production.
  #[serde(default)]
  pub dev_login:              bool,
  #[serde(default = "defaults::magic_link_ttl_minutes")]
  pub magic_link_ttl_minutes: i64,
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".to_string() }
  pub fn port() -> u16 { 3000 }
  pub fn base_url() -> String { "http://localhost:3000".to_string() }
  pub fn store_path() -> PathBuf { PathBuf::from("accord.db") }
  pub fn session_ttl_hours() -> i64 { 24 * 30 }
  pub fn magic_link_ttl_minutes() -> i64 { 24 * 60 }
}

impl ServerConfig {
  pub fn session_keys(&self) -> SessionKeys {
    SessionKeys::new(
      self.session_secret.as_bytes(),
      chrono::Duration::hours(self.session_ttl_hours),
    )
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the sign-in handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub sessions: Arc<SessionKeys>,
  pub links:    Arc<dyn LinkSender>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig, links: Arc<dyn LinkSender>) -> Self {
    Self {
      store,
      sessions: Arc::new(config.session_keys()),
      config: Arc::new(config),
      links,
    }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      config:   self.config.clone(),
      sessions: self.sessions.clone(),
      links:    self.links.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AccordStore + 'static,
{
  let api = api_router(ApiState::new(state.store.clone(), state.sessions.clone()));

  Router::new()
    .route("/healthz",                 get(|| async { "ok" }))
    .route("/auth/login",              post(auth::login::<S>))
    .route("/auth/magic-link",         post(auth::request_magic_link::<S>))
    .route("/auth/magic-link/verify",  get(auth::verify_magic_link::<S>))
    .route("/auth/dev-login",          post(auth::dev_login::<S>))
    .route("/auth/logout",             post(auth::logout))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
