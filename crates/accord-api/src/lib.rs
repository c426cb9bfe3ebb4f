//! JSON REST and RPC API for Accord.
//!
//! Exposes an axum [`Router`] backed by any [`accord_core::store::AccordStore`].
//! Sign-in flows, TLS and transport concerns are the caller's responsibility;
//! this crate only verifies the session tokens it is handed.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", accord_api::api_router(ApiState::new(store, sessions)))
//! ```

pub mod client_ip;
pub mod credentials;
pub mod error;
pub mod rpc;
pub mod service;
pub mod session;
pub mod terms;
pub mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use accord_core::store::AccordStore;
use axum::{
  Router,
  extract::FromRef,
  routing::{get, post},
};

pub use error::ApiError;
pub use session::{Session, SessionKeys};

/// Shared handler state: the store plus the session signing keys.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub sessions: Arc<SessionKeys>,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, sessions: Arc<SessionKeys>) -> Self {
    Self { store, sessions }
  }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      sessions: self.sessions.clone(),
    }
  }
}

impl<S> FromRef<ApiState<S>> for Arc<SessionKeys> {
  fn from_ref(state: &ApiState<S>) -> Self { state.sessions.clone() }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: AccordStore + 'static,
{
  Router::new()
    // Terms
    .route("/terms/status", get(terms::status::<S>))
    .route("/terms/accept", post(terms::accept::<S>))
    .route("/terms/current", get(terms::current::<S>))
    .route("/terms/acceptances", get(terms::acceptances::<S>))
    // Users
    .route("/me", get(users::me::<S>))
    .route("/user/update-name", post(users::update_name::<S>))
    .route("/user/update-password", post(users::update_password::<S>))
    // RPC
    .route("/rpc/{procedure}", get(rpc::dispatch::<S>).post(rpc::dispatch::<S>))
    .with_state(state)
}
