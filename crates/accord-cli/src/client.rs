//! Async HTTP client wrapping the accord JSON API.

use std::time::Duration;

use accord_core::{
  terms::{AcceptOutcome, AcceptanceRecord, TermsStatus},
  user::User,
};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the accord API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Session token; set by one of the sign-in calls or supplied directly.
  pub token:    Option<String>,
}

/// `GET /api/me`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
  pub id:           String,
  pub email:        Option<String>,
  pub name:         Option<String>,
  pub has_password: bool,
  pub created_at:   Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SignedIn {
  token: String,
  user:  User,
}

/// Async HTTP client for the accord REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Turn a non-2xx response into an error carrying the server's message.
  async fn check(what: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
      .unwrap_or_else(|| status.to_string());
    tracing::debug!(%status, %message, "{what} failed");
    Err(anyhow!(message))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let resp = self
      .auth(self.client.get(self.url(path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    Self::check(path, resp)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {path}"))
  }

  async fn post<T: DeserializeOwned>(
    &self,
    path: &str,
    body: serde_json::Value,
  ) -> Result<T> {
    let resp = self
      .auth(self.client.post(self.url(path)))
      .json(&body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    Self::check(path, resp)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {path}"))
  }

  pub fn has_token(&self) -> bool { self.config.token.is_some() }

  // ── Sign-in ───────────────────────────────────────────────────────────────

  /// `POST /auth/login`; keeps the returned token.
  pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
    let signed_in: SignedIn = self
      .post("/auth/login", json!({ "email": email, "password": password }))
      .await?;
    self.config.token = Some(signed_in.token);
    Ok(signed_in.user)
  }

  /// `POST /auth/magic-link`. The server delivers the link out of band.
  pub async fn request_magic_link(&self, email: &str) -> Result<()> {
    let _: serde_json::Value = self
      .post("/auth/magic-link", json!({ "email": email }))
      .await?;
    Ok(())
  }

  /// `GET /auth/magic-link/verify`; keeps the returned token.
  pub async fn verify_magic_link(&mut self, token: &str) -> Result<User> {
    let signed_in: SignedIn = self
      .get(&format!("/auth/magic-link/verify?token={token}"))
      .await?;
    self.config.token = Some(signed_in.token);
    Ok(signed_in.user)
  }

  /// `POST /auth/dev-login`; keeps the returned token.
  pub async fn dev_login(&mut self) -> Result<User> {
    let signed_in: SignedIn = self.post("/auth/dev-login", json!({})).await?;
    self.config.token = Some(signed_in.token);
    Ok(signed_in.user)
  }

  // ── Terms ─────────────────────────────────────────────────────────────────

  /// `GET /api/terms/status`
  pub async fn terms_status(&self) -> Result<TermsStatus> {
    self.get("/api/terms/status").await
  }

  /// `POST /api/terms/accept`
  pub async fn accept_terms(&self, terms_id: Uuid) -> Result<AcceptOutcome> {
    self
      .post("/api/terms/accept", json!({ "termsId": terms_id }))
      .await
  }

  /// `GET /api/terms/acceptances`
  pub async fn acceptances(&self) -> Result<Vec<AcceptanceRecord>> {
    self.get("/api/terms/acceptances").await
  }

  // ── User ──────────────────────────────────────────────────────────────────

  /// `GET /api/me`
  pub async fn me(&self) -> Result<Me> { self.get("/api/me").await }

  /// `POST /api/user/update-name`
  pub async fn update_name(&self, name: &str) -> Result<User> {
    self
      .post("/api/user/update-name", json!({ "name": name }))
      .await
  }

  /// `POST /api/user/update-password`
  pub async fn update_password(
    &self,
    current: Option<&str>,
    new: &str,
  ) -> Result<()> {
    let _: serde_json::Value = self
      .post(
        "/api/user/update-password",
        json!({ "currentPassword": current, "newPassword": new }),
      )
      .await?;
    Ok(())
  }
}

/// The token from a pasted sign-in link, or the argument itself when it is
/// already a bare token. Tokens are hex.
pub fn token_from_link(link: &str) -> Option<&str> {
  let link = link.trim();
  let token = match link.split_once('?') {
    Some((_, query)) => query
      .split('&')
      .find_map(|pair| pair.strip_prefix("token="))?,
    None => link,
  };
  (!token.is_empty() && token.bytes().all(|b| b.is_ascii_hexdigit())).then_some(token)
}
