//! Stateless sessions: HS256 JWTs carrying the user's profile.
//!
//! A token is accepted from `Authorization: Bearer <token>` or from the
//! [`SESSION_COOKIE`] cookie. Logging out only clears the cookie; tokens stay
//! valid until they expire.

use std::sync::Arc;

use accord_core::user::UserProfile;
use axum::{
  extract::{FromRef, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "accord_session";

// ─── Claims ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub:   String,
  pub email: Option<String>,
  pub name:  Option<String>,
  pub image: Option<String>,
  pub iat:   i64,
  pub exp:   i64,
}

impl Claims {
  pub fn profile(&self) -> UserProfile {
    UserProfile {
      id:    self.sub.clone(),
      email: self.email.clone(),
      name:  self.name.clone(),
      image: self.image.clone(),
    }
  }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Signing and verification material for session tokens.
pub struct SessionKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl SessionKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 30;
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Sign a session token for `profile`.
  pub fn issue(&self, profile: &UserProfile) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:   profile.id.clone(),
      email: profile.email.clone(),
      name:  profile.name.clone(),
      image: profile.image.clone(),
      iat:   now.timestamp(),
      exp:   (now + self.ttl).timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("session signing failed: {e}")))
  }

  /// Check signature and expiry.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| {
        tracing::debug!(error = %e, "rejected session token");
        ApiError::Unauthorized
      })
  }

  /// Resolve the session carried by `headers`, if any.
  pub fn authenticate(&self, headers: &HeaderMap) -> Result<UserProfile, ApiError> {
    let token = token_from_headers(headers).ok_or(ApiError::Unauthorized)?;
    Ok(self.verify(token)?.profile())
  }

  /// `Set-Cookie` value that stores `token` for the session lifetime.
  pub fn cookie(&self, token: &str) -> String {
    format!(
      "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
      self.ttl.num_seconds()
    )
  }
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie() -> String {
  format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Bearer token first, then the session cookie.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty());

  bearer.or_else(|| {
    headers
      .get_all(header::COOKIE)
      .iter()
      .filter_map(|v| v.to_str().ok())
      .flat_map(|v| v.split(';'))
      .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
      .find(|t| !t.is_empty())
  })
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when no valid session is
/// present.
#[derive(Debug, Clone)]
pub struct Session(pub UserProfile);

impl<St> FromRequestParts<St> for Session
where
  Arc<SessionKeys>: FromRef<St>,
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &St,
  ) -> Result<Self, Self::Rejection> {
    let keys = Arc::<SessionKeys>::from_ref(state);
    keys.authenticate(&parts.headers).map(Session)
  }
}
