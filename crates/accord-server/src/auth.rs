//! Sign-in endpoints that mint session tokens.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | `{email, password}` → `{token, user}` |
//! | `POST` | `/auth/magic-link` | `{email}` → 202, link handed to the [`LinkSender`] |
//! | `GET`  | `/auth/magic-link/verify?token=` | Single use |
//! | `POST` | `/auth/dev-login` | Only with `dev_login = true` |
//! | `POST` | `/auth/logout` | Clears the cookie |

use accord_api::{
  ApiError,
  credentials::verify_password,
  session::{SessionKeys, clear_cookie},
};
use accord_core::{
  store::AccordStore,
  user::{MagicLink, User, UserProfile, normalize_email},
};
use axum::{
  Json,
  extract::{Query, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::AppState;

// ─── Link delivery ────────────────────────────────────────────────────────────

/// Delivers magic sign-in links.
pub trait LinkSender: Send + Sync {
  fn send(&self, email: &str, link: &str);
}

/// Writes the link to the log instead of mailing it.
pub struct LogLinkSender;

impl LinkSender for LogLinkSender {
  fn send(&self, email: &str, link: &str) {
    tracing::info!(%email, %link, "magic sign-in link");
  }
}

// ─── Tokens ───────────────────────────────────────────────────────────────────

/// A fresh 32-byte token, hex-encoded.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The form a magic-link token is stored in.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── Session responses ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SignedIn {
  pub token: String,
  pub user:  User,
}

fn signed_in(sessions: &SessionKeys, user: User) -> Result<Response, ApiError> {
  let token = sessions.issue(&user.profile())?;
  let cookie = sessions.cookie(&token);
  Ok(([(header::SET_COOKIE, cookie)], Json(SignedIn { token, user })).into_response())
}

// ─── Password login ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, ApiError>
where
  S: AccordStore,
{
  let email =
    normalize_email(&body.email).map_err(|_| ApiError::InvalidCredentials)?;
  let user = state
    .store
    .find_user_by_email(email.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidCredentials)?;

  let verified = user
    .password_hash
    .as_deref()
    .is_some_and(|phc| verify_password(&body.password, phc));
  if !verified {
    tracing::info!(%email, "failed password login");
    return Err(ApiError::InvalidCredentials);
  }

  tracing::info!(user_id = %user.id, "password login");
  signed_in(&state.sessions, user)
}

// ─── Magic links ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MagicLinkBody {
  pub email: String,
}

/// `POST /auth/magic-link`
///
/// Answers the same way whether or not the address belongs to an account.
pub async fn request_magic_link<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<MagicLinkBody>,
) -> Result<Response, ApiError>
where
  S: AccordStore,
{
  let email = normalize_email(&body.email)?;
  let token = generate_token();
  let now = Utc::now();

  state
    .store
    .create_magic_link(MagicLink {
      token_hash: hash_token(&token),
      email:      email.clone(),
      created_at: now,
      expires_at: now + Duration::minutes(state.config.magic_link_ttl_minutes),
    })
    .await
    .map_err(ApiError::store)?;

  let link = format!(
    "{}/auth/magic-link/verify?token={token}",
    state.config.base_url.trim_end_matches('/')
  );
  state.links.send(&email, &link);

  Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "sent": true }))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
  pub token: String,
}

/// `GET /auth/magic-link/verify?token=…`
pub async fn verify_magic_link<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<VerifyQuery>,
) -> Result<Response, ApiError>
where
  S: AccordStore,
{
  let email = state
    .store
    .consume_magic_link(hash_token(query.token.trim()), Utc::now())
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  let existing = state
    .store
    .find_user_by_email(email.clone())
    .await
    .map_err(ApiError::store)?;

  let user = match existing {
    Some(user) => user,
    None => {
      let user = state
        .store
        .ensure_user(UserProfile {
          id:    Uuid::new_v4().to_string(),
          email: Some(email),
          name:  None,
          image: None,
        })
        .await
        .map_err(ApiError::store)?;
      tracing::info!(user_id = %user.id, "created user from magic link");
      user
    }
  };

  tracing::info!(user_id = %user.id, "magic link login");
  signed_in(&state.sessions, user)
}

// ─── Dev bypass ───────────────────────────────────────────────────────────────

pub const DEV_USER_ID: &str = "dev-user";
pub const DEV_USER_EMAIL: &str = "dev@localhost";
pub const DEV_USER_NAME: &str = "Dev User";

/// `POST /auth/dev-login`
pub async fn dev_login<S>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError>
where
  S: AccordStore,
{
  if !state.config.dev_login {
    return Err(ApiError::NotFound("Not found".into()));
  }

  let user = state
    .store
    .ensure_user(UserProfile {
      id:    DEV_USER_ID.into(),
      email: Some(DEV_USER_EMAIL.into()),
      name:  Some(DEV_USER_NAME.into()),
      image: None,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::warn!("dev login used");
  signed_in(&state.sessions, user)
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout() -> Response {
  (
    [(header::SET_COOKIE, clear_cookie())],
    Json(serde_json::json!({ "success": true })),
  )
    .into_response()
}
