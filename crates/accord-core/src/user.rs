//! Users and sign-in artefacts.
//!
//! The identity itself comes from a session; the `users` table holds a row per
//! identity so acceptances have something to reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound on display-name length, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:            String,
  pub email:         Option<String>,
  pub name:          Option<String>,
  pub image:         Option<String>,
  /// Argon2 PHC string. Never serialised.
  #[serde(skip)]
  pub password_hash: Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl User {
  pub fn has_password(&self) -> bool { self.password_hash.is_some() }

  pub fn profile(&self) -> UserProfile {
    UserProfile {
      id:    self.id.clone(),
      email: self.email.clone(),
      name:  self.name.clone(),
      image: self.image.clone(),
    }
  }
}

/// The identity carried by a session. Used to upsert the shadow row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id:    String,
  pub email: Option<String>,
  pub name:  Option<String>,
  pub image: Option<String>,
}

/// A pending single-use sign-in link. Only the SHA-256 of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLink {
  pub token_hash: String,
  pub email:      String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

/// Lowercase and trim an email, then check it has the rough `local@domain`
/// shape. Deliverability is the mailer's problem.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim().to_lowercase();
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };

  if valid { Ok(email) } else { Err(Error::InvalidEmail(raw.to_owned())) }
}

/// Trim a display name and check its length.
pub fn normalize_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  let len = name.chars().count();
  if len == 0 || len > MAX_NAME_LEN {
    return Err(Error::InvalidName);
  }
  Ok(name.to_owned())
}
