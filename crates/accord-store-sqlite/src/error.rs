//! Error type for `accord-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] accord_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The `(user_id, terms_id)` uniqueness constraint rejected an insert.
  #[error("user {user_id} has already accepted terms {terms_id}")]
  AlreadyAccepted { user_id: String, terms_id: Uuid },

  #[error("terms version {0:?} already exists")]
  DuplicateVersion(String),

  #[error("email {0:?} belongs to another user")]
  EmailTaken(String),

  /// An acceptance referenced a terms row or user that does not exist.
  #[error("referenced row does not exist")]
  MissingReference,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
