//! Error types for `accord-core`.

use thiserror::Error;

use crate::password::Requirement;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid terms version {0:?}; expected MAJOR.MINOR.PATCH")]
  InvalidVersion(String),

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("name must be between 1 and {max} characters", max = crate::user::MAX_NAME_LEN)]
  InvalidName,

  #[error("password does not meet requirements: {}", join_requirements(.0))]
  WeakPassword(Vec<Requirement>),
}

fn join_requirements(reqs: &[Requirement]) -> String {
  reqs
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
