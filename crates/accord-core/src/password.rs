//! Password strength rules applied when a user sets or changes a password.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Characters that satisfy [`Requirement::Special`].
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const MIN_LEN: usize = 8;

/// A single rule a password has to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
  Length,
  Uppercase,
  Lowercase,
  Number,
  Special,
}

impl Requirement {
  pub const ALL: [Requirement; 5] = [
    Requirement::Length,
    Requirement::Uppercase,
    Requirement::Lowercase,
    Requirement::Number,
    Requirement::Special,
  ];

  pub fn is_met_by(self, password: &str) -> bool {
    match self {
      Self::Length => password.chars().count() >= MIN_LEN,
      Self::Uppercase => password.chars().any(|c| c.is_ascii_uppercase()),
      Self::Lowercase => password.chars().any(|c| c.is_ascii_lowercase()),
      Self::Number => password.chars().any(|c| c.is_ascii_digit()),
      Self::Special => password.chars().any(|c| SPECIAL_CHARS.contains(c)),
    }
  }
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Length => write!(f, "at least {MIN_LEN} characters"),
      Self::Uppercase => f.write_str("an uppercase letter"),
      Self::Lowercase => f.write_str("a lowercase letter"),
      Self::Number => f.write_str("a number"),
      Self::Special => f.write_str("a special character"),
    }
  }
}

/// Return the requirements `password` fails, in [`Requirement::ALL`] order.
pub fn unmet_requirements(password: &str) -> Vec<Requirement> {
  Requirement::ALL
    .into_iter()
    .filter(|r| !r.is_met_by(password))
    .collect()
}

/// `Ok(())` if every requirement holds, else [`Error::WeakPassword`].
pub fn check_strength(password: &str) -> Result<()> {
  let unmet = unmet_requirements(password);
  if unmet.is_empty() { Ok(()) } else { Err(Error::WeakPassword(unmet)) }
}
