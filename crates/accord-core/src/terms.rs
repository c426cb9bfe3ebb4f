//! Terms of service and acceptance records.
//!
//! A terms row is immutable apart from its `is_current` flag, which flips when
//! a newer version is published. Acceptances are append-only: a user accepts
//! a given version at most once (enforced by a UNIQUE constraint).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Terms ───────────────────────────────────────────────────────────────────

/// A versioned terms-of-service document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terms {
  pub id:             Uuid,
  /// Semantic version string, e.g. `"1.0.0"`. Unique across all rows.
  pub version:        String,
  /// Markdown source; rendering is the client's concern.
  pub content:        String,
  pub effective_date: DateTime<Utc>,
  pub is_current:     bool,
}

/// The subset of [`Terms`] a client needs to display and accept a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTerms {
  pub id:             Uuid,
  pub version:        String,
  pub content:        String,
  pub effective_date: DateTime<Utc>,
}

impl From<Terms> for CurrentTerms {
  fn from(t: Terms) -> Self {
    Self {
      id:             t.id,
      version:        t.version,
      content:        t.content,
      effective_date: t.effective_date,
    }
  }
}

/// Input to [`crate::store::AccordStore::publish_terms`].
///
/// The published version always becomes the current one; the store clears
/// the flag on every other row in the same transaction.
#[derive(Debug, Clone)]
pub struct NewTerms {
  pub version:        String,
  pub content:        String,
  pub effective_date: DateTime<Utc>,
}

impl NewTerms {
  /// Build a publish request, rejecting versions that are not
  /// `MAJOR.MINOR.PATCH` (an optional `-prerelease` suffix is allowed).
  pub fn new(
    version: impl Into<String>,
    content: impl Into<String>,
    effective_date: DateTime<Utc>,
  ) -> Result<Self> {
    let version = version.into();
    validate_version(&version)?;
    Ok(Self { version, content: content.into(), effective_date })
  }
}

/// Check that `version` looks like `1.2.3` or `1.2.3-rc.1`.
pub fn validate_version(version: &str) -> Result<()> {
  let core = version.split_once('-').map_or(version, |(core, _)| core);
  let parts: Vec<&str> = core.split('.').collect();
  let well_formed = parts.len() == 3
    && parts
      .iter()
      .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

  if well_formed && !version.ends_with('-') {
    Ok(())
  } else {
    Err(Error::InvalidVersion(version.to_owned()))
  }
}

// ─── Acceptance ──────────────────────────────────────────────────────────────

/// Records that a user agreed to a specific terms version. Never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
  pub id:          Uuid,
  pub user_id:     String,
  pub terms_id:    Uuid,
  /// Client address as reported by the proxy headers, or `"unknown"`.
  pub ip_address:  String,
  /// Server-assigned timestamp.
  pub accepted_at: DateTime<Utc>,
}

/// Input to [`crate::store::AccordStore::record_acceptance`].
/// `accepted_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewAcceptance {
  pub user_id:    String,
  pub terms_id:   Uuid,
  pub ip_address: String,
}

/// The version details shown alongside an acceptance in a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedVersion {
  pub version:        String,
  pub effective_date: DateTime<Utc>,
}

/// An acceptance joined with the version it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceRecord {
  #[serde(flatten)]
  pub acceptance: Acceptance,
  pub terms:      AcceptedVersion,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Whether a user still has to accept the current terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsStatus {
  pub needs_acceptance: bool,
  pub current_terms:    CurrentTerms,
}

/// Outcome of an accept call. `already_accepted` is `true` when no row was
/// written because the user had accepted this version before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOutcome {
  pub success:          bool,
  pub already_accepted: bool,
}

impl AcceptOutcome {
  pub fn recorded() -> Self { Self { success: true, already_accepted: false } }

  pub fn already_accepted() -> Self {
    Self { success: true, already_accepted: true }
  }
}
