//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that lexical order in SQL matches chronological order. UUIDs are
//! stored as hyphenated lowercase strings.

use accord_core::{
  terms::{Acceptance, AcceptanceRecord, AcceptedVersion, Terms},
  user::User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// A `terms` row as read from SQLite, before decoding.
pub struct RawTerms {
  pub id:             String,
  pub version:        String,
  pub content:        String,
  pub effective_date: String,
  pub is_current:     bool,
}

impl RawTerms {
  pub const COLUMNS: &'static str = "id, version, content, effective_date, is_current";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      version:        row.get(1)?,
      content:        row.get(2)?,
      effective_date: row.get(3)?,
      is_current:     row.get(4)?,
    })
  }

  pub fn into_terms(self) -> Result<Terms> {
    Ok(Terms {
      id:             decode_uuid(&self.id)?,
      version:        self.version,
      content:        self.content,
      effective_date: decode_dt(&self.effective_date)?,
      is_current:     self.is_current,
    })
  }
}

/// A `user_terms_acceptances` row as read from SQLite.
pub struct RawAcceptance {
  pub id:          String,
  pub user_id:     String,
  pub terms_id:    String,
  pub ip_address:  String,
  pub accepted_at: String,
}

impl RawAcceptance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      user_id:     row.get(1)?,
      terms_id:    row.get(2)?,
      ip_address:  row.get(3)?,
      accepted_at: row.get(4)?,
    })
  }

  pub fn into_acceptance(self) -> Result<Acceptance> {
    Ok(Acceptance {
      id:          decode_uuid(&self.id)?,
      user_id:     self.user_id,
      terms_id:    decode_uuid(&self.terms_id)?,
      ip_address:  self.ip_address,
      accepted_at: decode_dt(&self.accepted_at)?,
    })
  }
}

/// An acceptance joined with its terms version.
pub struct RawAcceptanceRecord {
  pub acceptance:     RawAcceptance,
  pub version:        String,
  pub effective_date: String,
}

impl RawAcceptanceRecord {
  pub fn into_record(self) -> Result<AcceptanceRecord> {
    Ok(AcceptanceRecord {
      acceptance: self.acceptance.into_acceptance()?,
      terms:      AcceptedVersion {
        version:        self.version,
        effective_date: decode_dt(&self.effective_date)?,
      },
    })
  }
}

/// A `users` row as read from SQLite.
pub struct RawUser {
  pub id:            String,
  pub email:         Option<String>,
  pub name:          Option<String>,
  pub image:         Option<String>,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "id, email, name, image, password_hash, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      email:         row.get(1)?,
      name:          row.get(2)?,
      image:         row.get(3)?,
      password_hash: row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      email:         self.email,
      name:          self.name,
      image:         self.image,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
