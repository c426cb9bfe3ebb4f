//! [`SqliteStore`]: the SQLite implementation of [`AccordStore`].

use std::path::Path;

use accord_core::{
  store::AccordStore,
  terms::{Acceptance, AcceptanceRecord, NewAcceptance, NewTerms, Terms},
  user::{MagicLink, User, UserProfile},
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    RawAcceptance, RawAcceptanceRecord, RawTerms, RawUser, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Constraint classification ───────────────────────────────────────────────

/// How an INSERT fared against the table constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
  Written,
  /// A UNIQUE or PRIMARY KEY constraint rejected the row.
  Duplicate,
  /// A FOREIGN KEY constraint rejected the row.
  MissingReference,
}

/// Turn constraint violations into a [`WriteOutcome`]; other errors pass
/// through.
fn classify(result: rusqlite::Result<usize>) -> rusqlite::Result<WriteOutcome> {
  use rusqlite::ffi;

  match result {
    Ok(_) => Ok(WriteOutcome::Written),
    Err(rusqlite::Error::SqliteFailure(f, _))
      if f.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
    {
      Ok(WriteOutcome::Duplicate)
    }
    Err(rusqlite::Error::SqliteFailure(f, _))
      if f.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
    {
      Ok(WriteOutcome::MissingReference)
    }
    Err(e) => Err(e),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Accord store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of acceptance rows for `(user_id, terms_id)`. Only the tests
  /// care; the UNIQUE constraint keeps it at 0 or 1.
  #[cfg(test)]
  pub(crate) async fn count_acceptances(&self, user_id: &str, terms_id: Uuid) -> Result<i64> {
    let user_id  = user_id.to_owned();
    let terms_id = encode_uuid(terms_id);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT COUNT(*) FROM user_terms_acceptances WHERE user_id = ?1 AND terms_id = ?2",
            rusqlite::params![user_id, terms_id],
            |r| r.get(0),
          )?)
        })
        .await?,
    )
  }

  async fn select_user(&self, id: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE id = ?1", RawUser::COLUMNS),
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn select_terms_where(
    &self,
    clause: &'static str,
    param: String,
  ) -> Result<Option<Terms>> {
    let raw: Option<RawTerms> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM terms WHERE {clause}", RawTerms::COLUMNS),
              rusqlite::params![param],
              RawTerms::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTerms::into_terms).transpose()
  }
}

// ─── AccordStore impl ────────────────────────────────────────────────────────

impl AccordStore for SqliteStore {
  type Error = Error;

  // ── Terms ─────────────────────────────────────────────────────────────────

  async fn current_terms(&self) -> Result<Option<Terms>> {
    let raw: Option<RawTerms> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM terms WHERE is_current = 1", RawTerms::COLUMNS),
              [],
              RawTerms::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTerms::into_terms).transpose()
  }

  async fn get_terms(&self, id: Uuid) -> Result<Option<Terms>> {
    self.select_terms_where("id = ?1", encode_uuid(id)).await
  }

  async fn find_terms_by_version(&self, version: String) -> Result<Option<Terms>> {
    self.select_terms_where("version = ?1", version).await
  }

  async fn list_terms(&self) -> Result<Vec<Terms>> {
    let raws: Vec<RawTerms> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM terms ORDER BY effective_date DESC, rowid DESC",
          RawTerms::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawTerms::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTerms::into_terms).collect()
  }

  async fn publish_terms(&self, input: NewTerms) -> Result<Terms> {
    let terms = Terms {
      id:             Uuid::new_v4(),
      version:        input.version,
      content:        input.content,
      effective_date: input.effective_date,
      is_current:     true,
    };

    let id_str      = encode_uuid(terms.id);
    let version     = terms.version.clone();
    let content     = terms.content.clone();
    let effective   = encode_dt(terms.effective_date);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("UPDATE terms SET is_current = 0 WHERE is_current = 1", [])?;
        let outcome = classify(tx.execute(
          "INSERT INTO terms (id, version, content, effective_date, is_current)
           VALUES (?1, ?2, ?3, ?4, 1)",
          rusqlite::params![id_str, version, content, effective],
        ))?;
        // Dropping an uncommitted transaction rolls the flag flip back.
        if outcome == WriteOutcome::Written {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    match outcome {
      WriteOutcome::Written => {
        tracing::info!(version = %terms.version, id = %terms.id, "published terms");
        Ok(terms)
      }
      WriteOutcome::Duplicate => Err(Error::DuplicateVersion(terms.version)),
      WriteOutcome::MissingReference => Err(Error::MissingReference),
    }
  }

  // ── Acceptances ───────────────────────────────────────────────────────────

  async fn find_acceptance(
    &self,
    user_id: String,
    terms_id: Uuid,
  ) -> Result<Option<Acceptance>> {
    let terms_id_str = encode_uuid(terms_id);

    let raw: Option<RawAcceptance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, user_id, terms_id, ip_address, accepted_at
               FROM user_terms_acceptances
               WHERE user_id = ?1 AND terms_id = ?2",
              rusqlite::params![user_id, terms_id_str],
              RawAcceptance::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAcceptance::into_acceptance).transpose()
  }

  async fn record_acceptance(&self, input: NewAcceptance) -> Result<Acceptance> {
    let acceptance = Acceptance {
      id:          Uuid::new_v4(),
      user_id:     input.user_id,
      terms_id:    input.terms_id,
      ip_address:  input.ip_address,
      accepted_at: Utc::now(),
    };

    let id_str       = encode_uuid(acceptance.id);
    let user_id      = acceptance.user_id.clone();
    let terms_id_str = encode_uuid(acceptance.terms_id);
    let ip_address   = acceptance.ip_address.clone();
    let at_str       = encode_dt(acceptance.accepted_at);

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(classify(conn.execute(
          "INSERT INTO user_terms_acceptances (id, user_id, terms_id, ip_address, accepted_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_id, terms_id_str, ip_address, at_str],
        ))?)
      })
      .await?;

    match outcome {
      WriteOutcome::Written => Ok(acceptance),
      WriteOutcome::Duplicate => Err(Error::AlreadyAccepted {
        user_id:  acceptance.user_id,
        terms_id: acceptance.terms_id,
      }),
      WriteOutcome::MissingReference => Err(Error::MissingReference),
    }
  }

  async fn list_acceptances(&self, user_id: String) -> Result<Vec<AcceptanceRecord>> {
    let raws: Vec<RawAcceptanceRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT a.id, a.user_id, a.terms_id, a.ip_address, a.accepted_at,
                  t.version, t.effective_date
           FROM user_terms_acceptances a
           JOIN terms t ON t.id = a.terms_id
           WHERE a.user_id = ?1
           ORDER BY a.accepted_at DESC, a.rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], |row| {
            Ok(RawAcceptanceRecord {
              acceptance:     RawAcceptance::from_row(row)?,
              version:        row.get(5)?,
              effective_date: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAcceptanceRecord::into_record).collect()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, id: String) -> Result<Option<User>> {
    self.select_user(id).await
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE email = ?1", RawUser::COLUMNS),
              rusqlite::params![email],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn ensure_user(&self, profile: UserProfile) -> Result<User> {
    let UserProfile { id, email, name, image } = profile;
    let id_for_insert    = id.clone();
    let email_for_insert = email.clone();
    let at_str           = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(classify(conn.execute(
          "INSERT INTO users (id, email, name, image, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(id) DO NOTHING",
          rusqlite::params![id_for_insert, email_for_insert, name, image, at_str],
        ))?)
      })
      .await?;

    if outcome == WriteOutcome::Duplicate {
      return Err(Error::EmailTaken(email.unwrap_or_default()));
    }

    self.select_user(id).await?.ok_or(Error::MissingReference)
  }

  async fn update_user_name(&self, id: String, name: String) -> Result<Option<User>> {
    let id_for_update = id.clone();
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET name = ?2 WHERE id = ?1",
          rusqlite::params![id_for_update, name],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.select_user(id).await
  }

  async fn set_password_hash(&self, id: String, password_hash: String) -> Result<bool> {
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET password_hash = ?2 WHERE id = ?1",
          rusqlite::params![id, password_hash],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Magic links ───────────────────────────────────────────────────────────

  async fn create_magic_link(&self, link: MagicLink) -> Result<()> {
    let created = encode_dt(link.created_at);
    let expires = encode_dt(link.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO magic_links (token_hash, email, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![link.token_hash, link.email, created, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn consume_magic_link(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<String>> {
    let now_str = encode_dt(now);

    // A single UPDATE so two concurrent verifications cannot both succeed.
    let email: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE magic_links SET consumed_at = ?2
               WHERE token_hash = ?1 AND consumed_at IS NULL AND expires_at > ?2
               RETURNING email",
              rusqlite::params![token_hash, now_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(email)
  }
}
