//! The `AccordStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `accord-store-sqlite`).
//! Higher layers (`accord-api`, `accord-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  terms::{Acceptance, AcceptanceRecord, NewAcceptance, NewTerms, Terms},
  user::{MagicLink, User, UserProfile},
};

/// Abstraction over an Accord storage backend.
///
/// Terms rows and acceptances are never deleted. The only update ever issued
/// against `terms` is the `is_current` flip performed by
/// [`publish_terms`](AccordStore::publish_terms).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AccordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Terms ─────────────────────────────────────────────────────────────

  /// The version flagged as current, if any.
  fn current_terms(
    &self,
  ) -> impl Future<Output = Result<Option<Terms>, Self::Error>> + Send + '_;

  /// Retrieve a terms row by id, current or not.
  fn get_terms(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Terms>, Self::Error>> + Send + '_;

  fn find_terms_by_version(
    &self,
    version: String,
  ) -> impl Future<Output = Result<Option<Terms>, Self::Error>> + Send + '_;

  /// All versions, newest effective date first.
  fn list_terms(
    &self,
  ) -> impl Future<Output = Result<Vec<Terms>, Self::Error>> + Send + '_;

  /// Insert `input` as the current version and clear the flag on every other
  /// row, atomically. Fails if the version string is already taken.
  fn publish_terms(
    &self,
    input: NewTerms,
  ) -> impl Future<Output = Result<Terms, Self::Error>> + Send + '_;

  // ── Acceptances ───────────────────────────────────────────────────────

  fn find_acceptance(
    &self,
    user_id: String,
    terms_id: Uuid,
  ) -> impl Future<Output = Result<Option<Acceptance>, Self::Error>> + Send + '_;

  /// Append an acceptance. The `accepted_at` timestamp is set by the store.
  ///
  /// A second acceptance for the same `(user_id, terms_id)` pair violates the
  /// uniqueness constraint and returns an error rather than a duplicate row.
  fn record_acceptance(
    &self,
    input: NewAcceptance,
  ) -> impl Future<Output = Result<Acceptance, Self::Error>> + Send + '_;

  /// A user's acceptance history, most recent first.
  fn list_acceptances(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Vec<AcceptanceRecord>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn get_user(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user by an already-normalised email address.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Insert a row for `profile` unless one with the same id exists. An
  /// existing row is returned untouched.
  fn ensure_user(
    &self,
    profile: UserProfile,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Set the display name. Returns `None` if the user does not exist.
  fn update_user_name(
    &self,
    id: String,
    name: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Replace the stored argon2 hash. Returns `false` if the user does not
  /// exist.
  fn set_password_hash(
    &self,
    id: String,
    password_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Magic links ───────────────────────────────────────────────────────

  fn create_magic_link(
    &self,
    link: MagicLink,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark the link identified by `token_hash` as used and return its email.
  /// Returns `None` if the link is unknown, expired at `now`, or already used.
  fn consume_magic_link(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  // ── Derived reads ─────────────────────────────────────────────────────

  /// `true` if a current version exists and `user_id` has not accepted it.
  ///
  /// With no current terms there is nothing to accept, so this is `false`.
  fn needs_acceptance(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_ {
    async move {
      let Some(current) = self.current_terms().await? else {
        return Ok(false);
      };
      Ok(self.find_acceptance(user_id, current.id).await?.is_none())
    }
  }

  fn terms_version_exists(
    &self,
    version: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_ {
    async move { Ok(self.find_terms_by_version(version).await?.is_some()) }
  }
}
