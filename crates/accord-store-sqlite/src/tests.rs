//! Integration tests for `SqliteStore` against an in-memory database.

use accord_core::{
  store::AccordStore,
  terms::{NewAcceptance, NewTerms},
  user::{MagicLink, UserProfile},
};
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn terms(version: &str, day: u32) -> NewTerms {
  NewTerms::new(
    version,
    format!("# Terms {version}\n\nBe nice."),
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
  )
  .unwrap()
}

fn profile(id: &str) -> UserProfile {
  UserProfile {
    id:    id.into(),
    email: Some(format!("{id}@example.com")),
    name:  Some("Alice".into()),
    image: None,
  }
}

fn acceptance(user_id: &str, terms_id: Uuid) -> NewAcceptance {
  NewAcceptance {
    user_id:    user_id.into(),
    terms_id,
    ip_address: "203.0.113.7".into(),
  }
}

// ─── Terms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_has_no_current_terms() {
  let s = store().await;
  assert!(s.current_terms().await.unwrap().is_none());
  assert!(s.list_terms().await.unwrap().is_empty());
}

#[tokio::test]
async fn publish_makes_version_current() {
  let s = store().await;
  let published = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  assert!(published.is_current);

  let current = s.current_terms().await.unwrap().unwrap();
  assert_eq!(current, published);
  assert_eq!(s.get_terms(published.id).await.unwrap(), Some(published));
}

#[tokio::test]
async fn publishing_a_new_version_supersedes_the_old_one() {
  let s = store().await;
  let v1 = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  let v2 = s.publish_terms(terms("1.1.0", 2)).await.unwrap();

  let current = s.current_terms().await.unwrap().unwrap();
  assert_eq!(current.id, v2.id);

  let old = s.get_terms(v1.id).await.unwrap().unwrap();
  assert!(!old.is_current);

  let all = s.list_terms().await.unwrap();
  assert_eq!(all.iter().filter(|t| t.is_current).count(), 1);
  // Newest effective date first.
  assert_eq!(
    all.iter().map(|t| t.version.as_str()).collect::<Vec<_>>(),
    ["1.1.0", "1.0.0"]
  );
}

#[tokio::test]
async fn duplicate_version_is_rejected_and_current_is_kept() {
  let s = store().await;
  let v1 = s.publish_terms(terms("1.0.0", 1)).await.unwrap();

  let err = s.publish_terms(terms("1.0.0", 5)).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateVersion(ref v) if v == "1.0.0"));

  // The transaction rolled back, so v1 is still current.
  let current = s.current_terms().await.unwrap().unwrap();
  assert_eq!(current.id, v1.id);
  assert_eq!(s.list_terms().await.unwrap().len(), 1);
}

#[tokio::test]
async fn version_lookup() {
  let s = store().await;
  s.publish_terms(terms("1.0.0", 1)).await.unwrap();

  assert!(s.terms_version_exists("1.0.0".into()).await.unwrap());
  assert!(!s.terms_version_exists("2.0.0".into()).await.unwrap());
  let found = s.find_terms_by_version("1.0.0".into()).await.unwrap().unwrap();
  assert_eq!(found.version, "1.0.0");
}

// ─── Acceptances ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_and_find_acceptance() {
  let s = store().await;
  let t = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  s.ensure_user(profile("alice")).await.unwrap();

  assert!(s.find_acceptance("alice".into(), t.id).await.unwrap().is_none());

  let recorded = s.record_acceptance(acceptance("alice", t.id)).await.unwrap();
  assert_eq!(recorded.ip_address, "203.0.113.7");

  let found = s.find_acceptance("alice".into(), t.id).await.unwrap().unwrap();
  assert_eq!(found.id, recorded.id);
  assert_eq!(found.terms_id, t.id);
}

#[tokio::test]
async fn duplicate_acceptance_violates_unique_constraint() {
  let s = store().await;
  let t = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  s.ensure_user(profile("alice")).await.unwrap();

  s.record_acceptance(acceptance("alice", t.id)).await.unwrap();
  let err = s.record_acceptance(acceptance("alice", t.id)).await.unwrap_err();

  assert!(matches!(
    err,
    Error::AlreadyAccepted { ref user_id, terms_id } if user_id == "alice" && terms_id == t.id
  ));
  assert_eq!(s.count_acceptances("alice", t.id).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_acceptances_leave_one_row() {
  let s = store().await;
  let t = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  s.ensure_user(profile("alice")).await.unwrap();

  let (a, b) = tokio::join!(
    s.record_acceptance(acceptance("alice", t.id)),
    s.record_acceptance(acceptance("alice", t.id)),
  );
  assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
  assert_eq!(s.count_acceptances("alice", t.id).await.unwrap(), 1);
}

#[tokio::test]
async fn acceptance_for_unknown_user_is_a_missing_reference() {
  let s = store().await;
  let t = s.publish_terms(terms("1.0.0", 1)).await.unwrap();

  let err = s.record_acceptance(acceptance("ghost", t.id)).await.unwrap_err();
  assert!(matches!(err, Error::MissingReference));
}

#[tokio::test]
async fn needs_acceptance_tracks_the_current_version() {
  let s = store().await;
  s.ensure_user(profile("alice")).await.unwrap();

  // Nothing published: nothing to accept.
  assert!(!s.needs_acceptance("alice".into()).await.unwrap());

  let v1 = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  assert!(s.needs_acceptance("alice".into()).await.unwrap());

  s.record_acceptance(acceptance("alice", v1.id)).await.unwrap();
  assert!(!s.needs_acceptance("alice".into()).await.unwrap());

  s.publish_terms(terms("2.0.0", 2)).await.unwrap();
  assert!(s.needs_acceptance("alice".into()).await.unwrap());
}

#[tokio::test]
async fn acceptance_history_is_newest_first_with_versions() {
  let s = store().await;
  s.ensure_user(profile("alice")).await.unwrap();
  s.ensure_user(profile("bob")).await.unwrap();

  let v1 = s.publish_terms(terms("1.0.0", 1)).await.unwrap();
  s.record_acceptance(acceptance("alice", v1.id)).await.unwrap();
  s.record_acceptance(acceptance("bob", v1.id)).await.unwrap();
  let v2 = s.publish_terms(terms("2.0.0", 2)).await.unwrap();
  s.record_acceptance(acceptance("alice", v2.id)).await.unwrap();

  let history = s.list_acceptances("alice".into()).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].terms.version, "2.0.0");
  assert_eq!(history[1].terms.version, "1.0.0");
  assert!(history.iter().all(|r| r.acceptance.user_id == "alice"));
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_user_never_overwrites() {
  let s = store().await;
  let first = s.ensure_user(profile("alice")).await.unwrap();

  let mut changed = profile("alice");
  changed.name = Some("Someone Else".into());
  let second = s.ensure_user(changed).await.unwrap();

  assert_eq!(second, first);
  assert_eq!(second.name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn ensure_user_with_taken_email_errors() {
  let s = store().await;
  s.ensure_user(profile("alice")).await.unwrap();

  let mut imposter = profile("mallory");
  imposter.email = Some("alice@example.com".into());
  let err = s.ensure_user(imposter).await.unwrap_err();
  assert!(matches!(err, Error::EmailTaken(_)));
}

#[tokio::test]
async fn find_user_by_email_and_update_fields() {
  let s = store().await;
  s.ensure_user(profile("alice")).await.unwrap();

  let user = s
    .find_user_by_email("alice@example.com".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(user.id, "alice");
  assert!(!user.has_password());

  let renamed = s
    .update_user_name("alice".into(), "Alice L.".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renamed.name.as_deref(), Some("Alice L."));

  assert!(s.set_password_hash("alice".into(), "$argon2id$x".into()).await.unwrap());
  let user = s.get_user("alice".into()).await.unwrap().unwrap();
  assert_eq!(user.password_hash.as_deref(), Some("$argon2id$x"));
}

#[tokio::test]
async fn updates_on_missing_user_report_absence() {
  let s = store().await;
  assert!(s.update_user_name("ghost".into(), "x".into()).await.unwrap().is_none());
  assert!(!s.set_password_hash("ghost".into(), "h".into()).await.unwrap());
}

// ─── Magic links ─────────────────────────────────────────────────────────────

fn link(hash: &str, expires_in: Duration) -> MagicLink {
  let now = Utc::now();
  MagicLink {
    token_hash: hash.into(),
    email:      "alice@example.com".into(),
    created_at: now,
    expires_at: now + expires_in,
  }
}

#[tokio::test]
async fn magic_link_is_single_use() {
  let s = store().await;
  s.create_magic_link(link("h1", Duration::hours(24))).await.unwrap();

  let email = s.consume_magic_link("h1".into(), Utc::now()).await.unwrap();
  assert_eq!(email.as_deref(), Some("alice@example.com"));

  let again = s.consume_magic_link("h1".into(), Utc::now()).await.unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn expired_or_unknown_magic_link_is_rejected() {
  let s = store().await;
  s.create_magic_link(link("h2", Duration::minutes(5))).await.unwrap();

  let later = Utc::now() + Duration::minutes(10);
  assert!(s.consume_magic_link("h2".into(), later).await.unwrap().is_none());
  assert!(s.consume_magic_link("nope".into(), Utc::now()).await.unwrap().is_none());
}
