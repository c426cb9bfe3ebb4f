//! Seeding and publishing terms versions from markdown files.

use std::path::Path;

use accord_core::{
  store::AccordStore,
  terms::{NewTerms, Terms},
};
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Markdown file read by `seed-terms` when no path is given.
pub const DEFAULT_TERMS_FILE: &str = "legal/terms-of-service-v1.md";

/// Version created by `seed-terms`.
pub const SEED_VERSION: &str = "1.0.0";

#[derive(Debug)]
pub enum SeedOutcome {
  Created(Terms),
  /// The seed version exists already; nothing was written.
  Skipped,
}

async fn read_content(path: &Path) -> Result<String> {
  let content = tokio::fs::read_to_string(path)
    .await
    .map_err(|source| Error::ReadFile { path: path.to_path_buf(), source })?;
  if content.trim().is_empty() {
    return Err(Error::EmptyFile(path.to_path_buf()));
  }
  Ok(content)
}

/// Create the initial version from `path` unless it already exists.
pub async fn seed<S>(store: &S, path: &Path) -> Result<SeedOutcome>
where
  S: AccordStore,
{
  let content = read_content(path).await?;

  if store
    .terms_version_exists(SEED_VERSION.to_string())
    .await
    .map_err(Error::store)?
  {
    tracing::info!(version = SEED_VERSION, "terms already seeded, skipping");
    return Ok(SeedOutcome::Skipped);
  }

  let input = NewTerms::new(SEED_VERSION, content, Utc::now())?;
  let terms = store.publish_terms(input).await.map_err(Error::store)?;
  tracing::info!(version = %terms.version, id = %terms.id, "seeded terms");
  Ok(SeedOutcome::Created(terms))
}

/// Publish `path` as `version`, superseding whatever is current.
pub async fn publish<S>(
  store: &S,
  path: &Path,
  version: &str,
  effective_date: DateTime<Utc>,
) -> Result<Terms>
where
  S: AccordStore,
{
  let content = read_content(path).await?;
  let input = NewTerms::new(version, content, effective_date)?;

  if store
    .terms_version_exists(input.version.clone())
    .await
    .map_err(Error::store)?
  {
    return Err(Error::VersionExists(input.version));
  }

  let terms = store.publish_terms(input).await.map_err(Error::store)?;
  tracing::info!(version = %terms.version, id = %terms.id, "published terms");
  Ok(terms)
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use accord_store_sqlite::SqliteStore;

  use super::*;

  fn write_terms(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir()
      .join(format!("accord-terms-{}-{name}.md", uuid::Uuid::new_v4()));
    std::fs::write(&path, body).unwrap();
    path
  }

  #[tokio::test]
  async fn seed_creates_then_skips() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let path = write_terms("seed", "# Terms\n\nBe kind.");

    let first = seed(&store, &path).await.unwrap();
    let SeedOutcome::Created(terms) = first else {
      panic!("expected a new version, got {first:?}");
    };
    assert_eq!(terms.version, SEED_VERSION);
    assert!(terms.is_current);
    assert_eq!(terms.content, "# Terms\n\nBe kind.");

    assert!(matches!(seed(&store, &path).await.unwrap(), SeedOutcome::Skipped));
    assert_eq!(store.list_terms().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn seed_without_file_fails() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let missing = std::env::temp_dir().join("accord-no-such-terms.md");
    assert!(matches!(
      seed(&store, &missing).await,
      Err(Error::ReadFile { .. })
    ));
    assert!(store.current_terms().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn publish_supersedes_and_rejects_duplicates() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let v1 = write_terms("v1", "first");
    let v2 = write_terms("v2", "second");

    seed(&store, &v1).await.unwrap();
    let published = publish(&store, &v2, "1.1.0", Utc::now()).await.unwrap();

    let current = store.current_terms().await.unwrap().unwrap();
    assert_eq!(current.id, published.id);
    assert_eq!(
      store.list_terms().await.unwrap().iter().filter(|t| t.is_current).count(),
      1
    );

    assert!(matches!(
      publish(&store, &v2, "1.1.0", Utc::now()).await,
      Err(Error::VersionExists(v)) if v == "1.1.0"
    ));
    assert!(matches!(
      publish(&store, &v2, "one-point-two", Utc::now()).await,
      Err(Error::Core(_))
    ));
  }
}
