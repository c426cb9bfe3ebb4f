//! Errors from the terms administration commands.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("terms file not found at {path}: {source}")]
  ReadFile {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("terms file {0} is empty")]
  EmptyFile(PathBuf),

  #[error("terms version {0} already exists")]
  VersionExists(String),

  #[error(transparent)]
  Core(#[from] accord_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
