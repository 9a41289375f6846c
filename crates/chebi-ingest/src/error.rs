//! Error types for `chebi-ingest`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("download failed for file {file}")]
  Download {
    file:   String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{file}:{line}: {message}")]
  Parse { file: String, line: u64, message: String },

  #[error("staged file not found: {}", .0.display())]
  MissingFile(PathBuf),

  #[error("i/o error on {}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Error::Io { path: path.into(), source }
  }

  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
