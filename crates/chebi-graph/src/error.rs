//! Error types for `chebi-graph`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The archive is missing, is not a `.zip`, or cannot be opened as one.
  #[error("archive error: {0}")]
  Archive(String),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("download failed for {url}")]
  Download {
    url:    String,
    #[source]
    source: reqwest::Error,
  },

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("graph import failed: {0}")]
  GraphImport(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("turtle parse error in {file}")]
  Turtle {
    file:   String,
    #[source]
    source: oxttl::TurtleParseError,
  },

  #[error("blocking task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("i/o error on {}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Error::Io { path: path.into(), source }
  }

  pub(crate) fn graph(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::GraphImport(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
