//! Error types for `chebi-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown table: {0:?}")]
  UnknownTable(String),

  #[error("unknown compound status code: {0:?}")]
  UnknownStatus(String),

  #[error("unknown filter field: {0:?}")]
  UnknownField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
