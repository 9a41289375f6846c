//! Error type for `chebi-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] chebi_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  #[error("invalid value {value:?} for filter {field}")]
  InvalidFilter { field: &'static str, value: String },

  #[error("schema mismatch: {0}")]
  Schema(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
