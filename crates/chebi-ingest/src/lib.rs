//! Fetches the ChEBI flat files and loads them into a [`ChebiStore`].
//!
//! [`fetch_and_import`] is the stage entry point; [`Fetcher`] and [`Loader`]
//! can be driven separately when the files are staged by other means.

pub mod error;
pub mod fetch;
pub mod loader;
pub mod reader;
pub mod transform;

pub use error::{Error, Result};
pub use fetch::{FetchReport, Fetcher, RetryPolicy};
pub use loader::{LoadReport, Loader, TableReport};

use chebi_core::{PipelineConfig, Table, store::ChebiStore};
use tracing::info;

/// What one ingestion run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
  pub fetch: FetchReport,
  pub load:  LoadReport,
}

/// Mirror the flat files into `config.data_dir`, then replace the contents
/// of `store` with them.
pub async fn fetch_and_import<S: ChebiStore>(config: &PipelineConfig, store: &S) -> Result<ImportReport> {
  let files = Table::default_files();

  let fetch = Fetcher::from_config(config)?
    .fetch_all(&files, &config.data_dir)
    .await?;
  info!(
    downloaded = fetch.downloaded.len(),
    skipped = fetch.skipped.len(),
    "flat files staged"
  );

  let load = Loader::from_config(store, config)
    .files(files)
    .load_all(&config.data_dir)
    .await?;
  info!(rows = load.total_inserted(), "relational store loaded");

  Ok(ImportReport { fetch, load })
}
