//! Turns the relational ChEBI snapshot into a zip of Turtle documents.
//!
//! Documents: `compound.ttl`, `inchi.ttl`, `name.ttl`, `relation.ttl` and one
//! `<prefix>_xref.ttl` per cross-reference source with rows. All nodes carry
//! the `DbChEBI` class so the graph loader can purge them selectively.

pub mod archive;
pub mod builder;
pub mod document;
pub mod error;
pub mod namespaces;

pub use builder::{BuildReport, TripleBuilder};
pub use error::{Error, Result};

use chebi_core::{PipelineConfig, store::ChebiStore};
use tracing::info;

/// Build the triple archive at `config.archive_path()`.
///
/// An existing archive is kept and reported unless `force` is set.
pub async fn build_triples<S: ChebiStore>(config: &PipelineConfig, store: &S, force: bool) -> Result<BuildReport> {
  let archive = config.archive_path();
  if !force && archive.is_file() {
    let entries = archive::entries(&archive)?;
    info!(archive = %archive.display(), documents = entries.len(), "archive exists, reusing it");
    return Ok(BuildReport { archive, reused: true, ..BuildReport::default() });
  }

  TripleBuilder::from_config(store, config)
    .build(&config.export_dir, &archive)
    .await
}

#[cfg(test)]
mod tests;
