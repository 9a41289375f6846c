//! Loads a triple archive into a property-graph store.
//!
//! [`load_graph`] targets Neo4j over HTTP; [`GraphLoader`] works with any
//! [`GraphStore`], including the in-process [`MemoryGraph`].

pub mod error;
pub mod loader;
pub mod mapping;
pub mod memory;
pub mod neo4j;
pub mod store;

pub use error::{Error, Result};
pub use loader::{ArchiveSource, DocumentSummary, GraphLoader, LoadSummary};
pub use mapping::GraphBatch;
pub use memory::MemoryGraph;
pub use neo4j::Neo4jHttpStore;
pub use store::GraphStore;

use chebi_core::PipelineConfig;

/// Load `source` into the Neo4j database described by `config.graph`.
pub async fn load_graph(config: &PipelineConfig, source: &ArchiveSource) -> Result<LoadSummary> {
  let store = Neo4jHttpStore::from_config(&config.graph).map_err(Error::graph)?;
  GraphLoader::from_config(&store, &config.graph).load(source).await
}
