//! The `GraphStore` trait.
//!
//! Implemented by [`Neo4jHttpStore`](crate::neo4j::Neo4jHttpStore) and
//! [`MemoryGraph`](crate::memory::MemoryGraph). The loader only talks to this
//! abstraction.

use std::future::Future;

use chebi_core::{CHEBI_NS, SENTINEL_LABEL};

use crate::mapping::GraphBatch;

/// The nodes a purge removes: those carrying `label`, plus any whose `uri`
/// starts with one of `uri_prefixes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeScope {
  pub label:        String,
  pub uri_prefixes: Vec<String>,
}

impl PurgeScope {
  /// Everything an earlier pipeline load created, typed or not.
  pub fn pipeline() -> Self {
    Self { label: SENTINEL_LABEL.to_owned(), uri_prefixes: vec![CHEBI_NS.to_owned()] }
  }

  pub fn matches<'a>(&self, uri: &str, mut labels: impl Iterator<Item = &'a String>) -> bool {
    labels.any(|l| *l == self.label) || self.uri_prefixes.iter().any(|p| uri.starts_with(p.as_str()))
  }
}

/// Abstraction over a property-graph backend.
///
/// Every method is one transaction. Writes use merge semantics: nodes are
/// unique by `uri`, so committing a batch twice leaves the graph unchanged.
pub trait GraphStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the uniqueness constraint on `Resource.uri` if it does not exist.
  fn ensure_uri_constraint(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Detach-delete up to `limit` nodes within `scope`. Returns how many
  /// were deleted; zero means none are left.
  fn delete_batch<'a>(
    &'a self,
    scope: &'a PurgeScope,
    limit: usize,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Merge the nodes and relationships of `batch`.
  fn commit<'a>(&'a self, batch: &'a GraphBatch) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn count_labelled<'a>(&'a self, label: &'a str) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
