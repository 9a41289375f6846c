//! In-process [`GraphStore`] with the same merge semantics as Neo4j.
//!
//! Used by the tests and for dry runs.

use std::{
  collections::{BTreeMap, BTreeSet},
  convert::Infallible,
  sync::{Mutex, MutexGuard},
};

use crate::{
  mapping::{GraphBatch, NodeWrite, RelationshipWrite},
  store::{GraphStore, PurgeScope},
};

#[derive(Debug, Default)]
struct State {
  nodes:         BTreeMap<String, NodeWrite>,
  relationships: BTreeSet<RelationshipWrite>,
  constraints:   BTreeSet<String>,
  commits:       usize,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
  state: Mutex<State>,
}

impl MemoryGraph {
  pub fn new() -> Self { Self::default() }

  fn state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn node_count(&self) -> usize { self.state().nodes.len() }

  pub fn relationship_count(&self) -> usize { self.state().relationships.len() }

  pub fn node(&self, uri: &str) -> Option<NodeWrite> { self.state().nodes.get(uri).cloned() }

  pub fn has_relationship(&self, from: &str, kind: &str, to: &str) -> bool {
    self.state().relationships.contains(&RelationshipWrite {
      from: from.to_owned(),
      kind: kind.to_owned(),
      to:   to.to_owned(),
    })
  }

  pub fn constraint_count(&self) -> usize { self.state().constraints.len() }

  /// Successful `commit` calls so far.
  pub fn commit_count(&self) -> usize { self.state().commits }

  /// Insert a node directly, bypassing the loader.
  pub fn insert_node(&self, uri: &str, labels: &[&str]) {
    let mut state = self.state();
    let node = state.nodes.entry(uri.to_owned()).or_default();
    node.labels.extend(labels.iter().map(|l| (*l).to_owned()));
  }
}

impl GraphStore for MemoryGraph {
  type Error = Infallible;

  async fn ensure_uri_constraint(&self) -> Result<(), Infallible> {
    self.state().constraints.insert("n10s_unique_uri".to_owned());
    Ok(())
  }

  async fn delete_batch(&self, scope: &PurgeScope, limit: usize) -> Result<u64, Infallible> {
    let mut state = self.state();
    let doomed: Vec<String> = state
      .nodes
      .iter()
      .filter(|(uri, node)| scope.matches(uri, node.labels.iter()))
      .take(limit)
      .map(|(uri, _)| uri.clone())
      .collect();

    for uri in &doomed {
      state.nodes.remove(uri);
    }
    state
      .relationships
      .retain(|r| !doomed.contains(&r.from) && !doomed.contains(&r.to));
    Ok(doomed.len() as u64)
  }

  async fn commit(&self, batch: &GraphBatch) -> Result<(), Infallible> {
    let mut state = self.state();
    for (uri, write) in batch.nodes() {
      let node = state.nodes.entry(uri.clone()).or_default();
      node.labels.extend(write.labels.iter().cloned());
      node
        .properties
        .extend(write.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    state.relationships.extend(batch.relationships().iter().cloned());
    state.commits += 1;
    Ok(())
  }

  async fn count_labelled(&self, label: &str) -> Result<u64, Infallible> {
    Ok(self.state().nodes.values().filter(|n| n.labels.contains(label)).count() as u64)
  }
}
