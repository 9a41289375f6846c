//! Pipeline configuration.
//!
//! Constructed once by the caller (usually from `chebi.toml` plus `CHEBI_*`
//! environment variables) and passed by reference into each stage.

use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://ftp.ebi.ac.uk/pub/databases/chebi/flat_files";

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Source prefixes that get a cross-reference document by default.
pub const DEFAULT_XREF_PREFIXES: [&str; 10] = [
  "gxa.expt",
  "biomodels.db",
  "bindingdb",
  "reactome",
  "chembl",
  "surechembl",
  "brenda.ligand",
  "go",
  "rhea",
  "eccode",
];

// ─── Pipeline ────────────────────────────────────────────────────────────────

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
  /// Staging directory for downloaded flat files.
  pub data_dir:      PathBuf,
  /// SQLite database file.
  pub store_path:    PathBuf,
  /// Directory the Turtle documents are written to; the archive is created
  /// next to it as `<export_dir>.zip`.
  pub export_dir:    PathBuf,
  pub base_url:      String,
  /// Download files even if they already exist in `data_dir`.
  pub force_refresh: bool,
  /// Keep staged files after a successful import.
  pub keep_files:    bool,
  pub chunk_size:    usize,
  /// Skip malformed rows instead of aborting the run.
  pub lenient:       bool,
  pub xref_prefixes: Vec<String>,
  pub graph:         GraphConfig,
}

impl PipelineConfig {
  /// `<export_dir>.zip`; any dot already in the directory name is kept.
  pub fn archive_path(&self) -> PathBuf {
    let mut name = self.export_dir.as_os_str().to_owned();
    name.push(".zip");
    PathBuf::from(name)
  }
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      data_dir:      PathBuf::from("data"),
      store_path:    PathBuf::from("data/chebi.db"),
      export_dir:    PathBuf::from("data/ttls"),
      base_url:      DEFAULT_BASE_URL.to_owned(),
      force_refresh: false,
      keep_files:    true,
      chunk_size:    DEFAULT_CHUNK_SIZE,
      lenient:       false,
      xref_prefixes: DEFAULT_XREF_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
      graph:         GraphConfig::default(),
    }
  }
}

// ─── Graph store ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
  /// Base URL of the Neo4j HTTP endpoint.
  pub uri:               String,
  pub user:              String,
  pub password:          String,
  pub database:          String,
  /// Purge the nodes of earlier loads before loading. On by default.
  pub delete_existing:   bool,
  pub delete_batch_size: usize,
  /// Triples per commit.
  pub commit_batch_size: usize,
}

impl Default for GraphConfig {
  fn default() -> Self {
    Self {
      uri:               "http://localhost:7474".to_owned(),
      user:              "neo4j".to_owned(),
      password:          String::new(),
      database:          "neo4j".to_owned(),
      delete_existing:   true,
      delete_batch_size: 1_000,
      commit_batch_size: 10_000,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn graph_loads_replace_earlier_loads_by_default() {
    let graph = GraphConfig::default();
    assert!(graph.delete_existing);
    assert_eq!(graph.delete_batch_size, 1_000);
    assert_eq!(graph.commit_batch_size, 10_000);

    let kept: GraphConfig = serde_json::from_str(r#"{"delete_existing": false}"#).unwrap();
    assert!(!kept.delete_existing);
    assert_eq!(kept.database, "neo4j");
  }

  #[test]
  fn archive_sits_next_to_export_dir() {
    let cfg = PipelineConfig {
      export_dir: PathBuf::from("/tmp/out/ttls"),
      ..PipelineConfig::default()
    };
    assert_eq!(cfg.archive_path(), PathBuf::from("/tmp/out/ttls.zip"));

    let dotted = PipelineConfig { export_dir: PathBuf::from("out/chebi.v2"), ..cfg };
    assert_eq!(dotted.archive_path(), PathBuf::from("out/chebi.v2.zip"));
  }
}
