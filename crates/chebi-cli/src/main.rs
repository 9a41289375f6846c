//! `chebi` — runs the ChEBI pipeline stages.
//!
//! # Usage
//!
//! ```
//! chebi fetch-import
//! chebi build-triples --force
//! chebi load-graph data/ttls.zip --keep-existing
//! chebi --config ~/.config/chebi.toml run-all
//! ```
//!
//! Settings come from the TOML file (default `chebi.toml`, optional), then
//! `CHEBI_*` environment variables (`CHEBI_GRAPH__PASSWORD` for nested
//! keys), then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chebi_core::PipelineConfig;
use chebi_graph::ArchiveSource;
use chebi_store_sqlite::SqliteStore;
use clap::{Args, Parser, Subcommand};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "chebi", version, about = "ChEBI import, RDF export and graph load")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "chebi.toml")]
  config: PathBuf,

  #[command(flatten)]
  overrides: Overrides,

  #[command(subcommand)]
  command: Command,
}

/// Per-run overrides of individual configuration fields.
#[derive(Args)]
struct Overrides {
  /// Staging directory for the downloaded flat files.
  #[arg(long, global = true, value_name = "DIR")]
  data_dir: Option<PathBuf>,

  /// SQLite database file.
  #[arg(long, global = true, value_name = "FILE")]
  store_path: Option<PathBuf>,

  /// Export directory; the archive is written next to it.
  #[arg(long, global = true, value_name = "DIR")]
  export_dir: Option<PathBuf>,

  #[arg(long, global = true, value_name = "ROWS")]
  chunk_size: Option<usize>,

  /// Skip malformed rows instead of aborting.
  #[arg(long, global = true)]
  lenient: bool,

  /// Neo4j HTTP endpoint, e.g. http://localhost:7474.
  #[arg(long, global = true, env = "CHEBI_NEO4J_URI")]
  neo4j_uri: Option<String>,

  #[arg(long, global = true, env = "CHEBI_NEO4J_USER")]
  neo4j_user: Option<String>,

  #[arg(long, global = true, env = "CHEBI_NEO4J_PASSWORD", hide_env_values = true)]
  neo4j_password: Option<String>,
}

#[derive(Subcommand)]
enum Command {
  /// Download the flat files and load them into the relational store.
  FetchImport {
    /// Download files even if they are already staged.
    #[arg(long)]
    force_refresh: bool,
  },
  /// Export the relational store as a zip of Turtle documents.
  BuildTriples {
    /// Rebuild even if the archive already exists.
    #[arg(long)]
    force: bool,
  },
  /// Load a triple archive into Neo4j.
  LoadGraph {
    /// Archive path or http(s) URL; defaults to the configured archive.
    archive: Option<String>,

    /// Load on top of earlier loads instead of purging them first.
    #[arg(long)]
    keep_existing: bool,
  },
  /// Fetch, import, export and load in one go. The archive is always rebuilt
  /// from the fresh import.
  RunAll {
    /// Re-download the flat files even if they are already staged.
    #[arg(long)]
    force: bool,

    #[arg(long)]
    keep_existing: bool,
  },
}

impl Command {
  /// Whether the triple archive is rebuilt when it already exists.
  fn rebuilds_archive(&self) -> bool {
    match self {
      Command::BuildTriples { force } => *force,
      Command::RunAll { .. } => true,
      Command::FetchImport { .. } | Command::LoadGraph { .. } => false,
    }
  }
}

// ─── Config ──────────────────────────────────────────────────────────────────

fn load_config(path: &Path, overrides: Overrides) -> anyhow::Result<PipelineConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("CHEBI")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("xref_prefixes"),
    )
    .build()
    .context("failed to read config file")?;

  let mut cfg: PipelineConfig = settings
    .try_deserialize()
    .context("failed to deserialise PipelineConfig")?;

  if let Some(dir) = overrides.data_dir {
    cfg.data_dir = dir;
  }
  if let Some(path) = overrides.store_path {
    cfg.store_path = path;
  }
  if let Some(dir) = overrides.export_dir {
    cfg.export_dir = dir;
  }
  if let Some(size) = overrides.chunk_size {
    cfg.chunk_size = size;
  }
  cfg.lenient |= overrides.lenient;
  if let Some(uri) = overrides.neo4j_uri {
    cfg.graph.uri = uri;
  }
  if let Some(user) = overrides.neo4j_user {
    cfg.graph.user = user;
  }
  if let Some(password) = overrides.neo4j_password {
    cfg.graph.password = password;
  }

  cfg.data_dir = expand_tilde(&cfg.data_dir);
  cfg.store_path = expand_tilde(&cfg.store_path);
  cfg.export_dir = expand_tilde(&cfg.export_dir);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

async fn open_store(cfg: &PipelineConfig) -> anyhow::Result<SqliteStore> {
  if let Some(parent) = cfg.store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))
}

// ─── Stages ──────────────────────────────────────────────────────────────────

async fn fetch_import(cfg: &PipelineConfig) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  let report = chebi_ingest::fetch_and_import(cfg, &store)
    .await
    .context("fetch-import")?;

  for (table, counts) in &report.load.tables {
    info!(
      %table,
      inserted = counts.inserted,
      filtered = counts.filtered,
      skipped = counts.skipped_rows,
      "table loaded"
    );
  }
  println!(
    "imported {} rows from {} files ({} downloaded)",
    report.load.total_inserted(),
    report.load.tables.len(),
    report.fetch.downloaded.len()
  );
  Ok(())
}

async fn build_triples(cfg: &PipelineConfig, force: bool) -> anyhow::Result<PathBuf> {
  let store = open_store(cfg).await?;
  let report = chebi_rdf::build_triples(cfg, &store, force)
    .await
    .context("build-triples")?;

  if report.reused {
    println!("archive {} exists, use --force to rebuild", report.archive.display());
  } else {
    let triples: usize = report.documents.values().sum();
    println!(
      "wrote {triples} triples in {} documents to {}",
      report.documents.len(),
      report.archive.display()
    );
  }
  for warning in &report.warnings {
    println!("warning: {warning}");
  }
  Ok(report.archive)
}

async fn load_graph(cfg: &PipelineConfig, source: ArchiveSource) -> anyhow::Result<()> {
  let summary = chebi_graph::load_graph(cfg, &source)
    .await
    .context("load-graph")?;
  println!(
    "loaded {} triples from {} documents into {} ({} nodes deleted first)",
    summary.total_triples(),
    summary.documents.len(),
    cfg.graph.uri,
    summary.deleted_nodes
  );
  Ok(())
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let mut cfg = load_config(&cli.config, cli.overrides)?;

  let rebuild = cli.command.rebuilds_archive();

  match cli.command {
    Command::FetchImport { force_refresh } => {
      cfg.force_refresh |= force_refresh;
      fetch_import(&cfg).await?;
    }
    Command::BuildTriples { .. } => {
      build_triples(&cfg, rebuild).await?;
    }
    Command::LoadGraph { archive, keep_existing } => {
      cfg.graph.delete_existing &= !keep_existing;
      let source = match archive {
        Some(archive) => ArchiveSource::parse(&archive),
        None => ArchiveSource::Path(cfg.archive_path()),
      };
      load_graph(&cfg, source).await?;
    }
    Command::RunAll { force, keep_existing } => {
      cfg.force_refresh |= force;
      cfg.graph.delete_existing &= !keep_existing;
      fetch_import(&cfg).await?;
      let archive = build_triples(&cfg, rebuild).await?;
      load_graph(&cfg, ArchiveSource::Path(archive)).await?;
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_file_settings() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chebi.toml");
    std::fs::write(
      &file,
      "data_dir = \"staging\"\nchunk_size = 10\nxref_prefixes = [\"chembl\"]\n[graph]\nuser = \"reader\"\n",
    )
    .unwrap();

    let cli = Cli::parse_from(["chebi", "--config", file.to_str().unwrap(), "--chunk-size", "5", "build-triples"]);
    let cfg = load_config(&cli.config, cli.overrides).unwrap();
    assert_eq!(cfg.data_dir, PathBuf::from("staging"));
    assert_eq!(cfg.chunk_size, 5);
    assert_eq!(cfg.xref_prefixes, ["chembl"]);
    assert_eq!(cfg.graph.user, "reader");
    assert_eq!(cfg.graph.database, "neo4j");
  }

  #[test]
  fn run_all_always_rebuilds_the_archive() {
    let rebuilds = |args: &[&str]| Cli::parse_from(args).command.rebuilds_archive();
    assert!(rebuilds(&["chebi", "run-all"]));
    assert!(rebuilds(&["chebi", "run-all", "--force"]));
    assert!(!rebuilds(&["chebi", "build-triples"]));
    assert!(rebuilds(&["chebi", "build-triples", "--force"]));
    assert!(!rebuilds(&["chebi", "load-graph", "ttls.zip"]));
  }

  #[test]
  fn keep_existing_opts_out_of_the_purge() {
    let cli = Cli::parse_from(["chebi", "load-graph", "--keep-existing"]);
    assert!(matches!(cli.command, Command::LoadGraph { archive: None, keep_existing: true }));
    let cli = Cli::parse_from(["chebi", "run-all"]);
    assert!(matches!(cli.command, Command::RunAll { keep_existing: false, .. }));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/chebi/data")), PathBuf::from(home).join("chebi/data"));
    assert_eq!(expand_tilde(Path::new("data")), PathBuf::from("data"));
  }
}
