//! Archive → graph store.
//!
//! The archive is extracted into a temporary working area that is removed
//! when the load returns, whether it succeeded or not. Extraction and Turtle
//! parsing run on the blocking pool; parsed sub-batches reach the store
//! through a bounded channel.

use std::{
  collections::BTreeMap,
  fmt,
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
  str::FromStr,
};

use chebi_core::GraphConfig;
use oxttl::TurtleParser;
use reqwest::Client;
use tokio::{io::AsyncWriteExt, sync::mpsc, task};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::{
  Error, Result,
  mapping::GraphBatch,
  store::{GraphStore, PurgeScope},
};

/// Parsed sub-batches buffered ahead of the store.
const PARSED_BATCHES: usize = 2;

// ─── Source ──────────────────────────────────────────────────────────────────

/// Where the archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
  Path(PathBuf),
  /// `http://` or `https://` URL, downloaded before extraction.
  Url(String),
}

impl ArchiveSource {
  pub fn parse(s: &str) -> Self {
    let lower = s.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
      ArchiveSource::Url(s.trim().to_owned())
    } else {
      ArchiveSource::Path(PathBuf::from(s))
    }
  }
}

impl FromStr for ArchiveSource {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self::parse(s)) }
}

impl From<PathBuf> for ArchiveSource {
  fn from(path: PathBuf) -> Self { ArchiveSource::Path(path) }
}

impl fmt::Display for ArchiveSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArchiveSource::Path(path) => write!(f, "{}", path.display()),
      ArchiveSource::Url(url) => f.write_str(url),
    }
  }
}

/// A local archive must exist and carry a `.zip` extension.
fn validate(path: &Path) -> Result<()> {
  if !path.is_file() {
    return Err(Error::Archive(format!("{} does not exist", path.display())));
  }
  let is_zip = path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
  if !is_zip {
    return Err(Error::Archive(format!("{} is not a .zip file", path.display())));
  }
  Ok(())
}

/// Extract `archive` into `dir`; returns the `.ttl` files, sorted by name.
fn extract(archive: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
  let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
  let mut zip = ZipArchive::new(BufReader::new(file))
    .map_err(|e| Error::Archive(format!("{} is not a zip archive: {e}", archive.display())))?;
  std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
  zip.extract(dir)?;

  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
    let path = entry.map_err(|e| Error::io(dir, e))?.path();
    if path.is_file() && path.extension().is_some_and(|e| e == "ttl") {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

/// Parse the Turtle document at `path`, sending a batch every `batch_size`
/// triples and a final partial one. Stops quietly if the receiver is gone.
fn parse_document(name: &str, path: &Path, batch_size: usize, tx: &mpsc::Sender<GraphBatch>) -> Result<()> {
  let file = File::open(path).map_err(|e| Error::io(path, e))?;
  let mut batch = GraphBatch::default();

  for triple in TurtleParser::new().for_reader(BufReader::new(file)) {
    let triple = triple.map_err(|source| Error::Turtle { file: name.to_owned(), source })?;
    batch.add_triple(&triple);
    if batch.triples() >= batch_size && tx.blocking_send(std::mem::take(&mut batch)).is_err() {
      return Ok(());
    }
  }

  if !batch.is_empty() {
    let _ = tx.blocking_send(batch);
  }
  Ok(())
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentSummary {
  pub triples: usize,
  pub commits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
  /// Sentinel-labelled nodes removed before loading.
  pub deleted_nodes: u64,
  pub documents:     BTreeMap<String, DocumentSummary>,
}

impl LoadSummary {
  pub fn total_triples(&self) -> usize { self.documents.values().map(|d| d.triples).sum() }
}

// ─── Loader ──────────────────────────────────────────────────────────────────

pub struct GraphLoader<'a, G> {
  store:             &'a G,
  client:            Client,
  delete_existing:   bool,
  delete_batch_size: usize,
  commit_batch_size: usize,
}

impl<'a, G: GraphStore> GraphLoader<'a, G> {
  pub fn new(store: &'a G) -> Self {
    let defaults = GraphConfig::default();
    Self {
      store,
      client: Client::new(),
      delete_existing: defaults.delete_existing,
      delete_batch_size: defaults.delete_batch_size,
      commit_batch_size: defaults.commit_batch_size,
    }
  }

  pub fn from_config(store: &'a G, config: &GraphConfig) -> Self {
    Self::new(store)
      .delete_existing(config.delete_existing)
      .delete_batch_size(config.delete_batch_size)
      .commit_batch_size(config.commit_batch_size)
  }

  /// Client used to download URL sources.
  pub fn client(mut self, client: Client) -> Self {
    self.client = client;
    self
  }

  pub fn delete_existing(mut self, delete: bool) -> Self {
    self.delete_existing = delete;
    self
  }

  pub fn delete_batch_size(mut self, size: usize) -> Self {
    self.delete_batch_size = size.max(1);
    self
  }

  pub fn commit_batch_size(mut self, size: usize) -> Self {
    self.commit_batch_size = size.max(1);
    self
  }

  pub async fn load(&self, source: &ArchiveSource) -> Result<LoadSummary> {
    if let ArchiveSource::Path(path) = source {
      validate(path)?;
    }

    let work = tempfile::Builder::new()
      .prefix("chebi-graph-")
      .tempdir()
      .map_err(|e| Error::io(std::env::temp_dir(), e))?;

    let archive = match source {
      ArchiveSource::Path(path) => path.clone(),
      ArchiveSource::Url(url) => self.download(url, work.path()).await?,
    };
    let extracted = work.path().join("ttls");
    let files = task::spawn_blocking(move || extract(&archive, &extracted)).await??;
    info!(archive = %source, documents = files.len(), "archive extracted");

    self.store.ensure_uri_constraint().await.map_err(Error::graph)?;

    let mut summary = LoadSummary::default();
    if self.delete_existing {
      summary.deleted_nodes = self.purge().await?;
    }

    for file in &files {
      let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
      let document = self.load_document(&name, file).await?;
      info!(document = %name, triples = document.triples, commits = document.commits, "document loaded");
      summary.documents.insert(name, document);
    }

    info!(
      deleted = summary.deleted_nodes,
      triples = summary.total_triples(),
      "graph load complete"
    );
    Ok(summary)
  }

  /// Delete the nodes of earlier loads batch by batch until none are left.
  async fn purge(&self) -> Result<u64> {
    let scope = PurgeScope::pipeline();
    let mut total = 0;
    loop {
      let deleted = self
        .store
        .delete_batch(&scope, self.delete_batch_size)
        .await
        .map_err(Error::graph)?;
      if deleted == 0 {
        break;
      }
      total += deleted;
      debug!(deleted, total, "deleted batch of existing nodes");
    }
    info!(deleted = total, label = %scope.label, "existing nodes removed");
    Ok(total)
  }

  async fn load_document(&self, name: &str, path: &Path) -> Result<DocumentSummary> {
    let (tx, mut rx) = mpsc::channel(PARSED_BATCHES);
    let parser = {
      let (name, path, batch_size) = (name.to_owned(), path.to_path_buf(), self.commit_batch_size);
      task::spawn_blocking(move || parse_document(&name, &path, batch_size, &tx))
    };

    let mut summary = DocumentSummary::default();
    while let Some(batch) = rx.recv().await {
      self.store.commit(&batch).await.map_err(Error::graph)?;
      summary.triples += batch.triples();
      summary.commits += 1;
      debug!(document = %name, triples = summary.triples, "sub-batch committed");
    }
    parser.await??;
    Ok(summary)
  }

  async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf> {
    let download_error = |source| Error::Download { url: url.to_owned(), source };
    let path = dir.join("archive.zip");

    let mut resp = self
      .client
      .get(url)
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(download_error)?;

    let mut out = tokio::fs::File::create(&path)
      .await
      .map_err(|e| Error::io(&path, e))?;
    while let Some(chunk) = resp.chunk().await.map_err(download_error)? {
      out.write_all(&chunk).await.map_err(|e| Error::io(&path, e))?;
    }
    out.flush().await.map_err(|e| Error::io(&path, e))?;

    info!(url = %url, "archive downloaded");
    Ok(path)
  }
}
