//! Chunked relational loader.
//!
//! Tables are loaded in [`Table::LOAD_ORDER`]. The compound ids seen while
//! loading `chebi_compound` form the id set every dependent row is filtered
//! against, so the loader never hands the store a dangling reference.

use std::{
  collections::{BTreeMap, HashSet},
  path::{Path, PathBuf},
};

use chebi_core::{Cell, PipelineConfig, Table, config::DEFAULT_CHUNK_SIZE, store::ChebiStore};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  reader::ChunkedReader,
  transform::{ReferenceFilter, RowMapper},
};

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableReport {
  pub inserted:     u64,
  /// Rows dropped by the referential filter.
  pub filtered:     u64,
  /// Malformed rows skipped in lenient mode.
  pub skipped_rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
  pub tables: BTreeMap<Table, TableReport>,
}

impl LoadReport {
  pub fn table(&self, table: Table) -> TableReport {
    self.tables.get(&table).copied().unwrap_or_default()
  }

  pub fn inserted(&self, table: Table) -> u64 { self.table(table).inserted }

  pub fn filtered(&self, table: Table) -> u64 { self.table(table).filtered }

  pub fn total_inserted(&self) -> u64 { self.tables.values().map(|r| r.inserted).sum() }
}

// ─── Loader ──────────────────────────────────────────────────────────────────

pub struct Loader<'a, S> {
  store:      &'a S,
  files:      Vec<(Table, String)>,
  chunk_size: usize,
  lenient:    bool,
  keep_files: bool,
}

impl<'a, S: ChebiStore> Loader<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self {
      store,
      files: Table::default_files(),
      chunk_size: DEFAULT_CHUNK_SIZE,
      lenient: false,
      keep_files: true,
    }
  }

  pub fn from_config(store: &'a S, config: &PipelineConfig) -> Self {
    Self::new(store)
      .chunk_size(config.chunk_size)
      .lenient(config.lenient)
      .keep_files(config.keep_files)
  }

  /// Replace the `(table, file name)` map. Tables without an entry are not
  /// loaded.
  pub fn files(mut self, files: Vec<(Table, String)>) -> Self {
    self.files = files;
    self
  }

  pub fn chunk_size(mut self, rows: usize) -> Self {
    self.chunk_size = rows.max(1);
    self
  }

  pub fn lenient(mut self, lenient: bool) -> Self {
    self.lenient = lenient;
    self
  }

  pub fn keep_files(mut self, keep: bool) -> Self {
    self.keep_files = keep;
    self
  }

  /// Recreate the schema and load every staged file from `staging_dir`.
  pub async fn load_all(&self, staging_dir: &Path) -> Result<LoadReport> {
    let plan: Vec<(Table, PathBuf)> = Table::LOAD_ORDER
      .iter()
      .filter_map(|t| self.files.iter().find(|(ft, _)| ft == t))
      .map(|(t, f)| (*t, staging_dir.join(f)))
      .collect();
    if let Some((_, missing)) = plan.iter().find(|(_, p)| !p.is_file()) {
      return Err(Error::MissingFile(missing.clone()));
    }

    self.store.recreate_schema().await.map_err(Error::store)?;

    let mut report = LoadReport::default();
    let mut compound_ids = HashSet::new();
    for (table, path) in &plan {
      let (table_report, ids) = self.load_table(*table, path, &compound_ids).await?;
      compound_ids.extend(ids);
      info!(
        %table,
        inserted = table_report.inserted,
        filtered = table_report.filtered,
        skipped = table_report.skipped_rows,
        "table loaded"
      );
      report.tables.insert(*table, table_report);
    }

    if !self.keep_files {
      for (_, path) in &plan {
        tokio::fs::remove_file(path).await.map_err(|e| Error::io(path, e))?;
        debug!(file = %path.display(), "removed staged file");
      }
    }

    Ok(report)
  }

  /// Load one file. Returns the table report and, for `chebi_compound`, the
  /// ids that were inserted.
  async fn load_table(
    &self,
    table: Table,
    path: &Path,
    compound_ids: &HashSet<i64>,
  ) -> Result<(TableReport, Vec<i64>)> {
    let mut reader = ChunkedReader::open(path, table.encoding(), self.chunk_size)?;
    let file = reader.file().to_owned();
    let mut mapper = RowMapper::new(table, reader.header())
      .map_err(|message| Error::Parse { file: file.clone(), line: 1, message })?;
    if !mapper.unknown_columns().is_empty() {
      debug!(%table, file = %file, columns = ?mapper.unknown_columns(), "ignoring unknown columns");
    }

    let filter = ReferenceFilter::new(table, compound_ids);

    let mut report = TableReport::default();
    let mut inserted_ids = Vec::new();
    while let Some(chunk) = reader.next_chunk()? {
      let mut rows = Vec::with_capacity(chunk.len());
      for record in chunk {
        let row = match mapper.map(&record.fields) {
          Ok(row) => row,
          Err(message) if self.lenient => {
            warn!(%table, file = %file, line = record.line, %message, "skipping malformed row");
            report.skipped_rows += 1;
            continue;
          }
          Err(message) => return Err(Error::Parse { file, line: record.line, message }),
        };

        if filter.is_active() && !filter.keeps(&row) {
          report.filtered += 1;
          continue;
        }
        if table == Table::Compound {
          if let Cell::Integer(id) = row[0] {
            inserted_ids.push(id);
          }
        }
        rows.push(row);
      }

      if !rows.is_empty() {
        let n = self.store.append_rows(table, rows).await.map_err(Error::store)?;
        report.inserted += n as u64;
        debug!(%table, rows = n, "chunk appended");
      }
    }

    Ok((report, inserted_ids))
  }
}
