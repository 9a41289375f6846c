//! The `ChebiStore` trait and supporting query types.
//!
//! The trait is implemented by relational backends (e.g. `chebi-store-sqlite`).
//! The loader writes through it; the triple builder and API collaborators only
//! read through it.

use std::{future::Future, str::FromStr};

use crate::{
  Error,
  model::{ChemicalData, Compound, InchiLink, Name, ParentLink, Relation, Source, Xref},
  table::{Row, Table},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// The closed set of compound fields a caller may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundField {
  Id,
  /// Substring match.
  Name,
  Source,
  ChebiAccession,
  Status,
  /// Substring match.
  Definition,
  /// Minimum star rating.
  MinStar,
  ParentId,
}

impl FromStr for CompoundField {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "id"              => Ok(CompoundField::Id),
      "name"            => Ok(CompoundField::Name),
      "source"          => Ok(CompoundField::Source),
      "chebi_accession" => Ok(CompoundField::ChebiAccession),
      "status"          => Ok(CompoundField::Status),
      "definition"      => Ok(CompoundField::Definition),
      "min_star"        => Ok(CompoundField::MinStar),
      "parent_id"       => Ok(CompoundField::ParentId),
      other             => Err(Error::UnknownField(other.to_owned())),
    }
  }
}

/// Parameters for [`ChebiStore::search_compounds`].
///
/// All filters are combined with `AND`.
#[derive(Debug, Clone, Default)]
pub struct CompoundQuery {
  pub filters: Vec<(CompoundField, String)>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

impl CompoundQuery {
  pub fn with(mut self, field: CompoundField, value: impl Into<String>) -> Self {
    self.filters.push((field, value.into()));
    self
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational snapshot of the ChEBI dataset.
///
/// Every read method except [`ChebiStore::search_compounds`],
/// [`ChebiStore::chemical_data`] and [`ChebiStore::sources`] applies the
/// publishability predicate: only rows owned by a compound with status `C`
/// and no parent are returned.
pub trait ChebiStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Drop every pipeline table and create the schema again, empty.
  fn recreate_schema(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append `rows` (aligned with [`Table::columns`]) to `table` in one
  /// transaction. Returns the number of rows inserted.
  fn append_rows(
    &self,
    table: Table,
    rows: Vec<Row>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn count_rows(&self, table: Table) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Publishable compounds ordered by id.
  fn publishable_compounds(
    &self,
  ) -> impl Future<Output = Result<Vec<Compound>, Self::Error>> + Send + '_;

  /// Compounds with a parent, restricted to parents that are publishable.
  fn parent_links(&self) -> impl Future<Output = Result<Vec<ParentLink>, Self::Error>> + Send + '_;

  /// Standard InChI keys and raw InChI strings of publishable compounds.
  fn inchi_links(&self) -> impl Future<Output = Result<Vec<InchiLink>, Self::Error>> + Send + '_;

  fn names(&self) -> impl Future<Output = Result<Vec<Name>, Self::Error>> + Send + '_;

  /// Every row of the source lookup table.
  fn sources(&self) -> impl Future<Output = Result<Vec<Source>, Self::Error>> + Send + '_;

  /// Database accessions and references tagged with `source`.
  fn xrefs<'a>(
    &'a self,
    source: &'a Source,
  ) -> impl Future<Output = Result<Vec<Xref>, Self::Error>> + Send + 'a;

  /// Relations whose two ends are both publishable.
  fn relations(&self) -> impl Future<Output = Result<Vec<Relation>, Self::Error>> + Send + '_;

  fn chemical_data(
    &self,
    compound_id: i64,
  ) -> impl Future<Output = Result<Vec<ChemicalData>, Self::Error>> + Send + '_;

  /// Field-based compound search for API collaborators.
  fn search_compounds<'a>(
    &'a self,
    query: &'a CompoundQuery,
  ) -> impl Future<Output = Result<Vec<Compound>, Self::Error>> + Send + 'a;
}
