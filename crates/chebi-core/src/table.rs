//! The relational catalogue: every table the pipeline loads, the flat file it
//! comes from, and the columns it carries.
//!
//! The loader builds rows in the column order given here and the SQLite
//! backend inserts them by these names. The backend's hand-written DDL is
//! checked against this catalogue by its tests.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;

use crate::Error;

// ─── Cells ───────────────────────────────────────────────────────────────────

/// A single typed value in a loaded row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
  Null,
  Integer(i64),
  Text(String),
  Date(NaiveDate),
}

impl Cell {
  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Cell::Integer(v) => Some(*v),
      _ => None,
    }
  }

  pub fn is_null(&self) -> bool { matches!(self, Cell::Null) }
}

/// One row, aligned with [`Table::columns`].
pub type Row = Vec<Cell>;

// ─── Columns ─────────────────────────────────────────────────────────────────

/// Storage class of a column; drives both value parsing and DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
  Integer,
  Text,
  Date,
  /// Binary payload. Never read from flat files.
  Blob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub name: &'static str,
  pub kind: ColumnKind,
}

const fn int(name: &'static str) -> Column { Column { name, kind: ColumnKind::Integer } }
const fn text(name: &'static str) -> Column { Column { name, kind: ColumnKind::Text } }
const fn date(name: &'static str) -> Column { Column { name, kind: ColumnKind::Date } }
const fn blob(name: &'static str) -> Column { Column { name, kind: ColumnKind::Blob } }

/// Columns that point at `chebi_compound(id)` and are subject to the
/// referential filter.
pub const COMPOUND_REFERENCES: [&str; 3] = ["compound_id", "init_id", "final_id"];

/// Text encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
  Utf8,
  /// ISO-8859-1, decoded as its windows-1252 superset.
  Latin1,
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
  Status,
  Source,
  RelationType,
  Compound,
  Structure,
  ChemicalData,
  Comment,
  DatabaseAccession,
  Name,
  Relation,
  Reference,
  Inchi,
}

impl Table {
  /// Lookup tables first, then `Compound`, then everything that depends on it.
  pub const LOAD_ORDER: [Table; 12] = [
    Table::Status,
    Table::Source,
    Table::RelationType,
    Table::Compound,
    Table::Structure,
    Table::ChemicalData,
    Table::Comment,
    Table::DatabaseAccession,
    Table::Name,
    Table::Relation,
    Table::Reference,
    Table::Inchi,
  ];

  /// SQL table name.
  pub fn name(self) -> &'static str {
    match self {
      Table::Status            => "chebi_status",
      Table::Source            => "chebi_source",
      Table::RelationType      => "chebi_relation_type",
      Table::Compound          => "chebi_compound",
      Table::Structure         => "chebi_structure",
      Table::ChemicalData      => "chebi_chemical_data",
      Table::Comment           => "chebi_comment",
      Table::DatabaseAccession => "chebi_database_accession",
      Table::Name              => "chebi_name",
      Table::Relation          => "chebi_relation",
      Table::Reference         => "chebi_reference",
      Table::Inchi             => "chebi_inchi",
    }
  }

  /// File name on the remote file server and in the staging directory.
  pub fn file_name(self) -> &'static str {
    match self {
      Table::Status            => "status.tsv.gz",
      Table::Source            => "source.tsv.gz",
      Table::RelationType      => "relation_type.tsv.gz",
      Table::Compound          => "compounds.tsv.gz",
      Table::Structure         => "structures.tsv.gz",
      Table::ChemicalData      => "chemical_data.tsv.gz",
      Table::Comment           => "comments.tsv.gz",
      Table::DatabaseAccession => "database_accession.tsv.gz",
      Table::Name              => "names.tsv.gz",
      Table::Relation          => "relation.tsv.gz",
      Table::Reference         => "reference.tsv.gz",
      Table::Inchi             => "chebiId_inchi.tsv",
    }
  }

  /// The default `(table, file name)` map in load order.
  pub fn default_files() -> Vec<(Table, String)> {
    Self::LOAD_ORDER
      .iter()
      .map(|t| (*t, t.file_name().to_owned()))
      .collect()
  }

  /// Column catalogue; rows are aligned with this order.
  pub fn columns(self) -> &'static [Column] {
    match self {
      Table::Status => const { &[text("code"), text("description")] },
      Table::Source => const {
        &[
          int("id"),
          text("name"),
          text("prefix"),
          text("url"),
          text("description"),
        ]
      },
      Table::RelationType => const { &[text("code"), text("description")] },
      Table::Compound => const {
        &[
          int("id"),
          text("name"),
          text("source"),
          text("chebi_accession"),
          text("status"),
          text("definition"),
          int("star"),
          date("modified_on"),
          date("release_date"),
          text("created_by"),
          int("parent_id"),
        ]
      },
      Table::Structure => const {
        &[
          int("id"),
          int("compound_id"),
          blob("structure"),
          text("type"),
          text("dimension"),
          text("autogen_structure"),
          text("default_structure"),
          text("standard_inchi"),
          text("standard_inchi_key"),
        ]
      },
      Table::ChemicalData => const {
        &[
          int("id"),
          int("compound_id"),
          text("chemical_data"),
          text("source"),
          text("type"),
        ]
      },
      Table::Comment => const {
        &[
          int("id"),
          int("compound_id"),
          text("text"),
          date("created_on"),
          text("datatype"),
          int("datatype_id"),
        ]
      },
      Table::DatabaseAccession => const {
        &[
          int("id"),
          int("compound_id"),
          text("accession_number"),
          text("type"),
          text("source"),
          int("source_id"),
        ]
      },
      Table::Name => const {
        &[
          int("id"),
          int("compound_id"),
          text("name"),
          text("type"),
          text("source"),
          text("adapted"),
          text("language"),
        ]
      },
      Table::Relation => const {
        &[
          int("id"),
          text("type"),
          text("status"),
          int("init_id"),
          int("final_id"),
        ]
      },
      Table::Reference => const {
        &[
          int("id"),
          int("compound_id"),
          text("reference_id"),
          text("reference_db_name"),
          text("location_in_ref"),
          text("reference_name"),
          int("source_id"),
        ]
      },
      Table::Inchi => const { &[int("id"), int("compound_id"), text("inchi")] },
    }
  }

  /// Position of `column` in [`Table::columns`].
  pub fn column_index(self, column: &str) -> Option<usize> {
    self.columns().iter().position(|c| c.name == column)
  }

  /// Referential-filter columns present in this table.
  pub fn compound_references(self) -> Vec<usize> {
    COMPOUND_REFERENCES
      .iter()
      .filter_map(|c| self.column_index(c))
      .collect()
  }

  pub fn is_lookup(self) -> bool {
    matches!(self, Table::Status | Table::Source | Table::RelationType)
  }

  pub fn encoding(self) -> SourceEncoding {
    match self {
      Table::Reference => SourceEncoding::Latin1,
      _ => SourceEncoding::Utf8,
    }
  }

  /// File columns that are never materialized.
  pub fn skipped_source_columns(self) -> &'static [&'static str] {
    match self {
      Table::Structure => &["structure", "molfile"],
      _ => &[],
    }
  }

  /// `(file column, table column)` renames applied after lower-casing.
  pub fn column_renames(self) -> &'static [(&'static str, &'static str)] {
    match self {
      Table::Inchi => &[("chebi_id", "compound_id")],
      Table::Compound => &[("stars", "star")],
      _ => &[],
    }
  }

  /// Whether the loader assigns a sequential primary key itself.
  pub fn synthesizes_id(self) -> bool { matches!(self, Table::Inchi) }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Table {
  type Err = Error;

  /// Accepts both the SQL name (`chebi_name`) and the short form (`name`).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let short = s.strip_prefix("chebi_").unwrap_or(s);
    Table::LOAD_ORDER
      .iter()
      .copied()
      .find(|t| t.name().trim_start_matches("chebi_") == short)
      .ok_or_else(|| Error::UnknownTable(s.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn compound_is_loaded_before_every_dependent_table() {
    let compound_pos = Table::LOAD_ORDER
      .iter()
      .position(|t| *t == Table::Compound)
      .unwrap();
    for (pos, table) in Table::LOAD_ORDER.iter().enumerate() {
      if !table.compound_references().is_empty() {
        assert!(pos > compound_pos, "{table} loads before chebi_compound");
      }
      if table.is_lookup() {
        assert!(pos < compound_pos);
      }
    }
  }

  #[test]
  fn every_table_has_a_unique_column_list() {
    for table in Table::LOAD_ORDER {
      let columns = table.columns();
      assert!(!columns.is_empty(), "{table} has no columns");
      for (idx, column) in columns.iter().enumerate() {
        assert_eq!(table.column_index(column.name), Some(idx), "{table}.{} repeats", column.name);
      }
    }
    assert_eq!(Table::Compound.columns()[7], Column { name: "modified_on", kind: ColumnKind::Date });
    assert_eq!(Table::Structure.columns()[2].kind, ColumnKind::Blob);
  }

  #[test]
  fn relation_filters_on_both_ends() {
    let refs = Table::Relation.compound_references();
    assert_eq!(refs.len(), 2);
    assert!(Table::Compound.compound_references().is_empty());
  }

  #[test]
  fn table_names_parse_in_both_forms() {
    assert_eq!("chebi_name".parse::<Table>().unwrap(), Table::Name);
    assert_eq!("relation_type".parse::<Table>().unwrap(), Table::RelationType);
    assert!("molecules".parse::<Table>().is_err());
  }
}
