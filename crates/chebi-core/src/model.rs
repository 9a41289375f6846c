//! Row types read back from the relational store.
//!
//! Dependent records are plain structs carrying the owning compound's id;
//! there is no object graph between them. Ownership is resolved with explicit
//! joins in the store or with id-set lookups in the loader.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Curation state of a compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
  /// `C`: checked by a curator and published.
  Checked,
  /// `D`: deleted.
  Deleted,
  /// `E`: exists but not yet checked.
  Unchecked,
  /// `O`: obsolete, merged into another entry.
  Obsolete,
  /// `S`: secondary identifier of another entry.
  Secondary,
}

impl Status {
  pub fn code(self) -> &'static str {
    match self {
      Status::Checked   => "C",
      Status::Deleted   => "D",
      Status::Unchecked => "E",
      Status::Obsolete  => "O",
      Status::Secondary => "S",
    }
  }

  pub fn is_published(self) -> bool { matches!(self, Status::Checked) }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "C" => Ok(Status::Checked),
      "D" => Ok(Status::Deleted),
      "E" => Ok(Status::Unchecked),
      "O" => Ok(Status::Obsolete),
      "S" => Ok(Status::Secondary),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

// ─── Compound ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
  pub id:              i64,
  pub name:            Option<String>,
  pub source:          Option<String>,
  pub chebi_accession: Option<String>,
  /// Raw status code as stored; see [`Compound::status`].
  pub status:          Option<String>,
  pub definition:      Option<String>,
  pub star:            Option<i64>,
  pub modified_on:     Option<NaiveDate>,
  pub created_by:      Option<String>,
  pub parent_id:       Option<i64>,
}

impl Compound {
  /// The decoded status, or `None` when absent or not in the closed set.
  pub fn status(&self) -> Option<Status> {
    self.status.as_deref().and_then(|s| s.parse().ok())
  }

  /// Curator-approved and not merged into another entry.
  pub fn is_publishable(&self) -> bool {
    self.status().is_some_and(Status::is_published) && self.parent_id.is_none()
  }
}

/// A secondary / merged compound pointing at its publishable parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
  pub compound_id: i64,
  pub parent_id:   i64,
}

// ─── Dependent records ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalData {
  pub id:            i64,
  pub compound_id:   i64,
  pub chemical_data: Option<String>,
  pub source:        Option<String>,
  /// `CHARGE`, `FORMULA`, `MASS` or `MONOISOTOPIC MASS`.
  pub kind:          Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
  pub id:          i64,
  pub compound_id: i64,
  pub name:        Option<String>,
  pub kind:        Option<String>,
  pub source:      Option<String>,
  pub adapted:     Option<String>,
  pub language:    Option<String>,
}

/// An InChI identifier attached to a compound: a standard InChI key from the
/// structure table or a raw InChI string from the InChI table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InchiLink {
  pub compound_id: i64,
  pub key:         String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  pub id:     i64,
  pub name:   Option<String>,
  pub prefix: Option<String>,
}

/// A database accession or literature reference tagged with one source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xref {
  pub compound_id: i64,
  pub accession:   String,
}

/// A directed edge between two compounds, `init_id` → `final_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
  pub id:            i64,
  pub init_id:       i64,
  pub final_id:      i64,
  pub status:        Option<String>,
  /// The relation's type code as it appears in the relation file.
  pub kind:          Option<String>,
  /// The matching `chebi_relation_type.code`, `None` when the lookup fails.
  pub resolved_code: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compound(status: Option<&str>, parent_id: Option<i64>) -> Compound {
    Compound {
      id: 1,
      name: None,
      source: None,
      chebi_accession: Some("CHEBI:1".into()),
      status: status.map(str::to_owned),
      definition: None,
      star: Some(3),
      modified_on: None,
      created_by: None,
      parent_id,
    }
  }

  #[test]
  fn only_checked_roots_are_publishable() {
    assert!(compound(Some("C"), None).is_publishable());
    assert!(!compound(Some("C"), Some(2)).is_publishable());
    assert!(!compound(Some("S"), None).is_publishable());
    assert!(!compound(Some("X"), None).is_publishable());
    assert!(!compound(None, None).is_publishable());
  }

  #[test]
  fn status_codes_round_trip() {
    for code in ["C", "D", "E", "O", "S"] {
      assert_eq!(code.parse::<Status>().unwrap().code(), code);
    }
    assert!("Z".parse::<Status>().is_err());
  }
}
