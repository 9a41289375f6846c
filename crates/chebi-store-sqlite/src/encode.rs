//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` text. Everything else maps onto SQLite's
//! native integer and text storage classes.

use chebi_core::{Cell, model::Compound};
use chrono::NaiveDate;
use rusqlite::types::Value;

use crate::{Error, Result};

// ─── Cell ────────────────────────────────────────────────────────────────────

pub fn encode_cell(cell: &Cell) -> Value {
  match cell {
    Cell::Null       => Value::Null,
    Cell::Integer(v) => Value::Integer(*v),
    Cell::Text(s)    => Value::Text(s.clone()),
    Cell::Date(d)    => Value::Text(encode_date(*d)),
  }
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawCompound::from_row`].
pub const COMPOUND_COLUMNS: &str = "c.id, c.name, c.source, c.chebi_accession, c.status, \
                                    c.definition, c.star, c.modified_on, c.created_by, c.parent_id";

/// Values read directly from a `chebi_compound` row.
pub struct RawCompound {
  pub id:              i64,
  pub name:            Option<String>,
  pub source:          Option<String>,
  pub chebi_accession: Option<String>,
  pub status:          Option<String>,
  pub definition:      Option<String>,
  pub star:            Option<i64>,
  pub modified_on:     Option<String>,
  pub created_by:      Option<String>,
  pub parent_id:       Option<i64>,
}

impl RawCompound {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      source:          row.get(2)?,
      chebi_accession: row.get(3)?,
      status:          row.get(4)?,
      definition:      row.get(5)?,
      star:            row.get(6)?,
      modified_on:     row.get(7)?,
      created_by:      row.get(8)?,
      parent_id:       row.get(9)?,
    })
  }

  pub fn into_compound(self) -> Result<Compound> {
    Ok(Compound {
      id:              self.id,
      name:            self.name,
      source:          self.source,
      chebi_accession: self.chebi_accession,
      status:          self.status,
      definition:      self.definition,
      star:            self.star,
      modified_on:     self.modified_on.as_deref().map(decode_date).transpose()?,
      created_by:      self.created_by,
      parent_id:       self.parent_id,
    })
  }
}
