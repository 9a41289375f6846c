//! Per-table record transforms: header mapping, typed value parsing and the
//! referential filter.

use std::collections::HashSet;

use chebi_core::{
  Cell, Row, Table,
  table::{Column, ColumnKind},
};
use chrono::{NaiveDate, NaiveDateTime};

/// Values the flat files use for a missing field.
const NULL_MARKERS: [&str; 8] = ["", "null", "NULL", "Null", "None", "NaN", "nan", "N/A"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%b-%y", "%d-%b-%Y"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%d-%b-%y %H.%M.%S%.f"];

// ─── Values ──────────────────────────────────────────────────────────────────

pub fn is_null(value: &str) -> bool { NULL_MARKERS.contains(&value) }

/// Parse a date in any of the forms the flat files use.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
    .or_else(|| {
      DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .map(|dt| dt.date())
    })
}

fn parse_cell(column: &Column, raw: &str) -> Result<Cell, String> {
  let value = raw.trim();
  if is_null(value) {
    return Ok(Cell::Null);
  }

  match column.kind {
    ColumnKind::Integer => value
      .parse::<i64>()
      .map(Cell::Integer)
      .map_err(|_| format!("{}: invalid integer {value:?}", column.name)),
    ColumnKind::Text => Ok(Cell::Text(value.to_owned())),
    ColumnKind::Date => parse_date(value)
      .map(Cell::Date)
      .ok_or_else(|| format!("{}: invalid date {value:?}", column.name)),
    ColumnKind::Blob => Ok(Cell::Null),
  }
}

// ─── Header mapping ──────────────────────────────────────────────────────────

/// Maps the records of one file onto the columns of its table.
#[derive(Debug)]
pub struct RowMapper {
  table:   Table,
  /// For each table column, the index of the file field that feeds it.
  sources: Vec<Option<usize>>,
  width:   usize,
  unknown: Vec<String>,
  next_id: i64,
}

impl RowMapper {
  /// Build a mapper from a file header. Fails when the header shares no
  /// column with the table.
  pub fn new(table: Table, header: &[String]) -> Result<Self, String> {
    let columns = table.columns();
    let mut sources = vec![None; columns.len()];
    let mut unknown = Vec::new();

    for (pos, raw) in header.iter().enumerate() {
      let lower = raw.trim().to_lowercase();
      if table.skipped_source_columns().contains(&lower.as_str()) {
        continue;
      }
      let name = table
        .column_renames()
        .iter()
        .find(|(from, _)| *from == lower)
        .map_or(lower.as_str(), |(_, to)| *to);

      let target = table
        .column_index(name)
        .filter(|_| !(table.synthesizes_id() && name == "id"));
      match target {
        Some(idx) => sources[idx] = Some(pos),
        None => unknown.push(lower),
      }
    }

    if sources.iter().all(Option::is_none) {
      return Err(format!("header shares no columns with {table}: {}", header.join(", ")));
    }

    Ok(Self { table, sources, width: header.len(), unknown, next_id: 1 })
  }

  /// Lower-cased file columns the table does not know.
  pub fn unknown_columns(&self) -> &[String] { &self.unknown }

  /// Convert one record. Synthesized ids count every record, including the
  /// ones that turn out malformed, so ids depend only on file position.
  pub fn map(&mut self, fields: &[String]) -> Result<Row, String> {
    let synthesized = self.next_id;
    self.next_id += 1;

    if fields.len() != self.width {
      return Err(format!("expected {} fields, found {}", self.width, fields.len()));
    }

    let columns = self.table.columns();
    let mut row = Vec::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
      let cell = if idx == 0 && self.table.synthesizes_id() {
        Cell::Integer(synthesized)
      } else {
        match self.sources[idx] {
          Some(pos) => parse_cell(column, &fields[pos])?,
          None => Cell::Null,
        }
      };
      row.push(cell);
    }

    if row[0].is_null() {
      return Err(format!("{}: missing primary key", columns[0].name));
    }
    Ok(row)
  }
}

// ─── Referential filter ──────────────────────────────────────────────────────

/// Keeps rows whose compound references all resolve to an ingested compound.
pub struct ReferenceFilter<'a> {
  columns: Vec<usize>,
  ids:     &'a HashSet<i64>,
}

impl<'a> ReferenceFilter<'a> {
  pub fn new(table: Table, ids: &'a HashSet<i64>) -> Self {
    Self { columns: table.compound_references(), ids }
  }

  pub fn is_active(&self) -> bool { !self.columns.is_empty() }

  pub fn keeps(&self, row: &Row) -> bool {
    self.columns.iter().all(|&idx| match row.get(idx) {
      Some(Cell::Integer(id)) => self.ids.contains(id),
      _ => false,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header(cols: &[&str]) -> Vec<String> { cols.iter().map(|c| (*c).to_owned()).collect() }

  fn fields(vals: &[&str]) -> Vec<String> { vals.iter().map(|v| (*v).to_owned()).collect() }

  #[test]
  fn dates_in_every_known_form() {
    let d = NaiveDate::from_ymd_opt(2008, 3, 12).unwrap();
    assert_eq!(parse_date("2008-03-12"), Some(d));
    assert_eq!(parse_date("12-MAR-08"), Some(d));
    assert_eq!(parse_date("12-Mar-2008"), Some(d));
    assert_eq!(parse_date("2008-03-12 10:41:00"), Some(d));
    assert_eq!(parse_date("2008-03-12T10:41:00.5"), Some(d));
    assert_eq!(parse_date("yesterday"), None);
  }

  #[test]
  fn headers_are_case_insensitive_and_missing_columns_are_null() {
    let mut mapper = RowMapper::new(Table::Compound, &header(&["ID", "NAME", "STATUS", "STARS", "EXTRA"])).unwrap();
    assert_eq!(mapper.unknown_columns(), ["extra"]);

    let row = mapper.map(&fields(&["16236", " ethanol ", "C", "3", "x"])).unwrap();
    assert_eq!(row[0], Cell::Integer(16236));
    assert_eq!(row[1], Cell::Text("ethanol".into()));
    assert_eq!(row[Table::Compound.column_index("star").unwrap()], Cell::Integer(3));
    assert!(row[Table::Compound.column_index("parent_id").unwrap()].is_null());
  }

  #[test]
  fn null_markers_become_null() {
    let mut mapper = RowMapper::new(Table::Compound, &header(&["ID", "PARENT_ID", "DEFINITION"])).unwrap();
    let row = mapper.map(&fields(&["1", "null", ""])).unwrap();
    assert!(row[Table::Compound.column_index("parent_id").unwrap()].is_null());
    assert!(row[Table::Compound.column_index("definition").unwrap()].is_null());
  }

  #[test]
  fn inchi_ids_are_synthesized_from_file_position() {
    let mut mapper = RowMapper::new(Table::Inchi, &header(&["CHEBI_ID", "InChI"])).unwrap();
    let first = mapper.map(&fields(&["10", "InChI=1S/A"])).unwrap();
    assert!(mapper.map(&fields(&["oops"])).is_err());
    let third = mapper.map(&fields(&["12", "InChI=1S/B"])).unwrap();

    assert_eq!(first, vec![Cell::Integer(1), Cell::Integer(10), Cell::Text("InChI=1S/A".into())]);
    assert_eq!(third[0], Cell::Integer(3));
  }

  #[test]
  fn structure_payload_is_never_read() {
    let mut mapper =
      RowMapper::new(Table::Structure, &header(&["ID", "COMPOUND_ID", "STRUCTURE", "TYPE"])).unwrap();
    let row = mapper.map(&fields(&["1", "2", "<molfile>", "mol"])).unwrap();
    assert!(row[2].is_null());
    assert!(mapper.unknown_columns().is_empty());
  }

  #[test]
  fn malformed_rows_report_a_reason() {
    let mut mapper = RowMapper::new(Table::Compound, &header(&["ID", "MODIFIED_ON"])).unwrap();
    assert!(mapper.map(&fields(&["abc", "2008-03-12"])).unwrap_err().contains("invalid integer"));
    assert!(mapper.map(&fields(&["1", "soon"])).unwrap_err().contains("invalid date"));
    assert!(mapper.map(&fields(&["", "2008-03-12"])).unwrap_err().contains("primary key"));
    assert!(RowMapper::new(Table::Compound, &header(&["FOO", "BAR"])).is_err());
  }

  #[test]
  fn filter_requires_every_reference() {
    let ids: HashSet<i64> = [1, 2].into_iter().collect();
    let filter = ReferenceFilter::new(Table::Relation, &ids);
    let rel = |init, fin| vec![Cell::Integer(1), Cell::Null, Cell::Null, Cell::Integer(init), Cell::Integer(fin)];
    assert!(filter.keeps(&rel(1, 2)));
    assert!(!filter.keeps(&rel(1, 3)));
    assert!(!filter.keeps(&rel(3, 2)));
    assert!(!ReferenceFilter::new(Table::Source, &ids).is_active());
  }
}
