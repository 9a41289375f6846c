//! [`SqliteStore`] — the SQLite implementation of [`ChebiStore`].

use std::path::Path;

use chebi_core::{
  Row, Table,
  model::{ChemicalData, Compound, InchiLink, Name, ParentLink, Relation, Source, Xref},
  store::{ChebiStore, CompoundField, CompoundQuery},
};
use rusqlite::types::Value;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{COMPOUND_COLUMNS, RawCompound, encode_cell},
  schema::{DROP_SCHEMA, PRAGMAS, SCHEMA, publishable},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ChEBI relational snapshot backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and make sure the schema exists.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by the tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Column names of `table` as SQLite reports them.
  /// `(name, declared type)` of every column of `table`, in DDL order.
  pub async fn table_columns(&self, table: Table) -> Result<Vec<(String, String)>> {
    let sql = format!("SELECT name, type FROM pragma_table_info('{}')", table.name());
    let cols = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(cols)
  }

  /// Ids of every loaded compound, ascending.
  pub async fn compound_ids(&self) -> Result<Vec<i64>> {
    let ids = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id FROM chebi_compound ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  /// Run a compound `SELECT` and decode the rows.
  async fn query_compounds(&self, sql: String, params: Vec<Value>) -> Result<Vec<Compound>> {
    let raws: Vec<RawCompound> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawCompound::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompound::into_compound).collect()
  }
}

/// Translate one filter into a SQL predicate and its bound value.
fn filter_predicate(field: CompoundField, value: &str) -> Result<(&'static str, Value)> {
  let int = |name: &'static str| {
    value
      .trim()
      .parse::<i64>()
      .map(Value::Integer)
      .map_err(|_| Error::InvalidFilter { field: name, value: value.to_owned() })
  };

  Ok(match field {
    CompoundField::Id             => ("c.id = ?", int("id")?),
    CompoundField::Name           => ("c.name LIKE ?", Value::Text(format!("%{value}%"))),
    CompoundField::Source         => ("c.source = ?", Value::Text(value.to_owned())),
    CompoundField::ChebiAccession => ("c.chebi_accession = ?", Value::Text(value.to_owned())),
    CompoundField::Status         => ("c.status = ?", Value::Text(value.to_owned())),
    CompoundField::Definition     => ("c.definition LIKE ?", Value::Text(format!("%{value}%"))),
    CompoundField::MinStar        => ("c.star >= ?", int("min_star")?),
    CompoundField::ParentId       => ("c.parent_id = ?", int("parent_id")?),
  })
}

// ─── ChebiStore impl ─────────────────────────────────────────────────────────

impl ChebiStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn recreate_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DROP_SCHEMA)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!("schema recreated");
    Ok(())
  }

  async fn append_rows(&self, table: Table, rows: Vec<Row>) -> Result<usize> {
    let columns = table.columns();
    if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
      return Err(Error::Schema(format!(
        "{table}: row has {} values, table has {} columns",
        bad.len(),
        columns.len()
      )));
    }

    let names = columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ");
    let marks = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO {} ({names}) VALUES ({marks})", table.name());

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(&sql)?;
          for row in &rows {
            stmt.execute(rusqlite::params_from_iter(row.iter().map(encode_cell)))?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    Ok(inserted)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn count_rows(&self, table: Table) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(n as u64)
  }

  async fn publishable_compounds(&self) -> Result<Vec<Compound>> {
    let sql = format!(
      "SELECT {COMPOUND_COLUMNS} FROM chebi_compound c WHERE {} ORDER BY c.id",
      publishable("c")
    );
    self.query_compounds(sql, Vec::new()).await
  }

  async fn parent_links(&self) -> Result<Vec<ParentLink>> {
    let sql = format!(
      "SELECT c.id, c.parent_id
       FROM chebi_compound c
       JOIN chebi_compound p ON p.id = c.parent_id
       WHERE {}
       ORDER BY c.id",
      publishable("p")
    );

    let links = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok(ParentLink { compound_id: row.get(0)?, parent_id: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(links)
  }

  async fn inchi_links(&self) -> Result<Vec<InchiLink>> {
    let sql = format!(
      "SELECT s.compound_id, s.standard_inchi_key
       FROM chebi_structure s
       JOIN chebi_compound c ON c.id = s.compound_id
       WHERE {pc} AND s.standard_inchi_key IS NOT NULL AND s.standard_inchi_key != ''
       UNION
       SELECT i.compound_id, i.inchi
       FROM chebi_inchi i
       JOIN chebi_compound c ON c.id = i.compound_id
       WHERE {pc} AND i.inchi IS NOT NULL AND i.inchi != ''
       ORDER BY 1, 2",
      pc = publishable("c")
    );

    let links = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok(InchiLink { compound_id: row.get(0)?, key: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(links)
  }

  async fn names(&self) -> Result<Vec<Name>> {
    let sql = format!(
      "SELECT n.id, n.compound_id, n.name, n.type, n.source, n.adapted, n.language
       FROM chebi_name n
       JOIN chebi_compound c ON c.id = n.compound_id
       WHERE {}
       ORDER BY n.id",
      publishable("c")
    );

    let names = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Name {
              id:          row.get(0)?,
              compound_id: row.get(1)?,
              name:        row.get(2)?,
              kind:        row.get(3)?,
              source:      row.get(4)?,
              adapted:     row.get(5)?,
              language:    row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(names)
  }

  async fn sources(&self) -> Result<Vec<Source>> {
    let sources = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name, prefix FROM chebi_source ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Source { id: row.get(0)?, name: row.get(1)?, prefix: row.get(2)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(sources)
  }

  async fn xrefs(&self, source: &Source) -> Result<Vec<Xref>> {
    // Rows are tagged by source_id when the file carries it, otherwise by the
    // free-text source column matched against the source's name or prefix.
    let sql = format!(
      "SELECT d.compound_id, d.accession_number
       FROM chebi_database_accession d
       JOIN chebi_compound c ON c.id = d.compound_id
       WHERE {pc}
         AND d.accession_number IS NOT NULL AND d.accession_number != ''
         AND (d.source_id = ?1
              OR (d.source_id IS NULL
                  AND (lower(d.source) = lower(?2) OR lower(d.source) = lower(?3))))
       UNION
       SELECT r.compound_id, r.reference_id
       FROM chebi_reference r
       JOIN chebi_compound c ON c.id = r.compound_id
       WHERE {pc}
         AND r.reference_id IS NOT NULL AND r.reference_id != ''
         AND (r.source_id = ?1
              OR (r.source_id IS NULL
                  AND (lower(r.reference_db_name) = lower(?2)
                       OR lower(r.reference_db_name) = lower(?3))))
       ORDER BY 1, 2",
      pc = publishable("c")
    );
    let id = source.id;
    let name = source.name.clone();
    let prefix = source.prefix.clone();

    let xrefs = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id, name, prefix], |row| {
            Ok(Xref { compound_id: row.get(0)?, accession: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(xrefs)
  }

  async fn relations(&self) -> Result<Vec<Relation>> {
    let sql = format!(
      "SELECT r.id, r.init_id, r.final_id, r.status, r.type, rt.code
       FROM chebi_relation r
       JOIN chebi_compound a ON a.id = r.init_id
       JOIN chebi_compound b ON b.id = r.final_id
       LEFT JOIN chebi_relation_type rt ON lower(rt.code) = lower(r.type)
       WHERE {} AND {}
       ORDER BY r.id",
      publishable("a"),
      publishable("b")
    );

    let relations = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Relation {
              id:            row.get(0)?,
              init_id:       row.get(1)?,
              final_id:      row.get(2)?,
              status:        row.get(3)?,
              kind:          row.get(4)?,
              resolved_code: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(relations)
  }

  async fn chemical_data(&self, compound_id: i64) -> Result<Vec<ChemicalData>> {
    let data = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, compound_id, chemical_data, source, type
           FROM chebi_chemical_data
           WHERE compound_id = ?1
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![compound_id], |row| {
            Ok(ChemicalData {
              id:            row.get(0)?,
              compound_id:   row.get(1)?,
              chemical_data: row.get(2)?,
              source:        row.get(3)?,
              kind:          row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(data)
  }

  async fn search_compounds(&self, query: &CompoundQuery) -> Result<Vec<Compound>> {
    let mut conds: Vec<&'static str> = Vec::with_capacity(query.filters.len());
    let mut params: Vec<Value> = Vec::with_capacity(query.filters.len() + 2);
    for (field, value) in &query.filters {
      let (cond, param) = filter_predicate(*field, value)?;
      conds.push(cond);
      params.push(param);
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    params.push(Value::Integer(query.limit.unwrap_or(100) as i64));
    params.push(Value::Integer(query.offset.unwrap_or(0) as i64));

    let sql = format!(
      "SELECT {COMPOUND_COLUMNS} FROM chebi_compound c {where_clause} ORDER BY c.id LIMIT ? OFFSET ?"
    );
    self.query_compounds(sql, params).await
  }
}
