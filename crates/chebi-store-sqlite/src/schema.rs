//! SQL schema for the ChEBI SQLite store.
//!
//! There are no migrations: every ingestion run drops the pipeline tables and
//! creates them again. Column names, order and types mirror
//! [`Table::columns`](chebi_core::Table::columns); the store tests compare the
//! two.

/// Connection-level settings, applied once when a store is opened.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Drops every pipeline table, dependents before `chebi_compound`.
pub const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS chebi_inchi;
DROP TABLE IF EXISTS chebi_reference;
DROP TABLE IF EXISTS chebi_relation;
DROP TABLE IF EXISTS chebi_name;
DROP TABLE IF EXISTS chebi_database_accession;
DROP TABLE IF EXISTS chebi_comment;
DROP TABLE IF EXISTS chebi_chemical_data;
DROP TABLE IF EXISTS chebi_structure;
DROP TABLE IF EXISTS chebi_compound;
DROP TABLE IF EXISTS chebi_relation_type;
DROP TABLE IF EXISTS chebi_source;
DROP TABLE IF EXISTS chebi_status;
";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chebi_status (
    code        TEXT PRIMARY KEY,
    description TEXT
);

CREATE TABLE IF NOT EXISTS chebi_source (
    id          INTEGER PRIMARY KEY,
    name        TEXT,
    prefix      TEXT,
    url         TEXT,
    description TEXT
);

CREATE TABLE IF NOT EXISTS chebi_relation_type (
    code        TEXT PRIMARY KEY,
    description TEXT
);

-- parent_id is a self reference without a constraint: a parent may arrive
-- in a later chunk than its children.
CREATE TABLE IF NOT EXISTS chebi_compound (
    id              INTEGER PRIMARY KEY,
    name            TEXT,
    source          TEXT,
    chebi_accession TEXT,
    status          TEXT,            -- 'C' | 'D' | 'E' | 'O' | 'S'
    definition      TEXT,
    star            INTEGER,
    modified_on     TEXT,            -- YYYY-MM-DD
    release_date    TEXT,            -- YYYY-MM-DD
    created_by      TEXT,
    parent_id       INTEGER
);

CREATE TABLE IF NOT EXISTS chebi_structure (
    id                 INTEGER PRIMARY KEY,
    compound_id        INTEGER NOT NULL REFERENCES chebi_compound(id),
    structure          BLOB,
    type               TEXT,
    dimension          TEXT,
    autogen_structure  TEXT,
    default_structure  TEXT,
    standard_inchi     TEXT,
    standard_inchi_key TEXT
);

CREATE TABLE IF NOT EXISTS chebi_chemical_data (
    id            INTEGER PRIMARY KEY,
    compound_id   INTEGER NOT NULL REFERENCES chebi_compound(id),
    chemical_data TEXT,
    source        TEXT,
    type          TEXT
);

CREATE TABLE IF NOT EXISTS chebi_comment (
    id          INTEGER PRIMARY KEY,
    compound_id INTEGER NOT NULL REFERENCES chebi_compound(id),
    text        TEXT,
    created_on  TEXT,
    datatype    TEXT,
    datatype_id INTEGER
);

CREATE TABLE IF NOT EXISTS chebi_database_accession (
    id               INTEGER PRIMARY KEY,
    compound_id      INTEGER NOT NULL REFERENCES chebi_compound(id),
    accession_number TEXT,
    type             TEXT,
    source           TEXT,
    source_id        INTEGER
);

CREATE TABLE IF NOT EXISTS chebi_name (
    id          INTEGER PRIMARY KEY,
    compound_id INTEGER NOT NULL REFERENCES chebi_compound(id),
    name        TEXT,
    type        TEXT,
    source      TEXT,
    adapted     TEXT,
    language    TEXT
);

CREATE TABLE IF NOT EXISTS chebi_relation (
    id       INTEGER PRIMARY KEY,
    type     TEXT,
    status   TEXT,
    init_id  INTEGER NOT NULL REFERENCES chebi_compound(id),
    final_id INTEGER NOT NULL REFERENCES chebi_compound(id)
);

CREATE TABLE IF NOT EXISTS chebi_reference (
    id                INTEGER PRIMARY KEY,
    compound_id       INTEGER NOT NULL REFERENCES chebi_compound(id),
    reference_id      TEXT,
    reference_db_name TEXT,
    location_in_ref   TEXT,
    reference_name    TEXT,
    source_id         INTEGER
);

CREATE TABLE IF NOT EXISTS chebi_inchi (
    id          INTEGER PRIMARY KEY,
    compound_id INTEGER NOT NULL REFERENCES chebi_compound(id),
    inchi       TEXT
);

CREATE INDEX IF NOT EXISTS compound_status_idx     ON chebi_compound(status);
CREATE INDEX IF NOT EXISTS compound_parent_idx     ON chebi_compound(parent_id);
CREATE INDEX IF NOT EXISTS structure_compound_idx  ON chebi_structure(compound_id);
CREATE INDEX IF NOT EXISTS chemical_compound_idx   ON chebi_chemical_data(compound_id);
CREATE INDEX IF NOT EXISTS comment_compound_idx    ON chebi_comment(compound_id);
CREATE INDEX IF NOT EXISTS accession_compound_idx  ON chebi_database_accession(compound_id);
CREATE INDEX IF NOT EXISTS name_compound_idx       ON chebi_name(compound_id);
CREATE INDEX IF NOT EXISTS relation_init_idx       ON chebi_relation(init_id);
CREATE INDEX IF NOT EXISTS relation_final_idx      ON chebi_relation(final_id);
CREATE INDEX IF NOT EXISTS reference_compound_idx  ON chebi_reference(compound_id);
CREATE INDEX IF NOT EXISTS inchi_compound_idx      ON chebi_inchi(compound_id);
";

/// `WHERE` fragment selecting publishable compounds aliased as `alias`.
pub fn publishable(alias: &str) -> String {
  format!("{alias}.status = 'C' AND {alias}.parent_id IS NULL")
}
