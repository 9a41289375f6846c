//! Core types and trait definitions for the ChEBI pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store backend, the ingestion stage, the triple builder and the graph
//! loader all depend on it.

pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod table;

pub use config::{GraphConfig, PipelineConfig};
pub use error::{Error, Result};
pub use table::{Cell, Row, Table};

/// Class / label carried by every typed node the pipeline exports.
pub const SENTINEL_LABEL: &str = "DbChEBI";

/// Namespace of compound IRIs. Nodes under it are pipeline-owned even when
/// they carry no type, e.g. merged children that only appear as the subject
/// of a parent link.
pub const CHEBI_NS: &str = "http://purl.obolibrary.org/obo/CHEBI_";
