//! Relational snapshot → Turtle documents.
//!
//! One document per entity grouping. Only publishable compounds, and rows
//! owned by them, produce type and literal triples; a compound merged into a
//! publishable parent appears once, as the subject of its `HAS_PARENT` edge.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use chebi_core::{PipelineConfig, config::DEFAULT_XREF_PREFIXES, store::ChebiStore};
use tracing::{debug, info, warn};

use crate::{
  Error, Result, archive,
  document::Document,
  namespaces::{self as ns, SENTINEL_LABEL, XREF_PREFIX},
};

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
  pub archive:           PathBuf,
  /// Triples per document name. Empty when an existing archive was reused.
  pub documents:         BTreeMap<String, usize>,
  /// Relations whose type is missing from the relation type table.
  pub skipped_relations: u64,
  pub warnings:          Vec<String>,
  /// `true` when the archive already existed and was kept as is.
  pub reused:            bool,
}

pub struct TripleBuilder<'a, S> {
  store:         &'a S,
  xref_prefixes: Vec<String>,
}

impl<'a, S: ChebiStore> TripleBuilder<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self {
      store,
      xref_prefixes: DEFAULT_XREF_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
    }
  }

  pub fn from_config(store: &'a S, config: &PipelineConfig) -> Self {
    Self::new(store).xref_prefixes(config.xref_prefixes.clone())
  }

  /// Source prefixes that get a cross-reference document.
  pub fn xref_prefixes(mut self, prefixes: Vec<String>) -> Self {
    self.xref_prefixes = prefixes;
    self
  }

  /// Write every document into `export_dir`, zip them into
  /// `<export_dir>.zip` and remove the directory.
  pub async fn build(&self, export_dir: &Path, archive: &Path) -> Result<BuildReport> {
    if export_dir.exists() {
      std::fs::remove_dir_all(export_dir).map_err(|e| Error::io(export_dir, e))?;
    }
    std::fs::create_dir_all(export_dir).map_err(|e| Error::io(export_dir, e))?;

    let mut report = BuildReport { archive: archive.to_owned(), ..BuildReport::default() };

    let (relations, skipped) = self.relation_document().await?;
    report.skipped_relations = skipped;
    let (xrefs, warnings) = self.xref_documents().await?;
    report.warnings = warnings;

    let mut documents = vec![
      self.compound_document().await?,
      self.inchi_document().await?,
      self.name_document().await?,
      relations,
    ];
    documents.extend(xrefs);

    for doc in documents {
      let name = doc.name().to_owned();
      let triples = doc.write(export_dir)?;
      info!(document = %name, triples, "document written");
      report.documents.insert(name, triples);
    }

    archive::bundle(export_dir, archive)?;
    info!(archive = %archive.display(), documents = report.documents.len(), "archive created");
    Ok(report)
  }

  // ─── Documents ─────────────────────────────────────────────────────────────

  /// `compound.ttl`: publishable compounds plus parent edges.
  pub async fn compound_document(&self) -> Result<Document> {
    let mut doc = Document::new("compound.ttl");

    for compound in self.store.publishable_compounds().await.map_err(Error::store)? {
      let subject = ns::compound(compound.id);
      doc.add_type(&subject, "Compound");
      doc.add_type(&subject, SENTINEL_LABEL);

      let literals = [
        ("name", &compound.name),
        ("source", &compound.source),
        ("status", &compound.status),
        ("definition", &compound.definition),
      ];
      for (predicate, value) in literals {
        if let Some(value) = value {
          doc.add_string(&subject, predicate, value);
        }
      }
      doc.add_integer(&subject, "star", compound.star.unwrap_or(0));
    }

    for link in self.store.parent_links().await.map_err(Error::store)? {
      doc.add_link(&ns::compound(link.compound_id), "HAS_PARENT", &ns::compound(link.parent_id));
    }

    Ok(doc)
  }

  /// `inchi.ttl`: InChI nodes and `SAME_AS` edges.
  pub async fn inchi_document(&self) -> Result<Document> {
    let mut doc = Document::new("inchi.ttl");

    for link in self.store.inchi_links().await.map_err(Error::store)? {
      let inchi = ns::inchi(&link.key);
      doc.add_type(&inchi, "InChI");
      doc.add_type(&inchi, SENTINEL_LABEL);
      doc.add_link(&ns::compound(link.compound_id), "SAME_AS", &inchi);
    }

    Ok(doc)
  }

  /// `name.ttl`: one node per name row.
  pub async fn name_document(&self) -> Result<Document> {
    let mut doc = Document::new("name.ttl");

    for name in self.store.names().await.map_err(Error::store)? {
      let subject = ns::name(name.id);
      if let Some(kind) = name.kind.as_deref().filter(|k| !k.trim().is_empty()) {
        doc.add_type(&subject, &ns::name_class(kind));
      }
      doc.add_type(&subject, "OtherName");
      doc.add_type(&subject, SENTINEL_LABEL);

      let literals = [
        ("adapted", &name.adapted),
        ("language", &name.language),
        ("name", &name.name),
        ("source", &name.source),
      ];
      for (predicate, value) in literals {
        if let Some(value) = value {
          doc.add_string(&subject, predicate, value);
        }
      }
      doc.add_link(&ns::compound(name.compound_id), "HAS_NAME", &subject);
    }

    Ok(doc)
  }

  /// One `<prefix>_xref.ttl` per allow-listed source with rows. Returns the
  /// documents and the warnings for prefixes that were passed over.
  pub async fn xref_documents(&self) -> Result<(Vec<Document>, Vec<String>)> {
    let sources = self.store.sources().await.map_err(Error::store)?;
    let mut documents = Vec::new();
    let mut warnings = Vec::new();

    let mut seen = Vec::new();
    for prefix in &self.xref_prefixes {
      let prefix = prefix.trim().to_lowercase();
      if seen.contains(&prefix) {
        continue;
      }
      seen.push(prefix.clone());

      let Some(source) = sources
        .iter()
        .find(|s| s.prefix.as_deref().is_some_and(|p| p.trim().eq_ignore_ascii_case(&prefix)))
      else {
        debug!(prefix = %prefix, "no source with this prefix");
        continue;
      };
      let Some(namespace) = ns::xref_namespace(&prefix) else {
        let warning = format!("source prefix {prefix} has no known namespace, skipping");
        warn!("{warning}");
        warnings.push(warning);
        continue;
      };

      let class = ns::xref_class(&prefix);
      let mut doc = Document::new(ns::xref_document(&prefix)).with_prefix(XREF_PREFIX, namespace);
      for xref in self.store.xrefs(source).await.map_err(Error::store)? {
        let object = ns::xref(namespace, &xref.accession);
        doc.add_type(&object, &class);
        doc.add_type(&object, SENTINEL_LABEL);
        doc.add_link(&ns::compound(xref.compound_id), "HAS_XREF", &object);
      }

      if doc.is_empty() {
        debug!(prefix = %prefix, "no cross-references, no document");
      } else {
        documents.push(doc);
      }
    }

    Ok((documents, warnings))
  }

  /// `relation.ttl`: `init → final` edges typed by the upper-cased relation
  /// code. Returns the document and the number of relations skipped for an
  /// unknown type.
  pub async fn relation_document(&self) -> Result<(Document, u64)> {
    let mut doc = Document::new("relation.ttl");
    let mut skipped = 0;

    for relation in self.store.relations().await.map_err(Error::store)? {
      match relation.resolved_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => doc.add_link(
          &ns::compound(relation.init_id),
          &code.to_uppercase().replace(char::is_whitespace, "_"),
          &ns::compound(relation.final_id),
        ),
        None => {
          debug!(relation = relation.id, kind = ?relation.kind, "unknown relation type");
          skipped += 1;
        }
      }
    }

    if skipped > 0 {
      warn!(skipped, "relations with an unknown type were skipped");
    }
    Ok((doc, skipped))
  }
}
