//! Builder tests over a small in-memory snapshot.

use std::{collections::BTreeSet, io::Read, path::Path};

use chebi_core::{Cell, PipelineConfig, Table, store::ChebiStore};
use chebi_store_sqlite::SqliteStore;

use crate::{
  TripleBuilder, build_triples,
  document::{Datatype, Document, Object, Statement},
  namespaces::{self as ns, SENTINEL_LABEL},
};

fn t(s: &str) -> Cell { Cell::Text(s.to_owned()) }

fn i(v: i64) -> Cell { Cell::Integer(v) }

fn compound(id: i64, status: &str, parent_id: Option<i64>, star: Option<i64>) -> Vec<Cell> {
  vec![
    i(id),
    t(&format!("compound {id}")),
    t("ChEBI"),
    t(&format!("CHEBI:{id}")),
    t(status),
    Cell::Null,
    star.map_or(Cell::Null, i),
    Cell::Null,
    Cell::Null,
    Cell::Null,
    parent_id.map_or(Cell::Null, i),
  ]
}

/// Compounds 1–3 are publishable, 4 is merged into 1, 5 is deleted.
async fn seeded() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");

  let rows = [
    (Table::Source, vec![
      vec![i(1), t("ChEMBL"), t("chembl"), Cell::Null, Cell::Null],
      vec![i(2), t("KEGG COMPOUND"), t("kegg.compound"), Cell::Null, Cell::Null],
      vec![i(3), t("Rhea"), t("rhea"), Cell::Null, Cell::Null],
    ]),
    (Table::RelationType, vec![
      vec![t("has_functional_parent"), t("has functional parent")],
      vec![t("is_a"), t("is a")],
    ]),
    (Table::Compound, vec![
      compound(1, "C", None, Some(3)),
      compound(2, "C", None, Some(2)),
      compound(3, "C", None, None),
      compound(4, "C", Some(1), Some(3)),
      compound(5, "D", None, Some(3)),
    ]),
    (Table::Structure, vec![
      vec![i(1), i(1), Cell::Null, t("mol"), t("2D"), t("N"), t("Y"), Cell::Null, t("LFQSCWFLJHTTHZ-UHFFFAOYSA-N")],
      vec![i(2), i(5), Cell::Null, t("mol"), t("2D"), t("N"), t("Y"), Cell::Null, t("AAAAAAAAAAAAAA-UHFFFAOYSA-N")],
    ]),
    (Table::DatabaseAccession, vec![
      vec![i(1), i(1), t("CHEMBL545"), t("MANUAL_X_REF"), t("ChEMBL"), i(1)],
      vec![i(2), i(4), t("CHEMBL17"), t("MANUAL_X_REF"), t("ChEMBL"), i(1)],
      vec![i(3), i(3), t("C00001"), t("KEGG COMPOUND accession"), t("KEGG COMPOUND"), i(2)],
    ]),
    (Table::Name, vec![
      vec![i(1), i(1), t("ethyl alcohol"), t("IUPAC NAME"), t("IUPAC"), t("F"), t("en")],
      vec![i(2), i(4), t("merged"), t("SYNONYM"), t("ChEBI"), t("F"), t("en")],
      vec![i(3), i(5), t("deleted"), t("SYNONYM"), t("ChEBI"), t("F"), t("en")],
    ]),
    (Table::Relation, vec![
      vec![i(1), t("has_functional_parent"), t("C"), i(1), i(2)],
      vec![i(2), t("unknown_type"), t("C"), i(2), i(3)],
      vec![i(3), t("is_a"), t("C"), i(1), i(5)],
    ]),
    (Table::Inchi, vec![vec![i(1), i(2), t("InChI=1S/C2H4O2")]]),
  ];
  for (table, rows) in rows {
    s.append_rows(table, rows).await.expect("seed");
  }
  s
}

async fn all_documents(s: &SqliteStore) -> Vec<Document> {
  let builder = TripleBuilder::new(s).xref_prefixes(vec!["chembl".into(), "kegg.compound".into(), "go".into(), "rhea".into()]);
  let mut docs = vec![
    builder.compound_document().await.unwrap(),
    builder.inchi_document().await.unwrap(),
    builder.name_document().await.unwrap(),
    builder.relation_document().await.unwrap().0,
  ];
  docs.extend(builder.xref_documents().await.unwrap().0);
  docs
}

fn link(subject: String, predicate: &str, object: String) -> Statement {
  Statement { subject, predicate: ns::rel(predicate), object: Object::Iri(object) }
}

fn mentions(doc: &Document, iri: &str) -> bool {
  doc
    .statements()
    .iter()
    .any(|s| s.subject == iri || s.object == Object::Iri(iri.to_owned()))
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn relations_point_from_init_to_final() {
  let s = seeded().await;
  let (mut doc, skipped) = TripleBuilder::new(&s).relation_document().await.unwrap();
  doc.normalize();

  assert_eq!(doc.statements(), [link(ns::compound(1), "HAS_FUNCTIONAL_PARENT", ns::compound(2))]);
  assert_eq!(skipped, 1);
}

#[tokio::test]
async fn merged_compounds_only_point_at_their_parent() {
  let s = seeded().await;
  let child = ns::compound(4);

  let about_child: Vec<Statement> = all_documents(&s)
    .await
    .iter()
    .flat_map(|d| d.statements().iter().filter(|st| st.subject == child).cloned())
    .collect();
  assert_eq!(about_child, [link(ns::compound(4), "HAS_PARENT", ns::compound(1))]);
}

#[tokio::test]
async fn unpublished_compounds_are_absent_everywhere() {
  let s = seeded().await;
  let deleted = ns::compound(5);
  for doc in all_documents(&s).await {
    assert!(!mentions(&doc, &deleted), "{} mentions compound 5", doc.name());
  }
}

#[tokio::test]
async fn compound_literals_and_default_star() {
  let s = seeded().await;
  let doc = TripleBuilder::new(&s).compound_document().await.unwrap();

  let star_of = |id: i64| {
    doc
      .statements()
      .iter()
      .find(|st| st.subject == ns::compound(id) && st.predicate == ns::rel("star"))
      .map(|st| st.object.clone())
  };
  assert_eq!(star_of(1), Some(Object::Literal { value: "3".into(), datatype: Datatype::Integer }));
  assert_eq!(star_of(3), Some(Object::Literal { value: "0".into(), datatype: Datatype::Integer }));

  let sentinel = Object::Iri(ns::node(SENTINEL_LABEL));
  let typed: BTreeSet<&str> = doc
    .statements()
    .iter()
    .filter(|st| st.object == sentinel)
    .map(|st| st.subject.as_str())
    .collect();
  assert_eq!(typed.len(), 3);
}

#[tokio::test]
async fn names_are_typed_by_kind() {
  let s = seeded().await;
  let doc = TripleBuilder::new(&s).name_document().await.unwrap();
  let name = ns::name(1);

  let types: BTreeSet<String> = doc
    .statements()
    .iter()
    .filter(|st| st.subject == name && st.predicate == oxrdf::vocab::rdf::TYPE.as_str())
    .filter_map(|st| match &st.object {
      Object::Iri(iri) => Some(iri.clone()),
      Object::Literal { .. } => None,
    })
    .collect();
  let expected: BTreeSet<String> =
    ["NameIupacName", "OtherName", SENTINEL_LABEL].iter().map(|c| ns::node(c)).collect();
  assert_eq!(types, expected);
  assert!(doc.statements().contains(&link(ns::compound(1), "HAS_NAME", name)));
}

#[tokio::test]
async fn inchi_keys_and_strings_are_linked() {
  let s = seeded().await;
  let doc = TripleBuilder::new(&s).inchi_document().await.unwrap();
  assert!(doc.statements().contains(&link(
    ns::compound(1),
    "SAME_AS",
    ns::inchi("LFQSCWFLJHTTHZ-UHFFFAOYSA-N")
  )));
  assert!(doc.statements().contains(&link(ns::compound(2), "SAME_AS", ns::inchi("InChI=1S/C2H4O2"))));
}

#[tokio::test]
async fn xref_documents_skip_unknown_namespaces_and_empty_sources() {
  let s = seeded().await;
  let builder = TripleBuilder::new(&s)
    .xref_prefixes(vec!["chembl".into(), "kegg.compound".into(), "go".into(), "rhea".into()]);
  let (docs, warnings) = builder.xref_documents().await.unwrap();

  let names: Vec<&str> = docs.iter().map(Document::name).collect();
  assert_eq!(names, ["chembl_xref.ttl"]);
  assert_eq!(warnings.len(), 1);
  assert!(warnings[0].contains("kegg.compound"));

  let chembl = ns::xref(ns::xref_namespace("chembl").unwrap(), "CHEMBL545");
  assert!(docs[0].statements().contains(&link(ns::compound(1), "HAS_XREF", chembl)));
  assert!(!mentions(&docs[0], &ns::compound(4)));
}

// ─── Archive ─────────────────────────────────────────────────────────────────

fn read_archive(path: &Path) -> Vec<(String, Vec<u8>)> {
  let file = std::fs::File::open(path).unwrap();
  let mut zip = zip::ZipArchive::new(file).unwrap();
  let mut entries = Vec::new();
  for idx in 0..zip.len() {
    let mut entry = zip.by_index(idx).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    entries.push((entry.name().to_owned(), bytes));
  }
  entries.sort();
  entries
}

fn config(root: &Path, name: &str) -> PipelineConfig {
  PipelineConfig {
    export_dir: root.join(name),
    xref_prefixes: vec!["chembl".into(), "kegg.compound".into(), "go".into()],
    ..PipelineConfig::default()
  }
}

#[tokio::test]
async fn archive_holds_exactly_the_non_empty_documents() {
  let s = seeded().await;
  let root = tempfile::tempdir().unwrap();
  let cfg = config(root.path(), "ttls");

  let report = build_triples(&cfg, &s, false).await.unwrap();
  assert!(!report.reused);
  assert_eq!(report.archive, root.path().join("ttls.zip"));
  assert!(!cfg.export_dir.exists());

  let names: Vec<String> = read_archive(&report.archive).into_iter().map(|(n, _)| n).collect();
  assert_eq!(names, ["chembl_xref.ttl", "compound.ttl", "inchi.ttl", "name.ttl", "relation.ttl"]);
  assert_eq!(report.documents.keys().cloned().collect::<Vec<_>>(), names);
  assert_eq!(report.documents["relation.ttl"], 1);
  assert_eq!(report.skipped_relations, 1);
}

#[tokio::test]
async fn identical_snapshots_give_identical_documents() {
  let s = seeded().await;
  let root = tempfile::tempdir().unwrap();

  let first = build_triples(&config(root.path(), "a"), &s, true).await.unwrap();
  let second = build_triples(&config(root.path(), "b"), &s, true).await.unwrap();
  assert_eq!(read_archive(&first.archive), read_archive(&second.archive));
}

#[tokio::test]
async fn existing_archive_is_reused_unless_forced() {
  let s = seeded().await;
  let root = tempfile::tempdir().unwrap();
  let cfg = config(root.path(), "ttls");

  build_triples(&cfg, &s, false).await.unwrap();
  let again = build_triples(&cfg, &s, false).await.unwrap();
  assert!(again.reused);
  assert!(again.documents.is_empty());

  let forced = build_triples(&cfg, &s, true).await.unwrap();
  assert!(!forced.reused);
  assert_eq!(forced.documents.len(), 5);
}

#[tokio::test]
async fn forced_rebuild_reflects_a_changed_snapshot() {
  let s = seeded().await;
  let root = tempfile::tempdir().unwrap();
  let cfg = config(root.path(), "ttls");

  let first = build_triples(&cfg, &s, false).await.unwrap();
  let before = read_archive(&first.archive);

  s.append_rows(Table::Compound, vec![compound(6, "C", None, Some(1))]).await.unwrap();
  let stale = build_triples(&cfg, &s, false).await.unwrap();
  assert!(stale.reused);
  assert_eq!(read_archive(&stale.archive), before);

  let rebuilt = build_triples(&cfg, &s, true).await.unwrap();
  let after = read_archive(&rebuilt.archive);
  assert_ne!(after, before);
  let (_, compounds) = after.iter().find(|(name, _)| name == "compound.ttl").unwrap();
  assert!(String::from_utf8_lossy(compounds).contains("\"compound 6\""));
}

#[tokio::test]
async fn xref_accessions_with_iri_delimiters_are_exported() {
  let s = seeded().await;
  s.append_rows(Table::DatabaseAccession, vec![vec![
    i(4),
    i(2),
    t("CHEMBL[1] x"),
    t("MANUAL_X_REF"),
    t("ChEMBL"),
    i(1),
  ]])
  .await
  .unwrap();
  let root = tempfile::tempdir().unwrap();

  let report = build_triples(&config(root.path(), "ttls"), &s, true).await.unwrap();
  let entries = read_archive(&report.archive);
  let (_, chembl) = entries.iter().find(|(name, _)| name == "chembl_xref.ttl").unwrap();
  let chembl = String::from_utf8_lossy(chembl);
  assert!(chembl.contains("CHEMBL%5B1%5D%20x"), "{chembl}");
  assert!(!chembl.contains("CHEMBL[1]"));
}
