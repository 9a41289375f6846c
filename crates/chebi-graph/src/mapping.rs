//! RDF triples → property-graph writes.
//!
//! Subjects and IRI objects become `Resource` nodes keyed by `uri`.
//! `rdf:type` objects become labels, literals become properties and every
//! other IRI object becomes a relationship. Labels, property keys and
//! relationship types are the local names of the IRIs involved.

use std::collections::{BTreeMap, BTreeSet};

use oxrdf::{Literal, Subject, Term, Triple, vocab::{rdf, xsd}};
use serde_json::Value;

/// Local name of an IRI: everything after the last `#` or `/`.
pub fn local_name(iri: &str) -> &str {
  match iri.rfind(['#', '/']) {
    Some(idx) if idx + 1 < iri.len() => &iri[idx + 1..],
    _ => iri,
  }
}

fn literal_value(literal: &Literal) -> Value {
  let datatype = literal.datatype();
  if datatype == xsd::INTEGER || datatype == xsd::INT || datatype == xsd::LONG {
    if let Ok(v) = literal.value().parse::<i64>() {
      return Value::from(v);
    }
  }
  if datatype == xsd::BOOLEAN {
    if let Ok(v) = literal.value().parse::<bool>() {
      return Value::from(v);
    }
  }
  Value::from(literal.value())
}

fn subject_uri(subject: &Subject) -> Option<String> {
  match subject {
    Subject::NamedNode(n) => Some(n.as_str().to_owned()),
    Subject::BlankNode(b) => Some(format!("_:{}", b.as_str())),
    // Quoted-triple subjects exist only with oxrdf's `rdf-star` feature.
    #[allow(unreachable_patterns)]
    _ => None,
  }
}

// ─── Batch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeWrite {
  pub labels:     BTreeSet<String>,
  pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RelationshipWrite {
  pub from: String,
  pub kind: String,
  pub to:   String,
}

/// The writes derived from one sub-batch of triples. Applied with merge
/// semantics, so committing the same batch twice changes nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphBatch {
  nodes:         BTreeMap<String, NodeWrite>,
  relationships: BTreeSet<RelationshipWrite>,
  triples:       usize,
}

impl GraphBatch {
  pub fn add_triple(&mut self, triple: &Triple) {
    let Some(subject) = subject_uri(&triple.subject) else {
      return;
    };
    self.triples += 1;
    let predicate = triple.predicate.as_str();

    match &triple.object {
      Term::NamedNode(object) if predicate == rdf::TYPE.as_str() => {
        self.node(&subject).labels.insert(local_name(object.as_str()).to_owned());
      }
      Term::NamedNode(object) => {
        self.node(&subject);
        self.node(object.as_str());
        self.relationships.insert(RelationshipWrite {
          from: subject,
          kind: local_name(predicate).to_owned(),
          to:   object.as_str().to_owned(),
        });
      }
      Term::Literal(literal) => {
        self
          .node(&subject)
          .properties
          .insert(local_name(predicate).to_owned(), literal_value(literal));
      }
      Term::BlankNode(object) => {
        let object = format!("_:{}", object.as_str());
        self.node(&subject);
        self.node(&object);
        self.relationships.insert(RelationshipWrite {
          from: subject,
          kind: local_name(predicate).to_owned(),
          to:   object,
        });
      }
      // Quoted-triple objects exist only with oxrdf's `rdf-star` feature.
      #[allow(unreachable_patterns)]
      _ => {}
    }
  }

  fn node(&mut self, uri: &str) -> &mut NodeWrite {
    self.nodes.entry(uri.to_owned()).or_default()
  }

  pub fn nodes(&self) -> &BTreeMap<String, NodeWrite> { &self.nodes }

  pub fn relationships(&self) -> &BTreeSet<RelationshipWrite> { &self.relationships }

  /// Triples folded into this batch.
  pub fn triples(&self) -> usize { self.triples }

  pub fn is_empty(&self) -> bool { self.triples == 0 }
}

#[cfg(test)]
mod tests {
  use oxrdf::{BlankNode, NamedNode};

  use super::*;

  fn iri(s: &str) -> NamedNode { NamedNode::new(s).unwrap() }

  const C: &str = "http://purl.obolibrary.org/obo/CHEBI_";
  const N: &str = "https://biokb.scai.fraunhofer.de/chebi/node#";
  const R: &str = "https://biokb.scai.fraunhofer.de/chebi/relation#";

  #[test]
  fn local_names_follow_the_last_separator() {
    assert_eq!(local_name("https://biokb.scai.fraunhofer.de/chebi/node#Compound"), "Compound");
    assert_eq!(local_name("http://rdf.ncbi.nlm.nih.gov/pubchem/inchikey/ABC"), "ABC");
    assert_eq!(local_name("urn:x"), "urn:x");
  }

  #[test]
  fn types_literals_and_links_map_to_labels_properties_and_relationships() {
    let one = iri(&format!("{C}1"));
    let two = iri(&format!("{C}2"));
    let mut batch = GraphBatch::default();
    batch.add_triple(&Triple::new(one.clone(), rdf::TYPE, iri(&format!("{N}Compound"))));
    batch.add_triple(&Triple::new(one.clone(), rdf::TYPE, iri(&format!("{N}DbChEBI"))));
    batch.add_triple(&Triple::new(
      one.clone(),
      iri(&format!("{R}star")),
      Literal::new_typed_literal("3", xsd::INTEGER),
    ));
    batch.add_triple(&Triple::new(one.clone(), iri(&format!("{R}name")), Literal::new_simple_literal("ethanol")));
    batch.add_triple(&Triple::new(one.clone(), iri(&format!("{R}HAS_FUNCTIONAL_PARENT")), two.clone()));

    assert_eq!(batch.triples(), 5);
    let node = &batch.nodes()[one.as_str()];
    assert_eq!(
      node.labels.iter().map(String::as_str).collect::<Vec<_>>(),
      ["Compound", "DbChEBI"]
    );
    assert_eq!(node.properties["star"], Value::from(3));
    assert_eq!(node.properties["name"], Value::from("ethanol"));

    assert!(batch.nodes()[two.as_str()].labels.is_empty());
    let rel = batch.relationships().iter().next().unwrap();
    assert_eq!((rel.from.as_str(), rel.kind.as_str(), rel.to.as_str()), (one.as_str(), "HAS_FUNCTIONAL_PARENT", two.as_str()));
  }

  #[test]
  fn blank_nodes_are_keyed_by_their_turtle_label() {
    let one = iri(&format!("{C}1"));
    let mut batch = GraphBatch::default();
    batch.add_triple(&Triple::new(BlankNode::new("b0").unwrap(), iri(&format!("{R}name")), Literal::new_simple_literal("x")));
    batch.add_triple(&Triple::new(one.clone(), iri(&format!("{R}HAS_PART")), BlankNode::new("b0").unwrap()));

    assert_eq!(batch.triples(), 2);
    assert_eq!(batch.nodes()["_:b0"].properties["name"], Value::from("x"));
    let rel = batch.relationships().iter().next().unwrap();
    assert_eq!((rel.from.as_str(), rel.kind.as_str(), rel.to.as_str()), (one.as_str(), "HAS_PART", "_:b0"));
  }
}
