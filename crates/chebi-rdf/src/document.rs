//! In-memory Turtle documents.
//!
//! Statements are collected unordered, then sorted and de-duplicated before
//! serialization, so two builds over the same snapshot write identical bytes.

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

use oxrdf::{Literal, NamedNode, Term, TripleRef, vocab::{rdf, xsd}};
use oxttl::TurtleSerializer;

use crate::{
  Error, Result,
  namespaces::{self, PREFIXES},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Datatype {
  String,
  Integer,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Object {
  Iri(String),
  Literal { value: String, datatype: Datatype },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Statement {
  pub subject:   String,
  pub predicate: String,
  pub object:    Object,
}

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Document {
  name:       String,
  prefixes:   Vec<(String, String)>,
  statements: Vec<Statement>,
}

impl Document {
  /// An empty document bound to the common prefixes.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:       name.into(),
      prefixes:   PREFIXES.iter().map(|(p, ns)| ((*p).to_owned(), (*ns).to_owned())).collect(),
      statements: Vec::new(),
    }
  }

  pub fn with_prefix(mut self, prefix: &str, namespace: &str) -> Self {
    self.prefixes.push((prefix.to_owned(), namespace.to_owned()));
    self
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn statements(&self) -> &[Statement] { &self.statements }

  pub fn is_empty(&self) -> bool { self.statements.is_empty() }

  /// `subject a n:<class>`.
  pub fn add_type(&mut self, subject: &str, class: &str) {
    self.push(subject, rdf::TYPE.as_str(), Object::Iri(namespaces::node(class)));
  }

  pub fn add_link(&mut self, subject: &str, predicate: &str, object: &str) {
    self.push(subject, &namespaces::rel(predicate), Object::Iri(object.to_owned()));
  }

  pub fn add_string(&mut self, subject: &str, predicate: &str, value: &str) {
    let object = Object::Literal { value: value.to_owned(), datatype: Datatype::String };
    self.push(subject, &namespaces::rel(predicate), object);
  }

  pub fn add_integer(&mut self, subject: &str, predicate: &str, value: i64) {
    let object = Object::Literal { value: value.to_string(), datatype: Datatype::Integer };
    self.push(subject, &namespaces::rel(predicate), object);
  }

  fn push(&mut self, subject: &str, predicate: &str, object: Object) {
    self.statements.push(Statement {
      subject: subject.to_owned(),
      predicate: predicate.to_owned(),
      object,
    });
  }

  /// Sort and de-duplicate the statements; returns how many remain.
  pub fn normalize(&mut self) -> usize {
    self.statements.sort();
    self.statements.dedup();
    self.statements.len()
  }

  /// Write the document as `<dir>/<name>`. Returns the number of triples.
  pub fn write(mut self, dir: &Path) -> Result<usize> {
    let count = self.normalize();
    let path = dir.join(&self.name);

    let mut serializer = TurtleSerializer::new();
    for (prefix, namespace) in &self.prefixes {
      serializer = serializer.with_prefix(prefix, namespace)?;
    }

    let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    let mut writer = serializer.for_writer(BufWriter::new(file));
    for statement in &self.statements {
      let subject = NamedNode::new(&statement.subject)?;
      let predicate = NamedNode::new(&statement.predicate)?;
      let object: Term = match &statement.object {
        Object::Iri(iri) => NamedNode::new(iri)?.into(),
        Object::Literal { value, datatype } => {
          let datatype = match datatype {
            Datatype::String => xsd::STRING,
            Datatype::Integer => xsd::INTEGER,
          };
          Literal::new_typed_literal(value, datatype).into()
        }
      };
      writer
        .serialize_triple(TripleRef::new(&subject, &predicate, &object))
        .map_err(|e| Error::io(&path, e))?;
    }

    writer
      .finish()
      .and_then(|mut w| w.flush())
      .map_err(|e| Error::io(&path, e))?;
    Ok(count)
  }
}
