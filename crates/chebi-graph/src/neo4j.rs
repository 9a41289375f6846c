//! [`GraphStore`] over the Neo4j transactional HTTP endpoint.
//!
//! Every trait call is one `POST {uri}/db/{database}/tx/commit`, so each call
//! runs in its own transaction. Node and relationship writes are grouped
//! into `UNWIND` statements, one per label set or relationship type.

use std::{collections::BTreeMap, time::Duration};

use chebi_core::GraphConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::{
  mapping::GraphBatch,
  store::{GraphStore, PurgeScope},
};

#[derive(Debug, Error)]
pub enum Neo4jError {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("neo4j returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("{code}: {message}")]
  Cypher { code: String, message: String },

  #[error("unexpected response: {0}")]
  UnexpectedResponse(String),
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
  pub statement:  String,
  pub parameters: Value,
}

impl Statement {
  fn new(statement: impl Into<String>, parameters: Value) -> Self {
    Self { statement: statement.into(), parameters }
  }
}

#[derive(Serialize)]
struct Request<'a> {
  statements: &'a [Statement],
}

#[derive(Deserialize)]
struct Response {
  #[serde(default)]
  results: Vec<QueryResult>,
  #[serde(default)]
  errors:  Vec<CypherError>,
}

#[derive(Deserialize)]
struct QueryResult {
  #[serde(default)]
  data: Vec<ResultRow>,
}

#[derive(Deserialize)]
struct ResultRow {
  row: Vec<Value>,
}

#[derive(Deserialize)]
struct CypherError {
  code:    String,
  message: String,
}

// ─── Cypher ──────────────────────────────────────────────────────────────────

pub const CONSTRAINT: &str =
  "CREATE CONSTRAINT n10s_unique_uri IF NOT EXISTS FOR (r:Resource) REQUIRE r.uri IS UNIQUE";

/// Backtick-quoted identifier for labels and relationship types.
fn quote(identifier: &str) -> String { format!("`{}`", identifier.replace('`', "``")) }

pub fn delete_statement(scope: &PurgeScope, limit: usize) -> Statement {
  Statement::new(
    format!(
      "MATCH (n) WHERE n:{} OR any(prefix IN $prefixes WHERE n.uri STARTS WITH prefix) \
       WITH n LIMIT $limit DETACH DELETE n RETURN count(*)",
      quote(&scope.label)
    ),
    json!({ "prefixes": scope.uri_prefixes, "limit": limit }),
  )
}

pub fn count_statement(label: &str) -> Statement {
  Statement::new(format!("MATCH (n:{}) RETURN count(n)", quote(label)), json!({}))
}

/// The statements that merge `batch`: nodes first, grouped by label set,
/// then relationships grouped by type.
pub fn batch_statements(batch: &GraphBatch) -> Vec<Statement> {
  let mut by_labels: BTreeMap<Vec<&str>, Vec<Value>> = BTreeMap::new();
  for (uri, node) in batch.nodes() {
    let labels = node.labels.iter().map(String::as_str).collect();
    by_labels
      .entry(labels)
      .or_default()
      .push(json!({ "uri": uri, "props": node.properties }));
  }

  let mut statements = Vec::new();
  for (labels, rows) in by_labels {
    let mut cypher = "UNWIND $rows AS row MERGE (n:Resource {uri: row.uri}) SET n += row.props".to_owned();
    if !labels.is_empty() {
      cypher.push_str(" SET n");
      for label in labels {
        cypher.push(':');
        cypher.push_str(&quote(label));
      }
    }
    statements.push(Statement::new(cypher, json!({ "rows": rows })));
  }

  let mut by_kind: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
  for rel in batch.relationships() {
    by_kind
      .entry(rel.kind.as_str())
      .or_default()
      .push(json!({ "from": rel.from, "to": rel.to }));
  }
  for (kind, rows) in by_kind {
    statements.push(Statement::new(
      format!(
        "UNWIND $rows AS row \
         MERGE (a:Resource {{uri: row.from}}) \
         MERGE (b:Resource {{uri: row.to}}) \
         MERGE (a)-[:{}]->(b)",
        quote(kind)
      ),
      json!({ "rows": rows }),
    ));
  }

  statements
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Neo4jHttpStore {
  client:   Client,
  endpoint: String,
  user:     String,
  password: String,
}

impl Neo4jHttpStore {
  pub fn new(client: Client, uri: &str, database: &str, user: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      client,
      endpoint: format!("{}/db/{database}/tx/commit", uri.trim_end_matches('/')),
      user: user.into(),
      password: password.into(),
    }
  }

  pub fn from_config(config: &GraphConfig) -> Result<Self, Neo4jError> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self::new(
      client,
      &config.uri,
      &config.database,
      config.user.clone(),
      config.password.clone(),
    ))
  }

  pub fn endpoint(&self) -> &str { &self.endpoint }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.user.is_empty() {
      req
    } else {
      req.basic_auth(&self.user, Some(&self.password))
    }
  }

  /// Run `statements` in one transaction; returns the rows of each result.
  async fn run(&self, statements: &[Statement]) -> Result<Vec<Vec<Vec<Value>>>, Neo4jError> {
    debug!(endpoint = %self.endpoint, statements = statements.len(), "cypher request");
    let resp = self
      .auth(self.client.post(&self.endpoint))
      .json(&Request { statements })
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Neo4jError::Status { status: status.as_u16(), body });
    }

    let response: Response = resp.json().await?;
    if let Some(err) = response.errors.into_iter().next() {
      return Err(Neo4jError::Cypher { code: err.code, message: err.message });
    }
    Ok(
      response
        .results
        .into_iter()
        .map(|r| r.data.into_iter().map(|d| d.row).collect())
        .collect(),
    )
  }

  /// The single integer a `RETURN count(…)` statement yields.
  async fn scalar(&self, statement: Statement) -> Result<u64, Neo4jError> {
    let results = self.run(std::slice::from_ref(&statement)).await?;
    results
      .first()
      .and_then(|rows| rows.first())
      .and_then(|row| row.first())
      .and_then(Value::as_u64)
      .ok_or_else(|| Neo4jError::UnexpectedResponse(format!("no count in response to `{}`", statement.statement)))
  }
}

impl GraphStore for Neo4jHttpStore {
  type Error = Neo4jError;

  async fn ensure_uri_constraint(&self) -> Result<(), Neo4jError> {
    self.run(&[Statement::new(CONSTRAINT, json!({}))]).await?;
    Ok(())
  }

  async fn delete_batch(&self, scope: &PurgeScope, limit: usize) -> Result<u64, Neo4jError> {
    self.scalar(delete_statement(scope, limit)).await
  }

  async fn commit(&self, batch: &GraphBatch) -> Result<(), Neo4jError> {
    let statements = batch_statements(batch);
    if statements.is_empty() {
      return Ok(());
    }
    self.run(&statements).await?;
    Ok(())
  }

  async fn count_labelled(&self, label: &str) -> Result<u64, Neo4jError> {
    self.scalar(count_statement(label)).await
  }
}

#[cfg(test)]
mod tests {
  use oxrdf::{Literal, NamedNode, Triple, vocab::rdf};

  use super::*;

  fn iri(s: &str) -> NamedNode { NamedNode::new(s).unwrap() }

  #[test]
  fn labels_and_types_are_quoted() {
    assert_eq!(quote("DbChEBI"), "`DbChEBI`");
    assert_eq!(quote("a`b"), "`a``b`");
    assert_eq!(
      delete_statement(&PurgeScope::pipeline(), 1000),
      Statement::new(
        "MATCH (n) WHERE n:`DbChEBI` OR any(prefix IN $prefixes WHERE n.uri STARTS WITH prefix) \
         WITH n LIMIT $limit DETACH DELETE n RETURN count(*)",
        json!({ "prefixes": ["http://purl.obolibrary.org/obo/CHEBI_"], "limit": 1000 })
      )
    );
  }

  #[test]
  fn batches_group_nodes_by_labels_and_relationships_by_type() {
    let mut batch = GraphBatch::default();
    batch.add_triple(&Triple::new(iri("http://x/1"), rdf::TYPE, iri("http://x/n#Compound")));
    batch.add_triple(&Triple::new(iri("http://x/1"), iri("http://x/r#name"), Literal::new_simple_literal("a")));
    batch.add_triple(&Triple::new(iri("http://x/2"), rdf::TYPE, iri("http://x/n#Compound")));
    batch.add_triple(&Triple::new(iri("http://x/1"), iri("http://x/r#IS_A"), iri("http://x/3")));

    let statements = batch_statements(&batch);
    assert_eq!(statements.len(), 3);

    assert_eq!(
      statements[0].statement,
      "UNWIND $rows AS row MERGE (n:Resource {uri: row.uri}) SET n += row.props"
    );
    assert_eq!(statements[0].parameters["rows"][0]["uri"], "http://x/3");

    assert!(statements[1].statement.ends_with("SET n:`Compound`"));
    assert_eq!(statements[1].parameters["rows"].as_array().unwrap().len(), 2);
    assert_eq!(statements[1].parameters["rows"][0]["props"]["name"], "a");

    assert!(statements[2].statement.ends_with("MERGE (a)-[:`IS_A`]->(b)"));
    assert_eq!(statements[2].parameters["rows"][0], json!({ "from": "http://x/1", "to": "http://x/3" }));
  }

  #[test]
  fn endpoint_targets_the_database() {
    let store = Neo4jHttpStore::new(Client::new(), "http://localhost:7474/", "chebi", "neo4j", "pw");
    assert_eq!(store.endpoint(), "http://localhost:7474/db/chebi/tx/commit");
  }
}
