//! Client for a remote SPARQL 1.1 protocol endpoint pair.
//!
//! Queries are POSTed to the query endpoint as `application/sparql-query` and
//! answered in the SPARQL JSON results format. Mutations are sent to the
//! update endpoint as `INSERT DATA`/`DELETE DATA` requests. Every triple is
//! validated before it is rendered into update text.
//!
//! Blocking HTTP via `ureq`; the configured timeout bounds each request.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::{Node, Term, Triple};

use super::{
    pattern_query, pattern_triples, BoundValue, Solution, StoreResult, TripleStore, ValueKind,
};

/// Connection settings for a remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// SPARQL query endpoint URL.
    pub query_endpoint: String,
    /// SPARQL update endpoint URL.
    pub update_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl RemoteConfig {
    /// Settings for an endpoint pair without credentials.
    pub fn new(query_endpoint: impl Into<String>, update_endpoint: impl Into<String>) -> Self {
        Self {
            query_endpoint: query_endpoint.into(),
            update_endpoint: update_endpoint.into(),
            username: None,
            password: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Attach HTTP basic credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// A [`TripleStore`] backed by a remote SPARQL endpoint.
pub struct RemoteSparqlStore {
    config: RemoteConfig,
    agent: ureq::Agent,
    authorization: Option<String>,
}

impl RemoteSparqlStore {
    /// Create a client. No request is made until the first operation.
    pub fn new(config: RemoteConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        let authorization = match (&config.username, &config.password) {
            (Some(user), password) => Some(basic_auth(user, password.as_deref().unwrap_or(""))),
            (None, _) => None,
        };
        Self {
            config,
            agent,
            authorization,
        }
    }

    /// The connection settings.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn query(&self, sparql: &str) -> StoreResult<ResultsDocument> {
        tracing::trace!(endpoint = %self.config.query_endpoint, query = sparql, "remote query");
        let mut request = self
            .agent
            .post(&self.config.query_endpoint)
            .set("Content-Type", "application/sparql-query")
            .set("Accept", "application/sparql-results+json");
        if let Some(auth) = &self.authorization {
            request = request.set("Authorization", auth);
        }
        match request.send_string(sparql) {
            Ok(response) => response.into_json().map_err(|e| StoreError::Response {
                message: format!("malformed SPARQL JSON results: {e}"),
            }),
            Err(ureq::Error::Status(400, response)) => Err(StoreError::QuerySyntax {
                message: response_body(response),
            }),
            Err(ureq::Error::Status(code, response)) => Err(StoreError::Unavailable {
                message: format!("HTTP {code} from query endpoint: {}", response_body(response)),
            }),
            Err(ureq::Error::Transport(transport)) => Err(StoreError::Unavailable {
                message: format!("query endpoint {}: {transport}", self.config.query_endpoint),
            }),
        }
    }

    fn update(&self, sparql: &str) -> StoreResult<()> {
        tracing::trace!(endpoint = %self.config.update_endpoint, update = sparql, "remote update");
        let mut request = self
            .agent
            .post(&self.config.update_endpoint)
            .set("Content-Type", "application/sparql-update");
        if let Some(auth) = &self.authorization {
            request = request.set("Authorization", auth);
        }
        match request.send_string(sparql) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, response)) => Err(StoreError::Unavailable {
                message: format!("HTTP {code} from update endpoint: {}", response_body(response)),
            }),
            Err(ureq::Error::Transport(transport)) => Err(StoreError::Unavailable {
                message: format!("update endpoint {}: {transport}", self.config.update_endpoint),
            }),
        }
    }
}

impl TripleStore for RemoteSparqlStore {
    fn insert(&self, triple: &Triple) -> StoreResult<()> {
        self.apply(&[], std::slice::from_ref(triple))
    }

    fn remove(&self, triple: &Triple) -> StoreResult<()> {
        self.apply(std::slice::from_ref(triple), &[])
    }

    fn insert_all(&self, triples: &[Triple]) -> StoreResult<()> {
        self.apply(&[], triples)
    }

    fn remove_all(&self, triples: &[Triple]) -> StoreResult<()> {
        self.apply(triples, &[])
    }

    fn apply(&self, removals: &[Triple], additions: &[Triple]) -> StoreResult<()> {
        let Some(request) = update_request(removals, additions)? else {
            return Ok(());
        };
        self.update(&request)
    }

    fn contains(&self, triple: &Triple) -> StoreResult<bool> {
        if matches!(triple.subject, Node::Blank(_)) || matches!(triple.object, Term::Blank(_)) {
            let found = self.matching(
                Some(&triple.subject),
                Some(triple.predicate.as_str()),
                Some(&triple.object),
            )?;
            return Ok(!found.is_empty());
        }
        triple.validate()?;
        self.ask(&format!("ASK {{ {triple} }}"))
    }

    fn matching(
        &self,
        subject: Option<&Node>,
        predicate: Option<&str>,
        object: Option<&Term>,
    ) -> StoreResult<Vec<Triple>> {
        let rows = self.select(&pattern_query(subject, predicate, object)?)?;
        pattern_triples(rows, subject, predicate, object)
    }

    fn len(&self) -> StoreResult<usize> {
        let rows = self.select("SELECT (COUNT(*) AS ?n) WHERE { ?s ?p ?o }")?;
        rows.first()
            .and_then(|row| row.value("n"))
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| StoreError::Response {
                message: "COUNT query returned no integer".into(),
            })
    }

    fn select(&self, sparql: &str) -> StoreResult<Vec<Solution>> {
        let doc = self.query(sparql)?;
        let results = doc.results.ok_or_else(|| StoreError::Response {
            message: "expected solutions, got a boolean; use ask() for ASK queries".into(),
        })?;
        results
            .bindings
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(var, raw)| raw.into_bound().map(|bound| (var, bound)))
                    .collect::<StoreResult<Solution>>()
            })
            .collect()
    }

    fn ask(&self, sparql: &str) -> StoreResult<bool> {
        self.query(sparql)?.boolean.ok_or_else(|| StoreError::Response {
            message: "expected boolean result from ASK query".into(),
        })
    }
}

impl std::fmt::Debug for RemoteSparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSparqlStore")
            .field("query_endpoint", &self.config.query_endpoint)
            .field("update_endpoint", &self.config.update_endpoint)
            .field("authenticated", &self.authorization.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    results: Option<ResultSet>,
    #[serde(default)]
    boolean: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    bindings: Vec<BTreeMap<String, RawBinding>>,
}

#[derive(Debug, Deserialize)]
struct RawBinding {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang", default)]
    language: Option<String>,
    #[serde(default)]
    datatype: Option<String>,
}

impl RawBinding {
    fn into_bound(self) -> StoreResult<BoundValue> {
        let kind = match self.kind.as_str() {
            "uri" => ValueKind::Uri,
            "literal" | "typed-literal" => ValueKind::Literal,
            "bnode" => ValueKind::Blank,
            other => {
                return Err(StoreError::Response {
                    message: format!("unknown binding type {other:?}"),
                });
            }
        };
        // Plain strings come back with an explicit xsd:string datatype from
        // some stores; normalize to the simple form.
        let datatype = self
            .datatype
            .filter(|dt| dt != "http://www.w3.org/2001/XMLSchema#string" && self.language.is_none());
        Ok(BoundValue {
            kind,
            value: self.value,
            language: self.language,
            datatype,
        })
    }
}

/// Render `DELETE DATA`/`INSERT DATA` for a change set, or `None` if empty.
pub(crate) fn update_request(removals: &[Triple], additions: &[Triple]) -> StoreResult<Option<String>> {
    let mut parts = Vec::new();
    if !removals.is_empty() {
        if removals
            .iter()
            .any(|t| matches!(t.subject, Node::Blank(_)) || matches!(t.object, Term::Blank(_)))
        {
            return Err(StoreError::InvalidTerm {
                message: "blank nodes cannot be addressed in DELETE DATA".into(),
            });
        }
        parts.push(format!("DELETE DATA {{\n{}}}", data_block(removals)?));
    }
    if !additions.is_empty() {
        parts.push(format!("INSERT DATA {{\n{}}}", data_block(additions)?));
    }
    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join(" ;\n")))
    }
}

fn data_block(triples: &[Triple]) -> StoreResult<String> {
    let mut block = String::new();
    for t in triples {
        t.validate()?;
        block.push_str("  ");
        block.push_str(&t.to_string());
        block.push('\n');
    }
    Ok(block)
}

fn basic_auth(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

fn response_body(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    if body.len() > 500 {
        let cut = body.char_indices().nth(500).map(|(i, _)| i).unwrap_or(body.len());
        format!("{}...", &body[..cut])
    } else {
        body
    }
}
