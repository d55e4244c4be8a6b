//! Triple store capability and its backends.
//!
//! Everything above this layer talks to a [`TripleStore`]: insert/remove
//! triples, look them up by pattern, and run SPARQL `SELECT`/`ASK` queries
//! returning tabular [`Solution`]s.
//!
//! - [`OxigraphStore`]: embedded oxigraph, in memory or on disk
//! - [`RemoteSparqlStore`]: a SPARQL 1.1 protocol endpoint pair over HTTP
//! - [`AuditedStore`]: transactional wrapper buffering mutations until commit
//!
//! [`io`] serializes any store to RDF/XML, Turtle or N-Triples and back.

pub mod audit;
pub mod io;
pub mod local;
pub mod remote;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::{Literal, Node, Term, Triple};

pub use audit::AuditedStore;
pub use io::GraphFormat;
pub use local::OxigraphStore;
pub use remote::{RemoteSparqlStore, RemoteConfig};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A mutable triple collection with SPARQL query capability.
///
/// All operations are blocking; no timeout is applied at this layer beyond
/// what a backend is configured with.
pub trait TripleStore: Send + Sync {
    /// Add a triple. Adding a triple already present is a no-op.
    fn insert(&self, triple: &Triple) -> StoreResult<()>;

    /// Remove a triple. Removing an absent triple is a no-op.
    fn remove(&self, triple: &Triple) -> StoreResult<()>;

    /// Add many triples.
    fn insert_all(&self, triples: &[Triple]) -> StoreResult<()> {
        triples.iter().try_for_each(|t| self.insert(t))
    }

    /// Remove many triples.
    fn remove_all(&self, triples: &[Triple]) -> StoreResult<()> {
        triples.iter().try_for_each(|t| self.remove(t))
    }

    /// Apply a removal set and an addition set, removals first.
    ///
    /// Backends that can do so apply both in a single request.
    fn apply(&self, removals: &[Triple], additions: &[Triple]) -> StoreResult<()> {
        self.remove_all(removals)?;
        self.insert_all(additions)
    }

    /// Whether the exact triple is present.
    fn contains(&self, triple: &Triple) -> StoreResult<bool>;

    /// All triples matching a pattern; `None` is a wildcard.
    fn matching(
        &self,
        subject: Option<&Node>,
        predicate: Option<&str>,
        object: Option<&Term>,
    ) -> StoreResult<Vec<Triple>>;

    /// Number of triples in the store.
    fn len(&self) -> StoreResult<usize>;

    /// Whether the store holds no triples.
    fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Run a SPARQL `SELECT` query.
    fn select(&self, sparql: &str) -> StoreResult<Vec<Solution>>;

    /// Run a SPARQL `ASK` query.
    fn ask(&self, sparql: &str) -> StoreResult<bool>;

    /// Every triple in the store.
    fn all_triples(&self) -> StoreResult<Vec<Triple>> {
        self.matching(None, None, None)
    }
}

impl<T: TripleStore + ?Sized> TripleStore for &T {
    fn insert(&self, triple: &Triple) -> StoreResult<()> {
        (**self).insert(triple)
    }
    fn remove(&self, triple: &Triple) -> StoreResult<()> {
        (**self).remove(triple)
    }
    fn insert_all(&self, triples: &[Triple]) -> StoreResult<()> {
        (**self).insert_all(triples)
    }
    fn remove_all(&self, triples: &[Triple]) -> StoreResult<()> {
        (**self).remove_all(triples)
    }
    fn apply(&self, removals: &[Triple], additions: &[Triple]) -> StoreResult<()> {
        (**self).apply(removals, additions)
    }
    fn contains(&self, triple: &Triple) -> StoreResult<bool> {
        (**self).contains(triple)
    }
    fn matching(
        &self,
        subject: Option<&Node>,
        predicate: Option<&str>,
        object: Option<&Term>,
    ) -> StoreResult<Vec<Triple>> {
        (**self).matching(subject, predicate, object)
    }
    fn len(&self) -> StoreResult<usize> {
        (**self).len()
    }
    fn select(&self, sparql: &str) -> StoreResult<Vec<Solution>> {
        (**self).select(sparql)
    }
    fn ask(&self, sparql: &str) -> StoreResult<bool> {
        (**self).ask(sparql)
    }
}

macro_rules! forward_store_impl {
    ($wrapper:ident) => {
        impl<T: TripleStore + ?Sized> TripleStore for $wrapper<T> {
            fn insert(&self, triple: &Triple) -> StoreResult<()> {
                (**self).insert(triple)
            }
            fn remove(&self, triple: &Triple) -> StoreResult<()> {
                (**self).remove(triple)
            }
            fn insert_all(&self, triples: &[Triple]) -> StoreResult<()> {
                (**self).insert_all(triples)
            }
            fn remove_all(&self, triples: &[Triple]) -> StoreResult<()> {
                (**self).remove_all(triples)
            }
            fn apply(&self, removals: &[Triple], additions: &[Triple]) -> StoreResult<()> {
                (**self).apply(removals, additions)
            }
            fn contains(&self, triple: &Triple) -> StoreResult<bool> {
                (**self).contains(triple)
            }
            fn matching(
                &self,
                subject: Option<&Node>,
                predicate: Option<&str>,
                object: Option<&Term>,
            ) -> StoreResult<Vec<Triple>> {
                (**self).matching(subject, predicate, object)
            }
            fn len(&self) -> StoreResult<usize> {
                (**self).len()
            }
            fn select(&self, sparql: &str) -> StoreResult<Vec<Solution>> {
                (**self).select(sparql)
            }
            fn ask(&self, sparql: &str) -> StoreResult<bool> {
                (**self).ask(sparql)
            }
        }
    };
}

forward_store_impl!(Box);
forward_store_impl!(Arc);

// ---------------------------------------------------------------------------
// Query solutions
// ---------------------------------------------------------------------------

/// The kind of RDF term bound to a query variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Literal,
    Uri,
    Blank,
}

/// One variable binding: `{type, value, xml:lang?, datatype?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundValue {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl BoundValue {
    /// Convert back into a graph term.
    pub fn to_term(&self) -> Term {
        match self.kind {
            ValueKind::Uri => Term::Iri(self.value.clone()),
            ValueKind::Blank => Term::Blank(self.value.clone()),
            ValueKind::Literal => Term::Literal(Literal {
                value: self.value.clone(),
                language: self.language.clone(),
                datatype: self.datatype.clone(),
            }),
        }
    }
}

impl From<&Term> for BoundValue {
    fn from(term: &Term) -> Self {
        match term {
            Term::Iri(iri) => BoundValue {
                kind: ValueKind::Uri,
                value: iri.clone(),
                language: None,
                datatype: None,
            },
            Term::Blank(id) => BoundValue {
                kind: ValueKind::Blank,
                value: id.clone(),
                language: None,
                datatype: None,
            },
            Term::Literal(lit) => BoundValue {
                kind: ValueKind::Literal,
                value: lit.value.clone(),
                language: lit.language.clone(),
                datatype: lit.datatype.clone(),
            },
        }
    }
}

/// One row of a `SELECT` result: variable name to bound value.
///
/// Unbound variables are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Solution {
    bindings: BTreeMap<String, BoundValue>,
}

impl Solution {
    /// Bind a variable.
    pub fn bind(&mut self, variable: impl Into<String>, value: BoundValue) {
        self.bindings.insert(variable.into(), value);
    }

    /// The binding of a variable.
    pub fn get(&self, variable: &str) -> Option<&BoundValue> {
        self.bindings.get(variable)
    }

    /// The lexical value bound to a variable.
    pub fn value(&self, variable: &str) -> Option<&str> {
        self.get(variable).map(|b| b.value.as_str())
    }

    /// All bindings in variable-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, BoundValue)> for Solution {
    fn from_iter<I: IntoIterator<Item = (String, BoundValue)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// The lexical values of one variable across all rows, skipping unbound rows.
pub fn column(rows: &[Solution], variable: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.value(variable).map(str::to_string))
        .collect()
}

// ---------------------------------------------------------------------------
// Pattern lookups over SPARQL
// ---------------------------------------------------------------------------

/// Build the `SELECT` query answering a triple pattern lookup.
///
/// Bound IRIs and literals are validated so that no caller-supplied text
/// reaches the query unescaped. Blank nodes act as variables inside SPARQL, so
/// a bound blank node is queried as a wildcard and filtered afterwards.
pub(crate) fn pattern_query(
    subject: Option<&Node>,
    predicate: Option<&str>,
    object: Option<&Term>,
) -> StoreResult<String> {
    let s = match subject {
        Some(Node::Iri(iri)) => format!("<{}>", crate::graph::check_iri(iri)?.as_str()),
        _ => "?s".to_string(),
    };
    let p = match predicate {
        Some(iri) => format!("<{}>", crate::graph::check_iri(iri)?.as_str()),
        None => "?p".to_string(),
    };
    let o = match object {
        Some(Term::Iri(iri)) => format!("<{}>", crate::graph::check_iri(iri)?.as_str()),
        Some(Term::Literal(lit)) => lit.to_string(),
        _ => "?o".to_string(),
    };
    Ok(format!("SELECT * WHERE {{ {s} {p} {o} }}"))
}

/// Rebuild the triples of a pattern lookup from its solutions.
pub(crate) fn pattern_triples(
    rows: Vec<Solution>,
    subject: Option<&Node>,
    predicate: Option<&str>,
    object: Option<&Term>,
) -> StoreResult<Vec<Triple>> {
    let mut triples = Vec::with_capacity(rows.len());
    for row in rows {
        let s = match subject {
            Some(node @ Node::Iri(_)) => node.clone(),
            _ => {
                let bound = row.get("s").ok_or_else(|| missing("s"))?;
                bound.to_term().as_node().ok_or_else(|| StoreError::Response {
                    message: "literal bound in subject position".into(),
                })?
            }
        };
        let p = match predicate {
            Some(iri) => iri.to_string(),
            None => row.value("p").ok_or_else(|| missing("p"))?.to_string(),
        };
        let o = match object {
            Some(term @ (Term::Iri(_) | Term::Literal(_))) => term.clone(),
            _ => row.get("o").ok_or_else(|| missing("o"))?.to_term(),
        };
        let triple = Triple::new(s, p, o);
        if triple.matches(subject, predicate, object) {
            triples.push(triple);
        }
    }
    Ok(triples)
}

fn missing(variable: &str) -> StoreError {
    StoreError::Response {
        message: format!("pattern lookup row without ?{variable}"),
    }
}
