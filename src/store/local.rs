//! Embedded triple store backed by oxigraph.
//!
//! Used in memory for tests and one-shot processing, or on disk (RocksDB)
//! for a durable local graph. All triples live in the default graph.

use std::error::Error as StdError;
use std::path::Path;

use oxigraph::model::vocab::xsd;
use oxigraph::model::{BlankNode, GraphName, Literal as OxLiteral, Quad, Term as OxTerm};
use oxigraph::sparql::QueryResults;
use oxigraph::store::{StorageError, Store};

use crate::error::StoreError;
use crate::graph::{check_iri, Literal, Node, Term, Triple};

use super::{pattern_query, pattern_triples, BoundValue, Solution, StoreResult, TripleStore};

/// Embedded SPARQL-capable RDF store.
pub struct OxigraphStore {
    store: Store,
}

impl OxigraphStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Unavailable {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at the given directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path)?;
        let store = Store::open(path).map_err(|e| StoreError::Unavailable {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "opened oxigraph store");
        Ok(Self { store })
    }

    /// Get the internal store reference (for advanced oxigraph operations).
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl TripleStore for OxigraphStore {
    fn insert(&self, triple: &Triple) -> StoreResult<()> {
        let quad = to_quad(triple)?;
        self.store.insert(&quad).map_err(storage_error)?;
        Ok(())
    }

    fn remove(&self, triple: &Triple) -> StoreResult<()> {
        let quad = to_quad(triple)?;
        self.store.remove(&quad).map_err(storage_error)?;
        Ok(())
    }

    fn contains(&self, triple: &Triple) -> StoreResult<bool> {
        let quad = to_quad(triple)?;
        self.store.contains(&quad).map_err(storage_error)
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
        self.store.len().map_err(storage_error)
    }

    fn select(&self, sparql: &str) -> StoreResult<Vec<Solution>> {
        match self.store.query(sparql).map_err(query_error)? {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(query_error)?;
                    let mut row = Solution::default();
                    for (variable, term) in solution.iter() {
                        row.bind(variable.as_str(), bound_value(term)?);
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(_) => Err(StoreError::Response {
                message: "expected solutions, got a boolean; use ask() for ASK queries".into(),
            }),
            QueryResults::Graph(_) => Err(StoreError::Response {
                message: "CONSTRUCT/DESCRIBE queries are not supported via select()".into(),
            }),
        }
    }

    fn ask(&self, sparql: &str) -> StoreResult<bool> {
        match self.store.query(sparql).map_err(query_error)? {
            QueryResults::Boolean(b) => Ok(b),
            _ => Err(StoreError::Response {
                message: "expected boolean result from ASK query".into(),
            }),
        }
    }
}

impl std::fmt::Debug for OxigraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OxigraphStore").finish()
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Convert a graph triple into an oxigraph default-graph quad.
pub(crate) fn to_quad(triple: &Triple) -> StoreResult<Quad> {
    let predicate = check_iri(&triple.predicate)?;
    let object = to_ox_term(&triple.object)?;
    let quad = match &triple.subject {
        Node::Iri(iri) => Quad::new(check_iri(iri)?, predicate, object, GraphName::DefaultGraph),
        Node::Blank(id) => Quad::new(blank(id)?, predicate, object, GraphName::DefaultGraph),
    };
    Ok(quad)
}

fn to_ox_term(term: &Term) -> StoreResult<OxTerm> {
    Ok(match term {
        Term::Iri(iri) => check_iri(iri)?.into(),
        Term::Blank(id) => blank(id)?.into(),
        Term::Literal(Literal {
            value,
            language: Some(lang),
            ..
        }) => OxLiteral::new_language_tagged_literal(value.as_str(), lang.as_str())
            .map_err(|e| StoreError::InvalidTerm {
                message: format!("language tag {lang:?}: {e}"),
            })?
            .into(),
        Term::Literal(Literal {
            value,
            datatype: Some(datatype),
            ..
        }) => OxLiteral::new_typed_literal(value.as_str(), check_iri(datatype)?).into(),
        Term::Literal(lit) => OxLiteral::new_simple_literal(lit.value.as_str()).into(),
    })
}

fn blank(id: &str) -> StoreResult<BlankNode> {
    BlankNode::new(id).map_err(|e| StoreError::InvalidTerm {
        message: format!("blank node {id:?}: {e}"),
    })
}

fn bound_value(term: &OxTerm) -> StoreResult<BoundValue> {
    #[allow(unreachable_patterns)]
    let term = match term {
        OxTerm::NamedNode(node) => Term::Iri(node.as_str().to_string()),
        OxTerm::BlankNode(node) => Term::Blank(node.as_str().to_string()),
        OxTerm::Literal(lit) => Term::Literal(from_ox_literal(lit)),
        other => {
            return Err(StoreError::Response {
                message: format!("unsupported term in solution: {other}"),
            });
        }
    };
    Ok(BoundValue::from(&term))
}

fn from_ox_literal(lit: &OxLiteral) -> Literal {
    if let Some(lang) = lit.language() {
        Literal::tagged(lit.value(), lang)
    } else if lit.datatype() == xsd::STRING {
        Literal::simple(lit.value())
    } else {
        Literal::typed(lit.value(), lit.datatype().as_str())
    }
}

fn storage_error(e: StorageError) -> StoreError {
    StoreError::Unavailable {
        message: e.to_string(),
    }
}

/// Query failures caused by the storage layer mean the store is unavailable;
/// anything else is a problem with the query itself.
fn query_error<E: StdError + 'static>(e: E) -> StoreError {
    let mut source: Option<&(dyn StdError + 'static)> = Some(&e);
    while let Some(err) = source {
        if err.is::<StorageError>() {
            return StoreError::Unavailable {
                message: e.to_string(),
            };
        }
        source = err.source();
    }
    StoreError::QuerySyntax {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(s: &str, p: &str, o: Term) -> Triple {
        Triple::new(Node::iri(format!("http://x/{s}")), format!("http://x/{p}"), o)
    }

    #[test]
    fn insert_and_query() {
        let store = OxigraphStore::in_memory().unwrap();
        store
            .insert(&triple("a", "label", Term::tagged("the Board", "en")))
            .unwrap();

        let rows = store.select("SELECT ?s ?o WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(rows.len(), 1);
        let o = rows[0].get("o").unwrap();
        assert_eq!(o.value, "the Board");
        assert_eq!(o.language.as_deref(), Some("en"));
        assert_eq!(rows[0].value("s"), Some("http://x/a"));
    }

    #[test]
    fn duplicate_insert_is_a_set() {
        let store = OxigraphStore::in_memory().unwrap();
        let t = triple("a", "p", Term::iri("http://x/b"));
        store.insert(&t).unwrap();
        store.insert(&t).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        store.remove(&t).unwrap();
        store.remove(&t).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn matching_by_pattern() {
        let store = OxigraphStore::in_memory().unwrap();
        store
            .insert_all(&[
                triple("a", "p", Term::iri("http://x/b")),
                triple("a", "q", Term::literal("text")),
                triple("c", "p", Term::iri("http://x/b")),
            ])
            .unwrap();

        let from_a = store.matching(Some(&Node::iri("http://x/a")), None, None).unwrap();
        assert_eq!(from_a.len(), 2);

        let to_b = store
            .matching(None, Some("http://x/p"), Some(&Term::iri("http://x/b")))
            .unwrap();
        assert_eq!(to_b.len(), 2);

        let by_literal = store
            .matching(None, None, Some(&Term::literal("text")))
            .unwrap();
        assert_eq!(by_literal, vec![triple("a", "q", Term::literal("text"))]);
    }

    #[test]
    fn ask_query() {
        let store = OxigraphStore::in_memory().unwrap();
        store.insert(&triple("a", "p", Term::iri("http://x/b"))).unwrap();
        assert!(store.ask("ASK { <http://x/a> ?p ?o }").unwrap());
        assert!(!store.ask("ASK { <http://x/zzz> ?p ?o }").unwrap());
    }

    #[test]
    fn malformed_query_is_a_syntax_error() {
        let store = OxigraphStore::in_memory().unwrap();
        let err = store.select("SELECT ?s WHERE { ?s ").unwrap_err();
        assert!(matches!(err, StoreError::QuerySyntax { .. }));
    }

    #[test]
    fn typed_literals_survive() {
        let store = OxigraphStore::in_memory().unwrap();
        let lit = Term::Literal(Literal::typed("3", "http://www.w3.org/2001/XMLSchema#integer"));
        let t = triple("a", "count", lit.clone());
        store.insert(&t).unwrap();
        assert!(store.contains(&t).unwrap());
        let back = store.all_triples().unwrap();
        assert_eq!(back[0].object, lit);
    }
}
