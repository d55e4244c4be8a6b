//! Transactional document ingestion.
//!
//! The [`Ingestor`] is the write path used by the CLI: each call runs the
//! builder inside one [`AuditedStore`] transaction, committing on success and
//! rolling back before any error reaches the caller. Writers to the same
//! `doc_id` are serialized through a keyed lock table; different documents
//! proceed in parallel.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotatedNode, AnnotationNode};
use crate::graph::builder::{BuildResult, GraphBuilder};
use crate::store::{AuditedStore, TripleStore};

/// Where a document was retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Source IRI, e.g. the publishing website.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SourceSpec {
    pub fn new(url: impl Into<String>, name: Option<String>) -> Self {
        Self { url: url.into(), name }
    }
}

/// One mutex per `doc_id` currently being written.
#[derive(Debug, Default)]
struct DocumentLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DocumentLocks {
    fn with_lock<T>(&self, doc_id: &str, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out so the shard lock is released before blocking.
        let lock = self.locks.entry(doc_id.to_string()).or_default().clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        self.locks.remove_if(doc_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Serialized, transactional write access to the obligation graph.
#[derive(Debug)]
pub struct Ingestor<S: TripleStore> {
    store: S,
    builder: GraphBuilder,
    locks: DocumentLocks,
}

impl<S: TripleStore> Ingestor<S> {
    pub fn new(store: S, builder: GraphBuilder) -> Self {
        Self {
            store,
            builder,
            locks: DocumentLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn builder(&self) -> &GraphBuilder {
        &self.builder
    }

    /// Ingest (or re-ingest) a document, optionally linking its source.
    ///
    /// Any earlier version of `doc_id` is replaced. Either every triple of the
    /// new version is committed or the store is left untouched.
    pub fn ingest(
        &self,
        tree: &AnnotationNode,
        doc_id: &str,
        source: Option<&SourceSpec>,
    ) -> BuildResult<AnnotatedNode> {
        self.transaction(doc_id, |tx| {
            let annotated = self.builder.replace_document(tx, tree, doc_id)?;
            if let Some(src) = source {
                self.builder
                    .add_document_source(tx, doc_id, &src.url, src.name.as_deref())?;
            }
            Ok(annotated)
        })
    }

    /// Remove a document in one transaction. Returns the triples removed.
    pub fn remove(&self, doc_id: &str) -> BuildResult<usize> {
        self.transaction(doc_id, |tx| self.builder.remove_document(tx, doc_id))
    }

    /// Attach a source to an already ingested document.
    pub fn link_source(&self, doc_id: &str, source: &SourceSpec) -> BuildResult<()> {
        self.transaction(doc_id, |tx| {
            self.builder
                .add_document_source(tx, doc_id, &source.url, source.name.as_deref())
        })
    }

    fn transaction<T>(
        &self,
        doc_id: &str,
        f: impl FnOnce(&AuditedStore<&S>) -> BuildResult<T>,
    ) -> BuildResult<T> {
        self.locks.with_lock(doc_id, || {
            let tx = AuditedStore::new(&self.store);
            match f(&tx) {
                Ok(value) => match tx.commit() {
                    Ok(_) => Ok(value),
                    Err(e) => {
                        tracing::warn!(doc_id, error = %e, "commit failed; store state unknown");
                        Err(e.into())
                    }
                },
                Err(e) => {
                    let discarded = tx.rollback();
                    tracing::warn!(doc_id, discarded, error = %e, "ingestion rolled back");
                    Err(e)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::id::MintStrategy;
    use crate::ontology::Ontology;
    use crate::store::OxigraphStore;

    fn ingestor() -> Ingestor<OxigraphStore> {
        let builder = GraphBuilder::new(Ontology::default(), MintStrategy::RandomSerial.build());
        Ingestor::new(OxigraphStore::in_memory().unwrap(), builder)
    }

    fn tree(text: &str) -> AnnotationNode {
        AnnotationNode::document(vec![AnnotationNode::obligation(
            text,
            vec![AnnotationNode::entity("ARG0", "The Board")],
        )])
    }

    #[test]
    fn reingest_replaces() {
        let ing = ingestor();
        ing.ingest(&tree("old text"), "doc-1", None).unwrap();
        let size = ing.store().len().unwrap();
        ing.ingest(&tree("new text"), "doc-1", None).unwrap();
        assert_eq!(ing.store().len().unwrap(), size);
        assert_eq!(ing.locks.len(), 0);
    }

    #[test]
    fn failed_source_rolls_back_document() {
        let ing = ingestor();
        let bad = SourceSpec::new("not a uri", None);
        let err = ing.ingest(&tree("text"), "doc-1", Some(&bad)).unwrap_err();
        assert!(matches!(err, BuildError::Store(_)));
        assert!(ing.store().is_empty().unwrap());
    }

    #[test]
    fn failed_reingest_keeps_previous_version() {
        let ing = ingestor();
        ing.ingest(&tree("kept"), "doc-1", None).unwrap();
        let before = ing.store().all_triples().unwrap();

        let bad = SourceSpec::new("not a uri", None);
        assert!(ing.ingest(&tree("lost"), "doc-1", Some(&bad)).is_err());
        let mut after = ing.store().all_triples().unwrap();
        let mut before = before;
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn concurrent_writers_to_one_document_serialize() {
        let ing = ingestor();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let ing = &ing;
                scope.spawn(move || {
                    ing.ingest(&tree(&format!("version {i}")), "doc-1", None).unwrap();
                });
            }
        });
        let docs = ing
            .store()
            .matching(None, Some(crate::namespace::dc::IDENTIFIER), None)
            .unwrap();
        assert_eq!(docs.len(), 1);
        let texts = ing
            .store()
            .matching(None, Some(crate::namespace::rdf::VALUE), None)
            .unwrap();
        assert_eq!(texts.len(), 1);
    }
}
