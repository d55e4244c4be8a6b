//! Obligation graph construction.
//!
//! [`GraphBuilder`] turns an annotation tree into CatalogueDocument,
//! ReportingObligation and entity nodes, and maintains the document-source
//! side relation. It writes through any [`TripleStore`]; wrap the store in an
//! [`AuditedStore`](crate::store::AuditedStore) to make a sequence of calls
//! atomic.

use crate::annotation::{AnnotatedNode, AnnotationNode};
use crate::error::BuildError;
use crate::id::{sequence_number, IdMinter};
use crate::namespace::{dc, rdf, skos, Namespaces};
use crate::ontology::Ontology;
use crate::store::TripleStore;

use super::{check_iri, is_iri, Node, Term, Triple};

/// Result type for graph construction.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Id prefix of minted CatalogueDocument nodes.
pub const DOCUMENT_PREFIX: &str = "cat_doc_";
/// Id prefix of minted ReportingObligation nodes.
pub const OBLIGATION_PREFIX: &str = "rep_obl_";
/// Id prefix of minted entity nodes.
pub const ENTITY_PREFIX: &str = "entity_";

/// Builds the obligation graph from annotation trees.
#[derive(Debug)]
pub struct GraphBuilder {
    ontology: Ontology,
    minter: Box<dyn IdMinter>,
    language: String,
}

impl GraphBuilder {
    /// A builder over an ontology, minting ids with the given strategy.
    pub fn new(ontology: Ontology, minter: Box<dyn IdMinter>) -> Self {
        Self {
            ontology,
            minter,
            language: "en".to_string(),
        }
    }

    /// Set the language tag of entity labels.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn namespaces(&self) -> &Namespaces {
        self.ontology.namespaces()
    }

    /// Mint an id and make sure no node in the store already uses it.
    fn mint<S: TripleStore + ?Sized>(&self, store: &S, prefix: &str) -> BuildResult<String> {
        let id = self.minter.next_id(self.namespaces().obligations(), prefix);
        if !store.matching(Some(&Node::iri(id.as_str())), None, None)?.is_empty() {
            return Err(BuildError::IdCollision { id });
        }
        Ok(id)
    }

    /// Ingest one document tree.
    ///
    /// Fails with [`BuildError::IdCollision`] if the minter hands out an id
    /// that is already a subject in the store; nothing is written then.
    ///
    /// The document node is `doc_id` itself when that is an absolute IRI,
    /// otherwise a minted `cat_doc_` node; in both cases `dc:identifier`
    /// carries `doc_id`. All triples are written in one `insert_all`.
    ///
    /// Fails with [`BuildError::DuplicateDocument`] if `doc_id` is already in
    /// the graph; use [`replace_document`](Self::replace_document) to re-ingest.
    pub fn add_document<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        tree: &AnnotationNode,
        doc_id: &str,
    ) -> BuildResult<AnnotatedNode> {
        tree.validate()?;
        if self.find_document(store, doc_id)?.is_some() {
            return Err(BuildError::DuplicateDocument {
                doc_id: doc_id.to_string(),
            });
        }

        let ns = self.namespaces();
        let has_obligation = ns.has_reporting_obligation();
        let doc_iri = if is_iri(doc_id) {
            doc_id.to_string()
        } else {
            self.mint(store, DOCUMENT_PREFIX)?
        };
        let doc = Node::iri(doc_iri.clone());

        let mut triples = vec![
            Triple::new(doc.clone(), rdf::TYPE, Term::iri(ns.catalogue_document())),
            Triple::new(doc.clone(), dc::IDENTIFIER, Term::literal(doc_id)),
        ];
        let mut obligations = Vec::with_capacity(tree.children.len());

        for obligation in &tree.children {
            let text = obligation.value.clone().unwrap_or_default();
            let ob_iri = self.mint(store, OBLIGATION_PREFIX)?;
            let ob = Node::iri(ob_iri.clone());
            triples.push(Triple::new(ob.clone(), rdf::TYPE, Term::iri(ns.reporting_obligation())));
            triples.push(Triple::new(doc.clone(), has_obligation.as_str(), Term::iri(ob_iri.clone())));
            triples.push(Triple::new(ob.clone(), rdf::VALUE, Term::literal(text.clone())));

            let mut entities = Vec::with_capacity(obligation.children.len());
            for entity in &obligation.children {
                let label = entity.class.as_deref().unwrap_or_default();
                let surface = entity.value.clone().unwrap_or_default();
                let mapping = self.ontology.resolve(label);
                let ent_iri = self.mint(store, ENTITY_PREFIX)?;
                let ent = Node::iri(ent_iri.clone());
                triples.push(Triple::new(ent.clone(), rdf::TYPE, Term::iri(mapping.class)));
                triples.push(Triple::new(
                    ent,
                    skos::PREF_LABEL,
                    Term::tagged(surface.clone(), self.language.as_str()),
                ));
                triples.push(Triple::new(ob.clone(), mapping.predicate, Term::iri(ent_iri.clone())));
                entities.push(AnnotatedNode {
                    id: ent_iri,
                    value: Some(surface),
                    class: entity.class.clone(),
                    children: Vec::new(),
                });
            }

            obligations.push(AnnotatedNode {
                id: ob_iri,
                value: Some(text),
                class: obligation.class.clone(),
                children: entities,
            });
        }

        store.insert_all(&triples)?;
        let (n_obligations, n_entities) = tree.counts();
        tracing::info!(
            doc_id,
            node = %doc_iri,
            obligations = n_obligations,
            entities = n_entities,
            triples = triples.len(),
            "document added"
        );

        Ok(AnnotatedNode {
            id: doc_iri,
            value: tree.value.clone(),
            class: tree.class.clone(),
            children: obligations,
        })
    }

    /// The CatalogueDocument node carrying `doc_id`, if any.
    pub fn find_document<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        doc_id: &str,
    ) -> BuildResult<Option<Node>> {
        let class = Term::iri(self.namespaces().catalogue_document());
        let candidates = store.matching(None, Some(dc::IDENTIFIER), Some(&Term::literal(doc_id)))?;
        for triple in candidates {
            if store.contains(&Triple::new(triple.subject.clone(), rdf::TYPE, class.clone()))? {
                return Ok(Some(triple.subject));
            }
        }
        Ok(None)
    }

    /// Delete a document together with its obligations and their entities.
    ///
    /// Returns the number of triples removed; an unknown `doc_id` removes
    /// nothing. Document-source nodes are shared and stay in place.
    pub fn remove_document<S: TripleStore + ?Sized>(&self, store: &S, doc_id: &str) -> BuildResult<usize> {
        let Some(doc) = self.find_document(store, doc_id)? else {
            return Ok(0);
        };
        let has_obligation = self.namespaces().has_reporting_obligation();

        let doc_triples = store.matching(Some(&doc), None, None)?;
        let mut doomed = Vec::new();
        for link in doc_triples.iter().filter(|t| t.predicate == has_obligation) {
            let Some(ob) = link.object.as_node() else {
                continue;
            };
            let ob_triples = store.matching(Some(&ob), None, None)?;
            for edge in &ob_triples {
                if edge.predicate == rdf::TYPE {
                    continue;
                }
                if let Some(entity) = edge.object.as_node() {
                    doomed.extend(store.matching(Some(&entity), None, None)?);
                }
            }
            doomed.extend(ob_triples);
        }
        doomed.extend(doc_triples);

        store.remove_all(&doomed)?;
        tracing::info!(doc_id, triples = doomed.len(), "document removed");
        Ok(doomed.len())
    }

    /// Remove any existing version of `doc_id`, then add `tree` in its place.
    ///
    /// The tree is validated before anything is removed.
    pub fn replace_document<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        tree: &AnnotationNode,
        doc_id: &str,
    ) -> BuildResult<AnnotatedNode> {
        tree.validate()?;
        let removed = self.remove_document(store, doc_id)?;
        if removed > 0 {
            tracing::debug!(doc_id, removed, "replacing existing document");
        }
        self.add_document(store, tree, doc_id)
    }

    /// Link a document to the source it was retrieved from.
    ///
    /// The source node is `source_uri` itself. A `source_name` is attached as
    /// `rdf:value` on the source node. Repeating the call adds nothing.
    pub fn add_document_source<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        doc_id: &str,
        source_uri: &str,
        source_name: Option<&str>,
    ) -> BuildResult<()> {
        let doc = self
            .find_document(store, doc_id)?
            .ok_or_else(|| BuildError::DocumentNotFound {
                doc_id: doc_id.to_string(),
            })?;
        check_iri(source_uri)?;
        let ns = self.namespaces();
        let source = Node::iri(source_uri);

        let mut triples = vec![
            Triple::new(doc, ns.has_document_source(), Term::iri(source_uri)),
            Triple::new(source.clone(), rdf::TYPE, Term::iri(ns.document_source())),
        ];
        if let Some(name) = source_name {
            triples.push(Triple::new(source, rdf::VALUE, Term::literal(name)));
        }
        store.insert_all(&triples)?;
        tracing::debug!(doc_id, source = source_uri, "document source linked");
        Ok(())
    }

    /// Unlink a document from its source.
    ///
    /// With `remove_node`, the source node's own triples go too unless another
    /// document still references it. Nothing linked means nothing to do.
    pub fn remove_document_source<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        doc_id: &str,
        remove_node: bool,
    ) -> BuildResult<()> {
        let Some(doc) = self.find_document(store, doc_id)? else {
            return Ok(());
        };
        let has_source = self.namespaces().has_document_source();
        let links = store.matching(Some(&doc), Some(has_source.as_str()), None)?;
        if links.is_empty() {
            return Ok(());
        }
        store.remove_all(&links)?;

        if remove_node {
            for link in &links {
                let still_used = !store.matching(None, Some(has_source.as_str()), Some(&link.object))?.is_empty();
                if still_used {
                    continue;
                }
                if let Some(source) = link.object.as_node() {
                    let own = store.matching(Some(&source), None, None)?;
                    store.remove_all(&own)?;
                }
            }
        }
        tracing::debug!(doc_id, remove_node, "document source unlinked");
        Ok(())
    }

    /// The source IRI a document is linked to.
    pub fn document_source<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        doc_id: &str,
    ) -> BuildResult<Option<String>> {
        let Some(doc) = self.find_document(store, doc_id)? else {
            return Ok(None);
        };
        let has_source = self.namespaces().has_document_source();
        let links = store.matching(Some(&doc), Some(has_source.as_str()), None)?;
        Ok(links
            .into_iter()
            .find_map(|t| t.object.as_iri().map(str::to_string)))
    }
}

/// The first free suffix for a [`SequentialMinter`](crate::id::SequentialMinter)
/// writing document, obligation and entity nodes under `ns`.
///
/// Scans every typed subject in the obligations namespace; an empty graph
/// yields `0`.
pub fn next_sequence_number<S: TripleStore + ?Sized>(store: &S, ns: &Namespaces) -> BuildResult<u64> {
    let typed = store.matching(None, Some(rdf::TYPE), None)?;
    let next = typed
        .iter()
        .filter_map(|t| t.subject.as_iri())
        .filter_map(|iri| {
            [DOCUMENT_PREFIX, OBLIGATION_PREFIX, ENTITY_PREFIX]
                .iter()
                .find_map(|prefix| sequence_number(iri, ns.obligations(), prefix))
        })
        .max()
        .map_or(0, |n| n + 1);
    Ok(next)
}
