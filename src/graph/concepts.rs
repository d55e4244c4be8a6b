//! Glossary concept graph.
//!
//! Flat term lists become one `skos:Concept` node each, numbered in input
//! order under the `concepts/` namespace. Similarity links between
//! glossaries are asserted as `skos:relatedMatch`.

use std::collections::BTreeMap;

use crate::error::BuildError;
use crate::id::{sequence_number, IdMinter, SequentialMinter};
use crate::namespace::{rdf, skos, Namespaces};
use crate::store::TripleStore;

use super::builder::BuildResult;
use super::{check_iri, Node, Term, Triple};

/// Builds glossary concepts.
#[derive(Debug)]
pub struct ConceptBuilder {
    ns: Namespaces,
    minter: Box<dyn IdMinter>,
    language: String,
}

impl ConceptBuilder {
    /// A builder numbering concepts `0, 1, 2, ...`.
    pub fn new(ns: Namespaces) -> Self {
        Self::with_minter(ns, Box::new(SequentialMinter::new()))
    }

    pub fn with_minter(ns: Namespaces, minter: Box<dyn IdMinter>) -> Self {
        Self {
            ns,
            minter,
            language: "en".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Add one concept per term, in order. Duplicate terms get separate nodes.
    ///
    /// `definitions`, when given, must have one slot per term; empty or
    /// missing slots attach no definition.
    pub fn add_entity_terms<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        terms: &[String],
        definitions: Option<&[Option<String>]>,
    ) -> BuildResult<Vec<String>> {
        if let Some(defs) = definitions {
            if defs.len() != terms.len() {
                return Err(BuildError::DefinitionMismatch {
                    terms: terms.len(),
                    definitions: defs.len(),
                });
            }
        }

        let mut ids = Vec::with_capacity(terms.len());
        let mut triples = Vec::with_capacity(terms.len() * 3);
        for (i, term) in terms.iter().enumerate() {
            let id = self.minter.next_id(self.ns.concepts(), "");
            let node = Node::iri(id.clone());
            triples.push(Triple::new(node.clone(), rdf::TYPE, Term::iri(skos::CONCEPT)));
            triples.push(Triple::new(
                node.clone(),
                skos::PREF_LABEL,
                Term::tagged(term.as_str(), self.language.as_str()),
            ));
            let definition = definitions
                .and_then(|defs| defs[i].as_deref())
                .filter(|d| !d.is_empty());
            if let Some(def) = definition {
                triples.push(Triple::new(
                    node,
                    skos::DEFINITION,
                    Term::tagged(def, self.language.as_str()),
                ));
            }
            ids.push(id);
        }

        store.insert_all(&triples)?;
        tracing::info!(terms = terms.len(), "glossary terms added");
        Ok(ids)
    }

    /// Assert `key skos:relatedMatch value` for every key and each of its
    /// values. Nodes are not checked for existence. Returns the link count.
    pub fn add_similar_terms<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        links: &BTreeMap<String, Vec<String>>,
    ) -> BuildResult<usize> {
        let mut triples = Vec::new();
        for (from, targets) in links {
            check_iri(from)?;
            for to in targets {
                check_iri(to)?;
                triples.push(Triple::iris(from, skos::RELATED_MATCH, to));
            }
        }
        store.insert_all(&triples)?;
        tracing::info!(links = triples.len(), "similar terms linked");
        Ok(triples.len())
    }

    /// Every sequentially numbered concept with its label, in numeric order.
    pub fn terms<S: TripleStore + ?Sized>(&self, store: &S) -> BuildResult<Vec<(String, String)>> {
        let labels = store.matching(None, Some(skos::PREF_LABEL), None)?;
        let mut numbered: Vec<(u64, String, String)> = labels
            .into_iter()
            .filter_map(|t| {
                let id = t.subject.as_iri()?.to_string();
                let n = sequence_number(&id, self.ns.concepts(), "")?;
                Some((n, id, t.object.value().to_string()))
            })
            .collect();
        numbered.sort();
        Ok(numbered.into_iter().map(|(_, id, label)| (id, label)).collect())
    }
}
