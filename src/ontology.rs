//! The reporting-obligation vocabulary.
//!
//! A declarative table maps sentence-fragment labels (`ARG0`, `V`,
//! `ARGM-TMP`, ...) to the predicate that links an obligation to the entity
//! and the class of that entity. Every table predicate is declared as a
//! sub-property of `hasEntity` and every table class as a sub-class of
//! `skos:Concept`, so queries discover entity predicates from the graph
//! instead of from this table.
//!
//! Labels missing from the table resolve to `hasEntity`/`skos:Concept`.

use std::collections::BTreeMap;

use crate::graph::{Node, Term, Triple};
use crate::namespace::{dc, owl, rdf, rdfs, skos, Namespaces};
use crate::store::{StoreResult, TripleStore};

/// Title literal attached to the ontology header.
pub const ONTOLOGY_TITLE: &str = "Reporting obligations (RO) vocabulary";

/// Built-in label table: label, predicate local name, class local name.
const ENTITY_TABLE: &[(&str, &str, &str)] = &[
    ("ARG0", "hasReporter", "Reporter"),
    ("ARG1", "hasReport", "Report"),
    ("ARG2", "hasRegulatoryBody", "RegulatoryBody"),
    ("ARG3", "hasDetails", "Details"),
    ("V", "hasVerb", "Verb"),
    ("ARGM-TMP", "hasPropTmp", "PropTmp"),
    ("ARGM-LOC", "hasPropLoc", "PropLoc"),
    ("ARGM-CAU", "hasPropCau", "PropCau"),
    ("ARGM-EXT", "hasPropExt", "PropExt"),
    ("ARGM-MNR", "hasPropMnr", "PropMnr"),
    ("ARGM-PNC", "hasPropPnc", "PropPnc"),
    ("ARGM-ADV", "hasPropAdv", "PropAdv"),
    ("ARGM-DIR", "hasPropDir", "PropDir"),
    ("ARGM-NEG", "hasPropNeg", "PropNeg"),
    ("ARGM-MOD", "hasPropMod", "PropMod"),
    ("ARGM-DIS", "hasPropDis", "PropDis"),
    ("ARGM-PRP", "hasPropPrp", "PropPrp"),
    ("ARGM-PRD", "hasPropPrd", "PropPrd"),
    ("ARGM-COM", "hasPropCom", "PropCom"),
    ("ARGM-GOL", "hasPropGol", "PropGol"),
    ("ARGM-REC", "hasPropRec", "PropRec"),
    ("ARGM-DSP", "hasPropDsp", "PropDsp"),
    ("ARGM-LVB", "hasPropLVB", "PropLvb"),
];

/// The (predicate, class) pair an entity label resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    pub predicate: String,
    pub class: String,
}

/// Registry of entity labels and the schema they imply.
#[derive(Debug, Clone)]
pub struct Ontology {
    ns: Namespaces,
    entries: BTreeMap<String, EntityMapping>,
}

impl Ontology {
    /// The built-in table under the given namespaces.
    pub fn new(ns: Namespaces) -> Self {
        let entries = ENTITY_TABLE
            .iter()
            .map(|(label, predicate, class)| {
                (
                    label.to_string(),
                    EntityMapping {
                        predicate: ns.ro(predicate),
                        class: ns.ro(class),
                    },
                )
            })
            .collect();
        Self { ns, entries }
    }

    /// Add or override a label mapping.
    pub fn with_entry(
        mut self,
        label: impl Into<String>,
        predicate: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        self.entries.insert(
            label.into(),
            EntityMapping {
                predicate: predicate.into(),
                class: class.into(),
            },
        );
        self
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.ns
    }

    /// The mapping of a known label.
    pub fn get(&self, label: &str) -> Option<&EntityMapping> {
        self.entries.get(label)
    }

    /// Resolve a label, falling back to `hasEntity`/`skos:Concept`.
    pub fn resolve(&self, label: &str) -> EntityMapping {
        match self.entries.get(label) {
            Some(mapping) => mapping.clone(),
            None => {
                tracing::info!(label, "unknown entity class; using generic hasEntity/Concept");
                self.fallback()
            }
        }
    }

    /// The generic mapping for unknown labels.
    pub fn fallback(&self) -> EntityMapping {
        EntityMapping {
            predicate: self.ns.has_entity(),
            class: skos::CONCEPT.to_string(),
        }
    }

    /// All `(label, mapping)` entries in label order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &EntityMapping)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every schema declaration triple, without duplicates.
    pub fn schema_triples(&self) -> Vec<Triple> {
        let ns = &self.ns;
        let catalogue = ns.catalogue_document();
        let obligation = ns.reporting_obligation();
        let source = ns.document_source();
        let has_entity = ns.has_entity();

        let header = Node::iri(ns.obligations());
        let mut triples = vec![
            Triple::new(header.clone(), rdf::TYPE, Term::iri(owl::ONTOLOGY)),
            Triple::new(header, dc::TITLE, Term::literal(ONTOLOGY_TITLE)),
        ];

        for class in [&catalogue, &obligation, &source] {
            triples.push(Triple::iris(class, rdf::TYPE, rdfs::CLASS));
            triples.push(Triple::iris(class, rdf::TYPE, owl::CLASS));
        }

        let mut property = |p: &str, domain: &str, range: &str| {
            triples.push(Triple::iris(p, rdf::TYPE, rdf::PROPERTY));
            triples.push(Triple::iris(p, rdfs::DOMAIN, domain));
            triples.push(Triple::iris(p, rdfs::RANGE, range));
        };
        property(&ns.has_reporting_obligation(), &catalogue, &obligation);
        property(rdf::VALUE, &obligation, rdfs::LITERAL);
        property(&has_entity, &obligation, skos::CONCEPT);
        property(&ns.has_document_source(), &catalogue, &source);
        for mapping in self.entries.values() {
            property(&mapping.predicate, &obligation, &mapping.class);
        }

        for mapping in self.entries.values() {
            triples.push(Triple::iris(&mapping.predicate, rdfs::SUB_PROPERTY_OF, &has_entity));
            triples.push(Triple::iris(&mapping.class, rdf::TYPE, rdfs::CLASS));
            triples.push(Triple::iris(&mapping.class, rdfs::SUB_CLASS_OF, skos::CONCEPT));
        }

        let mut seen = std::collections::HashSet::new();
        triples.retain(|t| seen.insert(t.clone()));
        triples
    }

    /// Write the schema into a store. Returns the number of triples added;
    /// a second call adds none.
    pub fn declare_schema<S: TripleStore + ?Sized>(&self, store: &S) -> StoreResult<usize> {
        let mut missing = Vec::new();
        for triple in self.schema_triples() {
            if !store.contains(&triple)? {
                missing.push(triple);
            }
        }
        store.insert_all(&missing)?;
        tracing::info!(added = missing.len(), "ontology schema declared");
        Ok(missing.len())
    }
}

impl Default for Ontology {
    fn default() -> Self {
        Self::new(Namespaces::default())
    }
}
