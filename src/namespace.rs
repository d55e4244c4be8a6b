//! IRI namespaces and the well-known RDF vocabularies.
//!
//! All classes, properties and generated node ids live under one base IRI.
//! Two sub-namespaces split the collections: `reporting_obligations/` for the
//! obligation graph and its ontology, `concepts/` for glossary terms.

use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default base IRI under which every generated id lives.
pub const DEFAULT_BASE: &str = "http://dgfisma.com/";

/// `rdf:` vocabulary.
pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const VALUE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#value";
    pub const PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
}

/// `rdfs:` vocabulary.
pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
    pub const RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
    pub const LITERAL: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const SUB_PROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
}

/// `owl:` vocabulary.
pub mod owl {
    pub const NS: &str = "http://www.w3.org/2002/07/owl#";
    pub const ONTOLOGY: &str = "http://www.w3.org/2002/07/owl#Ontology";
    pub const CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
}

/// `skos:` vocabulary.
pub mod skos {
    pub const NS: &str = "http://www.w3.org/2004/02/skos/core#";
    pub const CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";
    pub const PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
    pub const DEFINITION: &str = "http://www.w3.org/2004/02/skos/core#definition";
    pub const RELATED_MATCH: &str = "http://www.w3.org/2004/02/skos/core#relatedMatch";
}

/// Dublin Core elements.
pub mod dc {
    pub const NS: &str = "http://purl.org/dc/elements/1.1/";
    pub const TITLE: &str = "http://purl.org/dc/elements/1.1/title";
    pub const IDENTIFIER: &str = "http://purl.org/dc/elements/1.1/identifier";
}

/// The namespace set used by one graph instance.
///
/// Fixed for the lifetime of the process; derived from a single base IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespaces {
    base: String,
    obligations: String,
    concepts: String,
}

impl Namespaces {
    /// Derive the sub-namespaces from a base IRI.
    ///
    /// The base must be an absolute IRI ending in `/` or `#` so that local
    /// names can be appended directly.
    pub fn from_base(base: &str) -> Result<Self, ConfigError> {
        let well_formed =
            (base.ends_with('/') || base.ends_with('#')) && NamedNode::new(base).is_ok();
        if !well_formed {
            return Err(ConfigError::Namespace {
                base: base.to_string(),
            });
        }
        Ok(Self {
            base: base.to_string(),
            obligations: format!("{base}reporting_obligations/"),
            concepts: format!("{base}concepts/"),
        })
    }

    /// The shared base IRI.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Namespace of the obligation graph and its ontology.
    pub fn obligations(&self) -> &str {
        &self.obligations
    }

    /// Namespace of glossary concepts.
    pub fn concepts(&self) -> &str {
        &self.concepts
    }

    /// IRI of a term in the obligation namespace.
    pub fn ro(&self, local: &str) -> String {
        format!("{}{local}", self.obligations)
    }

    /// `CatalogueDocument` class.
    pub fn catalogue_document(&self) -> String {
        self.ro("CatalogueDocument")
    }

    /// `ReportingObligation` class.
    pub fn reporting_obligation(&self) -> String {
        self.ro("ReportingObligation")
    }

    /// `DocumentSource` class.
    pub fn document_source(&self) -> String {
        self.ro("DocumentSource")
    }

    /// `hasReportingObligation` property.
    pub fn has_reporting_obligation(&self) -> String {
        self.ro("hasReportingObligation")
    }

    /// `hasDocumentSource` property.
    pub fn has_document_source(&self) -> String {
        self.ro("hasDocumentSource")
    }

    /// The universal `hasEntity` property every entity predicate specializes.
    pub fn has_entity(&self) -> String {
        self.ro("hasEntity")
    }

    /// Prefix bindings for serializers and query headers.
    pub fn prefixes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rdf", rdf::NS.to_string()),
            ("rdfs", rdfs::NS.to_string()),
            ("owl", owl::NS.to_string()),
            ("skos", skos::NS.to_string()),
            ("dc", dc::NS.to_string()),
            ("dgf", self.base.clone()),
            ("dgfro", self.obligations.clone()),
        ]
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            obligations: format!("{DEFAULT_BASE}reporting_obligations/"),
            concepts: format!("{DEFAULT_BASE}concepts/"),
        }
    }
}
