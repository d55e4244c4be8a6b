//! RDF document import and export for any [`TripleStore`].
//!
//! Export writes every triple in a stable order with the namespace prefixes
//! bound, so repeated exports of the same graph are byte-identical. Import
//! parses into a staging store first; nothing reaches the target unless the
//! whole document parses.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use oxigraph::io::{RdfFormat, RdfSerializer};

use crate::error::StoreError;
use crate::namespace::Namespaces;

use super::local::{to_quad, OxigraphStore};
use super::{StoreResult, TripleStore};

/// Supported RDF document syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphFormat {
    #[default]
    RdfXml,
    Turtle,
    NTriples,
}

impl GraphFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            GraphFormat::RdfXml => "rdf",
            GraphFormat::Turtle => "ttl",
            GraphFormat::NTriples => "nt",
        }
    }

    fn rdf_format(self) -> RdfFormat {
        match self {
            GraphFormat::RdfXml => RdfFormat::RdfXml,
            GraphFormat::Turtle => RdfFormat::Turtle,
            GraphFormat::NTriples => RdfFormat::NTriples,
        }
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rdfxml" | "rdf" | "xml" | "owl" => Ok(GraphFormat::RdfXml),
            "turtle" | "ttl" => Ok(GraphFormat::Turtle),
            "ntriples" | "nt" => Ok(GraphFormat::NTriples),
            other => Err(format!(
                "unknown RDF format {other:?} (expected rdfxml, turtle or ntriples)"
            )),
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFormat::RdfXml => write!(f, "rdfxml"),
            GraphFormat::Turtle => write!(f, "turtle"),
            GraphFormat::NTriples => write!(f, "ntriples"),
        }
    }
}

/// Serialize the whole store. Returns the number of triples written.
pub fn export<S, W>(store: &S, format: GraphFormat, ns: &Namespaces, writer: W) -> StoreResult<usize>
where
    S: TripleStore + ?Sized,
    W: Write,
{
    let mut triples = store.all_triples()?;
    triples.sort();

    let mut serializer = RdfSerializer::from_format(format.rdf_format());
    if format != GraphFormat::NTriples {
        for (prefix, iri) in ns.prefixes() {
            serializer = serializer
                .with_prefix(prefix, iri)
                .map_err(|e| StoreError::Serialization {
                    message: format!("prefix {prefix}: {e}"),
                })?;
        }
    }
    let mut out = serializer.for_writer(writer);
    for triple in &triples {
        out.serialize_quad(&to_quad(triple)?)?;
    }
    out.finish()?;
    tracing::info!(triples = triples.len(), %format, "graph exported");
    Ok(triples.len())
}

/// Parse an RDF document and add its triples to the store.
///
/// Returns the number of triples in the document. Triples already present
/// are counted but not duplicated.
pub fn load<S, R>(store: &S, format: GraphFormat, reader: R) -> StoreResult<usize>
where
    S: TripleStore + ?Sized,
    R: Read,
{
    let staging = OxigraphStore::in_memory()?;
    staging
        .store()
        .load_from_reader(format.rdf_format(), reader)
        .map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
    let triples = staging.all_triples()?;
    store.insert_all(&triples)?;
    tracing::info!(triples = triples.len(), %format, "graph loaded");
    Ok(triples.len())
}
