//! # ro-graph
//!
//! A knowledge graph of reporting obligations extracted from regulatory
//! documents, stored as RDF and queried through filtered SPARQL.
//!
//! ## Architecture
//!
//! - **Annotations** (`annotation`): the three-level document/obligation/entity tree
//! - **Ontology** (`ontology`): entity label to predicate/class registry and schema triples
//! - **Graph building** (`graph`): ingest trees and glossary terms as triples
//! - **Stores** (`store`): embedded oxigraph, remote SPARQL endpoints, transactional wrapper
//! - **Ingestion** (`ingest`): per-document serialized, all-or-nothing writes
//! - **Queries** (`query`): drop-down values, conjunctive filters, grouped counts
//!
//! ## Library usage
//!
//! ```no_run
//! use ro_graph::annotation::AnnotationNode;
//! use ro_graph::graph::builder::GraphBuilder;
//! use ro_graph::id::MintStrategy;
//! use ro_graph::ingest::Ingestor;
//! use ro_graph::namespace::Namespaces;
//! use ro_graph::ontology::Ontology;
//! use ro_graph::query::{Constraint, Filter, QueryProvider};
//! use ro_graph::store::OxigraphStore;
//!
//! let store = OxigraphStore::in_memory().unwrap();
//! let ontology = Ontology::default();
//! ontology.declare_schema(&store).unwrap();
//!
//! let ingestor = Ingestor::new(&store, GraphBuilder::new(ontology, MintStrategy::default().build()));
//! let tree = AnnotationNode::document(vec![AnnotationNode::obligation(
//!     "The Board shall report annually.",
//!     vec![AnnotationNode::entity("ARG0", "The Board")],
//! )]);
//! ingestor.ingest(&tree, "https://example.com/doc1", None).unwrap();
//!
//! let ns = Namespaces::default();
//! let reporter = ns.ro("hasReporter");
//! let queries = QueryProvider::new(&store, ns);
//! let filter = Filter::new().constraint(Constraint::one(reporter, "the board"));
//! assert_eq!(queries.filter_obligations(&filter).unwrap().len(), 1);
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod graph;
pub mod id;
pub mod ingest;
pub mod namespace;
pub mod ontology;
pub mod query;
pub mod store;
