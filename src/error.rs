//! Rich diagnostic error types for ro-graph.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers can tell a malformed
//! annotation tree apart from an unreachable store or a rejected query.
//!
//! Unknown entity classes have no variant: the ontology fallback recovers
//! them and only logs.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for ro-graph.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum RoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Annotation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AnnotationError {
    #[error("malformed annotation at {path}: missing field `{field}`")]
    #[diagnostic(
        code(ro::annotation::missing_field),
        help(
            "Every obligation and entity node needs a `value`, and every entity \
             node needs a `class` label. Check the output of the annotation parser."
        )
    )]
    MissingField { path: String, field: &'static str },

    #[error("malformed annotation at {path}: {message}")]
    #[diagnostic(
        code(ro::annotation::shape),
        help(
            "The tree must be exactly three levels deep: document, obligations, \
             entities. Entities cannot have children of their own."
        )
    )]
    UnexpectedShape { path: String, message: String },

    #[error("annotation tree is not valid JSON: {message}")]
    #[diagnostic(
        code(ro::annotation::json),
        help("The input must be a JSON object with `value`, `children` and `class` keys.")
    )]
    Json { message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("graph store unavailable: {message}")]
    #[diagnostic(
        code(ro::store::unavailable),
        help(
            "The triple store could not be reached or rejected the request. \
             Check the endpoint URLs and credentials, or the data directory \
             for an embedded store. Any open transaction has been rolled back."
        )
    )]
    Unavailable { message: String },

    #[error("query rejected by the store: {message}")]
    #[diagnostic(
        code(ro::store::query_syntax),
        help(
            "The store could not parse a generated query. This points at a bug \
             in query synthesis; run with RUST_LOG=ro_graph=debug to see the query text."
        )
    )]
    QuerySyntax { message: String },

    #[error("invalid RDF term: {message}")]
    #[diagnostic(
        code(ro::store::invalid_term),
        help("IRIs must be absolute (e.g. `https://example.com/doc1`) and language tags well-formed.")
    )]
    InvalidTerm { message: String },

    #[error("unexpected store response: {message}")]
    #[diagnostic(
        code(ro::store::response),
        help("The store answered with a result shape that does not match the query form.")
    )]
    Response { message: String },

    #[error("RDF serialization error: {message}")]
    #[diagnostic(
        code(ro::store::serialization),
        help(
            "Failed to read or write an RDF document. Check that the format \
             matches the file contents (rdfxml, turtle or ntriples)."
        )
    )]
    Serialization { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(ro::store::io),
        help("A filesystem operation failed. Check paths and permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(source: std::io::Error) -> Self {
        StoreError::Io { source }
    }
}

// ---------------------------------------------------------------------------
// Graph builder errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("document already ingested: {doc_id}")]
    #[diagnostic(
        code(ro::build::duplicate_document),
        help(
            "Re-ingesting a document replaces it. Use `replace_document` (or the \
             Ingestor) instead of `add_document` for an existing doc_id."
        )
    )]
    DuplicateDocument { doc_id: String },

    #[error("document not found: {doc_id}")]
    #[diagnostic(
        code(ro::build::document_not_found),
        help("Ingest the document before attaching a document source to it.")
    )]
    DocumentNotFound { doc_id: String },

    #[error("terms and definitions differ in length: {terms} terms, {definitions} definitions")]
    #[diagnostic(
        code(ro::build::definition_mismatch),
        help("Supply exactly one definition slot (possibly empty) per term.")
    )]
    DefinitionMismatch { terms: usize, definitions: usize },

    #[error("minted id already in use: {id}")]
    #[diagnostic(
        code(ro::build::id_collision),
        help(
            "A sequential minter was started below ids already in the graph. \
             Seed it with `next_sequence_number` before ingesting, or switch \
             `minting` to `random-serial`."
        )
    )]
    IdCollision { id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("unexpected binding in query result: variable `{variable}` {message}")]
    #[diagnostic(
        code(ro::query::binding),
        help("The store returned a row that does not match the generated projection.")
    )]
    Binding { variable: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(ro::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(ro::config::parse),
        help("Check the TOML syntax and field names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(ro::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid namespace base: {base}")]
    #[diagnostic(
        code(ro::config::namespace),
        help("The namespace base must be an absolute IRI ending in `/` or `#`.")
    )]
    Namespace { base: String },
}

/// Convenience alias for functions returning ro-graph results.
pub type RoResult<T> = std::result::Result<T, RoError>;
