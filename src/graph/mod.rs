//! Graph data model and the builders that populate it.
//!
//! The graph is a set of [`Triple`]s. Subjects are IRIs or blank nodes
//! ([`Node`]); objects may also be literals ([`Term`]).
//!
//! - **Obligation graph** ([`builder::GraphBuilder`]): catalogue documents,
//!   their reporting obligations and the typed entities inside them.
//! - **Concept graph** ([`concepts::ConceptBuilder`]): flat glossary terms and
//!   the similarity links between glossaries.
//!
//! Terms render in N-Triples syntax through `Display`, which is also valid
//! SPARQL term syntax.

pub mod builder;
pub mod concepts;

use std::fmt;

use oxigraph::model::{Literal as OxLiteral, NamedNode};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A subject position: an IRI or a blank node label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    Iri(String),
    Blank(String),
}

impl Node {
    /// An IRI node.
    pub fn iri(iri: impl Into<String>) -> Self {
        Node::Iri(iri.into())
    }

    /// The IRI, if this is not a blank node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(iri) => Some(iri),
            Node::Blank(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "<{iri}>"),
            Node::Blank(id) => write!(f, "_:{id}"),
        }
    }
}

/// A literal value with an optional language tag or datatype IRI.
///
/// At most one of `language` and `datatype` is set; neither means a plain
/// `xsd:string` literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl Literal {
    /// A plain string literal.
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    /// A language-tagged literal.
    pub fn tagged(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    /// A literal with an explicit datatype IRI.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.value.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '"' => f.write_str("\\\"")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                '\u{08}' => f.write_str("\\b")?,
                '\u{0C}' => f.write_str("\\f")?,
                c if c.is_control() => write!(f, "\\u{:04X}", c as u32)?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if let Some(datatype) = &self.datatype {
            write!(f, "^^<{datatype}>")
        } else {
            Ok(())
        }
    }
}

/// An object position: IRI, blank node or literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    /// An IRI term.
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// A plain string literal term.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(value))
    }

    /// A language-tagged literal term.
    pub fn tagged(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal::tagged(value, language))
    }

    /// The node behind this term, if it is not a literal.
    pub fn as_node(&self) -> Option<Node> {
        match self {
            Term::Iri(iri) => Some(Node::Iri(iri.clone())),
            Term::Blank(id) => Some(Node::Blank(id.clone())),
            Term::Literal(_) => None,
        }
    }

    /// The IRI, if this term is one.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// The lexical value: IRI text, blank label or literal value.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(id) => id,
            Term::Literal(lit) => &lit.value,
        }
    }
}

impl From<Node> for Term {
    fn from(node: Node) -> Self {
        match node {
            Node::Iri(iri) => Term::Iri(iri),
            Node::Blank(id) => Term::Blank(id),
        }
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(id) => write!(f, "_:{id}"),
            Term::Literal(lit) => lit.fmt(f),
        }
    }
}

/// A (subject, predicate, object) statement; the atomic unit of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Node,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    /// Create a triple.
    pub fn new(subject: Node, predicate: impl Into<String>, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Shorthand for a triple whose subject, predicate and object are all IRIs.
    pub fn iris(subject: &str, predicate: &str, object: &str) -> Self {
        Self::new(Node::iri(subject), predicate, Term::iri(object))
    }

    /// Whether this triple matches a pattern where `None` is a wildcard.
    pub fn matches(&self, subject: Option<&Node>, predicate: Option<&str>, object: Option<&Term>) -> bool {
        subject.is_none_or(|s| s == &self.subject)
            && predicate.is_none_or(|p| p == self.predicate)
            && object.is_none_or(|o| o == &self.object)
    }

    /// Check that every IRI and language tag is well-formed, so the triple can
    /// be written verbatim into an update request.
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Node::Iri(iri) = &self.subject {
            check_iri(iri)?;
        }
        check_iri(&self.predicate)?;
        match &self.object {
            Term::Iri(iri) => check_iri(iri).map(|_| ()),
            Term::Blank(_) => Ok(()),
            Term::Literal(lit) => {
                if let Some(lang) = &lit.language {
                    OxLiteral::new_language_tagged_literal(lit.value.as_str(), lang.as_str())
                        .map_err(|e| StoreError::InvalidTerm {
                            message: format!("language tag {lang:?}: {e}"),
                        })?;
                }
                if let Some(datatype) = &lit.datatype {
                    check_iri(datatype)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// Parse an absolute IRI.
pub fn check_iri(iri: &str) -> Result<NamedNode, StoreError> {
    NamedNode::new(iri).map_err(|e| StoreError::InvalidTerm {
        message: format!("{iri:?}: {e}"),
    })
}

/// Whether a string is an absolute IRI usable as a node identity.
pub fn is_iri(candidate: &str) -> bool {
    NamedNode::new(candidate).is_ok()
}
