//! Annotation trees: the ingestion input and its id-annotated output.
//!
//! The annotation parser hands over a three-level tree (document,
//! obligations, entities) as JSON with `value`, `children` and `class` keys.
//! Ingestion answers with an [`AnnotatedNode`] tree of the same shape in which
//! every node also carries the `id` minted for it.

use serde::{Deserialize, Serialize};

use crate::error::AnnotationError;

/// Result type for annotation parsing and validation.
pub type AnnotationResult<T> = std::result::Result<T, AnnotationError>;

/// One node of the input tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AnnotationNode>,
    /// Sentence-fragment label of an entity, e.g. `ARG0` or `ARGM-TMP`.
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Parser metadata; carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl AnnotationNode {
    /// A document node with the given obligations.
    pub fn document(obligations: Vec<AnnotationNode>) -> Self {
        Self {
            children: obligations,
            ..Self::default()
        }
    }

    /// An obligation node with its text and entities.
    pub fn obligation(text: impl Into<String>, entities: Vec<AnnotationNode>) -> Self {
        Self {
            value: Some(text.into()),
            children: entities,
            ..Self::default()
        }
    }

    /// An entity leaf.
    pub fn entity(class: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: Some(text.into()),
            class: Some(class.into()),
            ..Self::default()
        }
    }

    /// Parse a document tree from JSON.
    pub fn from_json(json: &str) -> AnnotationResult<Self> {
        serde_json::from_str(json).map_err(|e| AnnotationError::Json {
            message: e.to_string(),
        })
    }

    /// Check that this node is a well-formed document tree.
    ///
    /// Errors name the offending node by its path from the root, e.g.
    /// `children[2].children[0]`.
    pub fn validate(&self) -> AnnotationResult<()> {
        for (i, obligation) in self.children.iter().enumerate() {
            let path = format!("children[{i}]");
            if obligation.value.is_none() {
                return Err(AnnotationError::MissingField { path, field: "value" });
            }
            for (j, entity) in obligation.children.iter().enumerate() {
                let path = format!("{path}.children[{j}]");
                if entity.value.is_none() {
                    return Err(AnnotationError::MissingField { path, field: "value" });
                }
                if entity.class.is_none() {
                    return Err(AnnotationError::MissingField { path, field: "class" });
                }
                if !entity.children.is_empty() {
                    return Err(AnnotationError::UnexpectedShape {
                        path,
                        message: format!(
                            "entity has {} children; entities must be leaves",
                            entity.children.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of obligations and entities in the tree.
    pub fn counts(&self) -> (usize, usize) {
        let entities = self.children.iter().map(|o| o.children.len()).sum();
        (self.children.len(), entities)
    }
}

/// A node of the ingestion output: the input node plus its minted id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AnnotatedNode>,
}

impl AnnotatedNode {
    /// Ids of every node, document first, in tree order.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = vec![self.id.as_str()];
        for child in &self.children {
            out.extend(child.ids());
        }
        out
    }
}
