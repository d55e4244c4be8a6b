//! Filter parameters and the graph patterns they expand to.
//!
//! A [`Filter`] selects reporting obligations: every [`Constraint`] must hold
//! (AND), and a constraint holds when any of its values matches (OR). Values
//! match entity labels case-insensitively, either exactly after trimming or as
//! a substring. A [`Scope`] further restricts obligations to a set of
//! documents and/or a document source.

use serde::{Deserialize, Serialize};

use crate::graph::{is_iri, Term};
use crate::namespace::{rdf, skos, Namespaces};

use super::fragment::{Expr, Pattern, Slot};

/// Variable bound to the reporting obligation in every filter query.
pub const OBLIGATION_VAR: &str = "ro";
const DOCUMENT_VAR: &str = "doc";

/// Entity values required under one predicate; any one of them suffices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub predicate: String,
    pub values: Vec<String>,
}

impl Constraint {
    pub fn new<I, V>(predicate: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            predicate: predicate.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// A constraint with a single value.
    pub fn one(predicate: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(predicate, [value.into()])
    }
}

/// Restriction of results to documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// CatalogueDocument IRIs. `Some(empty)` matches nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    /// DocumentSource IRI the documents must be linked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Scope {
    pub fn is_unrestricted(&self) -> bool {
        self.documents.is_none() && self.source.is_none()
    }
}

/// A complete obligation filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default = "default_exact")]
    pub exact_match: bool,
    #[serde(default)]
    pub scope: Scope,
}

fn default_exact() -> bool {
    true
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            constraints: Vec::new(),
            exact_match: true,
            scope: Scope::default(),
        }
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn exact_match(mut self, exact: bool) -> Self {
        self.exact_match = exact;
        self
    }

    pub fn documents<I, V>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.scope.documents = Some(documents.into_iter().map(Into::into).collect());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.scope.source = Some(source.into());
        self
    }

    /// Patterns binding `?ro` to every obligation this filter selects.
    ///
    /// Returns `None` when the filter can match nothing: a constraint
    /// predicate or scope IRI that is not an IRI at all, or a document scope
    /// with no usable entries.
    pub(crate) fn obligation_patterns(&self, ns: &Namespaces) -> Option<Vec<Pattern>> {
        let ro = || Slot::var(OBLIGATION_VAR);
        let mut patterns = vec![Pattern::triple(
            ro(),
            Slot::iri(rdf::TYPE),
            Slot::iri(ns.reporting_obligation()),
        )];

        let active = self.constraints.iter().filter(|c| !c.values.is_empty());
        for (k, constraint) in active.enumerate() {
            if !is_iri(&constraint.predicate) {
                tracing::debug!(predicate = %constraint.predicate, "filter predicate is not an IRI");
                return None;
            }
            let entity = format!("c{k}");
            let label = format!("l{k}");
            patterns.push(Pattern::triple(
                ro(),
                Slot::iri(constraint.predicate.clone()),
                Slot::var(entity.clone()),
            ));
            patterns.push(Pattern::triple(
                Slot::var(entity),
                Slot::iri(skos::PREF_LABEL),
                Slot::var(label.clone()),
            ));
            let alternatives = constraint
                .values
                .iter()
                .map(|v| value_match(&label, v, self.exact_match))
                .collect();
            patterns.push(Pattern::Filter(Expr::Or(alternatives)));
        }

        if !self.scope.is_unrestricted() {
            patterns.push(Pattern::triple(
                Slot::var(DOCUMENT_VAR),
                Slot::iri(ns.has_reporting_obligation()),
                ro(),
            ));
        }
        if let Some(documents) = &self.scope.documents {
            let terms: Vec<Term> = documents
                .iter()
                .filter(|d| is_iri(d))
                .map(|d| Term::iri(d.as_str()))
                .collect();
            if terms.is_empty() {
                return None;
            }
            patterns.push(Pattern::Values {
                var: DOCUMENT_VAR.to_string(),
                terms,
            });
        }
        if let Some(source) = &self.scope.source {
            if !is_iri(source) {
                return None;
            }
            patterns.push(Pattern::triple(
                Slot::var(DOCUMENT_VAR),
                Slot::iri(ns.has_document_source()),
                Slot::iri(source.clone()),
            ));
        }
        Some(patterns)
    }
}

/// The characters XPath `\s` matches; the store trims exactly these.
const SPARQL_WHITESPACE: [char; 4] = [' ', '\t', '\r', '\n'];

/// Case-insensitive match of the label bound to `var` against `value`.
pub(crate) fn value_match(var: &str, value: &str, exact: bool) -> Expr {
    if exact {
        Expr::var(var)
            .str()
            .trim()
            .lcase()
            .equals(Expr::literal(value.trim_matches(SPARQL_WHITESPACE)).lcase())
    } else {
        Expr::var(var).str().lcase().contains(Expr::literal(value).lcase())
    }
}

/// How a free-text needle must match a candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Contains,
    StartsWith,
}

/// A free-text filter on candidate values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub needle: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl TextMatch {
    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            mode: MatchMode::Contains,
        }
    }

    pub fn starts_with(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            mode: MatchMode::StartsWith,
        }
    }

    /// Filter expression over the label bound to `var`.
    pub(crate) fn expr(&self, var: &str) -> Expr {
        let value = Expr::var(var).str().lcase();
        let needle = Expr::literal(self.needle.as_str()).lcase();
        match self.mode {
            MatchMode::Contains => value.contains(needle),
            MatchMode::StartsWith => value.starts_with(needle),
        }
    }

    /// Whether a value begins with the needle, ignoring case.
    pub(crate) fn is_prefix_of(&self, value: &str) -> bool {
        value.to_lowercase().starts_with(&self.needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fragment::Select;

    fn render(filter: &Filter) -> Option<String> {
        let ns = Namespaces::default();
        filter
            .obligation_patterns(&ns)
            .map(|p| Select::vars([OBLIGATION_VAR]).patterns(p).render().unwrap())
    }

    #[test]
    fn empty_filter_selects_all_obligations() {
        let q = render(&Filter::new()).unwrap();
        assert_eq!(
            q,
            "SELECT ?ro WHERE {\n  ?ro <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> \
             <http://dgfisma.com/reporting_obligations/ReportingObligation> .\n}"
        );
    }

    #[test]
    fn constraints_are_conjunctive_values_disjunctive() {
        let f = Filter::new()
            .constraint(Constraint::new("http://x/P1", ["a", "b"]))
            .constraint(Constraint::one("http://x/P2", "c"))
            .constraint(Constraint::new("http://x/P3", Vec::<String>::new()));
        let q = render(&f).unwrap();
        assert!(q.contains("?ro <http://x/P1> ?c0 ."));
        assert!(q.contains("?ro <http://x/P2> ?c1 ."));
        assert!(!q.contains("P3"));
        assert!(q.contains(") || ("));
        assert_eq!(q.matches("FILTER(").count(), 2);
    }

    #[test]
    fn exact_and_substring_expressions() {
        let exact = Select::vars(["x"]).filter(value_match("l0", "  Board ", true));
        assert!(exact
            .render()
            .unwrap()
            .contains(r#"LCASE(REPLACE(STR(?l0), "^\\s+|\\s+$", "")) = LCASE("Board")"#));
        let fuzzy = Select::vars(["x"]).filter(value_match("l0", "Bo", false));
        assert!(fuzzy.render().unwrap().contains(r#"CONTAINS(LCASE(STR(?l0)), LCASE("Bo"))"#));
    }

    #[test]
    fn exact_match_trims_only_sparql_whitespace() {
        let q = Select::vars(["x"])
            .filter(value_match("l0", "\t\u{a0}Board\r\n", true))
            .render()
            .unwrap();
        assert!(q.contains("= LCASE(\"\u{a0}Board\")"), "{q}");
    }

    #[test]
    fn invalid_predicate_matches_nothing() {
        let f = Filter::new().constraint(Constraint::one("not an iri", "x"));
        assert!(render(&f).is_none());
    }

    #[test]
    fn document_scope() {
        let f = Filter::new().documents(["https://example.com/doc1", "bogus"]);
        let q = render(&f).unwrap();
        assert!(q.contains("?doc <http://dgfisma.com/reporting_obligations/hasReportingObligation> ?ro ."));
        assert!(q.contains("VALUES ?doc { <https://example.com/doc1> }"));

        assert!(render(&Filter::new().documents(["bogus"])).is_none());
        assert!(render(&Filter::new().documents(Vec::<String>::new())).is_none());
    }

    #[test]
    fn source_scope_shares_document_variable() {
        let f = Filter::new()
            .documents(["https://example.com/doc1"])
            .source("https://eba.europa.eu/");
        let q = render(&f).unwrap();
        assert_eq!(q.matches("hasReportingObligation").count(), 1);
        assert!(q.contains("?doc <http://dgfisma.com/reporting_obligations/hasDocumentSource> <https://eba.europa.eu/> ."));
        assert!(render(&Filter::new().source("no source")).is_none());
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let f: Filter = serde_json::from_str(r#"{"constraints": [{"predicate": "http://x/P", "values": ["a"]}]}"#)
            .unwrap();
        assert!(f.exact_match);
        assert!(f.scope.is_unrestricted());
    }

    #[test]
    fn text_match_prefix() {
        let m = TextMatch::starts_with("the");
        assert!(m.is_prefix_of("The Board"));
        assert!(!m.is_prefix_of("Bathe"));
    }
}
