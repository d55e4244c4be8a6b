//! A small `SELECT` query builder.
//!
//! Queries are assembled as values (patterns, filter expressions, ordering
//! and paging) and rendered to SPARQL text in one place. Rendering validates
//! every IRI and variable name and escapes every literal, so no caller input
//! reaches the query text verbatim.

use crate::error::StoreError;
use crate::graph::{check_iri, Literal, Term};
use crate::store::StoreResult;

/// A position in a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Var(String),
    Term(Term),
}

impl Slot {
    pub fn var(name: impl Into<String>) -> Self {
        Slot::Var(name.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        Slot::Term(Term::iri(iri))
    }
}

/// One element of a group graph pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Triple(Slot, Slot, Slot),
    Filter(Expr),
    /// `VALUES ?var { ... }`
    Values { var: String, terms: Vec<Term> },
}

impl Pattern {
    pub fn triple(s: Slot, p: Slot, o: Slot) -> Self {
        Pattern::Triple(s, p, o)
    }
}

/// A filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Var(String),
    Term(Term),
    Str(Box<Expr>),
    Lcase(Box<Expr>),
    /// Strip leading and trailing whitespace.
    Trim(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Contains(Box<Expr>, Box<Expr>),
    StrStarts(Box<Expr>, Box<Expr>),
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Exists(Vec<Pattern>),
    Bool(bool),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Term(Term::literal(value))
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        Expr::Term(Term::iri(iri))
    }

    pub fn str(self) -> Self {
        Expr::Str(Box::new(self))
    }

    pub fn lcase(self) -> Self {
        Expr::Lcase(Box::new(self))
    }

    pub fn trim(self) -> Self {
        Expr::Trim(Box::new(self))
    }

    pub fn equals(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn contains(self, needle: Expr) -> Self {
        Expr::Contains(Box::new(self), Box::new(needle))
    }

    pub fn starts_with(self, prefix: Expr) -> Self {
        Expr::StrStarts(Box::new(self), Box::new(prefix))
    }
}

/// A projected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Var(String),
    /// `(COUNT(DISTINCT ?var) AS ?alias)`
    CountDistinct { var: String, alias: String },
}

/// A `SELECT` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<Projection>,
    pub patterns: Vec<Pattern>,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Select {
    /// `SELECT ?v1 ?v2 ...`
    pub fn vars<I, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            projection: vars.into_iter().map(|v| Projection::Var(v.into())).collect(),
            ..Self::default()
        }
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection.push(projection);
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn patterns(mut self, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    pub fn filter(self, expr: Expr) -> Self {
        self.pattern(Pattern::Filter(expr))
    }

    pub fn group_by(mut self, var: impl Into<String>) -> Self {
        self.group_by.push(var.into());
        self
    }

    pub fn order_by(mut self, var: impl Into<String>) -> Self {
        self.order_by.push(var.into());
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    /// Render to SPARQL text.
    pub fn render(&self) -> StoreResult<String> {
        let mut out = String::from("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        if self.projection.is_empty() {
            out.push('*');
        }
        for (i, column) in self.projection.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match column {
                Projection::Var(v) => out.push_str(&var(v)?),
                Projection::CountDistinct { var: v, alias } => {
                    out.push_str(&format!("(COUNT(DISTINCT {}) AS {})", var(v)?, var(alias)?));
                }
            }
        }
        out.push_str(" WHERE {\n");
        render_group(&mut out, &self.patterns, 1)?;
        out.push('}');
        if !self.group_by.is_empty() {
            out.push_str("\nGROUP BY");
            for v in &self.group_by {
                out.push_str(&format!(" {}", var(v)?));
            }
        }
        if !self.order_by.is_empty() {
            out.push_str("\nORDER BY");
            for v in &self.order_by {
                out.push_str(&format!(" {}", var(v)?));
            }
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!("\nLIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            out.push_str(&format!("\nOFFSET {offset}"));
        }
        Ok(out)
    }
}

fn render_group(out: &mut String, patterns: &[Pattern], depth: usize) -> StoreResult<()> {
    let indent = "  ".repeat(depth);
    for pattern in patterns {
        out.push_str(&indent);
        match pattern {
            Pattern::Triple(s, p, o) => {
                out.push_str(&format!("{} {} {} .\n", slot(s)?, slot(p)?, slot(o)?));
            }
            Pattern::Filter(expr) => {
                out.push_str(&format!("FILTER({})\n", expr_text(expr, depth)?));
            }
            Pattern::Values { var: v, terms } => {
                let mut rendered = Vec::with_capacity(terms.len());
                for t in terms {
                    rendered.push(term(t)?);
                }
                out.push_str(&format!("VALUES {} {{ {} }}\n", var(v)?, rendered.join(" ")));
            }
        }
    }
    Ok(())
}

fn expr_text(expr: &Expr, depth: usize) -> StoreResult<String> {
    Ok(match expr {
        Expr::Var(v) => var(v)?,
        Expr::Term(t) => term(t)?,
        Expr::Str(e) => format!("STR({})", expr_text(e, depth)?),
        Expr::Lcase(e) => format!("LCASE({})", expr_text(e, depth)?),
        Expr::Trim(e) => format!(
            "REPLACE({}, {}, \"\")",
            expr_text(e, depth)?,
            Literal::simple(r"^\s+|\s+$")
        ),
        Expr::Eq(a, b) => format!("{} = {}", expr_text(a, depth)?, expr_text(b, depth)?),
        Expr::Contains(a, b) => format!("CONTAINS({}, {})", expr_text(a, depth)?, expr_text(b, depth)?),
        Expr::StrStarts(a, b) => {
            format!("STRSTARTS({}, {})", expr_text(a, depth)?, expr_text(b, depth)?)
        }
        Expr::Or(items) => joined(items, " || ", "false", depth)?,
        Expr::And(items) => joined(items, " && ", "true", depth)?,
        Expr::Exists(patterns) => {
            let mut inner = String::from("EXISTS {\n");
            render_group(&mut inner, patterns, depth + 2)?;
            inner.push_str(&"  ".repeat(depth + 1));
            inner.push('}');
            inner
        }
        Expr::Bool(b) => b.to_string(),
    })
}

fn joined(items: &[Expr], op: &str, empty: &str, depth: usize) -> StoreResult<String> {
    if items.is_empty() {
        return Ok(empty.to_string());
    }
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(format!("({})", expr_text(item, depth)?));
    }
    Ok(parts.join(op))
}

fn slot(slot: &Slot) -> StoreResult<String> {
    match slot {
        Slot::Var(v) => var(v),
        Slot::Term(t) => term(t),
    }
}

fn term(t: &Term) -> StoreResult<String> {
    match t {
        Term::Iri(iri) => Ok(format!("<{}>", check_iri(iri)?.as_str())),
        Term::Blank(id) => Err(StoreError::InvalidTerm {
            message: format!("blank node _:{id} cannot be bound in a query"),
        }),
        Term::Literal(lit) => {
            if let Some(datatype) = &lit.datatype {
                check_iri(datatype)?;
            }
            if let Some(lang) = &lit.language {
                let well_formed = !lang.is_empty()
                    && lang.split('-').all(|part| {
                        !part.is_empty() && part.len() <= 8 && part.chars().all(|c| c.is_ascii_alphanumeric())
                    });
                if !well_formed {
                    return Err(StoreError::InvalidTerm {
                        message: format!("language tag {lang:?}"),
                    });
                }
            }
            Ok(lit.to_string())
        }
    }
}

fn var(name: &str) -> StoreResult<String> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("?{name}"))
    } else {
        Err(StoreError::InvalidTerm {
            message: format!("variable name {name:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_select() {
        let q = Select::vars(["s"])
            .distinct(true)
            .pattern(Pattern::triple(Slot::var("s"), Slot::iri("http://x/p"), Slot::var("o")))
            .order_by("s")
            .limit(Some(10))
            .offset(Some(20))
            .render()
            .unwrap();
        assert_eq!(
            q,
            "SELECT DISTINCT ?s WHERE {\n  ?s <http://x/p> ?o .\n}\nORDER BY ?s\nLIMIT 10\nOFFSET 20"
        );
    }

    #[test]
    fn renders_filters_and_aggregates() {
        let q = Select::vars(["pred"])
            .project(Projection::CountDistinct {
                var: "ro".into(),
                alias: "count".into(),
            })
            .filter(Expr::Or(vec![
                Expr::var("l").str().lcase().trim().equals(Expr::literal("a").lcase()),
                Expr::var("l").str().lcase().contains(Expr::literal("b")),
            ]))
            .group_by("pred")
            .render()
            .unwrap();
        assert!(q.starts_with("SELECT ?pred (COUNT(DISTINCT ?ro) AS ?count) WHERE {"));
        assert!(q.contains(
            r#"FILTER((REPLACE(LCASE(STR(?l)), "^\\s+|\\s+$", "") = LCASE("a")) || (CONTAINS(LCASE(STR(?l)), "b")))"#
        ));
        assert!(q.ends_with("GROUP BY ?pred"));
    }

    #[test]
    fn renders_exists_and_values() {
        let q = Select::vars(["p"])
            .pattern(Pattern::Values {
                var: "doc".into(),
                terms: vec![Term::iri("http://x/d1"), Term::iri("http://x/d2")],
            })
            .filter(Expr::Or(vec![
                Expr::Exists(vec![Pattern::triple(
                    Slot::var("p"),
                    Slot::iri("http://x/sub"),
                    Slot::iri("http://x/top"),
                )]),
                Expr::var("p").equals(Expr::iri("http://x/top")),
            ]))
            .render()
            .unwrap();
        assert!(q.contains("VALUES ?doc { <http://x/d1> <http://x/d2> }"));
        assert!(q.contains("EXISTS {\n      ?p <http://x/sub> <http://x/top> .\n    }"));
    }

    #[test]
    fn literals_are_escaped() {
        let q = Select::vars(["s"])
            .filter(Expr::var("s").equals(Expr::literal("x\" ) } DROP ALL #")))
            .render()
            .unwrap();
        assert!(q.contains(r#""x\" ) } DROP ALL #""#));
    }

    #[test]
    fn rejects_bad_iris_and_variables() {
        let bad_iri = Select::vars(["s"]).pattern(Pattern::triple(
            Slot::var("s"),
            Slot::iri("http://x/p> ?o } #"),
            Slot::var("o"),
        ));
        assert!(bad_iri.render().is_err());
        assert!(Select::vars(["s ?o"]).render().is_err());
        let blank = Select::vars(["s"]).pattern(Pattern::triple(
            Slot::var("s"),
            Slot::iri("http://x/p"),
            Slot::Term(Term::Blank("b".into())),
        ));
        assert!(blank.render().is_err());
    }

    #[test]
    fn empty_connectives() {
        let q = Select::vars(["s"]).filter(Expr::Or(vec![])).render().unwrap();
        assert!(q.contains("FILTER(false)"));
    }
}
