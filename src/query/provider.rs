//! Read-side operations over the obligation graph.
//!
//! Every operation builds one [`Select`], renders it, runs it against the
//! store and post-processes the rows (natural sort, grouping, paging).
//! Filters that can match nothing short-circuit to an empty result without
//! touching the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::graph::is_iri;
use crate::namespace::{dc, rdf, rdfs, skos, Namespaces};
use crate::store::{Solution, TripleStore};

use super::constraint::{Filter, TextMatch, OBLIGATION_VAR};
use super::fragment::{Expr, Pattern, Projection, Select, Slot};
use super::sort::{natural_cmp, sort_natural, sort_natural_by_text};

/// Result type for query operations.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Paging window over a sorted result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl Page {
    /// Everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: Option<usize>, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// One page of obligation ids and the size of the whole result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationPage {
    pub uris: Vec<String>,
    pub total: usize,
}

/// An entity value and the number of distinct obligations referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Entity values grouped under the predicate linking them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub predicate: String,
    pub values: Vec<ValueCount>,
}

/// One obligation with its text and entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationDetail {
    pub id: String,
    pub text: String,
    /// `(predicate, label)` pairs in natural order.
    pub entities: Vec<(String, String)>,
}

/// Query synthesis and execution for the obligation graph.
#[derive(Debug)]
pub struct QueryProvider<S: TripleStore> {
    store: S,
    ns: Namespaces,
}

impl<S: TripleStore> QueryProvider<S> {
    pub fn new(store: S, ns: Namespaces) -> Self {
        Self { store, ns }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.ns
    }

    fn run(&self, select: &Select) -> QueryResult<Vec<Solution>> {
        let sparql = select.render()?;
        tracing::debug!(query = %sparql, "running query");
        Ok(self.store.select(&sparql)?)
    }

    /// `?pred` is an entity predicate: `hasEntity` or one of its sub-properties.
    fn entity_predicate_filter(&self, var: &str) -> Expr {
        let has_entity = self.ns.has_entity();
        Expr::Or(vec![
            Expr::Exists(vec![Pattern::triple(
                Slot::var(var),
                Slot::iri(rdfs::SUB_PROPERTY_OF),
                Slot::iri(has_entity.clone()),
            )]),
            Expr::var(var).equals(Expr::iri(has_entity)),
        ])
    }

    /// Every predicate linking obligations to entities, as declared in the
    /// schema.
    pub fn entity_predicate_types(&self) -> QueryResult<Vec<String>> {
        let select = Select::vars(["pred"])
            .distinct(true)
            .pattern(Pattern::triple(
                Slot::var("pred"),
                Slot::iri(rdfs::DOMAIN),
                Slot::iri(self.ns.reporting_obligation()),
            ))
            .filter(self.entity_predicate_filter("pred"));
        let rows = self.run(&select)?;
        let mut preds = column(&rows, "pred")?;
        sort_natural(&mut preds);
        Ok(preds)
    }

    /// Labels of the entities reachable through `predicate`.
    ///
    /// Without `distinct`, a label appears once per entity carrying it.
    pub fn values_for_predicate(&self, predicate: &str, distinct: bool) -> QueryResult<Vec<String>> {
        if !is_iri(predicate) {
            return Ok(Vec::new());
        }
        let mut select = Select::vars(["value"]).distinct(distinct).patterns([
            Pattern::triple(
                Slot::var("ro"),
                Slot::iri(rdf::TYPE),
                Slot::iri(self.ns.reporting_obligation()),
            ),
            Pattern::triple(Slot::var("ro"), Slot::iri(predicate), Slot::var("e")),
            Pattern::triple(Slot::var("e"), Slot::iri(skos::PREF_LABEL), Slot::var("value")),
        ]);
        if !distinct {
            // Keep one row per entity, not per distinct label.
            select.projection.push(Projection::Var("e".into()));
        }
        let rows = self.run(&select)?;
        let mut values = column(&rows, "value")?;
        sort_natural(&mut values);
        Ok(values)
    }

    /// `(text, id)` of every obligation the filter selects.
    fn filtered_obligations(&self, filter: &Filter) -> QueryResult<Vec<(String, String)>> {
        let Some(patterns) = filter.obligation_patterns(&self.ns) else {
            return Ok(Vec::new());
        };
        let select = Select::vars([OBLIGATION_VAR, "text"])
            .distinct(true)
            .patterns(patterns)
            .pattern(Pattern::triple(
                Slot::var(OBLIGATION_VAR),
                Slot::iri(rdf::VALUE),
                Slot::var("text"),
            ));
        let rows = self.run(&select)?;
        let mut pairs = Vec::with_capacity(rows.len());
        for row in &rows {
            pairs.push((required(row, "text")?, required(row, OBLIGATION_VAR)?));
        }
        sort_natural_by_text(&mut pairs);
        Ok(pairs)
    }

    /// Texts of the obligations the filter selects, in natural order.
    pub fn filter_obligations(&self, filter: &Filter) -> QueryResult<Vec<String>> {
        Ok(self
            .filtered_obligations(filter)?
            .into_iter()
            .map(|(text, _)| text)
            .collect())
    }

    /// Ids of the obligations the filter selects, ordered by text then id,
    /// cut to one page.
    pub fn filter_obligation_ids(&self, filter: &Filter, page: Page) -> QueryResult<ObligationPage> {
        let all = self.filtered_obligations(filter)?;
        let total = all.len();
        let uris = all
            .into_iter()
            .skip(page.offset)
            .take(page.limit.unwrap_or(usize::MAX))
            .map(|(_, id)| id)
            .collect();
        Ok(ObligationPage { uris, total })
    }

    /// Distinct labels reachable through `predicate` from obligations the
    /// filter selects.
    pub fn filter_entities_by_type(&self, predicate: &str, filter: &Filter) -> QueryResult<Vec<String>> {
        self.entity_values(predicate, filter, None)
    }

    /// Like [`filter_entities_by_type`](Self::filter_entities_by_type) with a
    /// free-text match on the label itself.
    ///
    /// Labels starting with the needle rank before labels merely containing
    /// it; each group is in natural order. `limit` applies after ranking.
    pub fn filter_entities_lazy(
        &self,
        predicate: &str,
        text: Option<&TextMatch>,
        filter: &Filter,
        limit: Option<usize>,
    ) -> QueryResult<Vec<String>> {
        let mut values = self.entity_values(predicate, filter, text)?;
        if let Some(m) = text {
            let (prefixed, rest): (Vec<String>, Vec<String>) =
                values.into_iter().partition(|v| m.is_prefix_of(v));
            values = prefixed;
            values.extend(rest);
        }
        if let Some(limit) = limit {
            values.truncate(limit);
        }
        Ok(values)
    }

    fn entity_values(
        &self,
        predicate: &str,
        filter: &Filter,
        text: Option<&TextMatch>,
    ) -> QueryResult<Vec<String>> {
        if !is_iri(predicate) {
            return Ok(Vec::new());
        }
        let Some(patterns) = filter.obligation_patterns(&self.ns) else {
            return Ok(Vec::new());
        };
        let mut select = Select::vars(["value"])
            .distinct(true)
            .patterns(patterns)
            .patterns([
                Pattern::triple(Slot::var(OBLIGATION_VAR), Slot::iri(predicate), Slot::var("e")),
                Pattern::triple(Slot::var("e"), Slot::iri(skos::PREF_LABEL), Slot::var("value")),
            ]);
        if let Some(m) = text {
            select = select.filter(m.expr("value"));
        }
        let rows = self.run(&select)?;
        let mut values = column(&rows, "value")?;
        sort_natural(&mut values);
        Ok(values)
    }

    /// Entity labels of the selected obligations, grouped by predicate, each
    /// with the number of distinct obligations referencing it.
    pub fn filter_entities_grouped(&self, filter: &Filter) -> QueryResult<Vec<EntityGroup>> {
        let Some(patterns) = filter.obligation_patterns(&self.ns) else {
            return Ok(Vec::new());
        };
        let select = Select::vars(["pred", "value"])
            .project(Projection::CountDistinct {
                var: OBLIGATION_VAR.into(),
                alias: "count".into(),
            })
            .patterns(patterns)
            .patterns([
                Pattern::triple(Slot::var(OBLIGATION_VAR), Slot::var("pred"), Slot::var("e")),
                Pattern::triple(Slot::var("e"), Slot::iri(skos::PREF_LABEL), Slot::var("value")),
            ])
            .filter(self.entity_predicate_filter("pred"))
            .group_by("pred")
            .group_by("value");
        let rows = self.run(&select)?;

        let mut groups: BTreeMap<String, Vec<ValueCount>> = BTreeMap::new();
        for row in &rows {
            let count = required(row, "count")?;
            let count = count.parse().map_err(|_| QueryError::Binding {
                variable: "count".into(),
                message: format!("is not a count: {count:?}"),
            })?;
            groups.entry(required(row, "pred")?).or_default().push(ValueCount {
                value: required(row, "value")?,
                count,
            });
        }

        let mut out: Vec<EntityGroup> = groups
            .into_iter()
            .map(|(predicate, mut values)| {
                values.sort_by(|a, b| natural_cmp(&a.value, &b.value));
                EntityGroup { predicate, values }
            })
            .collect();
        out.sort_by(|a, b| natural_cmp(&a.predicate, &b.predicate));
        Ok(out)
    }

    /// All entity labels grouped by predicate.
    pub fn entities(&self) -> QueryResult<Vec<EntityGroup>> {
        self.filter_entities_grouped(&Filter::default())
    }

    /// Every obligation id, ordered by text.
    pub fn all_obligation_ids(&self) -> QueryResult<Vec<String>> {
        Ok(self.filter_obligation_ids(&Filter::default(), Page::all())?.uris)
    }

    /// Every obligation text, in natural order.
    pub fn all_obligation_texts(&self) -> QueryResult<Vec<String>> {
        self.filter_obligations(&Filter::default())
    }

    /// The caller-assigned id of every ingested document.
    pub fn all_document_ids(&self) -> QueryResult<Vec<String>> {
        let select = Select::vars(["id"]).distinct(true).patterns([
            Pattern::triple(
                Slot::var("doc"),
                Slot::iri(rdf::TYPE),
                Slot::iri(self.ns.catalogue_document()),
            ),
            Pattern::triple(Slot::var("doc"), Slot::iri(dc::IDENTIFIER), Slot::var("id")),
        ]);
        let rows = self.run(&select)?;
        let mut ids = column(&rows, "id")?;
        sort_natural(&mut ids);
        Ok(ids)
    }

    /// Text and entities of one obligation.
    pub fn obligation(&self, id: &str) -> QueryResult<Option<ObligationDetail>> {
        if !is_iri(id) {
            return Ok(None);
        }
        let text_query = Select::vars(["text"])
            .pattern(Pattern::triple(
                Slot::iri(id),
                Slot::iri(rdf::TYPE),
                Slot::iri(self.ns.reporting_obligation()),
            ))
            .pattern(Pattern::triple(Slot::iri(id), Slot::iri(rdf::VALUE), Slot::var("text")));
        let rows = self.run(&text_query)?;
        let Some(text) = rows.first().and_then(|r| r.value("text")).map(str::to_string) else {
            return Ok(None);
        };

        let entity_query = Select::vars(["pred", "value"])
            .patterns([
                Pattern::triple(Slot::iri(id), Slot::var("pred"), Slot::var("e")),
                Pattern::triple(Slot::var("e"), Slot::iri(skos::PREF_LABEL), Slot::var("value")),
            ])
            .filter(self.entity_predicate_filter("pred"));
        let rows = self.run(&entity_query)?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            entities.push((required(row, "pred")?, required(row, "value")?));
        }
        entities.sort_by(|a, b| natural_cmp(&a.0, &b.0).then_with(|| natural_cmp(&a.1, &b.1)));

        Ok(Some(ObligationDetail {
            id: id.to_string(),
            text,
            entities,
        }))
    }
}

fn required(row: &Solution, variable: &str) -> QueryResult<String> {
    row.value(variable)
        .map(str::to_string)
        .ok_or_else(|| QueryError::Binding {
            variable: variable.to_string(),
            message: "is unbound".into(),
        })
}

fn column(rows: &[Solution], variable: &str) -> QueryResult<Vec<String>> {
    rows.iter().map(|row| required(row, variable)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationNode;
    use crate::graph::builder::GraphBuilder;
    use crate::id::SequentialMinter;
    use crate::ontology::Ontology;
    use crate::query::constraint::Constraint;
    use crate::store::OxigraphStore;

    fn provider() -> QueryProvider<OxigraphStore> {
        let store = OxigraphStore::in_memory().unwrap();
        let onto = Ontology::default();
        onto.declare_schema(&store).unwrap();
        let builder = GraphBuilder::new(onto, Box::new(SequentialMinter::new()));
        let tree = AnnotationNode::document(vec![
            AnnotationNode::obligation(
                "The Board shall report annually.",
                vec![
                    AnnotationNode::entity("ARG0", "The Board"),
                    AnnotationNode::entity("V", "report"),
                ],
            ),
            AnnotationNode::obligation(
                "Firms shall report quarterly.",
                vec![
                    AnnotationNode::entity("ARG0", "Firms"),
                    AnnotationNode::entity("V", "report"),
                    AnnotationNode::entity("ARGM-XYZ", "quarterly"),
                ],
            ),
        ]);
        builder.add_document(&store, &tree, "https://example.com/doc1").unwrap();
        QueryProvider::new(store, Namespaces::default())
    }

    #[test]
    fn discovers_entity_predicates_from_schema() {
        let p = provider();
        let preds = p.entity_predicate_types().unwrap();
        assert_eq!(preds.len(), 24);
        assert!(preds.contains(&p.namespaces().has_entity()));
        assert!(preds.contains(&p.namespaces().ro("hasPropLVB")));
        assert!(!preds.contains(&p.namespaces().has_reporting_obligation()));
    }

    #[test]
    fn values_distinct_and_not() {
        let p = provider();
        let verb = p.namespaces().ro("hasVerb");
        assert_eq!(p.values_for_predicate(&verb, false).unwrap(), vec!["report", "report"]);
        assert_eq!(p.values_for_predicate(&verb, true).unwrap(), vec!["report"]);
        assert!(p.values_for_predicate("nonsense", true).unwrap().is_empty());
    }

    #[test]
    fn filter_by_reporter() {
        let p = provider();
        let f = Filter::new().constraint(Constraint::one(p.namespaces().ro("hasReporter"), "the board"));
        assert_eq!(p.filter_obligations(&f).unwrap(), vec!["The Board shall report annually."]);

        let fuzzy = Filter::new()
            .exact_match(false)
            .constraint(Constraint::one(p.namespaces().ro("hasReporter"), "IRM"));
        assert_eq!(p.filter_obligations(&fuzzy).unwrap(), vec!["Firms shall report quarterly."]);
    }

    #[test]
    fn grouped_entities_count_obligations() {
        let p = provider();
        let groups = p.entities().unwrap();
        let verb = groups
            .iter()
            .find(|g| g.predicate == p.namespaces().ro("hasVerb"))
            .unwrap();
        assert_eq!(
            verb.values,
            vec![ValueCount {
                value: "report".into(),
                count: 2
            }]
        );
        assert!(groups.iter().any(|g| g.predicate == p.namespaces().has_entity()));
    }

    #[test]
    fn lazy_ranks_prefix_matches_first() {
        let p = provider();
        let reporter = p.namespaces().ro("hasReporter");
        let m = TextMatch::contains("f");
        let values = p
            .filter_entities_lazy(&reporter, Some(&m), &Filter::new(), None)
            .unwrap();
        assert_eq!(values, vec!["Firms"]);

        let m = TextMatch::contains("r");
        let values = p
            .filter_entities_lazy(&reporter, Some(&m), &Filter::new(), None)
            .unwrap();
        assert_eq!(values, vec!["Firms", "The Board"]);
        let limited = p
            .filter_entities_lazy(&reporter, Some(&m), &Filter::new(), Some(1))
            .unwrap();
        assert_eq!(limited, vec!["Firms"]);
    }

    #[test]
    fn obligation_detail() {
        let p = provider();
        let ids = p.all_obligation_ids().unwrap();
        let detail = p.obligation(&ids[0]).unwrap().unwrap();
        assert_eq!(detail.text, "Firms shall report quarterly.");
        assert_eq!(detail.entities.len(), 3);
        assert!(p.obligation("http://x/missing").unwrap().is_none());
    }

    #[test]
    fn document_ids() {
        let p = provider();
        assert_eq!(p.all_document_ids().unwrap(), vec!["https://example.com/doc1"]);
    }
}
