//! Filter semantics of the query provider over a small fixed graph.
//!
//! Constraints combine with AND, the values inside one constraint with OR,
//! and every comparison ignores case.

use std::collections::BTreeSet;

use ro_graph::annotation::{AnnotatedNode, AnnotationNode};
use ro_graph::graph::builder::GraphBuilder;
use ro_graph::id::SequentialMinter;
use ro_graph::namespace::Namespaces;
use ro_graph::ontology::Ontology;
use ro_graph::query::{Constraint, Filter, Page, QueryProvider, TextMatch};
use ro_graph::store::OxigraphStore;

struct Fixture {
    queries: QueryProvider<OxigraphStore>,
    doc: AnnotatedNode,
    p1: String,
    p2: String,
}

/// OB1: P1=a1, P2=a2. OB2: P1=a1, P2=b2. OB3: P1=a1, P2=a2.
fn fixture() -> Fixture {
    let store = OxigraphStore::in_memory().unwrap();
    let ontology = Ontology::default();
    ontology.declare_schema(&store).unwrap();
    let ns = ontology.namespaces().clone();
    let builder = GraphBuilder::new(ontology, Box::new(SequentialMinter::new()));

    let ob = |text: &str, v1: &str, v2: &str| {
        AnnotationNode::obligation(
            text,
            vec![AnnotationNode::entity("ARG0", v1), AnnotationNode::entity("ARG1", v2)],
        )
    };
    let tree = AnnotationNode::document(vec![ob("OB1", "a1", "a2"), ob("OB2", "a1", "b2"), ob("OB3", "a1", "a2")]);
    let doc = builder.add_document(&store, &tree, "https://example.com/doc1").unwrap();

    Fixture {
        p1: ns.ro("hasReporter"),
        p2: ns.ro("hasReport"),
        queries: QueryProvider::new(store, ns),
        doc,
    }
}

fn texts(fx: &Fixture, filter: &Filter) -> BTreeSet<String> {
    fx.queries.filter_obligations(filter).unwrap().into_iter().collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn constraints_are_conjunctive() {
    let fx = fixture();
    let f = Filter::new()
        .constraint(Constraint::one(&fx.p1, "a1"))
        .constraint(Constraint::one(&fx.p2, "a2"));
    assert_eq!(texts(&fx, &f), set(&["OB1", "OB3"]));

    let f = Filter::new()
        .constraint(Constraint::one(&fx.p1, "a1"))
        .constraint(Constraint::one(&fx.p2, "b2"));
    assert_eq!(texts(&fx, &f), set(&["OB2"]));

    let f = Filter::new()
        .constraint(Constraint::one(&fx.p1, "a1"))
        .constraint(Constraint::one(&fx.p1, "a2"));
    assert!(texts(&fx, &f).is_empty());
}

#[test]
fn values_within_a_constraint_are_disjunctive() {
    let fx = fixture();
    let f = Filter::new().constraint(Constraint::new(&fx.p2, ["a2", "b2"]));
    assert_eq!(texts(&fx, &f), set(&["OB1", "OB2", "OB3"]));
}

#[test]
fn matching_ignores_case() {
    let fx = fixture();
    let expected = texts(&fx, &Filter::new().constraint(Constraint::one(&fx.p2, "b2")));
    for value in ["B2", "b2", " b2 "] {
        let f = Filter::new().constraint(Constraint::one(&fx.p2, value));
        assert_eq!(texts(&fx, &f), expected, "value {value:?}");
    }
    let f = Filter::new().exact_match(false).constraint(Constraint::one(&fx.p2, "B"));
    assert_eq!(texts(&fx, &f), set(&["OB2"]));
}

#[test]
fn empty_filter_is_identity() {
    let fx = fixture();
    assert_eq!(texts(&fx, &Filter::new()), set(&["OB1", "OB2", "OB3"]));
    let f = Filter::new().constraint(Constraint::new(&fx.p1, Vec::<String>::new()));
    assert_eq!(texts(&fx, &f), set(&["OB1", "OB2", "OB3"]));
}

#[test]
fn invalid_predicate_is_an_empty_result() {
    let fx = fixture();
    let f = Filter::new().constraint(Constraint::one("hasReporter", "a1"));
    assert!(fx.queries.filter_obligations(&f).unwrap().is_empty());
    assert!(fx.queries.filter_entities_by_type("not an iri", &Filter::new()).unwrap().is_empty());
}

#[test]
fn ids_follow_text_order() {
    let fx = fixture();
    let page = fx.queries.filter_obligation_ids(&Filter::new(), Page::all()).unwrap();
    let expected: Vec<String> = fx.doc.children.iter().map(|o| o.id.clone()).collect();
    assert_eq!(page.uris, expected);
    assert_eq!(page.total, 3);

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["total"], 3);
    assert_eq!(json["uris"].as_array().unwrap().len(), 3);
}

#[test]
fn entities_by_type_see_sibling_constraints() {
    let fx = fixture();
    let f = Filter::new().constraint(Constraint::one(&fx.p2, "b2"));
    assert_eq!(fx.queries.filter_entities_by_type(&fx.p1, &f).unwrap(), vec!["a1"]);
    assert_eq!(
        fx.queries.filter_entities_by_type(&fx.p2, &Filter::new()).unwrap(),
        vec!["a2", "b2"]
    );
}

#[test]
fn grouped_counts_distinct_obligations() {
    let fx = fixture();
    let groups = fx.queries.filter_entities_grouped(&Filter::new()).unwrap();
    let preds: Vec<&str> = groups.iter().map(|g| g.predicate.as_str()).collect();
    assert_eq!(preds, vec![fx.p2.as_str(), fx.p1.as_str()]);

    let report = &groups[0];
    let counts: Vec<(&str, usize)> = report.values.iter().map(|v| (v.value.as_str(), v.count)).collect();
    assert_eq!(counts, vec![("a2", 2), ("b2", 1)]);
    assert_eq!(groups[1].values[0].count, 3);

    let f = Filter::new().constraint(Constraint::one(&fx.p2, "a2"));
    let scoped = fx.queries.filter_entities_grouped(&f).unwrap();
    let reporter = scoped.iter().find(|g| g.predicate == fx.p1).unwrap();
    assert_eq!(reporter.values[0].count, 2);
}

#[test]
fn lazy_match_modes() {
    let fx = fixture();
    let prefix = TextMatch::starts_with("B");
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p2, Some(&prefix), &Filter::new(), None).unwrap(),
        vec!["b2"]
    );
    let contains = TextMatch::contains("2");
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p2, Some(&contains), &Filter::new(), None).unwrap(),
        vec!["a2", "b2"]
    );
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p2, None, &Filter::new(), Some(1)).unwrap(),
        vec!["a2"]
    );
}

#[test]
fn document_scope() {
    let fx = fixture();
    let scoped = Filter::new().documents(["https://example.com/doc1"]);
    assert_eq!(texts(&fx, &scoped).len(), 3);

    let missing = Filter::new().documents(["https://example.com/nowhere"]);
    assert!(texts(&fx, &missing).is_empty());
    let empty = Filter::new().documents(Vec::<String>::new());
    assert!(texts(&fx, &empty).is_empty());
}

#[test]
fn pagination_does_not_overlap() {
    let store = OxigraphStore::in_memory().unwrap();
    let ontology = Ontology::default();
    ontology.declare_schema(&store).unwrap();
    let ns = Namespaces::default();
    let builder = GraphBuilder::new(ontology, Box::new(SequentialMinter::new()));

    // Duplicate texts force the id tie-break.
    let obligations = (0..25)
        .map(|i| {
            AnnotationNode::obligation(
                format!("Obligation {}", (b'a' + (i % 13) as u8) as char),
                vec![AnnotationNode::entity("V", "report")],
            )
        })
        .collect();
    builder
        .add_document(&store, &AnnotationNode::document(obligations), "doc")
        .unwrap();
    let queries = QueryProvider::new(store, ns);

    let all = queries.filter_obligation_ids(&Filter::new(), Page::all()).unwrap();
    assert_eq!(all.total, 25);
    let first = queries.filter_obligation_ids(&Filter::new(), Page::new(Some(10), 0)).unwrap();
    let second = queries.filter_obligation_ids(&Filter::new(), Page::new(Some(10), 10)).unwrap();
    assert_eq!(first.total, 25);
    assert_eq!(first.uris.len(), 10);
    assert_eq!(second.uris.len(), 10);

    let a: BTreeSet<_> = first.uris.iter().collect();
    let b: BTreeSet<_> = second.uris.iter().collect();
    assert!(a.is_disjoint(&b));
    let mut joined = first.uris.clone();
    joined.extend(second.uris.clone());
    assert_eq!(joined, all.uris[..20].to_vec());

    let tail = queries.filter_obligation_ids(&Filter::new(), Page::new(Some(10), 20)).unwrap();
    assert_eq!(tail.uris.len(), 5);
}

const DOC_A: &str = "https://example.com/a";
const DOC_B: &str = "https://example.com/b";
const EBA: &str = "https://eba.europa.eu/";

/// Two documents. `a` (source EBA): Bank and Abank report the annual report.
/// `b` (no source): Bankers, Banking and Bank report the quarterly report.
fn banks() -> Fixture {
    let store = OxigraphStore::in_memory().unwrap();
    let ontology = Ontology::default();
    ontology.declare_schema(&store).unwrap();
    let ns = ontology.namespaces().clone();
    let builder = GraphBuilder::new(ontology, Box::new(SequentialMinter::new()));

    let ob = |reporter: &str, report: &str| {
        AnnotationNode::obligation(
            format!("{reporter} shall submit the {report}."),
            vec![AnnotationNode::entity("ARG0", reporter), AnnotationNode::entity("ARG1", report)],
        )
    };
    let a = AnnotationNode::document(vec![ob("Bank", "annual report"), ob("Abank", "annual report")]);
    let b = AnnotationNode::document(vec![
        ob("Bankers", "quarterly report"),
        ob("Banking", "quarterly report"),
        ob("Bank", "quarterly report"),
    ]);
    let doc = builder.add_document(&store, &a, DOC_A).unwrap();
    builder.add_document(&store, &b, DOC_B).unwrap();
    builder.add_document_source(&store, DOC_A, EBA, Some("EBA")).unwrap();

    Fixture {
        p1: ns.ro("hasReporter"),
        p2: ns.ro("hasReport"),
        queries: QueryProvider::new(store, ns),
        doc,
    }
}

#[test]
fn lazy_prefix_matches_rank_before_substring_matches() {
    let fx = banks();
    let ban = TextMatch::contains("ban");
    let in_a = Filter::new().documents([DOC_A]);
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p1, Some(&ban), &in_a, None).unwrap(),
        vec!["Bank", "Abank"]
    );
    // Natural order alone would put Abank first.
    assert_eq!(
        fx.queries.filter_entities_by_type(&fx.p1, &in_a).unwrap(),
        vec!["Abank", "Bank"]
    );
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p1, Some(&ban), &Filter::new(), None).unwrap(),
        vec!["Bank", "Bankers", "Banking", "Abank"]
    );
}

#[test]
fn lazy_limit_cuts_inside_the_prefix_group() {
    let fx = banks();
    let ban = TextMatch::contains("BAN");
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p1, Some(&ban), &Filter::new(), Some(2)).unwrap(),
        vec!["Bank", "Bankers"]
    );
    assert_eq!(
        fx.queries.filter_entities_lazy(&fx.p1, Some(&ban), &Filter::new(), Some(0)).unwrap(),
        Vec::<String>::new()
    );
}

#[test]
fn entities_by_type_respect_document_scope() {
    let fx = banks();
    let q = &fx.queries;
    assert_eq!(
        q.filter_entities_by_type(&fx.p1, &Filter::new().documents([DOC_B])).unwrap(),
        vec!["Bank", "Bankers", "Banking"]
    );
    assert_eq!(q.filter_entities_by_type(&fx.p1, &Filter::new().source(EBA)).unwrap(), vec!["Abank", "Bank"]);
    assert_eq!(
        q.filter_entities_by_type(&fx.p2, &Filter::new().documents([DOC_A, DOC_B])).unwrap(),
        vec!["annual report", "quarterly report"]
    );
    assert!(q
        .filter_entities_by_type(&fx.p1, &Filter::new().documents(Vec::<String>::new()))
        .unwrap()
        .is_empty());
    assert!(q
        .filter_entities_by_type(&fx.p1, &Filter::new().source("https://example.com/nowhere"))
        .unwrap()
        .is_empty());
}

#[test]
fn lazy_search_respects_document_scope() {
    let fx = banks();
    let q = &fx.queries;
    let ban = TextMatch::contains("ban");
    assert_eq!(
        q.filter_entities_lazy(&fx.p1, Some(&ban), &Filter::new().source(EBA), None).unwrap(),
        vec!["Bank", "Abank"]
    );
    assert_eq!(
        q.filter_entities_lazy(&fx.p1, Some(&ban), &Filter::new().documents([DOC_B]), None).unwrap(),
        vec!["Bank", "Bankers", "Banking"]
    );
    assert!(q
        .filter_entities_lazy(&fx.p1, Some(&ban), &Filter::new().documents(Vec::<String>::new()), None)
        .unwrap()
        .is_empty());
}

#[test]
fn grouped_counts_respect_document_scope() {
    let fx = banks();
    let q = &fx.queries;
    let counts = |filter: &Filter, predicate: &str| -> Vec<(String, usize)> {
        q.filter_entities_grouped(filter)
            .unwrap()
            .into_iter()
            .find(|g| g.predicate == predicate)
            .map(|g| g.values.into_iter().map(|v| (v.value, v.count)).collect())
            .unwrap_or_default()
    };
    let pairs = |items: &[(&str, usize)]| -> Vec<(String, usize)> {
        items.iter().map(|(v, n)| (v.to_string(), *n)).collect()
    };

    assert_eq!(
        counts(&Filter::new(), fx.p1.as_str()),
        pairs(&[("Abank", 1), ("Bank", 2), ("Bankers", 1), ("Banking", 1)])
    );
    assert_eq!(
        counts(&Filter::new().documents([DOC_B]), fx.p1.as_str()),
        pairs(&[("Bank", 1), ("Bankers", 1), ("Banking", 1)])
    );
    assert_eq!(counts(&Filter::new().documents([DOC_B]), fx.p2.as_str()), pairs(&[("quarterly report", 3)]));
    assert_eq!(counts(&Filter::new().source(EBA), fx.p2.as_str()), pairs(&[("annual report", 2)]));
    assert!(q
        .filter_entities_grouped(&Filter::new().documents(Vec::<String>::new()))
        .unwrap()
        .is_empty());
}

#[test]
fn scoped_fixture_keeps_documents_apart() {
    let fx = banks();
    let page = fx.queries.filter_obligation_ids(&Filter::new().documents([DOC_A]), Page::all()).unwrap();
    let mut expected: Vec<String> = fx.doc.children.iter().map(|o| o.id.clone()).collect();
    expected.sort();
    let mut got = page.uris.clone();
    got.sort();
    assert_eq!(got, expected);
}
