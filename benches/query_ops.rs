//! Benchmarks for natural sorting and filter queries.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;

use ro_graph::annotation::AnnotationNode;
use ro_graph::graph::builder::GraphBuilder;
use ro_graph::id::MintStrategy;
use ro_graph::namespace::Namespaces;
use ro_graph::ontology::Ontology;
use ro_graph::query::{sort_natural, Constraint, Filter, Page, QueryProvider};
use ro_graph::store::OxigraphStore;

const REPORTERS: &[&str] = &["The Board", "credit institutions", "(c) ESMA", "Member States", "the competent authority"];

fn bench_natural_sort(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let mut values: Vec<String> = (0..1_000)
        .map(|i| format!("{} #{i}", REPORTERS[i % REPORTERS.len()]))
        .collect();
    values.shuffle(&mut rng);

    c.bench_function("sort_natural_1k", |bench| {
        bench.iter(|| {
            let mut v = values.clone();
            sort_natural(&mut v);
            black_box(v)
        })
    });
}

fn populated() -> QueryProvider<OxigraphStore> {
    let store = OxigraphStore::in_memory().unwrap();
    let ontology = Ontology::default();
    ontology.declare_schema(&store).unwrap();
    let builder = GraphBuilder::new(ontology, MintStrategy::RandomSerial.build());
    for d in 0..20 {
        let obligations = (0..25)
            .map(|o| {
                AnnotationNode::obligation(
                    format!("Obligation {o} of document {d}"),
                    vec![
                        AnnotationNode::entity("ARG0", REPORTERS[(d + o) % REPORTERS.len()]),
                        AnnotationNode::entity("V", "report"),
                        AnnotationNode::entity("ARGM-TMP", if o % 2 == 0 { "annually" } else { "quarterly" }),
                    ],
                )
            })
            .collect();
        builder
            .add_document(&store, &AnnotationNode::document(obligations), &format!("doc-{d}"))
            .unwrap();
    }
    QueryProvider::new(store, Namespaces::default())
}

fn bench_filters(c: &mut Criterion) {
    let queries = populated();
    let ns = queries.namespaces().clone();
    let filter = Filter::new()
        .constraint(Constraint::new(ns.ro("hasReporter"), ["the board", "member states"]))
        .constraint(Constraint::one(ns.ro("hasPropTmp"), "annually"));

    c.bench_function("filter_obligation_ids_500", |bench| {
        bench.iter(|| black_box(queries.filter_obligation_ids(&filter, Page::new(Some(20), 0)).unwrap()))
    });
    c.bench_function("filter_entities_grouped_500", |bench| {
        bench.iter(|| black_box(queries.filter_entities_grouped(&Filter::new()).unwrap()))
    });
}

criterion_group!(benches, bench_natural_sort, bench_filters);
criterion_main!(benches);
