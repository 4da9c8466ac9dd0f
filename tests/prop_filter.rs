//! Property tests: query results against a brute-force filter.

use fastconn::{FastConn, FilterSpec, MemoryKernel, NodeId, ScanMode};
use proptest::prelude::*;

const NODES: u64 = 12;
const MODELS: [&str; 2] = ["static_synapse", "stdp_synapse"];

#[derive(Debug, Clone)]
struct Edge {
    source: u64,
    target: u64,
    model: usize,
    weight: f64,
    delay: f64,
}

fn edge() -> impl Strategy<Value = Edge> {
    (1..=NODES, 1..=NODES, 0..MODELS.len(), -4i32..=4, 1i32..=6).prop_map(
        |(source, target, model, w, d)| Edge {
            source,
            target,
            model,
            // Quarter steps so bounds hit stored values exactly.
            weight: f64::from(w) * 0.25,
            delay: f64::from(d) * 0.5,
        },
    )
}

fn id_list() -> impl Strategy<Value = Option<Vec<u64>>> {
    proptest::option::of(proptest::collection::vec(1..=NODES + 2, 0..5))
}

fn bound(lo: i32, hi: i32, step: f64) -> impl Strategy<Value = Option<f64>> {
    proptest::option::of((lo..=hi).prop_map(move |v| f64::from(v) * step))
}

fn filter() -> impl Strategy<Value = FilterSpec> {
    (
        id_list(),
        id_list(),
        proptest::option::of(0..MODELS.len()),
        bound(-4, 4, 0.25),
        bound(-4, 4, 0.25),
        bound(1, 6, 0.5),
        bound(1, 6, 0.5),
    )
        .prop_map(|(sources, targets, model, min_w, max_w, min_d, max_d)| FilterSpec {
            sources: sources.map(|v| v.into_iter().map(NodeId).collect()),
            targets: targets.map(|v| v.into_iter().map(NodeId).collect()),
            type_name: model.map(|m| MODELS[m].to_string()),
            min_weight: min_w,
            max_weight: max_w,
            min_delay: min_d,
            max_delay: max_d,
        })
}

fn admits(list: &Option<Vec<NodeId>>, id: u64) -> bool {
    match list {
        None => true,
        Some(ids) if ids.is_empty() => true,
        Some(ids) => ids.contains(&NodeId(id)),
    }
}

fn brute_force(edges: &[Edge], f: &FilterSpec) -> Vec<(u64, u64, u64, u64)> {
    let mut rows: Vec<_> = edges
        .iter()
        .filter(|e| admits(&f.sources, e.source))
        .filter(|e| admits(&f.targets, e.target))
        .filter(|e| f.type_name.as_deref().is_none_or(|m| MODELS[e.model] == m))
        .filter(|e| f.min_weight.is_none_or(|lo| e.weight >= lo))
        .filter(|e| f.max_weight.is_none_or(|hi| e.weight <= hi))
        .filter(|e| f.min_delay.is_none_or(|lo| e.delay >= lo))
        .filter(|e| f.max_delay.is_none_or(|hi| e.delay <= hi))
        .map(|e| (e.source, e.target, e.weight.to_bits(), e.delay.to_bits()))
        .collect();
    rows.sort_unstable();
    rows
}

fn query_rows(conn: &FastConn<MemoryKernel>, f: &FilterSpec, mode: ScanMode) -> Vec<(u64, u64, u64, u64)> {
    let cols = conn.query_with_mode(f, mode).unwrap();
    assert_eq!(cols.source().len(), cols.delay().len());
    let mut rows: Vec<_> = cols
        .rows()
        .map(|(s, t, w, d)| (s.0, t.0, w.to_bits(), d.to_bits()))
        .collect();
    rows.sort_unstable();
    rows
}

fn build(threads: usize, edges: &[Edge]) -> FastConn<MemoryKernel> {
    let kernel = MemoryKernel::with_threads(threads);
    kernel.create_nodes(NODES as usize);
    for e in edges {
        kernel
            .connect(NodeId(e.source), NodeId(e.target), MODELS[e.model], e.weight, e.delay)
            .unwrap();
    }
    FastConn::with_kernel(kernel)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_matches_brute_force(
        threads in 1usize..5,
        edges in proptest::collection::vec(edge(), 0..60),
        f in filter(),
    ) {
        let conn = build(threads, &edges);
        let expected = brute_force(&edges, &f);
        for mode in [ScanMode::Global, ScanMode::LocallyScoped, ScanMode::Auto] {
            prop_assert_eq!(&query_rows(&conn, &f, mode), &expected, "mode {}", mode);
        }
    }

    #[test]
    fn prop_unfiltered_is_identity(
        threads in 1usize..5,
        edges in proptest::collection::vec(edge(), 0..60),
    ) {
        let conn = build(threads, &edges);
        let rows = query_rows(&conn, &FilterSpec::new(), ScanMode::Global);
        prop_assert_eq!(rows.len(), edges.len());
    }

    #[test]
    fn prop_adding_a_bound_never_adds_rows(
        edges in proptest::collection::vec(edge(), 0..60),
        f in filter(),
        lo in -4i32..=4,
    ) {
        let conn = build(2, &edges);
        let loose = query_rows(&conn, &f, ScanMode::Global);
        let tight = query_rows(&conn, &f.clone().with_min_weight(f64::from(lo) * 0.25), ScanMode::Global);
        prop_assert!(tight.len() <= loose.len() || f.min_weight.is_some());
        for row in &tight {
            prop_assert!(f64::from_bits(row.2) >= f64::from(lo) * 0.25);
        }
    }
}
