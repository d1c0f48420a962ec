//! Performance benchmarks for ordering, checksums and CPM.
//!
//! Run with: `cargo bench --bench ordering`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Cold topological order | Linear in nodes + edges | Kahn over internal edges |
//! | Cached topological order | Constant after first call | Revision check only |
//! | Checksum | Linear after sort | One BLAKE2b pass |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use dag_kernel::{Attributes, Graph, NodeId, NodeStore};

/// Build a layered DAG: `layers` rows of `width` nodes, each node depending
/// on two nodes of the previous row.
fn make_layered(layers: usize, width: usize) -> (NodeStore<String>, Graph<String>) {
    let mut store = NodeStore::with_capacity(layers * width);
    let mut graph = Graph::new();
    let mut previous: Vec<NodeId> = Vec::new();

    for layer in 0..layers {
        let row: Vec<NodeId> = (0..width)
            .map(|i| {
                let id = store.insert(format!("L{}N{}", layer, i));
                store
                    .set_duration(id, ((layer + i) % 5 + 1) as f64)
                    .expect("set duration");
                id
            })
            .collect();
        for id in &row {
            graph.add_node(&store, *id).expect("add node");
        }
        if !previous.is_empty() {
            for (i, id) in row.iter().enumerate() {
                for offset in [0, 1] {
                    let dependency = previous[(i + offset) % previous.len()];
                    graph
                        .add_edge(&mut store, dependency, *id, Attributes::new())
                        .expect("add edge");
                }
            }
        }
        previous = row;
    }

    (store, graph)
}

/// Benchmark topological order without a warm cache.
fn bench_cold_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_topological_order");

    for layers in [10, 50, 100] {
        let (store, graph) = make_layered(layers, 10);
        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(BenchmarkId::new("nodes", graph.len()), &graph, |b, graph| {
            b.iter(|| {
                // A cloned view starts with an empty cache.
                let view = graph.clone();
                view.topological_order(black_box(&store)).map(|order| order.len())
            })
        });
    }

    group.finish();
}

/// Benchmark topological order served from the cache.
fn bench_cached_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_topological_order");

    for layers in [10, 50, 100] {
        let (store, graph) = make_layered(layers, 10);
        let warm = graph.topological_order(&store).map(|order| order.len());
        assert_eq!(warm.ok(), Some(graph.len()));

        group.bench_with_input(BenchmarkId::new("nodes", graph.len()), &graph, |b, graph| {
            b.iter(|| graph.topological_order(black_box(&store)).map(|order| order.len()))
        });
    }

    group.finish();
}

/// Benchmark checksum computation.
fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    for layers in [10, 50, 100] {
        let (store, graph) = make_layered(layers, 10);
        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(BenchmarkId::new("nodes", graph.len()), &graph, |b, graph| {
            b.iter(|| dag_kernel::compute_checksum(graph, black_box(&store)))
        });
    }

    group.finish();
}

/// Benchmark CPM analysis.
fn bench_cpm(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpm_analysis");

    for layers in [10, 50] {
        let (store, graph) = make_layered(layers, 10);
        group.bench_with_input(BenchmarkId::new("nodes", graph.len()), &graph, |b, graph| {
            b.iter(|| graph.cpm_analysis(black_box(&store)).map(|analysis| analysis.project_duration()))
        });
    }

    group.finish();
}

/// Benchmark transitive reduction, including the node copies it makes.
fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("transitive_reduction");

    for layers in [10, 30] {
        let (store, graph) = make_layered(layers, 10);
        group.bench_with_input(BenchmarkId::new("nodes", graph.len()), &graph, |b, graph| {
            b.iter(|| {
                let mut scratch = store.clone();
                graph
                    .transitive_reduction(black_box(&mut scratch))
                    .map(|reduced| reduced.graph.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cold_order,
    bench_cached_order,
    bench_checksum,
    bench_cpm,
    bench_reduction,
);

criterion_main!(benches);
