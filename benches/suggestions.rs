//! Benchmark suite for relationship operations
//!
//! Covers:
//! - Suggestions: friend-of-friend expansion and the full suggestion path
//! - Guard: bidirectional block check
//! - Queries: followers of a hub user
//!
//! Run: cargo bench --bench suggestions

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linkgraph::suggestion::DEFAULT_SUGGESTION_TARGET;
use linkgraph::{
    BlockGuard, ConnectionQuery, ConnectionRecord, ConnectionState, GraphStore, MemoryGraph,
    SuggestionEngine,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Each user follows `fanout` others; every tenth user blocks its successor.
fn create_social_graph(user_count: usize, fanout: usize) -> Arc<MemoryGraph> {
    let store = Arc::new(MemoryGraph::ephemeral());
    for i in 0..user_count {
        let from = format!("user-{}", i);
        for k in 1..=fanout {
            let to = format!("user-{}", (i * 7 + k * 13) % user_count);
            store
                .merge_connection(ConnectionRecord::new(from.clone(), to, ConnectionState::Connected))
                .unwrap();
        }
        if i % 10 == 0 {
            store
                .merge_block(&from, &format!("user-{}", (i + 1) % user_count))
                .unwrap();
        }
    }
    store
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");

    for size in [1000, 10000] {
        let store = create_social_graph(size, 20);
        let engine = SuggestionEngine::new(
            store.clone(),
            BlockGuard::new(store.clone()),
            DEFAULT_SUGGESTION_TARGET,
        );

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(engine.expand(black_box("user-0")).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_get_suggestions(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_suggestions");

    for fanout in [2, 20, 100] {
        let store = create_social_graph(10000, fanout);
        let engine = SuggestionEngine::new(
            store.clone(),
            BlockGuard::new(store.clone()),
            DEFAULT_SUGGESTION_TARGET,
        );

        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, _| {
            b.iter(|| {
                black_box(engine.get_suggestions(black_box("user-42")).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_is_blocked_either(c: &mut Criterion) {
    let store = create_social_graph(10000, 20);
    let guard = BlockGuard::new(store.clone());

    c.bench_function("is_blocked_either", |b| {
        b.iter(|| {
            black_box(guard.is_blocked_either(black_box("user-5"), black_box("user-6")).unwrap());
        });
    });
}

fn bench_followers(c: &mut Criterion) {
    let store = create_social_graph(10000, 20);

    c.bench_function("find_followers", |b| {
        b.iter(|| {
            black_box(
                store
                    .find_connections(&ConnectionQuery::new().to(black_box("user-13")).connected())
                    .unwrap(),
            );
        });
    });
}

criterion_group!(
    benches,
    bench_expand,
    bench_get_suggestions,
    bench_is_blocked_either,
    bench_followers,
);

criterion_main!(benches);
