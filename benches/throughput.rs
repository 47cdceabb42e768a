//! Benchmarks for Tradeflow queue and entropy window performance

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tradeflow::{shannon_entropy, BoundedQueue, MarketData, SlidingEntropy, TraderAction};

fn generate_actions(count: usize) -> Vec<TraderAction> {
    (0..count)
        .map(|i| TraderAction::ALL[(i * 7 + i / 5) % 3])
        .collect()
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("push_pop_1000", |b| {
        let queue = BoundedQueue::new(1_000, 1);
        b.iter(|| {
            for i in 0..1000u64 {
                let _ = queue.push(i);
            }
            while let Some(item) = queue.try_pop() {
                black_box(item);
            }
        })
    });

    group.bench_function("push_batch_pop_1000", |b| {
        let queue = BoundedQueue::new(1_000, 100);
        let mut batch = Vec::with_capacity(100);
        b.iter(|| {
            for i in 0..1000u64 {
                let _ = queue.push(i);
            }
            while queue.try_pop_batch(&mut batch) {
                black_box(&batch);
            }
        })
    });

    group.bench_function("push_market_data_1000", |b| {
        let queue = BoundedQueue::new(1_000, 100);
        let actions = generate_actions(10);
        let mut batch = Vec::with_capacity(100);
        b.iter(|| {
            for _ in 0..1000 {
                let _ = queue.push(MarketData::from(actions.clone()));
            }
            while queue.try_pop_batch(&mut batch) {
                black_box(&batch);
            }
        })
    });

    group.finish();
}

fn bench_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");
    let actions = generate_actions(1000);
    group.throughput(Throughput::Elements(1000));

    // Per-event cost should not depend on the window length.
    for size in [50usize, 500, 5_000] {
        group.bench_with_input(BenchmarkId::new("add_action_1000", size), &size, |b, &size| {
            let window = SlidingEntropy::new(size, size, size);
            b.iter(|| {
                for &action in &actions {
                    window.add_action(action);
                }
                black_box(window.current_entropy());
            })
        });
    }

    group.bench_function("add_actions_batch_1000", |b| {
        let window = SlidingEntropy::default();
        b.iter(|| {
            window.add_actions_batch(&actions);
            black_box(window.current_entropy());
        })
    });

    group.bench_function("shannon_entropy_1000", |b| {
        b.iter(|| black_box(shannon_entropy(black_box(&actions))))
    });

    group.finish();
}

criterion_group!(benches, bench_queue, bench_window);
criterion_main!(benches);
