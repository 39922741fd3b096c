//! Benchmarks for buffer operations
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use linesieve::{Buffer, FilteredBuffer, Line, MemoryBuffer, RawLineBuffer};
use std::sync::Arc;

fn filled_raw(size: usize) -> Arc<RawLineBuffer> {
    let raw = Arc::new(RawLineBuffer::new());
    for i in 0..size as u64 {
        raw.append(Line::new(i, format!("line {}", i), false));
    }
    raw
}

fn bench_raw_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_append");

    for capacity in [0usize, 1000, 10_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("append", capacity),
            capacity,
            |b, &capacity| {
                let raw = RawLineBuffer::new();
                raw.set_capacity(capacity);
                let mut i = 0u64;
                b.iter(|| {
                    raw.append(black_box(Line::new(i, "benchmark line", false)));
                    i = i.wrapping_add(1);
                });
            },
        );
    }

    group.finish();
}

fn bench_append_with_dependents(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_at_capacity");

    for views in [1usize, 16].iter() {
        let raw = filled_raw(1000);
        raw.set_capacity(1000);
        let pinned: Vec<_> = (0..*views)
            .map(|_| {
                let view = Arc::new(FilteredBuffer::page(raw.clone(), 1, 20));
                raw.register(&view);
                view
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("views", views), &raw, |b, raw| {
            let mut i = 1000u64;
            b.iter(|| {
                raw.append(Line::new(i, "benchmark line", false));
                i = i.wrapping_add(1);
            });
        });
        drop(pinned);
    }

    group.finish();
}

fn bench_page_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_construction");
    let raw = filled_raw(100_000);

    for page_size in [20usize, 500].iter() {
        group.throughput(Throughput::Elements(*page_size as u64));
        group.bench_with_input(
            BenchmarkId::new("page", page_size),
            page_size,
            |b, &page_size| {
                b.iter(|| black_box(FilteredBuffer::page(raw.clone(), 42, page_size)));
            },
        );
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_at");

    let memory = MemoryBuffer::new();
    for i in 0..10_000u64 {
        memory.append(Line::new(i, format!("line {}", i), false));
    }
    let raw = filled_raw(10_000);
    let view = FilteredBuffer::with_selection(raw.clone(), (0..10_000).rev().collect());

    group.bench_function("memory", |b| {
        b.iter(|| black_box(memory.line_at(black_box(5000))))
    });
    group.bench_function("raw", |b| b.iter(|| black_box(raw.line_at(black_box(5000)))));
    group.bench_function("filtered", |b| {
        b.iter(|| black_box(view.line_at(black_box(5000))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_raw_append,
    bench_append_with_dependents,
    bench_page_construction,
    bench_lookup
);
criterion_main!(benches);
