use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ripple_core::{Computed, Runtime, Value};

/// Invalidation and recomputation through graphs of different shapes.
fn bench_propagation(c: &mut Criterion) {
    bench_chain(c);
    bench_fanout_flush(c);
    bench_cached_reads(c);
}

fn build_chain(rt: &Runtime, len: usize) -> (Value<u64>, Computed<u64>) {
    let source = rt.value(0u64);
    let mut tail = rt.computed({
        let source = source.clone();
        move || Ok(source.get() + 1)
    });
    for _ in 1..len {
        let prev = tail.clone();
        tail = rt.computed(move || Ok(prev.get()? + 1));
    }
    (source, tail)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_set_then_read");
    for len in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let rt = Runtime::new();
            let (source, tail) = build_chain(&rt, len);
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                source.set(n);
                black_box(tail.get().ok());
            });
        });
    }
    group.finish();
}

fn bench_fanout_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout_flush");
    for width in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let rt = Runtime::new();
            let source = rt.value(0u64);
            let sink = Rc::new(Cell::new(0u64));
            for _ in 0..width {
                let (source, sink) = (source.clone(), sink.clone());
                rt.observer(move || {
                    sink.set(sink.get().wrapping_add(source.get()));
                    Ok(())
                });
            }
            rt.flush().unwrap();

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                source.set(n);
                rt.flush().unwrap();
                black_box(sink.get());
            });
        });
    }
    group.finish();
}

fn bench_cached_reads(c: &mut Criterion) {
    let rt = Runtime::new();
    let (_source, tail) = build_chain(&rt, 100);
    tail.get().unwrap();

    c.bench_function("cached_read", |b| {
        b.iter(|| black_box(tail.get().ok()));
    });
}

criterion_group!(benches, bench_propagation);
criterion_main!(benches);
