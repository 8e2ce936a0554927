//! Throughput benchmarks for the hazard-pointer queue

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nobet::Domain;
use nobet_queue::{BusySpinBackoff, NoBackoff, Queue};
use std::sync::Arc;
use std::thread;

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");
    let domain = Arc::new(Domain::new());
    let handle = domain.register();

    group.bench_function("single_thread", |b| {
        b.iter(|| {
            let guard = handle.acquire().unwrap();
            black_box(&guard);
        });
    });

    group.finish();
}

fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");

    for batch in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
            let q = Queue::builder().backoff(NoBackoff).build();
            let domain = q.domain().clone();
            let handle = domain.register();
            b.iter(|| {
                for i in 0..batch {
                    q.enqueue_with(&handle, i).unwrap();
                }
                for _ in 0..batch {
                    black_box(q.dequeue_with(&handle).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_cached_handle(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_handle");
    let q = Queue::new();

    group.bench_function("enqueue_dequeue", |b| {
        b.iter(|| {
            q.enqueue(black_box(1u64)).unwrap();
            black_box(q.dequeue().unwrap());
        });
    });

    group.finish();
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    const OPS: usize = 1000;

    for threads in [2usize, 4, 8].iter() {
        group.throughput(Throughput::Elements((*threads * OPS * 2) as u64));
        group.bench_with_input(
            BenchmarkId::new("paired", threads),
            threads,
            |b, &num_threads| {
                let q = Arc::new(
                    Queue::builder()
                        .backoff(BusySpinBackoff::default())
                        .build(),
                );
                b.iter(|| {
                    let workers: Vec<_> = (0..num_threads)
                        .map(|t| {
                            let q = q.clone();
                            thread::spawn(move || {
                                for i in 0..OPS {
                                    q.enqueue(t * OPS + i).unwrap();
                                    black_box(q.dequeue().unwrap());
                                }
                            })
                        })
                        .collect();
                    for w in workers {
                        w.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_single_thread,
    bench_cached_handle,
    bench_mpmc
);
criterion_main!(benches);
