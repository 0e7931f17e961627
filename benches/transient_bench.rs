//! Benchmark for transient bulk construction.
//!
//! Each transient is measured against building the same collection one
//! persistent update at a time.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use trieste::persistent::{
    PersistentHashMap, PersistentHashSet, PersistentVector, TransientHashMap, TransientHashSet,
    TransientVector,
};

const SIZES: [u32; 3] = [1_000, 10_000, 100_000];

fn benchmark_vector_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_vector_build");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("TransientVector", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut transient = TransientVector::new();
                for index in 0..size {
                    transient.push_back(black_box(index));
                }
                black_box(transient.persistent())
            });
        });

        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let vector = (0..size).fold(PersistentVector::new(), |vector, index| {
                        vector.push_back(black_box(index))
                    });
                    black_box(vector)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_vector_update(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_vector_update");

    for size in SIZES {
        let vector: PersistentVector<u32> = (0..size).collect();

        group.bench_with_input(BenchmarkId::new("TransientVector", size), &vector, |bencher, vector| {
            bencher.iter(|| {
                let mut transient = vector.transient();
                for index in 0..transient.len() {
                    let _ = transient.assoc_n(index, black_box(0));
                }
                black_box(transient.persistent())
            });
        });

        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &vector,
            |bencher, vector| {
                bencher.iter(|| {
                    let updated = (0..vector.len()).fold(vector.clone(), |current, index| {
                        current.update(index, black_box(0)).unwrap_or(current)
                    });
                    black_box(updated)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_hashmap_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_hashmap_build");

    for size in SIZES {
        group.bench_with_input(
            BenchmarkId::new("TransientHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = TransientHashMap::new();
                    for key in 0..size {
                        transient.insert(black_box(key), key);
                    }
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let map = (0..size).fold(PersistentHashMap::new(), |map, key| {
                        map.insert(black_box(key), key)
                    });
                    black_box(map)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_hashset_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_hashset_build");

    for size in SIZES {
        group.bench_with_input(
            BenchmarkId::new("TransientHashSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = TransientHashSet::new();
                    transient.extend((0..size).map(black_box));
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentHashSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let set = (0..size).fold(PersistentHashSet::new(), |set, element| {
                        set.insert(black_box(element))
                    });
                    black_box(set)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_vector_build,
    benchmark_vector_update,
    benchmark_hashmap_build,
    benchmark_hashset_build
);
criterion_main!(benches);
