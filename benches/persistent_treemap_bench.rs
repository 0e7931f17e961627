//! Benchmark for PersistentTreeMap against the standard BTreeMap.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;
use trieste::persistent::{FnComparator, PersistentTreeMap};

const SIZES: [i64; 3] = [100, 1_000, 100_000];

fn scrambled(size: i64) -> impl Iterator<Item = i64> {
    (0..size).map(move |index| (index * 7_919) % size)
}

fn benchmark_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("treemap_insert");

    for size in SIZES {
        group.bench_with_input(
            BenchmarkId::new("PersistentTreeMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let map = scrambled(size).fold(PersistentTreeMap::new(), |map, key| {
                        map.insert(black_box(key), key)
                    });
                    black_box(map)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = BTreeMap::new();
                for key in scrambled(size) {
                    map.insert(black_box(key), key);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("treemap_get");

    for size in SIZES {
        let map: PersistentTreeMap<i64, i64> = scrambled(size).map(|key| (key, key)).collect();

        group.bench_with_input(BenchmarkId::new("natural", size), &size, |bencher, &size| {
            bencher.iter(|| {
                (0..size)
                    .filter_map(|key| map.get(&black_box(key)))
                    .fold(0_i64, |sum, value| sum.wrapping_add(*value))
            });
        });

        let descending = scrambled(size).fold(
            PersistentTreeMap::with_comparator(FnComparator::new(|left: &i64, right: &i64| {
                right.cmp(left)
            })),
            |map, key| map.insert(key, key),
        );

        group.bench_with_input(BenchmarkId::new("comparator", size), &size, |bencher, &size| {
            bencher.iter(|| {
                (0..size)
                    .filter_map(|key| descending.get(&black_box(key)))
                    .fold(0_i64, |sum, value| sum.wrapping_add(*value))
            });
        });
    }

    group.finish();
}

fn benchmark_remove(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("treemap_remove");

    for size in SIZES {
        let map: PersistentTreeMap<i64, i64> = (0..size).map(|key| (key, key)).collect();

        group.bench_with_input(BenchmarkId::new("remove_all", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let emptied =
                    scrambled(size).fold(map.clone(), |map, key| map.remove(&black_box(key)));
                black_box(emptied)
            });
        });
    }

    group.finish();
}

fn benchmark_range(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("treemap_range");

    for size in SIZES {
        let map: PersistentTreeMap<i64, i64> = (0..size).map(|key| (key, key)).collect();
        let window = size / 10;

        group.bench_with_input(BenchmarkId::new("ascending", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let start = black_box(size / 2);
                black_box(map.range(start..start + window).count())
            });
        });

        group.bench_with_input(BenchmarkId::new("descending", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let end = black_box(size / 2);
                black_box(map.range_rev(end - window..end).count())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_insert,
    benchmark_get,
    benchmark_remove,
    benchmark_range
);
criterion_main!(benches);
