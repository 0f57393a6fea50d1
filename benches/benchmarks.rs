use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use json_docstore::{DocStore, MemoryFs};
use serde_json::{json, Value};
use std::hint::black_box;
use std::path::PathBuf;

fn bench_path(name: &str, size: usize) -> PathBuf {
    std::env::temp_dir().join(format!("json_docstore_bench_{}_{}.json", name, size))
}

fn docs(size: usize) -> Vec<Value> {
    (0..size).map(|i| json!({"id": i, "tag": i % 7})).collect()
}

fn fresh(name: &str, size: usize) -> DocStore {
    let path = bench_path(name, size);
    let _ = std::fs::remove_file(&path);
    let db = DocStore::new(&path);
    db.init_store().unwrap();
    db
}

fn bench_add_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_many");
    for size in [100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("os", size), &size, |b, &size| {
            let db = fresh("add_many", size);
            let batch = docs(size);
            b.iter(|| {
                db.add_many("k", batch.clone()).unwrap();
                db.remove("k").unwrap();
            });
            let _ = std::fs::remove_file(db.path());
        });
    }
}

fn bench_get_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_where");
    for size in [100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("os", size), &size, |b, &size| {
            let db = fresh("get_where", size);
            db.add_many("k", docs(size)).unwrap();
            b.iter(|| black_box(db.get_where("k", |d| d["tag"] == 3).unwrap()));
            let _ = std::fs::remove_file(db.path());
        });
    }
}

fn bench_update_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_where");
    for size in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("memory", size), &size, |b, &size| {
            let db = DocStore::builder("bench.json")
                .filesystem(MemoryFs::new())
                .open()
                .unwrap();
            db.add_many("k", docs(size)).unwrap();
            b.iter(|| db.update_where("k", json!({"tag": 0}), |d| d["tag"] == 1).unwrap());
        });
    }
}

fn bench_add_one_by_one(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    group.sample_size(20);
    for size in [10, 100] {
        group.bench_with_input(BenchmarkId::new("os", size), &size, |b, &size| {
            let db = fresh("add", size);
            b.iter(|| {
                for doc in docs(size) {
                    db.add("k", doc).unwrap();
                }
                db.remove_key("k").unwrap();
            });
            let _ = std::fs::remove_file(db.path());
        });
    }
}

criterion_group!(
    benches,
    bench_add_many,
    bench_get_where,
    bench_update_where,
    bench_add_one_by_one,
);
criterion_main!(benches);
