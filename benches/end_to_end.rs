//! End-to-end benchmark: compile latency and run throughput.
//!
//! 1. Compile a grouped aggregate with a decorrelated grand total
//! 2. Run it over synthetic inputs of growing size

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use rhyme::ast::{lit, object, path, sum, RawExpr};

fn grouped_query() -> RawExpr {
    object(vec![
        (lit("total"), sum(path("data.*A.value"))),
        (
            path("data.*.key"),
            object(vec![
                (lit("my_total"), sum(path("data.*.value"))),
                (lit("full_total"), sum(path("data.*B.value"))),
            ]),
        ),
    ])
}

/// `n` records spread over 16 keys.
fn synthetic_data(n: usize) -> Value {
    let rows: Vec<Value> = (0..n)
        .map(|i| json!({"key": format!("k{}", i % 16), "value": i}))
        .collect();
    json!({ "data": rows })
}

fn bench_compile(c: &mut Criterion) {
    let raw = grouped_query();
    c.bench_function("compile/grouped", |b| {
        b.iter(|| rhyme::compile(black_box(&raw)))
    });
}

fn bench_run(c: &mut Criterion) {
    let query = match rhyme::compile(&grouped_query()) {
        Ok(query) => query,
        Err(err) => panic!("benchmark query failed to compile: {err}"),
    };
    let small = synthetic_data(100);
    let large = synthetic_data(10_000);

    let mut group = c.benchmark_group("run");
    group.bench_function("100_rows", |b| b.iter(|| query.run(black_box(&small))));
    group.bench_function("10k_rows", |b| b.iter(|| query.run(black_box(&large))));
    group.finish();
}

criterion_group!(benches, bench_compile, bench_run);
criterion_main!(benches);
