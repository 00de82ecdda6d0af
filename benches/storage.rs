//! Results storage benchmark: replace and read the artifact on each backend.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use access_sentinel::model::AnomalyLabel;
use access_sentinel::scoring::{AnnotatedResult, AnnotatedRow};
use access_sentinel::storage::{CsvResultsStore, ResultsStore, SqliteResultsStore};
use tempfile::tempdir;

fn make_result(n: usize) -> AnnotatedResult {
    let rows = (0..n)
        .map(|i| AnnotatedRow {
            ip: format!("10.0.0.{}", i % 256),
            timestamp: chrono::DateTime::parse_from_rfc3339("2020-10-10T13:55:36+00:00").ok(),
            method: "GET".to_string(),
            url: format!("/item/{}", i),
            protocol: "HTTP/1.1".to_string(),
            status: Some(200),
            size: Some(i as i64 * 17),
            referer: "-".to_string(),
            user_agent: "bench".to_string(),
            anomaly: if i % 100 == 0 { AnomalyLabel::Anomaly } else { AnomalyLabel::Normal },
        })
        .collect();
    AnnotatedResult { rows }
}

fn bench_csv(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = CsvResultsStore::new(dir.path().join("results.csv"));
    let result = make_result(1_000);

    c.bench_function("csv_write_1k", |b| b.iter(|| store.write(black_box(&result)).unwrap()));
    store.write(&result).unwrap();
    c.bench_function("csv_read_1k", |b| b.iter(|| black_box(store.read()).unwrap()));
}

fn bench_sqlite(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = SqliteResultsStore::open(&dir.path().join("results.db")).unwrap();
    let result = make_result(1_000);

    c.bench_function("sqlite_write_1k", |b| b.iter(|| store.write(black_box(&result)).unwrap()));
    store.write(&result).unwrap();
    c.bench_function("sqlite_read_1k", |b| b.iter(|| black_box(store.read()).unwrap()));
}

criterion_group!(benches, bench_csv, bench_sqlite);
criterion_main!(benches);
