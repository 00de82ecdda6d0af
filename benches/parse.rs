//! Parsing benchmark: raw access-log lines → typed log table.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use access_sentinel::parser::{parse_line, LogTableBuilder};

const LINE: &str = r#"192.168.10.4 - - [10/Oct/2020:13:55:36 +0000] "GET /static/app.js?v=12 HTTP/1.1" 200 48213 "https://example.com/" "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0""#;

fn make_body(n: usize) -> String {
    (0..n)
        .map(|i| {
            if i % 50 == 0 {
                "malformed line without the expected shape".to_string()
            } else {
                LINE.replace("48213", &(i * 7 % 100_000).to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_parse_line(c: &mut Criterion) {
    c.bench_function("parse_line", |b| b.iter(|| parse_line(black_box(LINE))));
}

fn bench_build_table(c: &mut Criterion) {
    let builder = LogTableBuilder::new();
    let mut g = c.benchmark_group("build_table");
    for n in [100, 1_000, 10_000] {
        let body = make_body(n);
        g.throughput(Throughput::Elements(n as u64));
        g.bench_function(format!("lines_{}", n).as_str(), |b| {
            b.iter(|| builder.build_from_str(black_box(&body)))
        });
    }
    g.finish();
}

criterion_group!(benches, bench_parse_line, bench_build_table);
criterion_main!(benches);
