//! Benchmarks for query translation.
//!
//! Run with: cargo bench --package features-query

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use features_query::{coerce, translate, wkt, CqlTranslator, PropertyNamespace, QueryParameters};

fn params(pairs: &[(&str, &str)]) -> QueryParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn bench_coercion(c: &mut Criterion) {
    let mut group = c.benchmark_group("coercion");
    for raw in ["0.63", "'1000'", "true", "2018-10-22T22:00:00Z", "Garonne"] {
        group.bench_function(raw, |b| b.iter(|| coerce(black_box(raw))));
    }
    group.finish();
}

fn bench_parameters(c: &mut Criterion) {
    let query = params(&[
        ("limit", "100"),
        ("bbox", "-5,41,10,51.5"),
        ("datetime", "2018-10-22T22:00:00Z/2018-10-24T08:00:00Z"),
        ("sortby", "-H,name"),
        ("code_station", "'O962000101'"),
    ]);
    c.bench_function("translate_parameters", |b| {
        b.iter(|| translate(black_box(&query), true))
    });
}

fn bench_cql(c: &mut Criterion) {
    let translator = CqlTranslator::new(PropertyNamespace::Properties, chrono::Utc::now());
    let body = json!({"and": [
        {"between": {"value": {"property": "H"}, "lower": 0.1, "upper": 0.9}},
        {"not": [{"in": {"value": {"property": "code"}, "list": ["A", "B", "C"]}}]},
        {"intersects": [{"property": "geometry"}, {"type": "Point", "coordinates": [1.4, 43.6]}]}
    ]});
    c.bench_function("translate_cql_json", |b| {
        b.iter(|| translator.translate_json(black_box(&body)))
    });
    c.bench_function("parse_wkt_polygon", |b| {
        b.iter(|| wkt::parse(black_box("POLYGON((0 40,5 40,5 45,0 45,0 40))")))
    });
}

criterion_group!(benches, bench_coercion, bench_parameters, bench_cql);
criterion_main!(benches);
