//! Benchmarks for URL validation and inbound envelope decoding.
//!
//! Both run on every user edit or inbound message, so they should stay in the
//! low-microsecond range.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use viewer_core::{decode_inbound, validate, TrustPolicy};

fn bench_validate(c: &mut Criterion) {
    let policy = TrustPolicy::from_setting("example.com, starfinderencounters.com", false);

    c.bench_function("validate_allowed_with_session", |b| {
        b.iter(|| {
            validate(
                black_box("example.com/#/hacking/view?session=abcdefgh12345&state=x"),
                &policy,
            )
        })
    });

    c.bench_function("validate_rejected_host", |b| {
        b.iter(|| validate(black_box("badhost.net/#/hacking/view"), &policy))
    });
}

fn bench_origin(c: &mut Criterion) {
    let policy = TrustPolicy::from_setting("example.com", false);
    c.bench_function("authorize_origin", |b| {
        b.iter(|| policy.authorizes_origin(black_box("https://app.example.com")))
    });
}

fn bench_decode(c: &mut Criterion) {
    let data = json!({"type": "nodeSelected", "version": 1, "payload": {"nodeId": "n1", "nodeName": "Core"}});
    c.bench_function("decode_inbound", |b| b.iter(|| decode_inbound(black_box(&data))));
}

criterion_group!(benches, bench_validate, bench_origin, bench_decode);
criterion_main!(benches);
