mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pytoc::frontend;

fn bench_frontend(c: &mut Criterion) {
    let source = common::combined_source();

    c.bench_function("frontend_tokenize", |b| {
        b.iter(|| {
            let tokens = frontend::tokenize(black_box(&source)).expect("tokenize");
            black_box(tokens);
        })
    });

    c.bench_function("frontend_parse", |b| {
        b.iter(|| {
            let module = frontend::parse(black_box(&source)).expect("parse");
            black_box(module);
        })
    });
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
