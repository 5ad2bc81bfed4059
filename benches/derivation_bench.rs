//! Benchmarks for derivation and memo codec hot paths

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use teleburn::derivation::{self, DEFAULT_DOMAIN_TAG};
use teleburn::memo;
use teleburn::InscriptionId;

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derivation");

    for index in [0u32, 7, 1_000_000].iter() {
        let id = InscriptionId::new([0xab; 32], *index);
        group.bench_with_input(BenchmarkId::new("derive", index), &id, |b, id| {
            b.iter(|| derivation::derive(black_box(id), black_box(DEFAULT_DOMAIN_TAG)))
        });
    }

    group.finish();
}

fn bench_memo(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo");
    let id = InscriptionId::new([0x5c; 32], 42);
    let canonical = memo::encode(&id);
    let compact = format!("teleburn:v0.1:burn:{}", id);
    let bare = id.to_string();

    group.bench_function("encode", |b| b.iter(|| memo::encode(black_box(&id))));
    for (name, raw) in [("canonical", &canonical), ("compact", &compact), ("bare", &bare)] {
        group.bench_with_input(BenchmarkId::new("decode", name), raw, |b, raw| {
            b.iter(|| memo::decode(black_box(raw)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_derive, bench_memo);
criterion_main!(benches);
