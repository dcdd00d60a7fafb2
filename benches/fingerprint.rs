//! Benchmarks for fingerprinting and banding.
//!
//! These cover the hot path of an index build: vectorize + project, plus
//! the per-insert band signature computation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use simdex::simhash::{
    fingerprint_with_vectorizer, FrequencyVectorizer, Hyperplanes, NGramVectorizer,
    PermutationTable, SimHash, Vectorizer,
};

// === Generators ===

fn random_text(len: usize) -> String {
    let mut rng = StdRng::seed_from_u64(42);
    let words = [
        "index", "shard", "chunk", "fingerprint", "band", "offset", "query", "text", "overlap",
        "boundary", "hamming", "bucket",
    ];
    let mut out = String::with_capacity(len + 16);
    while out.len() < len {
        out.push_str(words[rng.gen_range(0..words.len())]);
        out.push(' ');
    }
    out
}

// === Benchmarks ===

fn bench_fingerprint_text_sizes(c: &mut Criterion) {
    let planes = Hyperplanes::generate(128, 64);
    let frequency = FrequencyVectorizer::new(128);
    let ngram = NGramVectorizer::new(128, 3);

    for (name, vectorizer) in [
        ("frequency", &frequency as &(dyn Vectorizer + Sync)),
        ("ngram3", &ngram as &(dyn Vectorizer + Sync)),
    ] {
        let mut group = c.benchmark_group(format!("fingerprint_{name}"));
        for size in [256usize, 1024, 4096, 16384] {
            let text = random_text(size);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
                bench.iter(|| fingerprint_with_vectorizer(black_box(&text), &planes, vectorizer));
            });
        }
        group.finish();
    }
}

fn bench_hyperplane_generation(c: &mut Criterion) {
    c.bench_function("hyperplanes_128x64", |bench| {
        bench.iter(|| Hyperplanes::generate(black_box(128), black_box(64)));
    });
}

fn bench_band_signatures(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let fps: Vec<SimHash> = (0..1024).map(|_| SimHash(rng.gen())).collect();

    let mut group = c.benchmark_group("band_signatures");
    for bands in [4usize, 8, 16] {
        let table = PermutationTable::new(64, bands).unwrap();
        group.throughput(Throughput::Elements(fps.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bands), &bands, |bench, _| {
            bench.iter(|| {
                for fp in &fps {
                    black_box(table.band_signatures(black_box(*fp)));
                }
            });
        });
    }
    group.finish();
}

fn bench_hamming(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(9);
    let pairs: Vec<(SimHash, SimHash)> = (0..4096)
        .map(|_| (SimHash(rng.gen()), SimHash(rng.gen())))
        .collect();

    c.bench_function("hamming_4096_pairs", |bench| {
        bench.iter(|| {
            let mut total = 0u32;
            for (a, b) in &pairs {
                total += a.hamming_distance(*b);
            }
            black_box(total)
        });
    });
}

criterion_group!(
    benches,
    bench_fingerprint_text_sizes,
    bench_hyperplane_generation,
    bench_band_signatures,
    bench_hamming
);
criterion_main!(benches);
