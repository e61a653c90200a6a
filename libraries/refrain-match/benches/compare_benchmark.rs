//! Comparator benchmarks on synthetic fingerprints

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use refrain_core::{Fingerprint, SUBFINGERPRINT_DURATION_SECONDS};
use refrain_match::FingerprintComparator;

fn random_words(seed: u64, len: usize) -> Vec<u32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_add(0x9E3779B97F4A7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
            (z ^ (z >> 31)) as u32
        })
        .collect()
}

fn fingerprint(seed: u64, len: usize) -> Fingerprint {
    let duration = len as f64 * SUBFINGERPRINT_DURATION_SECONDS;
    Fingerprint::new(random_words(seed, len), duration, "bench.flac").unwrap()
}

fn bench_compare(c: &mut Criterion) {
    let comparator = FingerprintComparator::default();

    // Typical 3-4 minute track (~2000 words) against a padded copy of itself.
    let base = random_words(1, 2000);
    let mut padded = vec![0u32; 50];
    padded.extend_from_slice(&base);
    let a = Fingerprint::new(base, 248.0, "a.flac").unwrap();
    let b = Fingerprint::new(padded, 254.2, "b.flac").unwrap();

    c.bench_function("compare/duplicate_2000_words", |bencher| {
        bencher.iter(|| comparator.compare(black_box(&a), black_box(&b)));
    });

    let unrelated = fingerprint(2, 2000);
    c.bench_function("compare/unrelated_2000_words", |bencher| {
        bencher.iter(|| comparator.compare(black_box(&a), black_box(&unrelated)));
    });

    c.bench_function("compare_sliding_window/duplicate_2000_words", |bencher| {
        bencher.iter(|| comparator.compare_sliding_window(black_box(&a), black_box(&b)));
    });
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);
