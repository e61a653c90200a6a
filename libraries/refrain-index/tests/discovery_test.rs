//! Duplicate discovery integration tests
//!
//! Builds small collections of synthetic fingerprints (mutated copies of a
//! base stand in for re-encodes of the same audio) and checks the full
//! pipeline: candidate retrieval, pairwise confirmation, group merge, and
//! output ordering.

use refrain_core::{FileId, Fingerprint, SUBFINGERPRINT_DURATION_SECONDS};
use refrain_index::DuplicateIndex;

/// Deterministic pseudo-random 32-bit words (splitmix64 mixing)
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

fn fp(data: Vec<u32>, path: &str) -> Fingerprint {
    let duration = data.len() as f64 * SUBFINGERPRINT_DURATION_SECONDS;
    Fingerprint::new(data, duration, path).unwrap()
}

/// Flip `bits_per_word` high bits in `fraction` of the words
///
/// High-bit corruption leaves the low-16-bit hashes intact, the way light
/// re-encode noise usually does, so candidate retrieval still fires.
fn corrupt_high_bits(base: &[u32], fraction: f64, bits_per_word: u32) -> Vec<u32> {
    let mut out = base.to_vec();
    let affected = (base.len() as f64 * fraction) as usize;
    let mask: u32 = ((1u32 << bits_per_word) - 1) << 16;
    for word in out.iter_mut().take(affected) {
        *word ^= mask;
    }
    out
}

#[test]
fn finds_a_single_group_among_unrelated_files() {
    let index = DuplicateIndex::new();
    let base = random_words(100, 400);

    // Three light variants of the same audio plus two unrelated files.
    index.add_file("x.flac", fp(base.clone(), "x.flac")).unwrap();
    index
        .add_file("x-v0.mp3", fp(corrupt_high_bits(&base, 0.1, 2), "x-v0.mp3"))
        .unwrap();
    index
        .add_file("x-v1.ogg", fp(corrupt_high_bits(&base, 0.2, 1), "x-v1.ogg"))
        .unwrap();
    index
        .add_file("y.flac", fp(random_words(200, 400), "y.flac"))
        .unwrap();
    index
        .add_file("z.flac", fp(random_words(300, 400), "z.flac"))
        .unwrap();

    let groups = index.find_all_duplicates();
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].files,
        vec![FileId::new(0), FileId::new(1), FileId::new(2)]
    );
    assert!(groups[0].avg_similarity >= 0.95);
}

#[test]
fn chains_collapse_into_one_group() {
    // A and C are each duplicates of B but not of each other: their
    // corruptions are disjoint, so A-to-C error is twice A-to-B error and
    // lands past both thresholds. The group must still contain all three.
    let base = random_words(7, 500);
    let a = corrupt_high_bits(&base, 0.8, 4);
    let mut c = base.clone();
    for word in c.iter_mut().take(400) {
        *word ^= 0b1111u32 << 20;
    }

    let index = DuplicateIndex::new();
    index.add_file("b.flac", fp(base, "b.flac")).unwrap();
    index.add_file("a.flac", fp(a, "a.flac")).unwrap();
    index.add_file("c.flac", fp(c, "c.flac")).unwrap();

    let groups = index.find_all_duplicates();
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].files,
        vec![FileId::new(0), FileId::new(1), FileId::new(2)]
    );
}

#[test]
fn groups_are_disjoint_and_sorted_by_similarity() {
    let index = DuplicateIndex::new();

    // Class one: identical copies (pairwise similarity 1.0).
    let first = random_words(1, 300);
    index.add_file("a1", fp(first.clone(), "a1")).unwrap();
    index.add_file("a2", fp(first, "a2")).unwrap();

    // Class two: lightly corrupted copies (similarity just under 1.0).
    let second = random_words(2, 300);
    index.add_file("b1", fp(second.clone(), "b1")).unwrap();
    index
        .add_file("b2", fp(corrupt_high_bits(&second, 0.5, 2), "b2"))
        .unwrap();

    // Noise.
    index.add_file("n", fp(random_words(3, 300), "n")).unwrap();

    let groups = index.find_all_duplicates();
    assert_eq!(groups.len(), 2);

    // Strongest group first.
    assert_eq!(groups[0].avg_similarity, 1.0);
    assert!(groups[1].avg_similarity < 1.0);
    assert!(groups[1].avg_similarity >= 0.95);

    // Every file appears in at most one group.
    let mut seen = std::collections::HashSet::new();
    for group in &groups {
        assert!(group.files.len() >= 2);
        for &file in &group.files {
            assert!(seen.insert(file), "file {file} appears in two groups");
        }
    }
}

#[test]
fn sequential_and_parallel_discovery_agree() {
    let index = DuplicateIndex::new();
    for class in 0..4u64 {
        let base = random_words(class * 17 + 1, 350);
        index
            .add_file(format!("{class}-0"), fp(base.clone(), "orig"))
            .unwrap();
        index
            .add_file(
                format!("{class}-1"),
                fp(corrupt_high_bits(&base, 0.15, 2), "copy"),
            )
            .unwrap();
    }
    for noise in 0..4u64 {
        index
            .add_file(
                format!("noise-{noise}"),
                fp(random_words(1000 + noise, 350), "noise"),
            )
            .unwrap();
    }

    let sequential = index.find_all_duplicates();
    let repeated = index.find_all_duplicates();
    let parallel = index.find_all_duplicates_parallel(None);
    let bounded = index.find_all_duplicates_parallel(Some(2));

    assert_eq!(sequential.len(), 4);
    assert_eq!(sequential, repeated);
    assert_eq!(sequential, parallel);
    assert_eq!(sequential, bounded);
}

#[test]
fn empty_and_singleton_indexes_yield_no_groups() {
    let index = DuplicateIndex::new();
    assert!(index.find_all_duplicates().is_empty());
    assert!(index.find_all_duplicates_parallel(None).is_empty());

    index
        .add_file("only", fp(random_words(5, 100), "only"))
        .unwrap();
    assert!(index.find_all_duplicates().is_empty());
}

#[test]
fn candidates_rank_the_closest_file_first() {
    let index = DuplicateIndex::new();
    let base = random_words(11, 300);

    let original = index.add_file("orig", fp(base.clone(), "orig")).unwrap();
    // Shares all hashes.
    let twin = index.add_file("twin", fp(base.clone(), "twin")).unwrap();
    // Shares only the first half.
    let mut half = base[..150].to_vec();
    half.extend_from_slice(&random_words(12, 150));
    let partial = index.add_file("half", fp(half, "half")).unwrap();

    let candidates = index.candidates(original).unwrap();
    // Self and twin tie on every hash; the tie breaks by file id.
    assert_eq!(candidates[0], original);
    assert_eq!(candidates[1], twin);
    assert!(candidates.contains(&partial));
}
