//! Duplicate discovery engine
//!
//! All-pairs-via-candidates search over an index snapshot. Files are walked
//! in parallel with small dynamic chunks (comparator cost varies a lot per
//! file); a shared atomic bitset prunes files that already landed in a
//! group. The bitset is read without synchronization, so two workers may
//! propose overlapping groups; the union-find merge pass at the end is the
//! source of truth and restores disjointness.

use crate::index::IndexState;
use rayon::prelude::*;
use refrain_core::{DuplicateGroup, FileId, MatchConfig};
use refrain_match::FingerprintComparator;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound on rayon chunk size for the discovery loop
const DISCOVERY_CHUNK_LIMIT: usize = 8;

/// Find all duplicate groups, sequentially
pub(crate) fn discover(state: &IndexState, config: &MatchConfig) -> Vec<DuplicateGroup> {
    let file_count = state.files.len();
    let comparator = FingerprintComparator::new(config.clone());
    let processed = AtomicBitSet::new(file_count);

    let proposals: Vec<Vec<u32>> = (0..file_count)
        .filter_map(|file| propose_group(state, &comparator, &processed, file))
        .collect();
    merge_proposals(state, &comparator, file_count, &proposals)
}

/// Find all duplicate groups on a rayon pool
///
/// With `num_threads` set, a dedicated scoped pool of that size runs the
/// discovery; otherwise the global pool is used.
pub(crate) fn discover_parallel(
    state: &IndexState,
    config: &MatchConfig,
    num_threads: Option<usize>,
) -> Vec<DuplicateGroup> {
    match num_threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| discover_on_current_pool(state, config)),
            Err(error) => {
                tracing::warn!(%error, "could not build a scoped thread pool, using the global pool");
                discover_on_current_pool(state, config)
            }
        },
        None => discover_on_current_pool(state, config),
    }
}

fn discover_on_current_pool(state: &IndexState, config: &MatchConfig) -> Vec<DuplicateGroup> {
    let file_count = state.files.len();
    let comparator = FingerprintComparator::new(config.clone());
    let processed = AtomicBitSet::new(file_count);

    let proposals: Vec<Vec<u32>> = (0..file_count)
        .into_par_iter()
        .with_max_len(DISCOVERY_CHUNK_LIMIT)
        .filter_map(|file| propose_group(state, &comparator, &processed, file))
        .collect();
    merge_proposals(state, &comparator, file_count, &proposals)
}

/// Compare one file against its candidates and propose a group
///
/// The `processed` reads here are an optimization only: a stale `false`
/// costs a redundant comparison that the merge pass absorbs.
fn propose_group(
    state: &IndexState,
    comparator: &FingerprintComparator,
    processed: &AtomicBitSet,
    file: usize,
) -> Option<Vec<u32>> {
    if processed.get(file) {
        return None;
    }
    let entry = state.files.get(file)?;
    let fingerprint = entry.fingerprint();

    let candidates = state
        .postings
        .candidates(fingerprint, comparator.config().hash_threshold);

    let mut members = vec![file as u32];
    for (candidate, _hits) in candidates {
        let other = candidate.index();
        if other == file || processed.get(other) {
            continue;
        }
        // A candidate with no backing entry is treated as absent.
        let Some(other_entry) = state.files.get(other) else {
            continue;
        };
        let result = comparator.compare(fingerprint, other_entry.fingerprint());
        if result.is_duplicate {
            members.push(other as u32);
        }
    }

    if members.len() >= 2 {
        for &member in &members {
            processed.set(member as usize);
        }
        tracing::debug!(file, size = members.len(), "proposed duplicate group");
        Some(members)
    } else {
        processed.set(file);
        None
    }
}

/// Union overlapping proposals into disjoint groups and attach statistics
fn merge_proposals(
    state: &IndexState,
    comparator: &FingerprintComparator,
    file_count: usize,
    proposals: &[Vec<u32>],
) -> Vec<DuplicateGroup> {
    let mut union_find = UnionFind::new(file_count);
    for proposal in proposals {
        let first = proposal[0] as usize;
        for &member in &proposal[1..] {
            union_find.union(first, member as usize);
        }
    }

    let mut classes: HashMap<usize, Vec<FileId>> = HashMap::new();
    for file in 0..file_count {
        classes
            .entry(union_find.find(file))
            .or_default()
            .push(FileId::new(file as u32));
    }

    let mut groups: Vec<DuplicateGroup> = classes
        .into_values()
        .filter(|files| files.len() >= 2)
        .map(|mut files| {
            files.sort_unstable();
            let avg_similarity = average_similarity(state, comparator, &files);
            DuplicateGroup {
                files,
                avg_similarity,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.avg_similarity
            .partial_cmp(&a.avg_similarity)
            .unwrap_or(CmpOrdering::Equal)
            .then(a.files[0].cmp(&b.files[0]))
    });
    groups
}

/// Mean pairwise similarity over all unordered member pairs
fn average_similarity(
    state: &IndexState,
    comparator: &FingerprintComparator,
    files: &[FileId],
) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, &left) in files.iter().enumerate() {
        for &right in &files[i + 1..] {
            let (Some(a), Some(b)) = (
                state.files.get(left.index()),
                state.files.get(right.index()),
            ) else {
                continue;
            };
            total += comparator
                .compare(a.fingerprint(), b.fingerprint())
                .similarity_score;
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}

/// Fixed-size bitset with per-bit atomic writes
///
/// Packs 64 flags per word; relaxed ordering is enough because readers
/// tolerate stale values (the merge pass restores correctness).
struct AtomicBitSet {
    words: Vec<AtomicU64>,
}

impl AtomicBitSet {
    fn new(len: usize) -> Self {
        Self {
            words: (0..len.div_ceil(64)).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn get(&self, index: usize) -> bool {
        self.words[index >> 6].load(Ordering::Relaxed) & (1u64 << (index & 63)) != 0
    }

    fn set(&self, index: usize) {
        self.words[index >> 6].fetch_or(1u64 << (index & 63), Ordering::Relaxed);
    }
}

/// Union-find with path halving
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] as usize != node {
            let grandparent = self.parent[self.parent[node] as usize];
            self.parent[node] = grandparent;
            node = grandparent as usize;
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            // Anchor on the smaller root for stable class representatives.
            if root_a < root_b {
                self.parent[root_b] = root_a as u32;
            } else {
                self.parent[root_a] = root_b as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_bitset_sets_and_reads_across_word_boundaries() {
        let bits = AtomicBitSet::new(130);
        assert!(!bits.get(0));
        assert!(!bits.get(129));

        bits.set(0);
        bits.set(63);
        bits.set(64);
        bits.set(129);

        assert!(bits.get(0));
        assert!(bits.get(63));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert!(!bits.get(128));
    }

    #[test]
    fn union_find_merges_transitively() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(4, 5);

        assert_eq!(uf.find(0), uf.find(2));
        assert_eq!(uf.find(4), uf.find(5));
        assert_ne!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(4));
    }

    #[test]
    fn union_find_prefers_the_smaller_representative() {
        let mut uf = UnionFind::new(4);
        uf.union(3, 1);
        uf.union(1, 2);
        assert_eq!(uf.find(3), 1);
        assert_eq!(uf.find(2), 1);
    }
}
