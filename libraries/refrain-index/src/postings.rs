//! Inverted hash index
//!
//! Maps every possible low-16-bit hash to the list of `(file, position)`
//! pairs where it occurred. Posting lists are append-only under a single
//! writer; the whole table is dropped on `clear`.

use refrain_core::{FileId, Fingerprint, IndexEntry};
use std::collections::HashMap;

/// Number of distinct 16-bit hash keys
const HASH_SPACE: usize = 1 << 16;

/// Append-only inverted index from 16-bit hash to postings
#[derive(Debug)]
pub struct InvertedIndex {
    /// One posting list per possible hash, indexed directly by hash value
    postings: Vec<Vec<IndexEntry>>,
    /// Total number of postings across all lists
    posting_count: usize,
}

impl InvertedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            postings: vec![Vec::new(); HASH_SPACE],
            posting_count: 0,
        }
    }

    /// Insert every word of a fingerprint
    ///
    /// Each word contributes exactly one posting, at the key given by its
    /// low 16 bits. Time is linear in the fingerprint length.
    pub fn insert(&mut self, file_id: FileId, fingerprint: &Fingerprint) {
        for (position, hash) in fingerprint.hashes().enumerate() {
            self.postings[hash as usize].push(IndexEntry {
                file_id,
                position: position as u32,
            });
        }
        self.posting_count += fingerprint.len();
    }

    /// Files sharing at least `hash_threshold` distinct hashes with the query
    ///
    /// Returns `(file_id, hit_count)` sorted by hit count descending, ties by
    /// file id ascending. The query's own file (if registered) is included;
    /// callers skip self.
    pub fn candidates(
        &self,
        fingerprint: &Fingerprint,
        hash_threshold: usize,
    ) -> Vec<(FileId, usize)> {
        let mut hits: HashMap<FileId, usize> = HashMap::new();
        // Count each query hash once, whatever its multiplicity.
        let mut seen = [0u64; 1024];
        for hash in fingerprint.hashes() {
            let (slot, bit) = ((hash >> 6) as usize, 1u64 << (hash & 63));
            if seen[slot] & bit != 0 {
                continue;
            }
            seen[slot] |= bit;

            // A file's postings under one key are contiguous (each insert
            // processes one fingerprint front to back), so consecutive
            // deduplication counts every file at most once per hash.
            let mut last: Option<FileId> = None;
            for entry in &self.postings[hash as usize] {
                if last != Some(entry.file_id) {
                    *hits.entry(entry.file_id).or_insert(0) += 1;
                    last = Some(entry.file_id);
                }
            }
        }

        let mut ranked: Vec<(FileId, usize)> = hits
            .into_iter()
            .filter(|&(_, count)| count >= hash_threshold)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// Posting list for one hash key
    pub fn postings_for(&self, hash: u16) -> &[IndexEntry] {
        &self.postings[hash as usize]
    }

    /// Total postings across all keys
    pub fn posting_count(&self) -> usize {
        self.posting_count
    }

    /// Drop all postings
    pub fn clear(&mut self) {
        for list in &mut self.postings {
            list.clear();
        }
        self.posting_count = 0;
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}
