//! Refrain Index
//!
//! Candidate retrieval and duplicate-group discovery over registered
//! fingerprints.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐ add_file ┌──────────────────┐     ┌───────────────────┐
//! │  Producer  │ ───────► │  DuplicateIndex  │ ──► │  InvertedIndex    │
//! └────────────┘          │  (files + lock)  │     │  hash16 → postings │
//!                         └────────┬─────────┘     └───────────────────┘
//!                                  │ find_all_duplicates
//!                                  ▼
//!                         ┌──────────────────┐     ┌───────────────────┐
//!                         │ Discovery engine │ ──► │ DuplicateGroups   │
//!                         │ (rayon + merge)  │     └───────────────────┘
//!                         └──────────────────┘
//! ```
//!
//! The index owns every fingerprint in a dense table keyed by `FileId`;
//! observers borrow through [`FileRef`]. Discovery walks candidates from the
//! inverted index, confirms them with the comparator, and merges proposals
//! with union-find so the final groups are disjoint and deterministic.
//!
//! # Example
//!
//! ```rust
//! use refrain_core::Fingerprint;
//! use refrain_index::DuplicateIndex;
//!
//! let index = DuplicateIndex::new();
//! let fp = Fingerprint::new(vec![0xABCD1234; 64], 8.0, "/music/a.flac").unwrap();
//! let id = index.add_file("/music/a.flac", fp).unwrap();
//!
//! assert_eq!(index.file_count(), 1);
//! assert!(index.get_file(id).is_some());
//! ```

#![forbid(unsafe_code)]

mod engine;
mod index;
mod postings;

pub use index::{DuplicateIndex, FileRef};
pub use postings::InvertedIndex;
