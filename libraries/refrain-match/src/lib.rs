//! Refrain Match
//!
//! Fingerprint comparison for Refrain: bitwise similarity, alignment search,
//! and sliding-window segment matching over Chromaprint-style fingerprints.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Fingerprints │ ──► │ Quick filter      │ ──► │ MatchResult  │
//! │  (A, B)      │     │ Alignment search  │     │              │
//! └──────────────┘     │ Similarity + BER  │     └──────────────┘
//!                      └───────────────────┘
//! ```
//!
//! The comparator is pure: it holds one immutable configuration snapshot and
//! can be invoked concurrently from any number of threads. It never fails;
//! anomalous inputs yield a well-formed "no match" result.
//!
//! # Example
//!
//! ```rust
//! use refrain_core::{Fingerprint, MatchConfig};
//! use refrain_match::FingerprintComparator;
//!
//! let a = Fingerprint::new(vec![0x12345678; 64], 8.0, "a.flac").unwrap();
//! let comparator = FingerprintComparator::new(MatchConfig::default());
//!
//! let result = comparator.compare(&a, &a);
//! assert!(result.is_duplicate);
//! assert_eq!(result.best_offset, 0);
//! ```

#![forbid(unsafe_code)]

pub mod bits;
mod comparator;
mod gaussian;

pub use comparator::{hash_jaccard, FingerprintComparator};
