//! Refrain Core
//!
//! Platform-agnostic core types, configuration, and error handling for
//! Refrain, the audio duplicate finder.
//!
//! This crate provides the foundational building blocks shared by the
//! comparator, the index, and the producer side:
//! - **Domain Types**: `Fingerprint`, `FileId`, `MatchResult`, `DuplicateGroup`
//! - **Configuration**: `MatchConfig` with validation
//! - **Error Handling**: Unified `RefrainError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use refrain_core::{Fingerprint, MatchConfig};
//!
//! let fp = Fingerprint::new(vec![0xDEADBEEF; 200], 24.8, "/music/song.flac").unwrap();
//! assert_eq!(fp.len(), 200);
//! assert_eq!(fp.hash_at(0), 0xBEEF);
//!
//! let config = MatchConfig::default();
//! assert!(config.validate().is_ok());
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{MatchConfig, QUICK_FILTER_SLACK};
pub use error::{RefrainError, Result};
pub use types::{
    DuplicateGroup, FileId, Fingerprint, IndexEntry, MatchResult, SegmentMatch,
};

/// Sample rate of the fingerprint producer's internal framing (Hz).
///
/// Carried on every `Fingerprint` for reporting; the comparator never uses it.
pub const FINGERPRINT_SAMPLE_RATE: u32 = 11_025;

/// Upper sanity bound on the number of sub-fingerprints in one fingerprint.
pub const MAX_SUBFINGERPRINTS: usize = 100_000;

/// Approximate audio duration represented by one 32-bit sub-fingerprint (seconds).
pub const SUBFINGERPRINT_DURATION_SECONDS: f64 = 0.124;
