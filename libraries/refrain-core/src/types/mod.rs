//! Domain types for Refrain

mod fingerprint;
mod ids;
mod results;

pub use fingerprint::Fingerprint;
pub use ids::{FileId, IndexEntry};
pub use results::{DuplicateGroup, MatchResult, SegmentMatch};
