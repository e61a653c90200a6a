//! Comparison and discovery result types
//!
//! Freshly computed value objects; the core never caches or persists them.
//! Field names, units, and ranges are part of the consumer contract.

use super::FileId;
use serde::{Deserialize, Serialize};

/// One accepted segment match from the sliding-window comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentMatch {
    /// Alignment offset of the segment (position in B minus position in A), in words
    pub offset: i32,
    /// Similarity of the segment pair (0.0 to 1.0)
    pub similarity: f64,
}

/// Outcome of comparing two fingerprints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Overall similarity (0.0 to 1.0); weighted over segments in
    /// sliding-window mode, alignment similarity otherwise
    pub similarity_score: f64,
    /// Best alignment offset in words; positive means B lags A
    pub best_offset: i32,
    /// Overlap length in words (single-offset mode) or kept segment count
    /// (sliding-window mode)
    pub matched_segments: usize,
    /// Bit error rate at `best_offset` (0.0 to 1.0)
    pub bit_error_rate: f64,
    /// Final duplicate verdict under the configuration snapshot
    pub is_duplicate: bool,
    /// Kept segment matches, strongest first; empty in single-offset mode
    pub segment_matches: Vec<SegmentMatch>,
    /// Fraction of the longer fingerprint covered by the match (0.0 to 1.0)
    pub coverage_ratio: f64,
}

impl MatchResult {
    /// The canonical "no match" value
    ///
    /// Returned for too-short inputs, quick-filter rejections, and runtime
    /// anomalies (empty histogram, no segments). The comparator never fails.
    pub fn no_match() -> Self {
        Self {
            similarity_score: 0.0,
            best_offset: 0,
            matched_segments: 0,
            bit_error_rate: 1.0,
            is_duplicate: false,
            segment_matches: Vec::new(),
            coverage_ratio: 0.0,
        }
    }
}

/// A set of mutually duplicate files
///
/// Groups in a discovery result are disjoint; members are sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Member files, sorted ascending, always at least two
    pub files: Vec<FileId>,
    /// Arithmetic mean of pairwise similarity over all unordered member pairs
    pub avg_similarity: f64,
}

impl DuplicateGroup {
    /// Number of files in the group
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Groups are never empty; present for API symmetry
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_is_zeroed() {
        let result = MatchResult::no_match();
        assert_eq!(result.similarity_score, 0.0);
        assert_eq!(result.best_offset, 0);
        assert_eq!(result.matched_segments, 0);
        assert!(!result.is_duplicate);
        assert!(result.segment_matches.is_empty());
        assert_eq!(result.coverage_ratio, 0.0);
    }

    #[test]
    fn match_result_round_trips_through_json() {
        let result = MatchResult {
            similarity_score: 0.97,
            best_offset: -5,
            matched_segments: 180,
            bit_error_rate: 0.03,
            is_duplicate: true,
            segment_matches: vec![SegmentMatch {
                offset: -5,
                similarity: 0.97,
            }],
            coverage_ratio: 0.9,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: MatchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
