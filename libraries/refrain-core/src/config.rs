//! Matching configuration
//!
//! All thresholds and search parameters used by the comparator and the
//! discovery engine. A `MatchConfig` is immutable once published: the index
//! façade swaps whole snapshots atomically, and an in-flight query keeps the
//! snapshot it loaded at entry, so a query never observes a half-updated
//! configuration.

use crate::error::{RefrainError, Result};
use serde::{Deserialize, Serialize};

/// Slack factor applied to `similarity_threshold` by the quick filter.
///
/// The Jaccard similarity of two fingerprints' 16-bit hash sets is a loose
/// lower proxy for alignment similarity; 0.6 is enough slack that the filter
/// never rejects a pair the full comparison would have accepted.
pub const QUICK_FILTER_SLACK: f64 = 0.6;

/// Thresholds and search parameters for fingerprint matching
///
/// Offsets, window sizes, and overlaps are measured in sub-fingerprint words
/// (one word covers [`crate::SUBFINGERPRINT_DURATION_SECONDS`] of audio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum similarity score for a duplicate verdict (0.0 to 1.0)
    pub similarity_threshold: f64,

    /// Maximum bit error rate for a duplicate verdict (0.0 to 1.0)
    pub bit_error_threshold: f64,

    /// Minimum overlapped words required before a pair is comparable
    pub minimum_overlap: usize,

    /// Half-range of the alignment offset search, in words (~30 s at 360)
    pub max_alignment_offset: usize,

    /// Stride of the coarse correlation search, in words (~0.5 s at 6)
    pub alignment_step: usize,

    /// Minimum distinct hash hits for a file to become a candidate
    pub hash_threshold: usize,

    /// Segment window size for sliding-window comparison, in words (~5 s at 60)
    pub sliding_window_size: usize,

    /// Stride between successive windows over the first fingerprint
    pub sliding_window_stride: usize,

    /// Factor applied to `similarity_threshold` when accepting a segment match
    pub segment_min_similarity_factor: f64,

    /// Minimum coverage ratio for a sliding-window duplicate verdict
    pub group_coverage_min: f64,

    /// Minimum kept segment count for a sliding-window duplicate verdict
    pub group_min_matching_segments: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            bit_error_threshold: 0.15,
            minimum_overlap: 10,
            max_alignment_offset: 360,
            alignment_step: 6,
            hash_threshold: 5,
            sliding_window_size: 60,
            sliding_window_stride: 30,
            segment_min_similarity_factor: 0.8,
            group_coverage_min: 0.5,
            group_min_matching_segments: 3,
        }
    }
}

impl MatchConfig {
    /// Validate all fields
    ///
    /// # Errors
    /// Returns `RefrainError::InvalidConfiguration` naming the offending
    /// field. Setters must reject invalid values before publishing.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RefrainError::invalid_configuration(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.bit_error_threshold) {
            return Err(RefrainError::invalid_configuration(format!(
                "bit_error_threshold must be in [0, 1], got {}",
                self.bit_error_threshold
            )));
        }
        if self.minimum_overlap < 1 {
            return Err(RefrainError::invalid_configuration(
                "minimum_overlap must be at least 1",
            ));
        }
        if self.max_alignment_offset > crate::MAX_SUBFINGERPRINTS {
            return Err(RefrainError::invalid_configuration(format!(
                "max_alignment_offset must be at most {}, got {}",
                crate::MAX_SUBFINGERPRINTS,
                self.max_alignment_offset
            )));
        }
        if self.alignment_step < 1 {
            return Err(RefrainError::invalid_configuration(
                "alignment_step must be at least 1",
            ));
        }
        if self.hash_threshold < 1 {
            return Err(RefrainError::invalid_configuration(
                "hash_threshold must be at least 1",
            ));
        }
        if self.sliding_window_size < 2 {
            return Err(RefrainError::invalid_configuration(
                "sliding_window_size must be at least 2",
            ));
        }
        if self.sliding_window_stride < 1 {
            return Err(RefrainError::invalid_configuration(
                "sliding_window_stride must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.segment_min_similarity_factor) {
            return Err(RefrainError::invalid_configuration(format!(
                "segment_min_similarity_factor must be in [0, 1], got {}",
                self.segment_min_similarity_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.group_coverage_min) {
            return Err(RefrainError::invalid_configuration(format!(
                "group_coverage_min must be in [0, 1], got {}",
                self.group_coverage_min
            )));
        }
        if self.group_min_matching_segments < 1 {
            return Err(RefrainError::invalid_configuration(
                "group_min_matching_segments must be at least 1",
            ));
        }
        Ok(())
    }

    /// Minimum segment similarity accepted by the sliding-window search
    pub fn segment_similarity_floor(&self) -> f64 {
        self.segment_min_similarity_factor * self.similarity_threshold
    }

    /// Jaccard threshold applied by the quick filter
    pub fn quick_filter_floor(&self) -> f64 {
        QUICK_FILTER_SLACK * self.similarity_threshold
    }
}
