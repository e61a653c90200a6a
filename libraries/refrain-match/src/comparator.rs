//! Fingerprint comparator
//!
//! Two comparison modes over 32-bit sub-fingerprint sequences:
//!
//! - [`FingerprintComparator::compare`] finds the single best alignment
//!   offset (histogram search joined with a coarse correlation scan, then
//!   local refinement) and judges the pair at that offset.
//! - [`FingerprintComparator::compare_sliding_window`] matches fixed-size
//!   segments independently, tolerating non-uniform silence padding and
//!   partial overlaps.
//!
//! Both modes are gated by a cheap Jaccard filter over the 16-bit hash sets
//! so that obviously unrelated pairs never pay for an alignment search.

use crate::bits;
use crate::gaussian;
use refrain_core::{Fingerprint, MatchConfig, MatchResult, SegmentMatch};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Gaussian sigma for histogram smoothing
const HISTOGRAM_SIGMA: f64 = 2.0;

/// Smoothed histogram values at or below this are never peaks
const PEAK_FLOOR: f64 = 0.1;

/// Half-width of the local refinement around the coarse alignment winner
const REFINEMENT_RADIUS: i64 = 2;

/// How many histogram peaks seed the per-segment search in sliding-window mode
const SEGMENT_SEED_LIMIT: usize = 4;

/// Stateless fingerprint comparator over one configuration snapshot
///
/// Pure and `Send + Sync`; safe to share across worker threads. The
/// comparator never fails: too-short inputs, quick-filter rejections, and
/// runtime anomalies all produce [`MatchResult::no_match`].
#[derive(Debug, Clone)]
pub struct FingerprintComparator {
    config: MatchConfig,
}

impl FingerprintComparator {
    /// Create a comparator over a configuration snapshot
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// The configuration snapshot this comparator judges with
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Compare two fingerprints at their single best alignment offset
    ///
    /// Runs the histogram and correlation searches independently, keeps the
    /// offset with the higher similarity, refines it locally, and judges the
    /// pair at the refined offset. `matched_segments` is the overlap length
    /// in words.
    pub fn compare(&self, a: &Fingerprint, b: &Fingerprint) -> MatchResult {
        let cfg = &self.config;
        if a.len() < cfg.minimum_overlap || b.len() < cfg.minimum_overlap {
            return MatchResult::no_match();
        }
        if !self.passes_quick_filter(a, b) {
            return MatchResult::no_match();
        }

        let max_offset = cfg.max_alignment_offset as i64;

        // Two independent coarse searches; higher similarity wins.
        let histogram_best = histogram_peaks(a.data(), b.data(), max_offset)
            .first()
            .map(|&k| (k, similarity_at(a.data(), b.data(), k).0));
        let (corr_offset, corr_similarity) = self.correlation_search(a.data(), b.data());

        let coarse = match histogram_best {
            Some((hist_offset, hist_similarity))
                if hist_similarity > corr_similarity
                    || (hist_similarity == corr_similarity
                        && hist_offset.abs() <= corr_offset.abs()) =>
            {
                hist_offset
            }
            _ => corr_offset,
        };

        let (best_offset, similarity, overlap) =
            refine_offset(a.data(), b.data(), coarse, max_offset);
        tracing::trace!(best_offset, similarity, overlap, "alignment selected");

        let bit_error_rate = 1.0 - similarity;
        let coverage_ratio = overlap as f64 / a.len().max(b.len()) as f64;
        let is_duplicate = similarity >= cfg.similarity_threshold
            && bit_error_rate <= cfg.bit_error_threshold
            && overlap >= cfg.minimum_overlap;

        MatchResult {
            similarity_score: similarity,
            best_offset: best_offset as i32,
            matched_segments: overlap,
            bit_error_rate,
            is_duplicate,
            segment_matches: Vec::new(),
            coverage_ratio,
        }
    }

    /// Compare two fingerprints segment-by-segment
    ///
    /// Slides a fixed window over A and searches B for the best matching
    /// window of the same size, so duplicates that differ by leading or
    /// trailing silence (or only partially overlap) still score well.
    /// `matched_segments` is the kept segment count.
    pub fn compare_sliding_window(&self, a: &Fingerprint, b: &Fingerprint) -> MatchResult {
        let cfg = &self.config;
        let window = cfg.sliding_window_size;
        if a.len() < window || b.len() < window {
            return MatchResult::no_match();
        }
        if a.len() < cfg.minimum_overlap || b.len() < cfg.minimum_overlap {
            return MatchResult::no_match();
        }
        if !self.passes_quick_filter(a, b) {
            return MatchResult::no_match();
        }

        // The coarse position grid can straddle the true alignment, so the
        // strongest global alignment offsets seed every per-window search.
        let max_offset = cfg.max_alignment_offset as i64;
        let seeds: Vec<i64> = histogram_peaks(a.data(), b.data(), max_offset)
            .into_iter()
            .take(SEGMENT_SEED_LIMIT)
            .collect();

        let floor = cfg.segment_similarity_floor();
        let mut matches: Vec<SegmentCandidate> = Vec::new();
        let mut a_pos = 0;
        while a_pos + window <= a.len() {
            let window_a = &a.data()[a_pos..a_pos + window];
            if let Some((similarity, b_pos)) =
                best_window_position(window_a, b.data(), window, cfg.alignment_step, &seeds, a_pos)
            {
                if similarity >= floor {
                    matches.push(SegmentCandidate {
                        a_pos,
                        offset: b_pos as i64 - a_pos as i64,
                        similarity,
                    });
                }
            }
            a_pos += cfg.sliding_window_stride;
        }

        if matches.is_empty() {
            return MatchResult::no_match();
        }

        // Strongest first; ties resolved by position for determinism.
        matches.sort_by(|x, y| {
            y.similarity
                .partial_cmp(&x.similarity)
                .unwrap_or(Ordering::Equal)
                .then(x.a_pos.cmp(&y.a_pos))
        });

        // Greedy overlap filter: a window too close to a kept one is dropped.
        let half_window = window / 2;
        let mut kept: Vec<&SegmentCandidate> = Vec::new();
        for candidate in &matches {
            if kept
                .iter()
                .all(|k| candidate.a_pos.abs_diff(k.a_pos) >= half_window)
            {
                kept.push(candidate);
            }
        }

        // Similarity-weighted mean upweights strong segments.
        let sum: f64 = kept.iter().map(|c| c.similarity).sum();
        let sum_sq: f64 = kept.iter().map(|c| c.similarity * c.similarity).sum();
        let overall_similarity = if sum > 0.0 { sum_sq / sum } else { 0.0 };

        let best_offset = kept[0].offset;
        let coverage_ratio =
            ((kept.len() * window) as f64 / a.len().max(b.len()) as f64).min(1.0);
        let (similarity_at_best, _) = similarity_at(a.data(), b.data(), best_offset);
        let bit_error_rate = 1.0 - similarity_at_best;

        let is_duplicate = overall_similarity >= cfg.similarity_threshold
            && bit_error_rate <= cfg.bit_error_threshold
            && coverage_ratio >= cfg.group_coverage_min
            && kept.len() >= cfg.group_min_matching_segments;

        MatchResult {
            similarity_score: overall_similarity,
            best_offset: best_offset as i32,
            matched_segments: kept.len(),
            bit_error_rate,
            is_duplicate,
            segment_matches: kept
                .iter()
                .map(|c| SegmentMatch {
                    offset: c.offset as i32,
                    similarity: c.similarity,
                })
                .collect(),
            coverage_ratio,
        }
    }

    /// Whether a pair survives the cheap hash-set pre-filter
    fn passes_quick_filter(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        hash_jaccard(a, b) >= self.config.quick_filter_floor()
    }

    /// Evaluate similarity on the coarse offset grid, best offset wins
    fn correlation_search(&self, a: &[u32], b: &[u32]) -> (i64, f64) {
        let max_offset = self.config.max_alignment_offset as i64;
        let step = self.config.alignment_step as i64;

        let mut best_offset = 0i64;
        let mut best_similarity = -1.0f64;
        let mut offset = -max_offset;
        while offset <= max_offset {
            let (similarity, _) = similarity_at(a, b, offset);
            if similarity > best_similarity
                || (similarity == best_similarity && offset.abs() < best_offset.abs())
            {
                best_similarity = similarity;
                best_offset = offset;
            }
            offset += step;
        }
        (best_offset, best_similarity)
    }
}

impl Default for FingerprintComparator {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

/// One accepted per-window match before the overlap filter
struct SegmentCandidate {
    a_pos: usize,
    offset: i64,
    similarity: f64,
}

/// Jaccard similarity of the two fingerprints' 16-bit hash sets
///
/// Duplicate hashes within one fingerprint are collapsed. Used by the quick
/// filter; public so calibration tests can assert the filter's soundness.
pub fn hash_jaccard(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let mut set_a = [0u64; 1024];
    let mut set_b = [0u64; 1024];
    for hash in a.hashes() {
        set_a[(hash >> 6) as usize] |= 1u64 << (hash & 63);
    }
    for hash in b.hashes() {
        set_b[(hash >> 6) as usize] |= 1u64 << (hash & 63);
    }

    let mut intersection = 0u32;
    let mut union = 0u32;
    for (wa, wb) in set_a.iter().zip(&set_b) {
        intersection += (wa & wb).count_ones();
        union += (wa | wb).count_ones();
    }
    if union == 0 {
        0.0
    } else {
        f64::from(intersection) / f64::from(union)
    }
}

/// Similarity and overlap length at a fixed alignment offset
///
/// The overlap pairs `a[i]` with `b[i + offset]`; an empty overlap scores 0.
fn similarity_at(a: &[u32], b: &[u32], offset: i64) -> (f64, usize) {
    let start = 0i64.max(-offset);
    let end = (a.len() as i64).min(b.len() as i64 - offset);
    if end <= start {
        return (0.0, 0);
    }

    let overlap = (end - start) as usize;
    let mut matching_bits = 0u64;
    for i in start..end {
        let distance = bits::hamming(a[i as usize], b[(i + offset) as usize]);
        matching_bits += u64::from(32 - distance);
    }
    (
        matching_bits as f64 / (overlap as f64 * 32.0),
        overlap,
    )
}

/// Evaluate every offset in a small neighborhood of the coarse winner
///
/// Returns `(offset, similarity, overlap)`; ties go to the smaller |offset|.
fn refine_offset(a: &[u32], b: &[u32], coarse: i64, max_offset: i64) -> (i64, f64, usize) {
    let lo = (coarse - REFINEMENT_RADIUS).max(-max_offset);
    let hi = (coarse + REFINEMENT_RADIUS).min(max_offset);

    let mut best = (coarse, -1.0f64, 0usize);
    for offset in lo..=hi {
        let (similarity, overlap) = similarity_at(a, b, offset);
        if similarity > best.1 || (similarity == best.1 && offset.abs() < best.0.abs()) {
            best = (offset, similarity, overlap);
        }
    }
    best
}

/// Candidate alignment offsets from the hash-match histogram
///
/// Joins the two fingerprints on their low-16-bit hashes (posting-list join,
/// not an all-pairs walk), accumulates offset counts, smooths with a
/// Gaussian, and returns the local maxima above the peak floor, strongest
/// first. Ties prefer the smaller |offset|.
fn histogram_peaks(a: &[u32], b: &[u32], max_offset: i64) -> Vec<i64> {
    let size = (2 * max_offset + 1) as usize;
    let mut histogram = vec![0.0f64; size];

    let mut b_positions: HashMap<u16, Vec<i64>> = HashMap::new();
    for (j, &word) in b.iter().enumerate() {
        b_positions
            .entry((word & 0xFFFF) as u16)
            .or_default()
            .push(j as i64);
    }

    for (i, &word) in a.iter().enumerate() {
        let Some(positions) = b_positions.get(&((word & 0xFFFF) as u16)) else {
            continue;
        };
        for &j in positions {
            let delta = j - i as i64;
            if delta.abs() <= max_offset {
                histogram[(delta + max_offset) as usize] += 1.0;
            }
        }
    }

    let smoothed = gaussian::smooth(&histogram, HISTOGRAM_SIGMA);

    let mut peaks: Vec<(f64, i64)> = Vec::new();
    for (i, &value) in smoothed.iter().enumerate() {
        if value <= PEAK_FLOOR {
            continue;
        }
        let left_ok = i == 0 || smoothed[i - 1] <= value;
        let right_ok = i + 1 == smoothed.len() || smoothed[i + 1] <= value;
        if left_ok && right_ok {
            peaks.push((value, i as i64 - max_offset));
        }
    }

    peaks.sort_by(|x, y| {
        y.0.partial_cmp(&x.0)
            .unwrap_or(Ordering::Equal)
            .then(x.1.abs().cmp(&y.1.abs()))
            .then(x.1.cmp(&y.1))
    });
    peaks.into_iter().map(|(_, offset)| offset).collect()
}

/// Best matching window position in B for one window of A
///
/// Scans the coarse grid plus the seeded global alignment offsets; returns
/// `(similarity, b_position)` of the strongest candidate.
fn best_window_position(
    window_a: &[u32],
    b: &[u32],
    window: usize,
    grid_step: usize,
    seeds: &[i64],
    a_pos: usize,
) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    let mut consider = |b_pos: usize| {
        let window_b = &b[b_pos..b_pos + window];
        let (similarity, _) = similarity_at(window_a, window_b, 0);
        if best.map_or(true, |(s, _)| similarity > s) {
            best = Some((similarity, b_pos));
        }
    };

    let mut b_pos = 0;
    while b_pos + window <= b.len() {
        consider(b_pos);
        b_pos += grid_step;
    }
    for &seed in seeds {
        let seeded = a_pos as i64 + seed;
        if seeded >= 0 && (seeded as usize) + window <= b.len() {
            consider(seeded as usize);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use refrain_core::SUBFINGERPRINT_DURATION_SECONDS;

    fn fp(data: Vec<u32>) -> Fingerprint {
        let duration = data.len() as f64 * SUBFINGERPRINT_DURATION_SECONDS;
        Fingerprint::new(data, duration, "test.flac").unwrap()
    }

    // Deterministic pseudo-random words (splitmix64 mixing).
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

    #[test]
    fn too_short_inputs_never_match() {
        let comparator = FingerprintComparator::default();
        let short = fp(vec![0xABCD; 5]);
        let long = fp(random_words(1, 100));

        assert_eq!(comparator.compare(&short, &long), MatchResult::no_match());
        assert_eq!(comparator.compare(&long, &short), MatchResult::no_match());
    }

    #[test]
    fn unrelated_fingerprints_fail_the_quick_filter() {
        let comparator = FingerprintComparator::default();
        let a = fp(random_words(1, 200));
        let b = fp(random_words(2, 200));

        // Disjoint random data shares almost no 16-bit hashes.
        assert!(hash_jaccard(&a, &b) < comparator.config().quick_filter_floor());
        assert_eq!(comparator.compare(&a, &b), MatchResult::no_match());
    }

    #[test]
    fn similarity_at_handles_empty_overlap() {
        let a = random_words(3, 10);
        let b = random_words(4, 10);
        assert_eq!(similarity_at(&a, &b, 10), (0.0, 0));
        assert_eq!(similarity_at(&a, &b, -10), (0.0, 0));
        assert_eq!(similarity_at(&a, &b, 1000), (0.0, 0));
    }

    #[test]
    fn similarity_at_partial_overlap() {
        let a = vec![0xFFFF_FFFF, 0xFFFF_FFFF];
        let b = vec![0xFFFF_FFFF, 0x0000_0000];
        // Offset 1 pairs a[0] with b[1]: all 32 bits differ.
        let (similarity, overlap) = similarity_at(&a, &b, 1);
        assert_eq!(overlap, 1);
        assert_eq!(similarity, 0.0);
        // Offset -1 pairs a[1] with b[0]: all 32 bits match.
        let (similarity, overlap) = similarity_at(&a, &b, -1);
        assert_eq!(overlap, 1);
        assert_eq!(similarity, 1.0);
    }

    #[test]
    fn histogram_finds_a_known_shift() {
        let a = random_words(5, 300);
        let mut b = vec![0u32; 40];
        b.extend_from_slice(&a);

        let peaks = histogram_peaks(&a, &b, 360);
        assert_eq!(peaks.first(), Some(&40));
    }

    #[test]
    fn histogram_of_unrelated_data_has_no_dominant_shift() {
        let a = random_words(6, 50);
        let b = random_words(7, 50);
        let peaks = histogram_peaks(&a, &b, 360);
        // Collisions may produce stray small peaks but nothing near the
        // count a genuine alignment produces.
        for k in peaks {
            let (similarity, _) = similarity_at(&a, &b, k);
            assert!(similarity < 0.8);
        }
    }

    #[test]
    fn refinement_recovers_off_grid_offsets() {
        let a = random_words(8, 200);
        let mut b = vec![0u32; 7];
        b.extend_from_slice(&a);

        // Coarse winner lands near 7; refinement must settle exactly on it.
        let (offset, similarity, overlap) = refine_offset(&a, &b, 6, 360);
        assert_eq!(offset, 7);
        assert_eq!(similarity, 1.0);
        assert_eq!(overlap, 200);
    }

    #[test]
    fn identical_fingerprints_are_duplicates() {
        let comparator = FingerprintComparator::default();
        let a = fp(random_words(9, 120));
        let result = comparator.compare(&a, &a);

        assert_eq!(result.similarity_score, 1.0);
        assert_eq!(result.bit_error_rate, 0.0);
        assert_eq!(result.best_offset, 0);
        assert_eq!(result.matched_segments, 120);
        assert!(result.is_duplicate);
        assert_eq!(result.coverage_ratio, 1.0);
    }

    #[test]
    fn sliding_window_requires_a_full_window() {
        let comparator = FingerprintComparator::default();
        let short = fp(random_words(10, 59));
        let long = fp(random_words(10, 200));

        assert_eq!(
            comparator.compare_sliding_window(&short, &long),
            MatchResult::no_match()
        );
    }

    #[test]
    fn sliding_window_self_match_keeps_every_segment() {
        let comparator = FingerprintComparator::default();
        let a = fp(random_words(11, 300));
        let result = comparator.compare_sliding_window(&a, &a);

        assert!(result.is_duplicate);
        assert_eq!(result.best_offset, 0);
        assert_eq!(result.similarity_score, 1.0);
        assert!(result.coverage_ratio >= 0.5);
        assert!(result.matched_segments >= 3);
        assert_eq!(result.segment_matches.len(), result.matched_segments);
    }

    #[test]
    fn quick_filter_floor_tracks_the_threshold() {
        let config = MatchConfig {
            similarity_threshold: 0.5,
            ..MatchConfig::default()
        };
        let comparator = FingerprintComparator::new(config);
        assert!((comparator.config().quick_filter_floor() - 0.3).abs() < 1e-12);
    }
}
