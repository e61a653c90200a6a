//! Fingerprint value object
//!
//! An immutable sequence of 32-bit sub-fingerprints plus reporting metadata.
//! The producer (Chromaprint-style fingerprinter) builds these; the object
//! itself only exposes its data and hash views and never decides similarity.

use crate::error::{RefrainError, Result};
use crate::{FINGERPRINT_SAMPLE_RATE, MAX_SUBFINGERPRINTS};
use serde::Serialize;

/// An acoustic fingerprint of one audio file
///
/// Immutable after construction; the constructor enforces the invariants
/// (non-empty data, positive duration, length under the sanity bound), so
/// downstream code never re-validates. Serializable for reporting;
/// deserialization is deliberately absent so every instance passes through
/// the validating constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fingerprint {
    /// Sub-fingerprint words, one per [`crate::SUBFINGERPRINT_DURATION_SECONDS`] of audio
    data: Vec<u32>,
    /// Producer sample rate; reporting only
    sample_rate: u32,
    /// Seconds of audio represented
    duration: f64,
    /// Source path; identity and display only
    file_path: String,
}

impl Fingerprint {
    /// Construct a validated fingerprint
    ///
    /// # Errors
    /// Returns `RefrainError::InvalidFingerprint` when `data` is empty,
    /// `duration` is not a positive finite number, or the length exceeds
    /// [`MAX_SUBFINGERPRINTS`].
    pub fn new(data: Vec<u32>, duration: f64, file_path: impl Into<String>) -> Result<Self> {
        if data.is_empty() {
            return Err(RefrainError::invalid_fingerprint("empty fingerprint data"));
        }
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(RefrainError::invalid_fingerprint(format!(
                "duration must be positive, got {duration}"
            )));
        }
        if data.len() > MAX_SUBFINGERPRINTS {
            return Err(RefrainError::invalid_fingerprint(format!(
                "fingerprint has {} words, limit is {MAX_SUBFINGERPRINTS}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            sample_rate: FINGERPRINT_SAMPLE_RATE,
            duration,
            file_path: file_path.into(),
        })
    }

    /// The sub-fingerprint words
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Number of sub-fingerprint words
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; the constructor rejects empty data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Seconds of audio represented
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Producer sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Source file path
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Low 16 bits of the word at `position`
    ///
    /// # Panics
    /// Panics if `position` is out of bounds.
    pub fn hash_at(&self, position: usize) -> u16 {
        (self.data[position] & 0xFFFF) as u16
    }

    /// Iterator over the low-16-bit hash of every word, in order
    pub fn hashes(&self) -> impl Iterator<Item = u16> + '_ {
        self.data.iter().map(|&word| (word & 0xFFFF) as u16)
    }

    /// Whether any 16-bit hash occurs in both fingerprints
    pub fn matches_any_hash_of(&self, other: &Fingerprint) -> bool {
        // 64 Ki possible hashes pack into an 8 KiB bitmap
        let mut seen = [0u64; 1024];
        for hash in self.hashes() {
            seen[(hash >> 6) as usize] |= 1u64 << (hash & 63);
        }
        other
            .hashes()
            .any(|hash| seen[(hash >> 6) as usize] & (1u64 << (hash & 63)) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_fingerprint_is_accepted() {
        let fp = Fingerprint::new(vec![1, 2, 3], 0.5, "a.flac").unwrap();
        assert_eq!(fp.len(), 3);
        assert_eq!(fp.sample_rate(), FINGERPRINT_SAMPLE_RATE);
        assert_eq!(fp.file_path(), "a.flac");
        assert!(!fp.is_empty());
    }

    #[test]
    fn empty_data_is_rejected() {
        let err = Fingerprint::new(vec![], 1.0, "a.flac").unwrap_err();
        assert!(matches!(err, RefrainError::InvalidFingerprint(_)));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert!(Fingerprint::new(vec![1], 0.0, "a.flac").is_err());
        assert!(Fingerprint::new(vec![1], -3.0, "a.flac").is_err());
        assert!(Fingerprint::new(vec![1], f64::NAN, "a.flac").is_err());
    }

    #[test]
    fn oversized_data_is_rejected() {
        let data = vec![0u32; MAX_SUBFINGERPRINTS + 1];
        assert!(Fingerprint::new(data, 10.0, "a.flac").is_err());
    }

    #[test]
    fn hash_at_takes_low_16_bits() {
        let fp = Fingerprint::new(vec![0xABCD_1234, 0xFFFF_FFFF], 1.0, "a.flac").unwrap();
        assert_eq!(fp.hash_at(0), 0x1234);
        assert_eq!(fp.hash_at(1), 0xFFFF);
        let hashes: Vec<u16> = fp.hashes().collect();
        assert_eq!(hashes, vec![0x1234, 0xFFFF]);
    }

    #[test]
    fn matches_any_hash_detects_shared_hash() {
        let a = Fingerprint::new(vec![0x0001_1111, 0x0002_2222], 1.0, "a").unwrap();
        let b = Fingerprint::new(vec![0xFFFF_2222], 1.0, "b").unwrap();
        let c = Fingerprint::new(vec![0xFFFF_3333], 1.0, "c").unwrap();
        assert!(a.matches_any_hash_of(&b));
        assert!(!a.matches_any_hash_of(&c));
    }
}
