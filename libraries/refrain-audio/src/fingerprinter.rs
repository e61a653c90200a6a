//! Audio fingerprinting using Chromaprint
//!
//! Turns decoded and preprocessed audio into AcoustID-compatible
//! fingerprints. Very short clips are "smart doubled": audio under three
//! seconds is concatenated with itself before fingerprinting so Chromaprint
//! has enough signal to emit a usable word sequence, except when the clip
//! got short because silence trimming removed most of an already-short file.

use crate::decoder::AudioDecoder;
use crate::error::{AudioError, Result};
use crate::preprocess::{preprocess, resample_linear, PreprocessConfig};
use refrain_core::{Fingerprint, FINGERPRINT_SAMPLE_RATE};
use rusty_chromaprint::{Configuration, Fingerprinter as Chromaprint};
use std::path::Path;

/// Number of channels fed to Chromaprint (mono)
const FINGERPRINT_CHANNELS: u32 = 1;

/// Audio shorter than this is doubled before fingerprinting (seconds)
const SMART_DOUBLING_BELOW_S: f64 = 3.0;

/// Fingerprinter options
#[derive(Debug, Clone)]
pub struct FingerprinterConfig {
    /// Maximum duration to analyze (seconds); longer audio is truncated.
    /// AcoustID itself uses 120 seconds.
    pub max_duration_seconds: u32,
    /// Fingerprint the full duration, ignoring `max_duration_seconds`
    pub use_full_duration: bool,
    /// Preprocessing applied before fingerprinting
    pub preprocess: PreprocessConfig,
}

impl Default for FingerprinterConfig {
    fn default() -> Self {
        Self {
            max_duration_seconds: 120,
            use_full_duration: false,
            preprocess: PreprocessConfig::default(),
        }
    }
}

impl FingerprinterConfig {
    /// Analyze the full audio duration
    pub fn full_duration() -> Self {
        Self {
            use_full_duration: true,
            ..Self::default()
        }
    }
}

/// Audio fingerprinter
pub struct Fingerprinter {
    config: FingerprinterConfig,
    decoder: AudioDecoder,
}

impl Fingerprinter {
    /// Create a fingerprinter with the given configuration
    pub fn new(config: FingerprinterConfig) -> Self {
        Self {
            config,
            decoder: AudioDecoder::new(),
        }
    }

    /// Decode, preprocess, and fingerprint one file
    pub fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let decoded = self.decoder.decode(path)?;
        self.fingerprint_samples(
            &decoded.samples,
            decoded.sample_rate,
            &path.display().to_string(),
        )
    }

    /// Preprocess and fingerprint raw mono samples
    pub fn fingerprint_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
        path_label: &str,
    ) -> Result<Fingerprint> {
        let prepared = preprocess(samples, sample_rate, &self.config.preprocess);
        if prepared.samples.is_empty() {
            return Err(AudioError::EmptyAudio);
        }

        let mut audio = prepared.samples;
        if should_double(
            prepared.processed_duration_s,
            prepared.original_duration_s,
            &self.config.preprocess,
        ) {
            tracing::debug!(
                path = path_label,
                duration_s = prepared.processed_duration_s,
                "doubling short clip before fingerprinting"
            );
            let copy = audio.clone();
            audio.extend(copy);
        }

        // Chromaprint runs at its own internal rate.
        let resampled = resample_linear(&audio, prepared.sample_rate, FINGERPRINT_SAMPLE_RATE);
        let duration_seconds = prepared.processed_duration_s;

        let max_samples = if self.config.use_full_duration {
            resampled.len()
        } else {
            self.config.max_duration_seconds as usize * FINGERPRINT_SAMPLE_RATE as usize
        };
        let analyzed = &resampled[..resampled.len().min(max_samples)];

        let data = compute_fingerprint(analyzed)?;
        Ok(Fingerprint::new(data, duration_seconds, path_label)?)
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(FingerprinterConfig::default())
    }
}

/// Whether a clip of this length gets doubled before fingerprinting
///
/// Doubling is suppressed when the clip was significantly trimmed
/// (processed / original under the threshold ratio) and the original was
/// already very short.
fn should_double(processed_s: f64, original_s: f64, config: &PreprocessConfig) -> bool {
    if processed_s >= SMART_DOUBLING_BELOW_S {
        return false;
    }
    if config.disable_doubling_after_trim && original_s > 0.0 {
        let trim_ratio = processed_s / original_s;
        if trim_ratio < config.doubling_threshold_ratio
            && original_s < config.min_duration_for_doubling_s
        {
            return false;
        }
    }
    true
}

/// Feed mono samples through Chromaprint
fn compute_fingerprint(samples: &[f32]) -> Result<Vec<u32>> {
    let samples_i16: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();

    let config = Configuration::preset_test2();
    let mut printer = Chromaprint::new(&config);
    printer
        .start(FINGERPRINT_SAMPLE_RATE, FINGERPRINT_CHANNELS)
        .map_err(|e| AudioError::Fingerprint(format!("failed to start fingerprinter: {e}")))?;
    printer.consume(&samples_i16);
    printer.finish();

    let fingerprint = printer.fingerprint();
    if fingerprint.is_empty() {
        return Err(AudioError::Fingerprint(
            "audio too short to produce a fingerprint".to_string(),
        ));
    }
    Ok(fingerprint.to_vec())
}
