//! PCM preprocessing ahead of fingerprinting
//!
//! Silence trimming, volume normalization, and sample-rate normalization.
//! The option surface is stable: two systems configured the same way must
//! produce byte-comparable input to the fingerprinter, or their fingerprints
//! stop being comparable.

use serde::{Deserialize, Serialize};

/// Preprocessing options
///
/// Defaults match the established surface; change them only in lockstep on
/// every system whose fingerprints are compared against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Trim leading and trailing silence
    pub trim_silence: bool,
    /// Samples below this level count as silence (dBFS)
    pub silence_threshold_db: f64,
    /// Context preserved on each side of the trimmed region (milliseconds)
    pub preserve_padding_ms: u32,

    /// Resample to `target_sample_rate` before fingerprinting
    pub normalize_sample_rate: bool,
    /// Target rate for sample-rate normalization (Hz)
    pub target_sample_rate: u32,

    /// Apply volume normalization
    pub normalize_volume: bool,
    /// Use RMS normalization; peak normalization otherwise
    pub use_rms: bool,
    /// RMS target level (dBFS)
    pub target_rms_db: f64,
    /// Peak target level (dBFS)
    pub target_peak_db: f64,
    /// Samples below this level are excluded from the RMS estimate (dBFS)
    pub noise_floor_db: f64,

    /// Suppress smart doubling when a short clip was heavily trimmed
    pub disable_doubling_after_trim: bool,
    /// Trim ratio (processed / original) below which doubling is suppressed
    pub doubling_threshold_ratio: f64,
    /// Original duration below which doubling is suppressed (seconds)
    pub min_duration_for_doubling_s: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            trim_silence: true,
            silence_threshold_db: -55.0,
            preserve_padding_ms: 100,
            normalize_sample_rate: true,
            target_sample_rate: 44_100,
            normalize_volume: true,
            use_rms: true,
            target_rms_db: -20.0,
            target_peak_db: -3.0,
            noise_floor_db: -60.0,
            disable_doubling_after_trim: true,
            doubling_threshold_ratio: 0.5,
            min_duration_for_doubling_s: 1.5,
        }
    }
}

/// Preprocessed mono audio plus the durations the fingerprinter needs
#[derive(Debug, Clone)]
pub struct PreprocessedAudio {
    /// Mono samples after all enabled stages
    pub samples: Vec<f32>,
    /// Sample rate after normalization (Hz)
    pub sample_rate: u32,
    /// Duration before any processing (seconds)
    pub original_duration_s: f64,
    /// Duration after processing (seconds)
    pub processed_duration_s: f64,
}

/// Run all enabled preprocessing stages over mono samples
pub fn preprocess(samples: &[f32], sample_rate: u32, config: &PreprocessConfig) -> PreprocessedAudio {
    let original_duration_s = samples.len() as f64 / f64::from(sample_rate);

    let mut processed = if config.trim_silence {
        trim_silence(
            samples,
            sample_rate,
            config.silence_threshold_db,
            config.preserve_padding_ms,
        )
    } else {
        samples.to_vec()
    };

    if config.normalize_volume {
        if config.use_rms {
            normalize_rms(&mut processed, config.target_rms_db, config.noise_floor_db);
        } else {
            normalize_peak(&mut processed, config.target_peak_db);
        }
    }

    let mut rate = sample_rate;
    if config.normalize_sample_rate && rate != config.target_sample_rate {
        processed = resample_linear(&processed, rate, config.target_sample_rate);
        rate = config.target_sample_rate;
    }

    let processed_duration_s = processed.len() as f64 / f64::from(rate);
    tracing::trace!(
        original_s = original_duration_s,
        processed_s = processed_duration_s,
        rate,
        "preprocessed audio"
    );

    PreprocessedAudio {
        samples: processed,
        sample_rate: rate,
        original_duration_s,
        processed_duration_s,
    }
}

/// Drop leading and trailing silence, keeping some context on each side
///
/// Audio that is silent end to end is returned unchanged; deciding what to
/// do with an all-silent file belongs to the caller.
pub fn trim_silence(
    samples: &[f32],
    sample_rate: u32,
    threshold_db: f64,
    preserve_padding_ms: u32,
) -> Vec<f32> {
    let threshold = db_to_linear(threshold_db) as f32;

    let Some(first) = samples.iter().position(|s| s.abs() > threshold) else {
        return samples.to_vec();
    };
    let last = samples
        .iter()
        .rposition(|s| s.abs() > threshold)
        .unwrap_or(samples.len() - 1);

    let padding = (u64::from(sample_rate) * u64::from(preserve_padding_ms) / 1000) as usize;
    let start = first.saturating_sub(padding);
    let end = (last + 1 + padding).min(samples.len());
    samples[start..end].to_vec()
}

/// Scale toward a target RMS level, never pushing the peak past 0 dBFS
pub fn normalize_rms(samples: &mut [f32], target_rms_db: f64, noise_floor_db: f64) {
    let noise_floor = db_to_linear(noise_floor_db) as f32;

    let mut sum_squares = 0.0f64;
    let mut counted = 0usize;
    for &sample in samples.iter() {
        if sample.abs() > noise_floor {
            sum_squares += f64::from(sample) * f64::from(sample);
            counted += 1;
        }
    }
    if counted == 0 {
        return;
    }

    let rms = (sum_squares / counted as f64).sqrt();
    if rms <= 0.0 {
        return;
    }

    let mut gain = db_to_linear(target_rms_db) / rms;
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        gain = gain.min(1.0 / f64::from(peak));
    }

    for sample in samples.iter_mut() {
        *sample = (f64::from(*sample) * gain) as f32;
    }
}

/// Scale so the absolute peak sits at the target level
pub fn normalize_peak(samples: &mut [f32], target_peak_db: f64) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= 0.0 {
        return;
    }

    let gain = db_to_linear(target_peak_db) / f64::from(peak);
    for sample in samples.iter_mut() {
        *sample = (f64::from(*sample) * gain) as f32;
    }
}

/// Linear-interpolation resampler
///
/// Accurate enough for fingerprinting, where the downstream transform is
/// heavily quantized anyway; not intended for playback.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < samples.len() {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            0.0
        };
        output.push(sample);
    }

    output
}

fn db_to_linear(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}
