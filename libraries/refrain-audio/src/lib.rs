//! Refrain Audio
//!
//! The producer side of Refrain: everything between an audio file on disk
//! and a validated [`refrain_core::Fingerprint`].
//!
//! - Audio decoding via Symphonia (MP3, FLAC, OGG, WAV, AAC, M4A)
//! - PCM preprocessing: silence trimming, volume normalization, sample-rate
//!   normalization
//! - Chromaprint fingerprinting (AcoustID compatible) with smart doubling of
//!   very short clips
//!
//! # Example
//!
//! ```rust,no_run
//! use refrain_audio::{Fingerprinter, FingerprinterConfig};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fingerprinter = Fingerprinter::new(FingerprinterConfig::default());
//! let fingerprint = fingerprinter.fingerprint_file(Path::new("song.mp3"))?;
//!
//! println!("{} words, {:.1}s", fingerprint.len(), fingerprint.duration());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod decoder;
mod error;
mod fingerprinter;
mod preprocess;

pub use decoder::{AudioDecoder, DecodedAudio};
pub use error::{AudioError, Result};
pub use fingerprinter::{Fingerprinter, FingerprinterConfig};
pub use preprocess::{preprocess, PreprocessConfig, PreprocessedAudio};
