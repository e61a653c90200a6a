//! Error types for the producer side

use thiserror::Error;

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Errors that can occur while decoding or fingerprinting audio
#[derive(Error, Debug)]
pub enum AudioError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Container probing failed
    #[error("Failed to probe file: {0}")]
    Probe(String),

    /// No decodable audio track in the container
    #[error("No audio tracks found")]
    NoAudioTrack,

    /// Packet decoding failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Fingerprint computation failed
    #[error("Fingerprint error: {0}")]
    Fingerprint(String),

    /// The audio was empty (or silent end to end) after preprocessing
    #[error("No audio samples left after preprocessing")]
    EmptyAudio,

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<refrain_core::RefrainError> for AudioError {
    fn from(err: refrain_core::RefrainError) -> Self {
        Self::Fingerprint(err.to_string())
    }
}
