/// Core error types for Refrain
use thiserror::Error;

/// Result type alias using `RefrainError`
pub type Result<T> = std::result::Result<T, RefrainError>;

/// Core error type for Refrain
///
/// Errors surface only at the ingestion and configuration boundaries. The
/// comparator and the discovery engine are infallible: anomalous inputs
/// produce well-formed zero results so a single bad file cannot stop a scan.
#[derive(Error, Debug)]
pub enum RefrainError {
    /// Fingerprint failed validation (empty data, non-positive duration,
    /// or length over the sanity bound)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Operation on a cleared or empty index
    #[error("Index is empty; add fingerprints before querying")]
    NotInitialized,

    /// Configuration value rejected at the setter
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RefrainError {
    /// Create an invalid-fingerprint error
    pub fn invalid_fingerprint(msg: impl Into<String>) -> Self {
        Self::InvalidFingerprint(msg.into())
    }

    /// Create an invalid-configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
