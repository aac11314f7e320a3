//! Error taxonomy shared by every component of the crate.

use thiserror::Error;

/// Everything that can go wrong while sketching, indexing or doing I/O.
///
/// Configuration and family errors are fatal to the operation that
/// raised them and never leave partial state behind.
#[derive(Debug, Error)]
pub enum SketchError {
    /// A construction parameter is outside its documented range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Two sketches from different `(seed, n_samples, width)` families
    /// were combined, or a sketch was used against a foreign index.
    #[error("sketch family mismatch: {reason}")]
    FamilyMismatch { reason: String },

    /// A weighted update carried no positive weight, or a similarity was
    /// requested from a sketch that was never successfully updated.
    #[error("empty input: no position carries a positive weight")]
    EmptyInput,

    /// Input bytes violate the expected format under a strict policy.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// The lazily materialized weighted parameter matrix hit its row cap.
    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SketchError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SketchError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        SketchError::FamilyMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SketchError::MalformedInput {
            reason: reason.into(),
        }
    }
}
