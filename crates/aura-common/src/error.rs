//! Error types shared across the Aura crates.

use thiserror::Error;

/// Top-level error type for Aura operations.
///
/// Subsystem crates convert their own error enums into this one so that
/// binaries can surface a single error type.
#[derive(Debug, Error)]
pub enum AuraError {
    /// Combat resolution failed
    #[error("Combat error: {0}")]
    Combat(String),

    /// Progression bookkeeping failed
    #[error("Progression error: {0}")]
    Progression(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for Aura operations.
pub type AuraResult<T> = Result<T, AuraError>;
