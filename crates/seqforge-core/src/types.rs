//! # Error Types
//!
//! All fallible operations in seqforge-core return [`SeqforgeError`].
//!
//! Two families are fatal and surface before any search begins:
//! - input errors (malformed seed, impossible target length)
//! - configuration errors (inconsistent thresholds, unknown or malformed profiles)
//!
//! Search exhaustion is NOT an error. It is reported through
//! [`crate::engine::Termination`] together with full statistics.

use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors raised by seqforge-core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeqforgeError {
    /// The seed contains a symbol outside {A, T, G, C}.
    #[error("Invalid nucleotide '{symbol}' at position {position}")]
    InvalidNucleotide {
        /// The offending character.
        symbol: char,
        /// Zero-based position in the normalized input.
        position: usize,
    },

    /// The target length is shorter than the seed.
    #[error("Target length ({target}) must be >= initial sequence length ({initial})")]
    TargetTooShort {
        /// Requested target length.
        target: usize,
        /// Length of the normalized seed.
        initial: usize,
    },

    /// The target length is zero.
    #[error("Target length must be positive")]
    NonPositiveTarget,

    /// A threshold or parameter is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A profile name is not present in the catalog.
    #[error("Unknown validation profile '{name}'. Available: {available}")]
    UnknownProfile {
        /// The requested name.
        name: String,
        /// Comma-separated list of known names.
        available: String,
    },

    /// A profile document could not be understood.
    #[error("Invalid profile document: {0}")]
    InvalidProfile(String),

    /// An I/O error occurred while reading a profile document.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SeqforgeError {
    /// True for malformed caller input (seed or target length).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidNucleotide { .. } | Self::TargetTooShort { .. } | Self::NonPositiveTarget
        )
    }

    /// True for configuration and profile resolution failures.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::UnknownProfile { .. } | Self::InvalidProfile(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
