//! Central error type for validation-job generation.
//!
//! Every failure surfaces as one user-facing [`Error`] carrying a
//! descriptive message; the variant records which stage of generation
//! failed. There is no silent recovery anywhere in the crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation-job generation error.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or inconsistent configuration input (missing mandatory key,
    /// unknown key, conflicting inherited default, malformed value,
    /// job count over policy).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Software environment could not be resolved (bad root path,
    /// missing required package).
    #[error("Environment error: {0}")]
    EnvironmentError(String),

    /// Dataset lookup or run/time-range reconciliation failed.
    #[error("Dataset error: {0}")]
    DatasetError(String),

    /// Artifact generation failed (schedule mismatch, unresolved
    /// template placeholder, unsupported fan-out).
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// An external command failed or returned an invalid answer.
    #[error("Command error: {0}")]
    CommandError(String),

    /// Underlying filesystem failure while writing artifacts.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
