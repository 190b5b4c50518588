//! Error types for the compression pipeline

use thiserror::Error;

/// Errors that abort a compression run
#[derive(Debug, Error)]
pub enum FitError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File discovery found nothing usable
    #[error("No files matched the provided patterns under {0}")]
    NoFiles(String),

    /// Malformed override pattern
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Tokenizer failure
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled before completion
    #[error("Operation was cancelled")]
    Cancelled,

    /// The overall deadline elapsed
    #[error("Deadline of {0}s exceeded")]
    DeadlineExceeded(u64),
}

/// A malformed override pattern. Fatal to the whole resolve call;
/// no partial rule application survives it.
#[derive(Debug, Error)]
#[error("Invalid override pattern '{pattern}' (rule #{rule}): {reason}")]
pub struct PatternError {
    /// Zero-based index of the offending rule
    pub rule: usize,
    /// The pattern text as supplied
    pub pattern: String,
    /// What the glob compiler objected to
    pub reason: String,
}

/// Errors from the advisory service. Always recovered locally by the
/// deterministic fallback; never surfaced to the caller.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// The round trip timed out
    #[error("Advisory call timed out after {0}s")]
    Timeout(u64),

    /// Transport or upstream service error
    #[error("Advisory service error: {0}")]
    Service(String),

    /// Response did not match the expected schema
    #[error("Malformed advisory response: {0}")]
    Malformed(String),

    /// Response parsed but failed validation against the problem
    #[error("Invalid advisory proposal: {0}")]
    Invalid(String),
}

/// Errors from rendering a single file. Recovered per file by
/// substituting the baseline content.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The render call timed out
    #[error("Render timed out after {0}s")]
    Timeout(u64),

    /// Upstream API error
    #[error("Render API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// The service returned no usable content
    #[error("Render produced empty output")]
    Empty,
}

/// Result alias for run-level operations
pub type FitResult<T> = Result<T, FitError>;

/// Result alias for advisory operations
pub type AdvisoryResult<T> = Result<T, AdvisoryError>;

/// Result alias for render operations
pub type RenderResult<T> = Result<T, RenderError>;
