//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
///
/// Every format error aborts the load before anything is handed back, so a
/// caller's peak store or image is never left half-replaced.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data line holds a single token.
    #[error("line {line}: missing separator")]
    MissingSeparator { line: usize },

    /// A data line holds fewer fields than the format requires.
    #[error("line {line}: missing field")]
    MissingField { line: usize },

    /// A token does not parse as a number.
    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },

    /// The grid exchange header (tag and dimensions) is absent.
    #[error("missing grid header")]
    MissingHeader,

    /// The grid header names a shape with no addressable pixel count.
    #[error("invalid grid dimensions {width}x{height}")]
    Dimensions { width: usize, height: usize },

    /// The grid body does not hold `width * height` samples.
    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] crystalmap_core::Error),
}
