//! Error types for crystalmap-core.

use thiserror::Error;

/// Result type alias for crystalmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for crystalmap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Pixel coordinate outside the grid.
    #[error("pixel coordinate ({x}, {y}) outside {width}x{height} grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    /// Two grids that must share a shape do not.
    #[error("grid dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Crystal enumeration error.
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),
}

/// Errors raised while assigning crystal numbers to peaks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerationError {
    /// The peak count does not match `columns * rows`. Nothing was modified.
    #[error("{} peaks: expected {expected}, found {found}", count_word(.expected, .found))]
    PeakCountMismatch { expected: usize, found: usize },

    /// The greedy row walk found no candidate for this crystal.
    /// Assignments below `crystal` are kept.
    #[error("no unmapped peak qualifies for crystal {crystal}")]
    SelectionExhausted { crystal: usize },

    /// Correction was requested before any successful enumeration.
    #[error("peaks have not been enumerated yet")]
    NotCharacterized,

    /// Requested crystal id is outside `0..total`.
    #[error("crystal id {id} outside 0..{total}")]
    InvalidCrystalId { id: i64, total: usize },

    /// Peak index does not address a peak in the store.
    #[error("no peak at index {0}")]
    InvalidPeak(usize),
}

fn count_word(expected: &usize, found: &usize) -> &'static str {
    if found > expected {
        "too many"
    } else {
        "too few"
    }
}
