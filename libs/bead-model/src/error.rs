//! # Model Errors
//!
//! Error types for sample ingestion, bead parameters and calibration.

use thiserror::Error;

/// Errors raised while building the sample model or bead parameters.
///
/// These are structural: they reject a whole request. Per-sample problems
/// (non-finite values) are recovered locally and only flagged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A sample carries a non-finite position or velocity.
    #[error("Invalid sample at index {index}: {message}")]
    InvalidSample { index: usize, message: String },

    /// Sequence indices must strictly increase.
    #[error("Sequence index {current} at position {index} does not follow {previous}")]
    NonMonotonicSequence {
        index: usize,
        previous: u64,
        current: u64,
    },

    /// An extra column does not have one value per sample.
    #[error("Column '{name}' has {actual} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A geometric or physical parameter is out of range.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
}

impl ModelError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Creates an invalid sample error.
    pub fn invalid_sample(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidSample {
            index,
            message: message.into(),
        }
    }
}

/// Errors raised while loading or setting calibration parameters.
///
/// Loading never surfaces these as failures: the store falls back to the
/// identity calibration and hands the error back as a warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// The calibration source is not valid JSON or has wrong value types.
    #[error("Malformed calibration: {0}")]
    Parse(String),

    /// The calibration file could not be read.
    #[error("Failed to read calibration: {0}")]
    Io(String),

    /// The document has no `calibration` object.
    #[error("Missing 'calibration' section")]
    MissingSection,

    /// A parameter violates its invariant.
    #[error("Invalid calibration value {field} = {value}")]
    InvalidValue { field: &'static str, value: f64 },
}

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

// =============================================================================
// TESTS
// =============================================================================
