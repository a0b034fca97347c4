//! # Mesh Errors
//!
//! Error types for mesh generation and caching.

use bead_model::{Cancelled, ModelError};
use thiserror::Error;

/// Errors that can occur while building a bead mesh.
///
/// `Clone` so that callers coalesced on one cache computation all observe
/// the leader's failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// Error from the sample or physics model
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Requested colour column does not exist in the series
    #[error("Unknown color column: {name}")]
    UnknownColumn { name: String },

    /// Degenerate geometry
    #[error("Degenerate geometry: {message}")]
    DegenerateGeometry { message: String },

    /// Structurally invalid request
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The build was superseded and aborted
    #[error("Mesh generation cancelled")]
    Cancelled,

    /// The computation panicked while other callers were waiting on it
    #[error("Mesh generator panicked")]
    GeneratorPanicked,

    /// Mesh validation failed
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// Too many vertices for 32-bit indices
    #[error("Too many vertices: {count} (max: {max})")]
    TooManyVertices { count: usize, max: usize },
}

impl MeshError {
    /// Creates a degenerate geometry error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            message: message.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Returns true for failures a later identical request might not hit.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Cancelled | Self::GeneratorPanicked)
    }
}

impl From<Cancelled> for MeshError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
