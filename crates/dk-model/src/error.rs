//! Error types for model-side data structures and collaborators.

use dk_core::CoreError;
use thiserror::Error;

/// Errors reported by model storage, description validation and the
/// collaborator boundary.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid model description: {what}")]
    Description { what: String },

    #[error("Numeric failure: {what}")]
    Numeric { what: String },

    #[error("Allocation failed: {what}")]
    Allocation { what: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type ModelResult<T> = Result<T, ModelError>;
