//! Error types for the severity core

use thiserror::Error;

use crate::gbdt::ModelError;
use crate::labels::LabelError;
use crate::serde_canon::CanonicalError;

/// Errors that can occur in the severity core
#[derive(Error, Debug)]
pub enum CoreError {
    /// Label derivation failed
    #[error("Label derivation failed: {0}")]
    Label(#[from] LabelError),

    /// Model validation, inference or artifact I/O failed
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Canonical serialization failed
    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for severity core operations
pub type Result<T> = std::result::Result<T, CoreError>;
