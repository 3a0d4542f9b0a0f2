use disaster_severity_core::{LabelError, ModelError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the trainer and the offline evaluator.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("record {index}: {message}")]
    Record { index: usize, message: String },

    #[error("label error: {0}")]
    Label(#[from] LabelError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("invalid training parameters: {0}")]
    Params(String),

    #[error("training error: {0}")]
    Training(String),
}
