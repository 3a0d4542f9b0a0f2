use disaster_severity_core::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a single prediction request fails
///
/// Every variant is reported to the caller as `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("unreadable request body: {0}")]
    Body(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field {field} must be a number, got {value}")]
    NonNumeric { field: &'static str, value: String },

    #[error("prediction failed: {0}")]
    Model(#[from] ModelError),
}

/// Startup and serving failures
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to load model from {}: {source}", path.display())]
    ModelLoad { path: PathBuf, source: ModelError },

    #[error("model does not match the request schema: {0}")]
    Schema(ModelError),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("server terminated unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}
