use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use disaster_severity_core::{FeatureVector, Model, SeverityClass, FEATURE_COLUMNS, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::errors::{PredictError, ServiceError};

/// Immutable state shared by every request
#[derive(Clone, Debug)]
pub struct AppState {
    pub model: Arc<Model>,
    /// BLAKE3 digest of the loaded artifact
    pub model_hash: String,
}

impl AppState {
    /// Wrap an already loaded model
    ///
    /// Fails when the model does not index features in request order.
    pub fn new(model: Model) -> Result<Self, ServiceError> {
        let model_hash = model.hash_hex().map_err(ServiceError::Schema)?;
        Self::with_hash(model, model_hash)
    }

    /// Load and verify the artifact at `path`
    ///
    /// `model_hash` is the digest of the file bytes, the same value the
    /// sidecar holds.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let (model, model_hash) =
            Model::load_with_hash(path).map_err(|source| ServiceError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_hash(model, model_hash)
    }

    fn with_hash(model: Model, model_hash: String) -> Result<Self, ServiceError> {
        model.check_feature_order().map_err(ServiceError::Schema)?;
        Ok(Self {
            model: Arc::new(model),
            model_hash,
        })
    }
}

pub type SharedState = Arc<AppState>;

/// Largest accepted `/predict` body
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Body of every `/predict` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Severity { disaster_severity: u8 },
    Error { error: String },
}

impl From<Result<SeverityClass, PredictError>> for PredictResponse {
    fn from(outcome: Result<SeverityClass, PredictError>) -> Self {
        match outcome {
            Ok(class) => PredictResponse::Severity {
                disaster_severity: class.into(),
            },
            Err(err) => PredictResponse::Error {
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_hash: String,
    pub num_class: usize,
    pub trees: usize,
    pub features: Vec<String>,
}

/// Read the five model features from a request object, in model order
pub fn extract_features(body: &Value) -> Result<FeatureVector, PredictError> {
    let object = body.as_object().ok_or(PredictError::NotAnObject)?;

    let mut features = [0.0; FEATURE_COUNT];
    for (slot, field) in features.iter_mut().zip(FEATURE_COLUMNS) {
        let value = object.get(field).ok_or(PredictError::MissingField(field))?;
        *slot = value.as_f64().ok_or_else(|| PredictError::NonNumeric {
            field,
            value: value.to_string(),
        })?;
    }
    Ok(features)
}

/// Parse a raw request body and classify it
pub fn predict_body(model: &Model, body: &[u8]) -> Result<SeverityClass, PredictError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| PredictError::InvalidJson(err.to_string()))?;
    let features = extract_features(&value)?;
    Ok(model.predict(&features)?)
}

pub async fn start_server(state: AppState, addr: &str) -> Result<(), ServiceError> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("Severity service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServiceError::Serve)
}

pub async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener, ServiceError> {
    let bound = if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr).await
    } else {
        tokio::net::TcpListener::bind(addr).await
    };
    bound.map_err(|source| ServiceError::Bind {
        addr: addr.to_string(),
        source,
    })
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/predict", post(handle_predict))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }
}

// Failures are reported in the body; the status stays 200.
async fn handle_predict(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<PredictResponse> {
    let outcome = body
        .map_err(|rejection| PredictError::Body(rejection.body_text()))
        .and_then(|body| predict_body(&state.model, &body));
    if let Err(err) = &outcome {
        debug!("Rejected prediction request: {}", err);
    }
    Json(PredictResponse::from(outcome))
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_hash: state.model_hash.clone(),
        num_class: state.model.num_class,
        trees: state.model.trees.len(),
        features: state.model.feature_names.clone(),
    })
}
