//! Disaster Severity Service
//!
//! Serves the trained severity classifier over HTTP. The model is loaded and
//! verified once at startup and shared read-only across requests.
//!
//! - `POST /predict`: flat JSON object with the five features, answered with
//!   `{"disaster_severity": n}` or `{"error": "..."}`, always HTTP 200
//! - `GET /health`: loaded model hash and shape

pub mod errors;
pub mod server;

pub use errors::{PredictError, ServiceError};
pub use server::{
    bind_listener, build_router, extract_features, predict_body, start_server, AppState,
    HealthResponse, PredictResponse, SharedState, MAX_BODY_BYTES,
};

/// Default listening port
pub const DEFAULT_PORT: u16 = 5100;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
