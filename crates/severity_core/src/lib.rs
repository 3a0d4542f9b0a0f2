//! Disaster Severity Core
//!
//! Shared building blocks for the severity pipeline: the feature schema both
//! training and serving agree on, the derived severity label, and the
//! multiclass GBDT model together with its on-disk artifact format.
//!
//! Modules:
//! - `features`: Record shapes and the fixed feature column order
//! - `labels`: Severity score and quantile bucketing
//! - `gbdt`: Multiclass tree ensemble, inference and artifact I/O
//! - `serde_canon`: Canonical JSON and BLAKE3 hashing
//! - `metrics`: Accuracy and multi-class log-loss
//! - `errors`: Crate-wide error type

pub mod errors;
pub mod features;
pub mod gbdt;
pub mod labels;
pub mod metrics;
pub mod serde_canon;

pub use errors::{CoreError, Result};
pub use features::{
    DisasterRecord, FeatureRow, FeatureVector, RecordShape, ResourceAvailability,
    FEATURE_COLUMNS, FEATURE_COUNT,
};
pub use gbdt::{Model, ModelError, Node, Tree, NUM_CLASSES};
pub use labels::{derive_labels, severity_score, LabelError, QuantileCut, SeverityClass};
pub use metrics::{accuracy, multi_logloss};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
