//! Multiclass GBDT model with artifact I/O
//!
//! Raw class scores are `init_scores[k]` plus the leaf values of every tree
//! whose `class_idx == k`. Probabilities are the softmax of the raw scores
//! and the predicted class is their argmax.
//!
//! On disk the model is canonical JSON. A sidecar file next to it holds the
//! BLAKE3 digest of those exact bytes, and loading rejects a model whose
//! bytes no longer match the sidecar.

use super::tree::Tree;
use crate::features::{FEATURE_COLUMNS, FEATURE_COUNT};
use crate::labels::{LabelError, SeverityClass, SEVERITY_BINS};
use crate::serde_canon::{hash_canonical_hex, to_canonical_json, CanonicalError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Current artifact format version
pub const MODEL_VERSION: i32 = 1;

/// Number of severity classes the model predicts
pub const NUM_CLASSES: usize = SEVERITY_BINS;

/// Extension of the hash sidecar written next to the model file
pub const HASH_EXTENSION: &str = "hash";

/// GBDT Model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("model hash mismatch: sidecar has {expected}, file hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Canonical serialization error: {0}")]
    CanonicalError(#[from] CanonicalError),

    #[error("Invalid class: {0}")]
    InvalidClass(#[from] LabelError),
}

/// Fitted multiclass tree ensemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    /// Artifact format version
    pub version: i32,

    /// Number of output classes
    pub num_class: usize,

    /// Feature names in the positional order the trees index into
    pub feature_names: Vec<String>,

    /// Per-class starting raw score
    pub init_scores: Vec<f64>,

    /// Trees, `num_class` per boosting round, round-major
    pub trees: Vec<Tree>,

    /// Boosting round with the best held-out loss (1-based, 0 if unknown)
    pub best_iteration: usize,
}

impl Model {
    /// Create a model over the standard severity feature columns
    pub fn new(init_scores: Vec<f64>, trees: Vec<Tree>, best_iteration: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            num_class: init_scores.len(),
            feature_names: FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect(),
            init_scores,
            trees,
            best_iteration,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of complete boosting rounds
    pub fn num_rounds(&self) -> usize {
        if self.num_class == 0 {
            0
        } else {
            self.trees.len() / self.num_class
        }
    }

    /// Keep only the first `rounds` boosting rounds
    pub fn truncate_rounds(&mut self, rounds: usize) {
        self.trees.truncate(rounds * self.num_class);
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.num_class != NUM_CLASSES {
            return Err(ModelError::ValidationFailed(format!(
                "Expected {} classes, model has {}",
                NUM_CLASSES, self.num_class
            )));
        }

        if self.init_scores.len() != self.num_class
            || self.init_scores.iter().any(|score| !score.is_finite())
        {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid init scores: {:?}",
                self.init_scores
            )));
        }

        if self.feature_names.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Model has no feature names".to_string(),
            ));
        }

        if self.trees.len() % self.num_class != 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Tree count {} is not a multiple of {} classes",
                self.trees.len(),
                self.num_class
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            if tree.class_idx != i % self.num_class {
                return Err(ModelError::ValidationFailed(format!(
                    "Tree {} belongs to class {}, expected {}",
                    i,
                    tree.class_idx,
                    i % self.num_class
                )));
            }
            tree.validate(self.feature_count()).map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Check that the model indexes features in the standard column order
    pub fn check_feature_order(&self) -> Result<(), ModelError> {
        let matches = self.feature_names.len() == FEATURE_COUNT
            && self
                .feature_names
                .iter()
                .zip(FEATURE_COLUMNS)
                .all(|(name, column)| name == column);

        if matches {
            Ok(())
        } else {
            Err(ModelError::ValidationFailed(format!(
                "Feature order {:?} does not match {:?}",
                self.feature_names, FEATURE_COLUMNS
            )))
        }
    }

    /// Per-class raw scores
    pub fn predict_raw(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.feature_count() {
            return Err(ModelError::FeatureCount {
                expected: self.feature_count(),
                actual: features.len(),
            });
        }

        let mut raw = self.init_scores.clone();
        for tree in &self.trees {
            raw[tree.class_idx] += tree.evaluate(features);
        }
        Ok(raw)
    }

    /// Per-class probabilities (softmax of the raw scores)
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        Ok(softmax(&self.predict_raw(features)?))
    }

    /// Most probable severity class; ties go to the lower class
    pub fn predict(&self, features: &[f64]) -> Result<SeverityClass, ModelError> {
        let raw = self.predict_raw(features)?;
        Ok(SeverityClass::from_index(argmax(&raw))?)
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        Ok(to_canonical_json(self)?)
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Write the model and its hash sidecar, replacing any previous artifact
    ///
    /// Returns the hex digest written to the sidecar.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<String, ModelError> {
        let path = path.as_ref();
        self.validate()?;
        let json = self.to_canonical_json()?;
        let hash = hex::encode(blake3::hash(json.as_bytes()).as_bytes());

        fs::write(path, &json)?;
        fs::write(hash_path(path), &hash)?;
        debug!(path = %path.display(), %hash, "model artifact written");

        Ok(hash)
    }

    /// Load, verify and validate a model artifact
    ///
    /// A missing sidecar is tolerated with a warning; a present one must
    /// match the file contents.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        Self::load_with_hash(path).map(|(model, _)| model)
    }

    /// Like [`Model::load`], also returning the digest of the file bytes
    pub fn load_with_hash<P: AsRef<Path>>(path: P) -> Result<(Self, String), ModelError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let actual = hex::encode(blake3::hash(&bytes).as_bytes());

        let sidecar = hash_path(path);
        match fs::read_to_string(&sidecar) {
            Ok(expected) => {
                let expected = expected.trim().to_string();
                if expected != actual {
                    return Err(ModelError::HashMismatch { expected, actual });
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %sidecar.display(), "model hash sidecar missing, skipping verification");
            }
            Err(err) => return Err(err.into()),
        }

        let model: Model = serde_json::from_slice(&bytes)?;
        model.validate()?;
        Ok((model, actual))
    }
}

/// Path of the hash sidecar for a model file
pub fn hash_path(model_path: &Path) -> PathBuf {
    model_path.with_extension(HASH_EXTENSION)
}

/// Numerically stable softmax
pub fn softmax(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = raw.iter().map(|&score| (score - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|value| value / total).collect()
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}
