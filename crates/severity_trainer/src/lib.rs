//! Disaster Severity Trainer - offline GBDT trainer and evaluator
//!
//! Loads exported disaster records, derives tercile severity labels, and fits
//! a multiclass gradient boosted tree ensemble with early stopping on a
//! seeded hold-out split. Training is deterministic: the same data and
//! parameters always produce the same artifact hash.

pub mod binning;
pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod evaluate;
pub mod trainer;

use disaster_severity_core::Model;
use std::path::Path;

pub use dataset::Dataset;
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use evaluate::{evaluate_file, evaluate_rows, load_rows, EvaluationReport};
pub use trainer::{ClassWeight, FeatureImportance, GbdtTrainer, TrainingParams, TrainingReport};

/// Default hold-out fraction
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Train a model directly from a JSON export, holding out `test_fraction`
/// of the records (split with `params.seed`) for early stopping.
pub fn train_model_from_json(
    path: &Path,
    params: TrainingParams,
    test_fraction: f64,
) -> Result<(Model, TrainingReport), TrainerError> {
    let dataset = Dataset::from_json(path)?;
    let (train, test) = dataset.train_test_split(test_fraction, params.seed)?;
    GbdtTrainer::new(params).train(&train, &test)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
