//! Offline accuracy check against a separate data file
//!
//! The file carries no labels. They are recomputed from the severity score
//! with a quantile cut fitted on this file alone, so the reported accuracy
//! measures agreement with the file's own tercile boundaries rather than the
//! boundaries the model was trained against.

use disaster_severity_core::{
    accuracy, derive_labels, FeatureRow, Model, QuantileCut, RecordShape,
};
use std::path::Path;
use tracing::debug;

use crate::dataset::parse_records;
use crate::errors::TrainerError;

/// Result of one evaluation run
#[derive(Clone, Debug)]
pub struct EvaluationReport {
    pub samples: usize,
    pub correct: usize,
    /// `correct / samples * 100`
    pub accuracy_percent: f64,
    /// Cut fitted on the evaluated file
    pub cut: QuantileCut,
}

/// Read flat or nested records from a JSON array file
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<FeatureRow>, TrainerError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| TrainerError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = parse_records::<RecordShape>(&content)?;
    Ok(records.into_iter().map(RecordShape::into_row).collect())
}

/// Label `rows` with their own cut and score `model` against those labels
pub fn evaluate_rows(model: &Model, rows: &[FeatureRow]) -> Result<EvaluationReport, TrainerError> {
    if rows.is_empty() {
        return Err(TrainerError::Dataset("evaluation data is empty".to_string()));
    }

    let (cut, labels) = derive_labels(rows)?;
    debug!("Evaluation cut edges: {:?}", cut.edges);

    let predictions = rows
        .iter()
        .map(|row| model.predict(&row.to_vector()))
        .collect::<Result<Vec<_>, _>>()?;

    let correct = predictions
        .iter()
        .zip(&labels)
        .filter(|(predicted, actual)| predicted == actual)
        .count();

    Ok(EvaluationReport {
        samples: rows.len(),
        correct,
        accuracy_percent: accuracy(&predictions, &labels) * 100.0,
        cut,
    })
}

/// Load the data file and the model artifact, then evaluate
pub fn evaluate_file<P: AsRef<Path>, Q: AsRef<Path>>(
    data_path: P,
    model_path: Q,
) -> Result<EvaluationReport, TrainerError> {
    let rows = load_rows(data_path)?;
    let model = Model::load(model_path)?;
    evaluate_rows(&model, &rows)
}
