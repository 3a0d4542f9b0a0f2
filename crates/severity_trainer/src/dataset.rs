//! JSON dataset loading and splitting
//!
//! Reads the reporting backend's export (a JSON array of nested disaster
//! records), flattens it into the five model features and derives the
//! severity label over the whole file before any split.

use disaster_severity_core::{
    derive_labels, DisasterRecord, FeatureRow, FeatureVector, QuantileCut, SeverityClass,
    NUM_CLASSES,
};
use serde_json::Value;
use std::path::Path;

use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Labeled training dataset
#[derive(Clone, Debug)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<SeverityClass>,
    /// Cut the labels were derived with
    pub cut: QuantileCut,
}

impl Dataset {
    /// Load a JSON array of nested records from `path`
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TrainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a JSON array of nested records
    pub fn from_json_str(content: &str) -> Result<Self, TrainerError> {
        let records = parse_records::<DisasterRecord>(content)?;
        Self::from_records(&records)
    }

    pub fn from_records(records: &[DisasterRecord]) -> Result<Self, TrainerError> {
        let rows: Vec<FeatureRow> = records.iter().map(DisasterRecord::flatten).collect();
        Self::from_rows(&rows)
    }

    /// Label `rows` with a cut fitted on exactly these rows
    pub fn from_rows(rows: &[FeatureRow]) -> Result<Self, TrainerError> {
        if rows.is_empty() {
            return Err(TrainerError::Dataset("dataset is empty".to_string()));
        }

        let (cut, labels) = derive_labels(rows)?;
        Ok(Self {
            features: rows.iter().map(FeatureRow::to_vector).collect(),
            labels,
            cut,
        })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Labels as class indices
    pub fn label_indices(&self) -> Vec<usize> {
        self.labels.iter().map(|label| label.index()).collect()
    }

    /// Samples per class
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }

    /// Shuffled, unstratified split into `(train, test)`
    ///
    /// The test part holds `ceil(len * test_fraction)` samples. Both parts
    /// keep the cut of the full dataset.
    pub fn train_test_split(
        &self,
        test_fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), TrainerError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainerError::Params(format!(
                "test fraction must be in (0, 1), got {test_fraction}"
            )));
        }

        let n = self.len();
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(TrainerError::Dataset(format!(
                "cannot split {n} samples with test fraction {test_fraction}"
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        LcgRng::new(seed).shuffle(&mut order);
        let (test_idx, train_idx) = order.split_at(n_test);

        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            cut: self.cut.clone(),
        }
    }
}

/// Parse a JSON array, naming the first record that fails to deserialize
pub fn parse_records<T: serde::de::DeserializeOwned>(content: &str) -> Result<Vec<T>, TrainerError> {
    let values: Vec<Value> = serde_json::from_str(content)
        .map_err(|err| TrainerError::Dataset(format!("expected a JSON array of records: {err}")))?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|err| TrainerError::Record {
                index,
                message: err.to_string(),
            })
        })
        .collect()
}
