//! Feature schema shared by training, evaluation and serving
//!
//! The model consumes positional feature vectors, so every producer of a
//! vector must go through [`FeatureRow::to_vector`] to get the column order
//! in [`FEATURE_COLUMNS`].
use serde::{Deserialize, Serialize};

/// Feature column names in model order
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "urgency",
    "affected_population",
    "donation_amount",
    "num_ngos",
    "num_volunteers",
];

/// Number of model input features
pub const FEATURE_COUNT: usize = 5;

/// Positional feature vector in [`FEATURE_COLUMNS`] order
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Resources already committed to a disaster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceAvailability {
    pub donation_amount: f64,
    pub num_ngos: f64,
    pub num_volunteers: f64,
}

/// Raw training record as exported by the reporting backend
///
/// Extra keys (ids, locations, free text) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisasterRecord {
    pub urgency: f64,
    pub affected_population: f64,
    pub resource_availability: ResourceAvailability,
}

impl DisasterRecord {
    /// Flatten the nested resource block into a [`FeatureRow`]
    pub fn flatten(&self) -> FeatureRow {
        FeatureRow {
            urgency: self.urgency,
            affected_population: self.affected_population,
            donation_amount: self.resource_availability.donation_amount,
            num_ngos: self.resource_availability.num_ngos,
            num_volunteers: self.resource_availability.num_volunteers,
        }
    }
}

/// Flat record with the five model features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub urgency: f64,
    pub affected_population: f64,
    pub donation_amount: f64,
    pub num_ngos: f64,
    pub num_volunteers: f64,
}

impl FeatureRow {
    /// Assemble the positional vector in [`FEATURE_COLUMNS`] order
    pub fn to_vector(&self) -> FeatureVector {
        [
            self.urgency,
            self.affected_population,
            self.donation_amount,
            self.num_ngos,
            self.num_volunteers,
        ]
    }

    /// Severity score of this row, see [`crate::labels::severity_score`]
    pub fn severity_score(&self) -> f64 {
        crate::labels::severity_score(self.urgency, self.affected_population)
    }
}

/// Either record layout found in data files
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecordShape {
    Nested(DisasterRecord),
    Flat(FeatureRow),
}

impl RecordShape {
    pub fn into_row(self) -> FeatureRow {
        match self {
            RecordShape::Nested(record) => record.flatten(),
            RecordShape::Flat(row) => row,
        }
    }
}
