//! Severity label engineering
//!
//! The label is synthetic: a closed-form score over urgency and affected
//! population, cut into equal-frequency bins over whatever sample it is fit
//! on. Bin boundaries therefore move with the data, and the same raw pair can
//! land in different classes on different datasets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureRow;

/// Number of severity bins
pub const SEVERITY_BINS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelError {
    #[error("cannot fit a quantile cut on an empty sample")]
    Empty,

    #[error("non-finite severity score at row {index}: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("bin edges must be unique: {edges:?}")]
    DuplicateEdges { edges: Vec<f64> },

    #[error("at least one bin is required")]
    NoBins,

    #[error("invalid severity class: {0}")]
    InvalidClass(usize),
}

/// Ordinal severity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeverityClass {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl SeverityClass {
    pub const ALL: [SeverityClass; SEVERITY_BINS] =
        [SeverityClass::Low, SeverityClass::Medium, SeverityClass::High];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self, LabelError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(LabelError::InvalidClass(index))
    }
}

impl From<SeverityClass> for u8 {
    fn from(class: SeverityClass) -> Self {
        class as u8
    }
}

impl TryFrom<u8> for SeverityClass {
    type Error = LabelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value as usize)
    }
}

/// Severity score: `2 * urgency + ln(1 + affected_population)`
pub fn severity_score(urgency: f64, affected_population: f64) -> f64 {
    urgency * 2.0 + affected_population.ln_1p()
}

/// Equal-frequency cut fitted on one sample
///
/// `edges` holds `bins + 1` increasing boundaries. Bin `i` covers
/// `(edges[i], edges[i + 1]]`, and the first bin also includes `edges[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileCut {
    pub edges: Vec<f64>,
}

impl QuantileCut {
    /// Fit edges at quantiles `0, 1/bins, ..., 1` with linear interpolation
    /// between order statistics.
    pub fn fit(scores: &[f64], bins: usize) -> Result<Self, LabelError> {
        if bins == 0 {
            return Err(LabelError::NoBins);
        }
        if scores.is_empty() {
            return Err(LabelError::Empty);
        }
        if let Some((index, &value)) = scores.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(LabelError::NonFinite { index, value });
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        let edges: Vec<f64> = (0..=bins)
            .map(|i| interpolate_quantile(&sorted, i as f64 / bins as f64))
            .collect();

        if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(LabelError::DuplicateEdges { edges });
        }

        Ok(Self { edges })
    }

    pub fn bins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Bin index for `score`; scores outside the fitted range clamp to the
    /// first or last bin.
    pub fn bin_of(&self, score: f64) -> usize {
        if self.edges.len() < 3 {
            return 0;
        }
        let inner = &self.edges[1..self.edges.len() - 1];
        inner.partition_point(|&edge| edge < score)
    }

    /// Severity class for `score` on a three-bin cut
    pub fn assign(&self, score: f64) -> Result<SeverityClass, LabelError> {
        SeverityClass::from_index(self.bin_of(score))
    }
}

fn interpolate_quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Fit a three-bin cut on `rows` and label every row with it
pub fn derive_labels(rows: &[FeatureRow]) -> Result<(QuantileCut, Vec<SeverityClass>), LabelError> {
    let scores: Vec<f64> = rows.iter().map(FeatureRow::severity_score).collect();
    let cut = QuantileCut::fit(&scores, SEVERITY_BINS)?;
    let labels = scores
        .iter()
        .map(|&score| cut.assign(score))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((cut, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(urgency: f64, affected_population: f64) -> FeatureRow {
        FeatureRow {
            urgency,
            affected_population,
            donation_amount: 0.0,
            num_ngos: 0.0,
            num_volunteers: 0.0,
        }
    }

    #[test]
    fn test_severity_score_formula() {
        assert_eq!(severity_score(0.0, 0.0), 0.0);
        let score = severity_score(5.0, 1000.0);
        assert!((score - (10.0 + 1001f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_edges_interpolate() {
        let cut = QuantileCut::fit(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 3).unwrap();
        // positions 0, 2, 4, 6 over seven sorted values
        assert_eq!(cut.edges, vec![1.0, 3.0, 5.0, 7.0]);

        let cut = QuantileCut::fit(&[0.0, 10.0], 3).unwrap();
        let expected = [0.0, 10.0 / 3.0, 20.0 / 3.0, 10.0];
        for (edge, want) in cut.edges.iter().zip(expected) {
            assert!((edge - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bins_are_right_closed_and_include_lowest() {
        let cut = QuantileCut::fit(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 3).unwrap();
        assert_eq!(cut.assign(1.0).unwrap(), SeverityClass::Low);
        assert_eq!(cut.assign(3.0).unwrap(), SeverityClass::Low);
        assert_eq!(cut.assign(3.5).unwrap(), SeverityClass::Medium);
        assert_eq!(cut.assign(5.0).unwrap(), SeverityClass::Medium);
        assert_eq!(cut.assign(5.01).unwrap(), SeverityClass::High);
        assert_eq!(cut.assign(7.0).unwrap(), SeverityClass::High);
    }

    #[test]
    fn test_out_of_range_scores_clamp() {
        let cut = QuantileCut::fit(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert_eq!(cut.assign(-100.0).unwrap(), SeverityClass::Low);
        assert_eq!(cut.assign(100.0).unwrap(), SeverityClass::High);
    }

    #[test]
    fn test_duplicate_edges_rejected() {
        let err = QuantileCut::fit(&[2.0, 2.0, 2.0, 2.0, 9.0], 3).unwrap_err();
        assert!(matches!(err, LabelError::DuplicateEdges { .. }));
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert_eq!(QuantileCut::fit(&[], 3).unwrap_err(), LabelError::Empty);
        assert!(matches!(
            QuantileCut::fit(&[1.0, f64::NAN], 3).unwrap_err(),
            LabelError::NonFinite { index: 1, .. }
        ));
    }

    #[test]
    fn test_derive_labels_balanced_tertiles() {
        let rows: Vec<FeatureRow> = (0..9).map(|i| row(i as f64, 0.0)).collect();
        let (cut, labels) = derive_labels(&rows).unwrap();

        assert_eq!(cut.bins(), 3);
        let counts = SeverityClass::ALL
            .map(|class| labels.iter().filter(|&&label| label == class).count());
        assert_eq!(counts, [3, 3, 3]);
    }

    #[test]
    fn test_same_pair_moves_between_samples() {
        let pair = row(5.0, 100.0);
        let low_sample: Vec<FeatureRow> = (0..9).map(|i| row(i as f64 * 2.0, 100.0)).collect();
        let high_sample: Vec<FeatureRow> = (0..9).map(|i| row(i as f64 * 0.5, 100.0)).collect();

        let (low_cut, _) = derive_labels(&low_sample).unwrap();
        let (high_cut, _) = derive_labels(&high_sample).unwrap();

        assert_ne!(
            low_cut.assign(pair.severity_score()).unwrap(),
            high_cut.assign(pair.severity_score()).unwrap()
        );
    }

    #[test]
    fn test_degenerate_deserialized_cut_does_not_panic() {
        for edges in ["[]", "[1.5]", "[1.0, 2.0]"] {
            let cut: QuantileCut = serde_json::from_str(&format!(r#"{{"edges":{edges}}}"#)).unwrap();
            assert_eq!(cut.bin_of(0.0), 0);
            assert_eq!(cut.bin_of(10.0), 0);
            assert_eq!(cut.assign(10.0).unwrap(), SeverityClass::Low);
        }
    }

    #[test]
    fn test_class_conversions() {
        assert_eq!(u8::from(SeverityClass::High), 2);
        assert_eq!(SeverityClass::try_from(1u8).unwrap(), SeverityClass::Medium);
        assert!(SeverityClass::try_from(3u8).is_err());
        assert_eq!(serde_json::to_string(&SeverityClass::Medium).unwrap(), "1");
    }
}
