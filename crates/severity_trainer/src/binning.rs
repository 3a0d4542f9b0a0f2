//! Feature histogram binning
//!
//! Each feature is discretized once, before boosting, into at most
//! `max_bin` ordered bins. Split search then works on per-bin gradient sums
//! instead of raw values. Bin `b` covers `(upper[b - 1], upper[b]]` and the
//! last bound is `+inf`, so a split "bins `0..=b` go left" is exactly the
//! raw-value test `x <= upper[b]` used at inference.

use disaster_severity_core::FeatureVector;

/// Upper bin bounds of one feature
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBins {
    upper_bounds: Vec<f64>,
}

impl FeatureBins {
    /// Fit bounds on one feature column
    ///
    /// With few distinct values every value gets its own bin; otherwise
    /// distinct values are grouped so bins hold roughly equal sample counts.
    /// Bounds sit halfway between neighbouring distinct values.
    pub fn fit(values: &[f64], max_bin: usize) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);

        let mut distinct: Vec<(f64, usize)> = Vec::new();
        for value in sorted {
            match distinct.last_mut() {
                Some((last, count)) if *last == value => *count += 1,
                _ => distinct.push((value, 1)),
            }
        }

        let mut upper_bounds = Vec::new();
        if distinct.len() <= max_bin {
            for pair in distinct.windows(2) {
                upper_bounds.push(midpoint(pair[0].0, pair[1].0));
            }
        } else {
            let total: usize = distinct.iter().map(|(_, count)| count).sum();
            let per_bin = (total as f64 / max_bin as f64).max(1.0);
            let mut filled = 0usize;

            for i in 0..distinct.len() - 1 {
                filled += distinct[i].1;
                let target = per_bin * (upper_bounds.len() + 1) as f64;
                if filled as f64 >= target && upper_bounds.len() < max_bin - 1 {
                    upper_bounds.push(midpoint(distinct[i].0, distinct[i + 1].0));
                }
            }
        }

        upper_bounds.push(f64::INFINITY);
        Self { upper_bounds }
    }

    pub fn num_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    /// Bin holding `value`
    pub fn bin_of(&self, value: f64) -> usize {
        self.upper_bounds.partition_point(|&upper| upper < value)
    }

    /// Raw threshold equivalent to splitting after bin `bin`
    pub fn threshold(&self, bin: usize) -> f64 {
        self.upper_bounds[bin]
    }
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    // Adjacent floats can round the midpoint up onto `high`
    if mid >= high {
        low
    } else {
        mid
    }
}

/// Binned training matrix, column-major
#[derive(Clone, Debug)]
pub struct BinnedFeatures {
    pub bins: Vec<FeatureBins>,
    /// `columns[feature][row]` is the bin of that cell
    pub columns: Vec<Vec<u16>>,
    pub num_rows: usize,
}

impl BinnedFeatures {
    pub fn fit(rows: &[FeatureVector], max_bin: usize) -> Self {
        let max_bin = max_bin.clamp(2, u16::MAX as usize);
        let feature_count = rows.first().map_or(0, |row| row.len());

        let mut bins = Vec::with_capacity(feature_count);
        let mut columns = Vec::with_capacity(feature_count);

        for feature in 0..feature_count {
            let values: Vec<f64> = rows.iter().map(|row| row[feature]).collect();
            let feature_bins = FeatureBins::fit(&values, max_bin);
            columns.push(
                values
                    .iter()
                    .map(|&value| feature_bins.bin_of(value) as u16)
                    .collect(),
            );
            bins.push(feature_bins);
        }

        Self {
            bins,
            columns,
            num_rows: rows.len(),
        }
    }

    pub fn feature_count(&self) -> usize {
        self.bins.len()
    }
}
