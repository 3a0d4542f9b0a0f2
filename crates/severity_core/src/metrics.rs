//! Classification metrics used by training and offline evaluation.

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logs
const LOGLOSS_EPS: f64 = 1e-15;

/// Fraction of positions where `predicted` equals `actual`, in `[0, 1]`.
///
/// Empty input yields 0.
pub fn accuracy<T: PartialEq>(predicted: &[T], actual: &[T]) -> f64 {
    assert_eq!(
        predicted.len(),
        actual.len(),
        "predictions and labels must have same length"
    );

    if actual.is_empty() {
        return 0.0;
    }

    let hits = predicted
        .iter()
        .zip(actual)
        .filter(|(pred, label)| pred == label)
        .count();
    hits as f64 / actual.len() as f64
}

/// Mean multi-class log-loss of per-row class probabilities.
pub fn multi_logloss(probabilities: &[Vec<f64>], labels: &[usize]) -> f64 {
    assert_eq!(
        probabilities.len(),
        labels.len(),
        "probabilities and labels must have same length"
    );

    if labels.is_empty() {
        return 0.0;
    }

    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(row, &label)| -row[label].clamp(LOGLOSS_EPS, 1.0 - LOGLOSS_EPS).ln())
        .sum();
    total / labels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 2, 2], &[0, 1, 1, 2]), 0.75);
        assert_eq!(accuracy::<u8>(&[], &[]), 0.0);
    }

    #[test]
    fn test_logloss_uniform() {
        let probabilities = vec![vec![1.0 / 3.0; 3]; 4];
        let loss = multi_logloss(&probabilities, &[0, 1, 2, 0]);
        assert!((loss - 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_logloss_perfect_is_clipped() {
        let loss = multi_logloss(&[vec![0.0, 1.0, 0.0]], &[1]);
        assert!(loss >= 0.0 && loss < 1e-12);

        let loss = multi_logloss(&[vec![1.0, 0.0, 0.0]], &[1]);
        assert!((loss - (-LOGLOSS_EPS.ln())).abs() < 1e-9);
    }
}
