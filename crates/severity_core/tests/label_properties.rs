use disaster_severity_core::{derive_labels, FeatureRow, QuantileCut, SeverityClass};
use proptest::prelude::*;

fn feature_row() -> impl Strategy<Value = FeatureRow> {
    (1u32..=10, 0u32..2_000_000, 0u32..100_000, 0u32..50, 0u32..1_000).prop_map(
        |(urgency, population, donation, ngos, volunteers)| FeatureRow {
            urgency: urgency as f64,
            affected_population: population as f64,
            donation_amount: donation as f64,
            num_ngos: ngos as f64,
            num_volunteers: volunteers as f64,
        },
    )
}

proptest! {
    #[test]
    fn labels_are_deterministic(rows in prop::collection::vec(feature_row(), 3..200)) {
        let first = derive_labels(&rows);
        let second = derive_labels(&rows);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn labels_are_monotonic_in_score(rows in prop::collection::vec(feature_row(), 3..200)) {
        if let Ok((cut, labels)) = derive_labels(&rows) {
            prop_assert_eq!(labels.len(), rows.len());

            let mut scored: Vec<(f64, SeverityClass)> = rows
                .iter()
                .map(FeatureRow::severity_score)
                .zip(labels)
                .collect();
            scored.sort_by(|a, b| a.0.total_cmp(&b.0));

            for pair in scored.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].1);
            }

            // The extremes of the sample always land in the outer bins
            prop_assert_eq!(scored[0].1, SeverityClass::Low);
            prop_assert_eq!(scored[scored.len() - 1].1, SeverityClass::High);
            prop_assert_eq!(cut.edges.len(), 4);
        }
    }

    #[test]
    fn cut_edges_span_the_sample(scores in prop::collection::vec(-1.0e6f64..1.0e6, 3..300)) {
        if let Ok(cut) = QuantileCut::fit(&scores, 3) {
            let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(cut.edges[0], min);
            prop_assert_eq!(cut.edges[3], max);
            for &score in &scores {
                prop_assert!(cut.bin_of(score) < 3);
            }
        }
    }
}
