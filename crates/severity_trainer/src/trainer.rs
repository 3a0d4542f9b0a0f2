//! Multiclass gradient boosting trainer
//!
//! Softmax boosting with one tree per class per round. Each round's trees
//! are fitted on the gradients of the same raw scores, and the held-out
//! multi-class log-loss after every round drives early stopping.

use disaster_severity_core::gbdt::softmax;
use disaster_severity_core::{
    accuracy, multi_logloss, FeatureVector, Model, Tree, FEATURE_COLUMNS, NUM_CLASSES,
};
use tracing::{debug, info, warn};

use crate::binning::BinnedFeatures;
use crate::cart::{BuiltTree, CartBuilder, SplitRecord, TreeConfig};
use crate::dataset::Dataset;
use crate::errors::TrainerError;

/// Per-class sample weighting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassWeight {
    /// Every sample weighs 1
    Uniform,
    /// `n_samples / (n_classes * class_count)`
    Balanced,
}

/// Boosting configuration
#[derive(Clone, Debug)]
pub struct TrainingParams {
    pub num_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub num_leaves: usize,
    pub min_data_in_leaf: usize,
    pub min_sum_hessian_in_leaf: f64,
    pub lambda_l2: f64,
    pub max_bin: usize,
    /// Rounds without held-out improvement before stopping; 0 disables
    pub early_stopping_rounds: usize,
    pub class_weight: ClassWeight,
    /// Seed of the train/test split
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_rounds: 500,
            learning_rate: 0.05,
            max_depth: 10,
            num_leaves: 31,
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            lambda_l2: 0.0,
            max_bin: 255,
            early_stopping_rounds: 50,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), TrainerError> {
        let problem = if self.num_rounds == 0 {
            Some("num_rounds must be positive".to_string())
        } else if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            Some(format!("learning_rate must be positive, got {}", self.learning_rate))
        } else if self.num_leaves < 2 {
            Some(format!("num_leaves must be at least 2, got {}", self.num_leaves))
        } else if self.max_depth == 0 {
            Some("max_depth must be positive".to_string())
        } else if self.max_bin < 2 {
            Some(format!("max_bin must be at least 2, got {}", self.max_bin))
        } else if self.lambda_l2 < 0.0 || self.min_sum_hessian_in_leaf < 0.0 {
            Some("regularization terms must be non-negative".to_string())
        } else {
            None
        };

        match problem {
            Some(message) => Err(TrainerError::Params(message)),
            None => Ok(()),
        }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            num_leaves: self.num_leaves,
            min_data_in_leaf: self.min_data_in_leaf,
            min_sum_hessian_in_leaf: self.min_sum_hessian_in_leaf,
            lambda_l2: self.lambda_l2,
            learning_rate: self.learning_rate,
        }
    }
}

/// Importance of one feature across the kept trees
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureImportance {
    pub feature: String,
    /// Number of splits on this feature
    pub splits: usize,
    /// Total loss reduction of those splits
    pub gain: f64,
}

/// Summary of a training run
#[derive(Clone, Debug)]
pub struct TrainingReport {
    /// Round with the lowest held-out loss (1-based); the model keeps this many rounds
    pub best_iteration: usize,
    /// Rounds actually fitted before stopping
    pub rounds_trained: usize,
    pub stopped_early: bool,
    /// Held-out log-loss after each fitted round
    pub eval_logloss: Vec<f64>,
    /// Sorted by split count, then gain, descending
    pub feature_importance: Vec<FeatureImportance>,
    /// Held-out accuracy of the returned model, in `[0, 1]`
    pub accuracy: f64,
}

/// GBDT trainer
pub struct GbdtTrainer {
    params: TrainingParams,
}

impl GbdtTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Fit on `train`, early-stopping on `valid`
    pub fn train(&self, train: &Dataset, valid: &Dataset) -> Result<(Model, TrainingReport), TrainerError> {
        self.params.validate()?;
        if train.is_empty() || valid.is_empty() {
            return Err(TrainerError::Training(
                "training and validation sets must both be non-empty".to_string(),
            ));
        }

        let labels = train.label_indices();
        let valid_labels = valid.label_indices();
        let weights = self.sample_weights(&labels);
        let init_scores = initial_scores(&labels, &weights);
        debug!("Initial class scores: {:?}", init_scores);

        let binned = BinnedFeatures::fit(&train.features, self.params.max_bin);
        let tree_config = self.params.tree_config();

        let mut train_raw = vec![init_scores.clone(); train.len()];
        let mut valid_raw = vec![init_scores.clone(); valid.len()];

        let mut rounds: Vec<Vec<BuiltTree>> = Vec::with_capacity(self.params.num_rounds);
        let mut eval_logloss = Vec::with_capacity(self.params.num_rounds);
        let mut best_loss = f64::INFINITY;
        let mut best_iteration = 0usize;
        let mut rounds_without_improvement = 0usize;
        let mut stopped_early = false;

        for round in 0..self.params.num_rounds {
            let probabilities: Vec<Vec<f64>> = train_raw.iter().map(|raw| softmax(raw)).collect();

            let built: Vec<BuiltTree> = (0..NUM_CLASSES)
                .map(|class| {
                    let (gradients, hessians) =
                        softmax_gradients(&probabilities, &labels, &weights, class);
                    CartBuilder::new(&binned, &gradients, &hessians, class, tree_config.clone())
                        .build()
                })
                .collect();

            // A splitless first round is kept so the model still predicts the prior
            if built.iter().all(|tree| tree.splits.is_empty()) {
                if rounds.is_empty() {
                    warn!("Round 1: no leaf meets the split requirements, keeping constant trees");
                } else {
                    warn!(
                        "Stopped at round {}: no leaf meets the split requirements",
                        round + 1
                    );
                    break;
                }
            }

            for tree in &built {
                apply_tree(&tree.tree, &train.features, &mut train_raw);
                apply_tree(&tree.tree, &valid.features, &mut valid_raw);
            }
            rounds.push(built);

            let valid_proba: Vec<Vec<f64>> = valid_raw.iter().map(|raw| softmax(raw)).collect();
            let loss = multi_logloss(&valid_proba, &valid_labels);
            eval_logloss.push(loss);
            debug!("Round {}: valid multi_logloss={:.6}", round + 1, loss);

            if loss < best_loss {
                best_loss = loss;
                best_iteration = round + 1;
                rounds_without_improvement = 0;
            } else {
                rounds_without_improvement += 1;
            }

            if self.params.early_stopping_rounds > 0
                && rounds_without_improvement >= self.params.early_stopping_rounds
            {
                info!(
                    "Early stopping at round {}; best iteration {} with multi_logloss={:.6}",
                    round + 1,
                    best_iteration,
                    best_loss
                );
                stopped_early = true;
                break;
            }
        }

        let rounds_trained = rounds.len();
        let kept = if self.params.early_stopping_rounds > 0 && best_iteration > 0 {
            best_iteration
        } else {
            rounds_trained
        };
        rounds.truncate(kept);

        let feature_importance = feature_importance(rounds.iter().flatten());
        let trees: Vec<Tree> = rounds.into_iter().flatten().map(|built| built.tree).collect();
        let model = Model::new(init_scores, trees, best_iteration);
        model.validate()?;

        let predictions = valid
            .features
            .iter()
            .map(|row| model.predict(row))
            .collect::<Result<Vec<_>, _>>()?;
        let accuracy = accuracy(&predictions, &valid.labels);

        Ok((
            model,
            TrainingReport {
                best_iteration,
                rounds_trained,
                stopped_early,
                eval_logloss,
                feature_importance,
                accuracy,
            },
        ))
    }

    fn sample_weights(&self, labels: &[usize]) -> Vec<f64> {
        match self.params.class_weight {
            ClassWeight::Uniform => vec![1.0; labels.len()],
            ClassWeight::Balanced => {
                let class_weights = balanced_class_weights(labels);
                labels.iter().map(|&label| class_weights[label]).collect()
            }
        }
    }
}

/// `n_samples / (n_classes * count)` per class; absent classes get 0
pub fn balanced_class_weights(labels: &[usize]) -> [f64; NUM_CLASSES] {
    let mut counts = [0usize; NUM_CLASSES];
    for &label in labels {
        counts[label] += 1;
    }

    counts.map(|count| {
        if count == 0 {
            0.0
        } else {
            labels.len() as f64 / (NUM_CLASSES as f64 * count as f64)
        }
    })
}

/// Log of the weighted class priors
fn initial_scores(labels: &[usize], weights: &[f64]) -> Vec<f64> {
    const MIN_PRIOR: f64 = 1e-15;

    let mut class_weight = [0.0f64; NUM_CLASSES];
    for (&label, &weight) in labels.iter().zip(weights) {
        class_weight[label] += weight;
    }
    let total: f64 = class_weight.iter().sum();

    class_weight
        .iter()
        .map(|&weight| (weight / total).max(MIN_PRIOR).ln())
        .collect()
}

/// Gradients and hessians of the softmax cross-entropy for one class
///
/// The hessian carries the `K / (K - 1)` factor of the diagonal
/// approximation used for softmax boosting.
fn softmax_gradients(
    probabilities: &[Vec<f64>],
    labels: &[usize],
    weights: &[f64],
    class: usize,
) -> (Vec<f64>, Vec<f64>) {
    let factor = NUM_CLASSES as f64 / (NUM_CLASSES as f64 - 1.0);

    probabilities
        .iter()
        .zip(labels.iter().zip(weights))
        .map(|(row, (&label, &weight))| {
            let p = row[class];
            let target = if label == class { 1.0 } else { 0.0 };
            ((p - target) * weight, factor * p * (1.0 - p) * weight)
        })
        .unzip()
}

fn apply_tree(tree: &Tree, features: &[FeatureVector], raw: &mut [Vec<f64>]) {
    for (row, scores) in features.iter().zip(raw.iter_mut()) {
        scores[tree.class_idx] += tree.evaluate(row);
    }
}

/// Split-count and gain importance, ranked
pub fn feature_importance<'a>(trees: impl Iterator<Item = &'a BuiltTree>) -> Vec<FeatureImportance> {
    let mut importance: Vec<FeatureImportance> = FEATURE_COLUMNS
        .iter()
        .map(|name| FeatureImportance {
            feature: name.to_string(),
            splits: 0,
            gain: 0.0,
        })
        .collect();

    for SplitRecord { feature_idx, gain } in trees.flat_map(|built| built.splits.iter().copied()) {
        importance[feature_idx].splits += 1;
        importance[feature_idx].gain += gain;
    }

    importance.sort_by(|a, b| {
        b.splits
            .cmp(&a.splits)
            .then_with(|| b.gain.total_cmp(&a.gain))
    });
    importance
}
