//! Regression tree learner
//!
//! Grows one tree on per-sample gradients and hessians, leaf-wise: every
//! step splits whichever current leaf offers the largest loss reduction,
//! until the leaf budget or depth limit is reached or no split gains
//! anything. Split search runs over histogram bins (see [`crate::binning`]).

use disaster_severity_core::{Node, Tree};

use crate::binning::BinnedFeatures;
use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub num_leaves: usize,
    pub min_data_in_leaf: usize,
    pub min_sum_hessian_in_leaf: f64,
    pub lambda_l2: f64,
    /// Shrinkage folded into the stored leaf values
    pub learning_rate: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            num_leaves: 31,
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            lambda_l2: 0.0,
            learning_rate: 0.05,
        }
    }
}

/// One split made while growing a tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitRecord {
    pub feature_idx: usize,
    pub gain: f64,
}

/// Fitted tree plus the splits it made, for importance reporting
#[derive(Clone, Debug)]
pub struct BuiltTree {
    pub tree: Tree,
    pub splits: Vec<SplitRecord>,
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    bin: usize,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, bin: usize, gain: f64) -> Self {
        Self {
            feature_idx,
            bin,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, bin),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

#[derive(Debug)]
enum GrowNode {
    Leaf {
        indices: Vec<usize>,
        depth: usize,
        best: Option<SplitCandidate>,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Copy, Default)]
struct BinStats {
    gradient: f64,
    hessian: f64,
    count: usize,
}

/// Leaf-wise tree builder over one class's gradients
pub struct CartBuilder<'a> {
    config: TreeConfig,
    data: &'a BinnedFeatures,
    gradients: &'a [f64],
    hessians: &'a [f64],
    class_idx: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        data: &'a BinnedFeatures,
        gradients: &'a [f64],
        hessians: &'a [f64],
        class_idx: usize,
        config: TreeConfig,
    ) -> Self {
        assert_eq!(data.num_rows, gradients.len());
        assert_eq!(data.num_rows, hessians.len());

        Self {
            config,
            data,
            gradients,
            hessians,
            class_idx,
        }
    }

    /// Grow the tree
    pub fn build(&self) -> BuiltTree {
        let root: Vec<usize> = (0..self.data.num_rows).collect();
        let mut arena = vec![self.new_leaf(root, 0)];
        let mut splits = Vec::new();
        let mut leaves = 1usize;

        while leaves < self.config.num_leaves.max(1) {
            let Some(target) = self.best_leaf(&arena) else {
                break;
            };

            let (indices, depth, split) = match &mut arena[target] {
                GrowNode::Leaf {
                    indices,
                    depth,
                    best,
                } => (std::mem::take(indices), *depth, best.take()),
                GrowNode::Split { .. } => break,
            };
            let Some(split) = split else {
                break;
            };

            let column = &self.data.columns[split.feature_idx];
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&row| column[row] as usize <= split.bin);

            let left = arena.len();
            arena.push(self.new_leaf(left_idx, depth + 1));
            let right = arena.len();
            arena.push(self.new_leaf(right_idx, depth + 1));

            arena[target] = GrowNode::Split {
                feature_idx: split.feature_idx,
                threshold: self.data.bins[split.feature_idx].threshold(split.bin),
                left,
                right,
            };
            splits.push(SplitRecord {
                feature_idx: split.feature_idx,
                gain: split.gain,
            });
            leaves += 1;
        }

        BuiltTree {
            tree: Tree::new(self.flatten(&arena), self.class_idx),
            splits,
        }
    }

    /// Splittable leaf with the highest gain; earliest created wins ties
    fn best_leaf(&self, arena: &[GrowNode]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, node) in arena.iter().enumerate() {
            if let GrowNode::Leaf {
                best: Some(split), ..
            } = node
            {
                if best.map_or(true, |(_, gain)| split.gain > gain) {
                    best = Some((idx, split.gain));
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn new_leaf(&self, indices: Vec<usize>, depth: usize) -> GrowNode {
        let best = if depth < self.config.max_depth {
            self.find_best_split(&indices)
        } else {
            None
        };
        GrowNode::Leaf {
            indices,
            depth,
            best,
        }
    }

    /// Find the best histogram split over all features
    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        if indices.len() < 2 * self.config.min_data_in_leaf.max(1) {
            return None;
        }

        let (sum_g, sum_h) = self.sum_gradients_hessians(indices);
        let parent_score = self.leaf_score(sum_g, sum_h);
        let mut best_split: Option<SplitCandidate> = None;

        for feature_idx in 0..self.data.feature_count() {
            let num_bins = self.data.bins[feature_idx].num_bins();
            if num_bins < 2 {
                continue;
            }

            let histogram = self.histogram(indices, feature_idx, num_bins);
            let mut left = BinStats::default();

            for (bin, stats) in histogram.iter().enumerate().take(num_bins - 1) {
                left.gradient += stats.gradient;
                left.hessian += stats.hessian;
                left.count += stats.count;

                let right_count = indices.len() - left.count;
                let right_g = sum_g - left.gradient;
                let right_h = sum_h - left.hessian;

                if left.count < self.config.min_data_in_leaf
                    || right_count < self.config.min_data_in_leaf
                    || left.hessian < self.config.min_sum_hessian_in_leaf
                    || right_h < self.config.min_sum_hessian_in_leaf
                {
                    continue;
                }

                let gain = self.leaf_score(left.gradient, left.hessian)
                    + self.leaf_score(right_g, right_h)
                    - parent_score;
                if gain <= 0.0 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, bin, gain);
                best_split = match best_split {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best_split
    }

    fn histogram(&self, indices: &[usize], feature_idx: usize, num_bins: usize) -> Vec<BinStats> {
        let column = &self.data.columns[feature_idx];
        let mut histogram = vec![BinStats::default(); num_bins];
        for &row in indices {
            let stats = &mut histogram[column[row] as usize];
            stats.gradient += self.gradients[row];
            stats.hessian += self.hessians[row];
            stats.count += 1;
        }
        histogram
    }

    /// `G² / (H + λ)`
    fn leaf_score(&self, sum_g: f64, sum_h: f64) -> f64 {
        let denominator = sum_h + self.config.lambda_l2;
        if denominator <= 0.0 {
            0.0
        } else {
            sum_g * sum_g / denominator
        }
    }

    fn sum_gradients_hessians(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(g, h), &row| {
            (g + self.gradients[row], h + self.hessians[row])
        })
    }

    /// Optimal leaf value `-G / (H + λ)`, shrunk by the learning rate
    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let (sum_g, sum_h) = self.sum_gradients_hessians(indices);
        let denominator = sum_h + self.config.lambda_l2;
        if denominator <= 0.0 {
            return 0.0;
        }
        -sum_g / denominator * self.config.learning_rate
    }

    /// Emit nodes in pre-order so children always follow their parent
    fn flatten(&self, arena: &[GrowNode]) -> Vec<Node> {
        let mut nodes = Vec::with_capacity(arena.len());
        self.emit(arena, 0, &mut nodes);
        nodes
    }

    fn emit(&self, arena: &[GrowNode], idx: usize, nodes: &mut Vec<Node>) -> i32 {
        let id = nodes.len() as i32;
        match &arena[idx] {
            GrowNode::Leaf { indices, .. } => {
                nodes.push(Node::leaf(id, self.leaf_value(indices)));
            }
            GrowNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                nodes.push(Node::internal(id, *feature_idx as i32, *threshold, -1, -1));
                let left_id = self.emit(arena, *left, nodes);
                let right_id = self.emit(arena, *right, nodes);
                nodes[id as usize].left = left_id;
                nodes[id as usize].right = right_id;
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[f64]) -> Vec<[f64; 5]> {
        values.iter().map(|&v| [v, 0.0, 0.0, 0.0, 0.0]).collect()
    }

    fn config(min_data_in_leaf: usize) -> TreeConfig {
        TreeConfig {
            min_data_in_leaf,
            learning_rate: 1.0,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_single_split_separates_gradients() {
        let features = rows(&[1.0, 2.0, 3.0, 4.0]);
        let data = BinnedFeatures::fit(&features, 255);
        let gradients = vec![-1.0, -1.0, 1.0, 1.0];
        let hessians = vec![1.0; 4];

        let built = CartBuilder::new(&data, &gradients, &hessians, 0, config(1)).build();
        let tree = &built.tree;

        assert!(tree.validate(5).is_ok());
        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert_eq!(tree.nodes[0].threshold, 2.5);
        assert_eq!(tree.evaluate(&features[0]), 1.0);
        assert_eq!(tree.evaluate(&features[3]), -1.0);
        assert_eq!(built.splits.len(), 1);
        assert!((built.splits[0].gain - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_leaf_only_tree() {
        let features = rows(&[1.0]);
        let data = BinnedFeatures::fit(&features, 255);
        let built = CartBuilder::new(&data, &[-1.0], &[1.0], 2, TreeConfig::default()).build();

        assert_eq!(built.tree.nodes.len(), 1);
        assert_eq!(built.tree.class_idx, 2);
        assert!(built.tree.nodes[0].is_leaf());
        assert!(built.splits.is_empty());
    }

    #[test]
    fn test_min_data_in_leaf_blocks_split() {
        let features = rows(&[1.0, 2.0, 3.0, 4.0]);
        let data = BinnedFeatures::fit(&features, 255);
        let built = CartBuilder::new(&data, &[-1.0, -1.0, 1.0, 1.0], &[1.0; 4], 0, config(3)).build();
        assert_eq!(built.tree.num_leaves(), 1);
    }

    #[test]
    fn test_leaf_budget_and_depth() {
        let values: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let features = rows(&values);
        let data = BinnedFeatures::fit(&features, 255);
        let gradients: Vec<f64> = (0..64).map(|i| if (i / 4) % 2 == 0 { -1.0 } else { 1.0 }).collect();
        let hessians = vec![1.0; 64];

        let limited = TreeConfig {
            num_leaves: 4,
            ..config(1)
        };
        let built = CartBuilder::new(&data, &gradients, &hessians, 0, limited).build();
        assert!(built.tree.num_leaves() <= 4);

        let shallow = TreeConfig {
            max_depth: 1,
            ..config(1)
        };
        let built = CartBuilder::new(&data, &gradients, &hessians, 0, shallow).build();
        assert!(built.tree.num_leaves() <= 2);
        assert!(built.tree.validate(5).is_ok());
    }

    #[test]
    fn test_build_is_deterministic() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 7) % 13) as f64).collect();
        let features = rows(&values);
        let data = BinnedFeatures::fit(&features, 255);
        let gradients: Vec<f64> = values.iter().map(|v| v - 6.0).collect();
        let hessians = vec![1.0; 40];

        let a = CartBuilder::new(&data, &gradients, &hessians, 1, config(2)).build();
        let b = CartBuilder::new(&data, &gradients, &hessians, 1, config(2)).build();
        assert_eq!(a.tree, b.tree);
        assert_eq!(a.splits, b.splits);
    }
}
