//! Stochastic gradient-boosted regression trees with squared loss, as used by
//! GRNBoost2 to score candidate regulators of a target gene.
//!
//! Each boosting stage fits a shallow CART tree to the residuals of a random
//! subsample of the rows, considering a random subset of the features at each
//! split. The rows left out of a stage (out-of-bag) are used to decide when to
//! stop adding trees. Regulator importances are the impurity decreases credited
//! to each feature, summed over the ensemble.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::error::CisGrnError;

/// Features whose values differ by no more than this are treated as equal when
/// searching for splits.
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Gradient boosting parameters. The defaults are GRNBoost2's.
#[derive(Clone, Debug, PartialEq)]
pub struct BoostParams {
    pub learning_rate: f64,
    /// The maximum number of boosting stages; fewer are fit if early stopping triggers.
    pub max_estimators: usize,
    /// The fraction of features considered at each split.
    pub max_features: f64,
    /// The fraction of rows, drawn without replacement, used to fit each stage.
    pub subsample: f64,
    pub max_depth: usize,
    /// The number of stages of out-of-bag improvement averaged by the early stopping rule.
    pub early_stop_window: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_estimators: 5000,
            max_features: 0.1,
            subsample: 0.9,
            max_depth: 3,
            early_stop_window: 25,
        }
    }
}

impl BoostParams {
    pub fn validate(&self) -> Result<(), CisGrnError> {
        let in_unit = |v: f64| v > 0.0 && v <= 1.0;
        if !(self.learning_rate > 0.0) {
            return Err(CisGrnError::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !in_unit(self.max_features) || !in_unit(self.subsample) {
            return Err(CisGrnError::InvalidParameter(
                "max_features and subsample must be in (0, 1]".to_string(),
            ));
        }
        if self.max_estimators == 0 || self.max_depth == 0 || self.early_stop_window == 0 {
            return Err(CisGrnError::InvalidParameter(
                "max_estimators, max_depth and early_stop_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn n_inbag(&self, n_rows: usize) -> usize {
        ((self.subsample * n_rows as f64) as usize).clamp(1, n_rows)
    }

    fn n_split_features(&self, n_features: usize) -> usize {
        ((self.max_features * n_features as f64) as usize).clamp(1, n_features)
    }

    /// Whether to stop after stage `stage`, given the out-of-bag improvements so far.
    fn should_stop(&self, stage: usize, oob_improvement: &[f64]) -> bool {
        let window = self.early_stop_window;
        if stage + 1 < window {
            return false;
        }
        let recent = &oob_improvement[(stage + 1 - window)..stage];
        if recent.is_empty() {
            return false;
        }
        recent.iter().sum::<f64>() / (recent.len() as f64) < 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A CART regression tree.
#[derive(Clone, Debug)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Predict one row. Rows go left when `x[feature] <= threshold`.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = 0;
        loop {
            match self.nodes[node] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => node = if row[feature] <= threshold { left } else { right },
            }
        }
    }
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    /// `Σl²/nl + Σr²/nr`, maximized by the best split.
    proxy: f64,
}

/// Grows one tree on a subset of rows, crediting impurity decreases to features.
struct TreeGrower<'a, 'r, R: Rng + ?Sized> {
    x: ArrayView2<'a, f64>,
    residuals: &'a [f64],
    max_depth: usize,
    n_split_features: usize,
    rng: &'r mut R,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

impl<'a, 'r, R: Rng + ?Sized> TreeGrower<'a, 'r, R> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let n = rows.len() as f64;
        let sum: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let sum_sq: f64 = rows.iter().map(|&r| self.residuals[r].powi(2)).sum();
        let mean = sum / n;
        let impurity = sum_sq / n - mean * mean;

        let node = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: mean });
        if depth >= self.max_depth || rows.len() < 2 || impurity <= f64::EPSILON {
            return node;
        }
        let Some(split) = self.best_split(&rows, sum) else {
            return node;
        };

        self.importances[split.feature] += split.proxy - sum * sum / n;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, split.feature]] <= split.threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    /// Visit features in random order until `n_split_features` non-constant
    /// features have been searched, and return the best split among them.
    fn best_split(&mut self, rows: &[usize], sum: f64) -> Option<SplitChoice> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut *self.rng);

        let mut best: Option<SplitChoice> = None;
        let mut visited = 0;
        for feature in features {
            if visited >= self.n_split_features {
                break;
            }
            let Some(candidate) = self.best_split_on(feature, rows, sum) else {
                continue;
            };
            visited += 1;
            if best.as_ref().map_or(true, |b| candidate.proxy > b.proxy) {
                best = Some(candidate);
            }
        }
        best
    }

    /// The best threshold on one feature, or `None` if the feature is constant
    /// over these rows.
    fn best_split_on(&self, feature: usize, rows: &[usize], sum: f64) -> Option<SplitChoice> {
        let mut pairs: Vec<(f64, f64)> = rows
            .iter()
            .map(|&r| (self.x[[r, feature]], self.residuals[r]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (first, last) = (pairs[0].0, pairs[pairs.len() - 1].0);
        if last <= first + FEATURE_THRESHOLD {
            return None;
        }

        let n = pairs.len();
        let mut left_sum = 0.0;
        let mut best: Option<(usize, f64)> = None;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            if pairs[i + 1].0 <= pairs[i].0 + FEATURE_THRESHOLD {
                continue;
            }
            let n_left = (i + 1) as f64;
            let n_right = (n - i - 1) as f64;
            let right_sum = sum - left_sum;
            let proxy = left_sum * left_sum / n_left + right_sum * right_sum / n_right;
            if best.map_or(true, |(_, p)| proxy > p) {
                best = Some((i, proxy));
            }
        }

        best.map(|(i, proxy)| {
            let (lo, hi) = (pairs[i].0, pairs[i + 1].0);
            let mut threshold = lo / 2.0 + hi / 2.0;
            if threshold == hi || !threshold.is_finite() {
                threshold = lo;
            }
            SplitChoice {
                feature,
                threshold,
                proxy,
            }
        })
    }
}

/// A fitted gradient-boosted ensemble.
#[derive(Clone, Debug)]
pub struct BoostedRegressor {
    initial: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    oob_improvement: Vec<f64>,
    importance_sum: Vec<f64>,
    relevant_trees: usize,
}

fn squared_error(y: ArrayView1<f64>, predictions: &[f64], rows: &[usize]) -> f64 {
    rows.iter()
        .map(|&r| (y[r] - predictions[r]).powi(2))
        .sum::<f64>()
        / rows.len() as f64
}

impl BoostedRegressor {
    /// Fit the ensemble to predict `y` from the columns of `x` (rows are samples).
    pub fn fit<R: Rng + ?Sized>(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        params: &BoostParams,
        rng: &mut R,
    ) -> Result<Self, CisGrnError> {
        params.validate()?;
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 || y.len() != n_rows {
            return Err(CisGrnError::InvalidParameter(format!(
                "cannot fit {} targets from a {}×{} matrix",
                y.len(),
                n_rows,
                n_features
            )));
        }

        let initial = y.sum() / n_rows as f64;
        let mut predictions = vec![initial; n_rows];
        let n_inbag = params.n_inbag(n_rows);
        let n_split_features = params.n_split_features(n_features);

        let mut model = Self {
            initial,
            learning_rate: params.learning_rate,
            trees: Vec::new(),
            oob_improvement: Vec::new(),
            importance_sum: vec![0.0; n_features],
            relevant_trees: 0,
        };

        for stage in 0..params.max_estimators {
            let mut inbag = if n_inbag < n_rows {
                index::sample(&mut *rng, n_rows, n_inbag).into_vec()
            } else {
                (0..n_rows).collect()
            };
            inbag.sort_unstable();
            let mut is_inbag = vec![false; n_rows];
            for &r in inbag.iter() {
                is_inbag[r] = true;
            }
            let oob: Vec<usize> = (0..n_rows).filter(|&r| !is_inbag[r]).collect();

            let residuals: Vec<f64> = (0..n_rows).map(|r| y[r] - predictions[r]).collect();
            let oob_before = (!oob.is_empty()).then(|| squared_error(y, &predictions, &oob));

            let n_root = inbag.len() as f64;
            let mut grower = TreeGrower {
                x: x.reborrow(),
                residuals: &residuals,
                max_depth: params.max_depth,
                n_split_features,
                rng: &mut *rng,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            grower.grow(inbag, 0);
            let TreeGrower {
                nodes, importances, ..
            } = grower;
            let tree = RegressionTree { nodes };

            for (r, prediction) in predictions.iter_mut().enumerate() {
                *prediction += params.learning_rate * tree.predict_row(x.row(r));
            }
            let improvement = match oob_before {
                Some(before) => before - squared_error(y, &predictions, &oob),
                None => 0.0,
            };
            model.oob_improvement.push(improvement);

            if tree.node_count() > 1 {
                for (total, imp) in model.importance_sum.iter_mut().zip(importances) {
                    *total += imp / n_root;
                }
                model.relevant_trees += 1;
            }
            model.trees.push(tree);

            if params.should_stop(stage, &model.oob_improvement) {
                break;
            }
        }
        Ok(model)
    }

    /// The number of boosting stages that were fit.
    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// The out-of-bag loss improvement of each stage.
    pub fn oob_improvement(&self) -> &[f64] {
        &self.oob_improvement
    }

    /// Per-feature importances, scaled as GRNBoost2 reports them.
    ///
    /// The impurity decreases of each tree (divided by its root sample count) are
    /// averaged over the trees that split at least once, normalized to sum to one,
    /// then multiplied by the number of fitted stages. All zeros if no tree split.
    pub fn feature_importances(&self) -> Vec<f64> {
        if self.relevant_trees == 0 {
            return vec![0.0; self.importance_sum.len()];
        }
        let n_trees = self.relevant_trees as f64;
        let averaged: Vec<f64> = self.importance_sum.iter().map(|s| s / n_trees).collect();
        let total: f64 = averaged.iter().sum();
        if !(total > 0.0) {
            return vec![0.0; averaged.len()];
        }
        let scale = self.n_estimators() as f64 / total;
        averaged.into_iter().map(|v| v * scale).collect()
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.initial
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// `y` depends only on feature 1 (a step function); features 0 and 2 are noise.
    fn step_data(n: usize, rng: &mut StdRng) -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            1 => i as f64,
            _ => rng.gen_range(0.0..1.0),
        });
        let y = (0..n).map(|i| if i < n / 2 { 0.0 } else { 10.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_default_params() {
        let params = BoostParams::default();
        assert_eq!(params.n_inbag(100), 90);
        assert_eq!(params.n_inbag(1), 1);
        assert_eq!(params.n_split_features(25), 2);
        assert_eq!(params.n_split_features(3), 1);
        assert!(params.validate().is_ok());
        let bad = BoostParams {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_should_stop() {
        let params = BoostParams {
            early_stop_window: 3,
            ..Default::default()
        };
        assert!(!params.should_stop(1, &[-1.0, -1.0]));
        // stages 0 and 1 are averaged after stage 2
        assert!(params.should_stop(2, &[-1.0, -1.0, 5.0]));
        assert!(!params.should_stop(2, &[-1.0, 1.5, -5.0]));
        let params = BoostParams {
            early_stop_window: 1,
            ..Default::default()
        };
        assert!(!params.should_stop(0, &[-1.0]));
    }

    #[test]
    fn test_single_tree_split() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let residuals = [0.0, 0.0, 4.0, 4.0];
        let mut rng = StdRng::seed_from_u64(0);
        let mut grower = TreeGrower {
            x: x.view(),
            residuals: &residuals,
            max_depth: 3,
            n_split_features: 1,
            rng: &mut rng,
            nodes: Vec::new(),
            importances: vec![0.0],
        };
        grower.grow(vec![0, 1, 2, 3], 0);
        // root split plus two pure leaves
        assert_eq!(grower.nodes.len(), 3);
        assert_eq!(
            grower.nodes[0],
            TreeNode::Split {
                feature: 0,
                threshold: 2.5,
                left: 1,
                right: 2
            }
        );
        // n·var of the root is 16
        assert!((grower.importances[0] - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_finds_informative_feature() {
        let mut rng = StdRng::seed_from_u64(666);
        let (x, y) = step_data(60, &mut rng);
        let y = ndarray::Array1::from(y);
        let params = BoostParams {
            max_estimators: 300,
            max_features: 1.0,
            ..Default::default()
        };
        let model = BoostedRegressor::fit(x.view(), y.view(), &params, &mut rng).unwrap();
        assert!(model.n_estimators() >= 1);
        assert_eq!(model.oob_improvement().len(), model.n_estimators());

        let importances = model.feature_importances();
        let total: f64 = importances.iter().sum();
        assert!((total - model.n_estimators() as f64).abs() < 1e-6);
        assert!(importances[1] > importances[0]);
        assert!(importances[1] > importances[2]);

        // predictions move toward the targets
        let low = model.predict_row(x.row(0));
        let high = model.predict_row(x.row(59));
        assert!(low < 5.0 && high > 5.0);
    }

    #[test]
    fn test_constant_target_has_no_importance() {
        let mut rng = StdRng::seed_from_u64(1);
        let (x, _) = step_data(20, &mut rng);
        let y = ndarray::Array1::from_elem(20, 3.0);
        let params = BoostParams {
            max_estimators: 50,
            ..Default::default()
        };
        let model = BoostedRegressor::fit(x.view(), y.view(), &params, &mut rng).unwrap();
        assert!(model.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fit_is_reproducible() {
        let mut data_rng = StdRng::seed_from_u64(3);
        let (x, y) = step_data(30, &mut data_rng);
        let y = ndarray::Array1::from(y);
        let params = BoostParams {
            max_estimators: 100,
            ..Default::default()
        };
        let a = BoostedRegressor::fit(x.view(), y.view(), &params, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = BoostedRegressor::fit(x.view(), y.view(), &params, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.feature_importances(), b.feature_importances());
        assert_eq!(a.n_estimators(), b.n_estimators());
    }

    #[test]
    fn test_fit_rejects_empty_inputs() {
        let x = Array2::<f64>::zeros((5, 0));
        let y = ndarray::Array1::zeros(5);
        let mut rng = StdRng::seed_from_u64(0);
        let result = BoostedRegressor::fit(x.view(), y.view(), &BoostParams::default(), &mut rng);
        assert!(matches!(result, Err(CisGrnError::InvalidParameter(_))));
    }
}
