use fitchain_core::traits::{check_features, check_fit_input, class_index, unique_classes};
use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::decision_tree::{argmax, DecisionTreeClassifier};

/// Random forest classifier: bagged decision trees, each trained on a
/// bootstrap sample and a random subset of the features.
///
/// `max_features_ratio: None` gives each tree `sqrt(n_features)` columns.
/// Trees are grown one after another from a single seeded generator, so a
/// fixed `seed` reproduces the same forest.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier<T: Float> {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features_ratio: Option<f64>,
    pub seed: Option<u64>,
    trees: Vec<DecisionTreeClassifier<T>>,
    feature_subsets: Vec<Vec<usize>>,
    classes: Vec<T>,
    n_features: Option<usize>,
}

impl<T: Float> RandomForestClassifier<T> {
    pub fn new(n_estimators: usize, max_depth: Option<usize>) -> Self {
        RandomForestClassifier {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            max_features_ratio: None,
            seed: Some(42),
            trees: Vec::new(),
            feature_subsets: Vec::new(),
            classes: Vec::new(),
            n_features: None,
        }
    }

    pub fn with_max_features_ratio(mut self, ratio: f64) -> Self {
        self.max_features_ratio = Some(ratio);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Number of columns each tree sees for `p` input features.
    fn max_features(&self, p: usize) -> MlResult<usize> {
        let k = match self.max_features_ratio {
            None => (p as f64).sqrt().round() as usize,
            Some(r) if r > 0.0 && r <= 1.0 => (p as f64 * r).ceil() as usize,
            Some(r) => {
                return Err(MlError::InvalidParameter(format!(
                    "max_features_ratio must be in (0, 1], got {}",
                    r
                )))
            }
        };
        Ok(k.clamp(1, p))
    }

    /// Per-class vote counts for every row of `x`.
    fn votes(&self, x: &Matrix<T>) -> MlResult<Vec<Vec<usize>>> {
        let p = self
            .n_features
            .ok_or_else(|| MlError::not_fitted("RandomForestClassifier", "predict"))?;
        check_features(p, x)?;
        let mut votes = vec![vec![0usize; self.classes.len()]; x.rows()];
        for (tree, features) in self.trees.iter().zip(&self.feature_subsets) {
            let pred = tree.predict(&x.select_cols(features)?)?;
            for (row_votes, label) in votes.iter_mut().zip(pred) {
                if let Some(k) = class_index(&self.classes, label) {
                    row_votes[k] += 1;
                }
            }
        }
        Ok(votes)
    }

    /// Fraction of trees voting for each class, one column per class.
    pub fn predict_proba(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        let votes = self.votes(x)?;
        let n_trees = T::from_usize(self.trees.len());
        let data = votes
            .iter()
            .flat_map(|row| row.iter().map(|&v| T::from_usize(v) / n_trees))
            .collect();
        Matrix::new(data, x.rows(), self.classes.len())
    }
}

impl<T: Float> Default for RandomForestClassifier<T> {
    fn default() -> Self {
        Self::new(100, None)
    }
}

impl<T: Float> Estimator<T> for RandomForestClassifier<T> {
    fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()> {
        check_fit_input(x, Some(y))?;
        if self.n_estimators == 0 {
            return Err(MlError::InvalidParameter("n_estimators must be at least 1".into()));
        }
        let (n, p) = x.shape();
        let max_features = self.max_features(p)?;
        let classes = unique_classes(y)?;

        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut feature_subsets = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let mut features: Vec<usize> = (0..p).collect();
            features.shuffle(&mut rng);
            features.truncate(max_features);
            features.sort_unstable();

            let x_sub = x.select_rows(&sample)?.select_cols(&features)?;
            let y_sub: Vec<T> = sample.iter().map(|&i| y[i]).collect();

            let mut tree =
                DecisionTreeClassifier::new(self.max_depth, self.min_samples_split, 1);
            tree.fit(&x_sub, &y_sub)?;
            trees.push(tree);
            feature_subsets.push(features);
        }
        debug!(
            trees = trees.len(),
            max_features, "random forest fitted"
        );

        self.trees = trees;
        self.feature_subsets = feature_subsets;
        self.classes = classes;
        self.n_features = Some(p);
        Ok(())
    }

    fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>> {
        Ok(self
            .votes(x)?
            .iter()
            .map(|row| self.classes[argmax(row)])
            .collect())
    }

    fn classes(&self) -> &[T] {
        &self.classes
    }

    fn n_features_in(&self) -> Option<usize> {
        self.n_features
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}
