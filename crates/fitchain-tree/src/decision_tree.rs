use fitchain_core::traits::{check_features, check_fit_input, class_index, unique_classes};
use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult};
use std::cmp::Ordering;

/// A node in the decision tree.
#[derive(Debug, Clone)]
enum TreeNode<T: Float> {
    /// Internal node: rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: T,
        left: Box<TreeNode<T>>,
        right: Box<TreeNode<T>>,
    },
    /// Leaf: index into the fitted class list.
    Leaf { class: usize },
}

impl<T: Float> TreeNode<T> {
    fn predict(&self, row: &[T]) -> usize {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Decision tree classifier using CART (Gini impurity).
///
/// `max_depth: None` grows until leaves are pure or too small to split.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier<T: Float> {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    tree: Option<TreeNode<T>>,
    classes: Vec<T>,
    n_features: Option<usize>,
}

/// Training view shared by every recursive call.
struct Grow<'a, T: Float> {
    x: &'a Matrix<T>,
    y: &'a [usize],
    n_classes: usize,
}

impl<T: Float> DecisionTreeClassifier<T> {
    pub fn new(max_depth: Option<usize>, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            tree: None,
            classes: Vec::new(),
            n_features: None,
        }
    }

    /// Depth of the fitted tree (a lone leaf has depth 0).
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeNode::depth)
    }

    pub fn n_leaves(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeNode::n_leaves)
    }

    fn build(&self, data: &Grow<T>, rows: &[usize], depth: usize) -> TreeNode<T> {
        let counts = class_counts(data.y, rows, data.n_classes);
        let majority = argmax(&counts);
        let depth_reached = self.max_depth.map_or(false, |d| depth >= d);
        let pure = counts[majority] == rows.len();
        if depth_reached || pure || rows.len() < self.min_samples_split.max(2) {
            return TreeNode::Leaf { class: majority };
        }

        match self.best_split(data, rows) {
            Some((feature, threshold, left, right)) => TreeNode::Split {
                feature,
                threshold,
                left: Box::new(self.build(data, &left, depth + 1)),
                right: Box::new(self.build(data, &right, depth + 1)),
            },
            None => TreeNode::Leaf { class: majority },
        }
    }

    /// Lowest weighted-Gini threshold over every feature, scanning sorted
    /// values with running class counts.
    fn best_split(
        &self,
        data: &Grow<T>,
        rows: &[usize],
    ) -> Option<(usize, T, Vec<usize>, Vec<usize>)> {
        let n = rows.len();
        let min_leaf = self.min_samples_leaf.max(1);
        let total = class_counts(data.y, rows, data.n_classes);
        let mut best: Option<(f64, usize, T)> = None;

        for feature in 0..data.x.cols() {
            let mut sorted: Vec<(T, usize)> =
                rows.iter().map(|&i| (data.x[(i, feature)], i)).collect();
            sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut left = vec![0usize; data.n_classes];
            for k in 0..n - 1 {
                left[data.y[sorted[k].1]] += 1;
                let (v, next) = (sorted[k].0, sorted[k + 1].0);
                let n_left = k + 1;
                if v == next || n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }
                let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let score = (n_left as f64 * gini(&left, n_left)
                    + (n - n_left) as f64 * gini(&right, n - n_left))
                    / n as f64;
                if best.map_or(true, |(b, _, _)| score < b) {
                    best = Some((score, feature, (v + next) / T::TWO));
                }
            }
        }

        let (_, feature, threshold) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&i| data.x[(i, feature)] <= threshold);
        Some((feature, threshold, left, right))
    }
}

impl<T: Float> Default for DecisionTreeClassifier<T> {
    fn default() -> Self {
        Self::new(None, 2, 1)
    }
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in rows {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Index of the largest count; ties go to the lowest index.
pub(crate) fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (k, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = k;
        }
    }
    best
}

impl<T: Float> Estimator<T> for DecisionTreeClassifier<T> {
    fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()> {
        check_fit_input(x, Some(y))?;
        if self.max_depth == Some(0) {
            return Err(MlError::InvalidParameter("max_depth must be at least 1".into()));
        }
        let classes = unique_classes(y)?;
        let encoded: Vec<usize> = y
            .iter()
            .map(|&v| class_index(&classes, v).unwrap_or(0))
            .collect();
        let data = Grow {
            x,
            y: &encoded,
            n_classes: classes.len(),
        };
        let rows: Vec<usize> = (0..x.rows()).collect();
        self.tree = Some(self.build(&data, &rows, 0));
        self.classes = classes;
        self.n_features = Some(x.cols());
        Ok(())
    }

    fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| MlError::not_fitted("DecisionTreeClassifier", "predict"))?;
        check_features(self.n_features.unwrap_or(0), x)?;
        Ok(x.iter_rows().map(|row| self.classes[tree.predict(row)]).collect())
    }

    fn classes(&self) -> &[T] {
        &self.classes
    }

    fn n_features_in(&self) -> Option<usize> {
        self.n_features
    }

    fn name(&self) -> &'static str {
        "decision_tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tree_classifier() {
        let x = Matrix::from_rows(&[
            vec![0.0],
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![4.0],
            vec![5.0],
            vec![6.0],
            vec![7.0],
        ])
        .unwrap();
        let y = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.depth(), Some(1));
        assert_eq!(tree.n_leaves(), Some(2));

        let q = Matrix::from_rows(&[vec![3.4], vec![3.6]]).unwrap();
        assert_eq!(tree.predict(&q).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_xor_needs_two_levels() {
        let x = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let y = vec![5.0, 9.0, 9.0, 5.0];
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.classes(), &[5.0, 9.0]);

        let mut stump = DecisionTreeClassifier::new(Some(1), 2, 1);
        stump.fit(&x, &y).unwrap();
        assert_eq!(stump.depth(), Some(1));
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let y = vec![0.0, 1.0, 1.0, 1.0];
        let mut tree = DecisionTreeClassifier::new(None, 2, 2);
        tree.fit(&x, &y).unwrap();
        // the pure cut at 0.5 would leave a single row on the left
        assert_eq!(tree.n_leaves(), Some(2));
        assert_eq!(tree.predict(&x).unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_errors() {
        let x: Matrix<f64> = Matrix::zeros(4, 2);
        let tree: DecisionTreeClassifier<f64> = DecisionTreeClassifier::default();
        assert!(tree.predict(&x).unwrap_err().is_not_fitted());

        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&x, &[0.0, 1.0, 0.0, 1.0]).unwrap();
        let wide: Matrix<f64> = Matrix::zeros(1, 3);
        assert!(tree.predict(&wide).unwrap_err().is_shape_mismatch());

        let mut bad = DecisionTreeClassifier::new(Some(0), 2, 1);
        assert!(bad.fit(&x, &[0.0, 1.0, 0.0, 1.0]).is_err());
    }
}
