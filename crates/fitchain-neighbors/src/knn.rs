use fitchain_core::traits::{check_features, check_fit_input, class_index, unique_classes};
use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Distance metric for KNN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    pub fn distance<T: Float>(&self, a: &[T], b: &[T]) -> T {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(&x, &y)| (x - y) * (x - y))
                .sum::<T>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(&x, &y)| (x - y).abs()).sum(),
        }
    }
}

/// K-Nearest Neighbors classifier.
///
/// Predicts the majority label among the `k` closest training rows. When
/// several classes share the top vote count, the class of the closest
/// tied neighbour wins.
#[derive(Debug, Clone)]
pub struct KNNClassifier<T: Float> {
    pub k: usize,
    pub metric: DistanceMetric,
    x_train: Option<Matrix<T>>,
    // class index per training row
    y_train: Vec<usize>,
    classes: Vec<T>,
}

impl<T: Float> KNNClassifier<T> {
    pub fn new(k: usize, metric: DistanceMetric) -> Self {
        KNNClassifier {
            k,
            metric,
            x_train: None,
            y_train: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Indices of the `k` training rows closest to `row`, nearest first.
    /// Equal distances keep training order.
    fn neighbors(&self, train: &Matrix<T>, row: &[T]) -> Vec<usize> {
        let mut dists: Vec<(T, usize)> = train
            .iter_rows()
            .enumerate()
            .map(|(j, t)| (self.metric.distance(row, t), j))
            .collect();
        dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        dists.into_iter().take(self.k).map(|(_, j)| j).collect()
    }

    fn vote(&self, neighbors: &[usize]) -> usize {
        let mut votes = vec![0usize; self.classes.len()];
        for &j in neighbors {
            votes[self.y_train[j]] += 1;
        }
        let top = votes.iter().copied().max().unwrap_or(0);
        // neighbors are sorted by distance, so the first one whose class
        // reaches the top count is the nearest tied neighbour
        neighbors
            .iter()
            .map(|&j| self.y_train[j])
            .find(|&c| votes[c] == top)
            .unwrap_or(0)
    }
}

impl<T: Float> Default for KNNClassifier<T> {
    fn default() -> Self {
        Self::new(5, DistanceMetric::Euclidean)
    }
}

impl<T: Float> Estimator<T> for KNNClassifier<T> {
    fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()> {
        check_fit_input(x, Some(y))?;
        if self.k == 0 || self.k > x.rows() {
            return Err(MlError::InvalidParameter(format!(
                "k must be in 1..={} for {} training rows, got {}",
                x.rows(),
                x.rows(),
                self.k
            )));
        }
        let classes = unique_classes(y)?;
        self.y_train = y
            .iter()
            .map(|&v| class_index(&classes, v).unwrap_or(0))
            .collect();
        self.classes = classes;
        self.x_train = Some(x.clone());
        Ok(())
    }

    fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>> {
        let train = self
            .x_train
            .as_ref()
            .ok_or_else(|| MlError::not_fitted("KNNClassifier", "predict"))?;
        check_features(train.cols(), x)?;
        Ok(x
            .iter_rows()
            .map(|row| self.classes[self.vote(&self.neighbors(train, row))])
            .collect())
    }

    fn classes(&self) -> &[T] {
        &self.classes
    }

    fn n_features_in(&self) -> Option<usize> {
        self.x_train.as_ref().map(Matrix::cols)
    }

    fn name(&self) -> &'static str {
        "knn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters() -> (Matrix<f64>, Vec<f64>) {
        let x = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.2, 0.0],
            vec![5.0, 5.0],
            vec![5.1, 5.1],
            vec![5.2, 5.0],
        ])
        .unwrap();
        (x, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = clusters();
        let mut knn = KNNClassifier::new(3, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();

        let test = Matrix::from_rows(&[vec![0.05, 0.05], vec![5.05, 5.05]]).unwrap();
        assert_eq!(knn.predict(&test).unwrap(), vec![0.0, 1.0]);
        assert_eq!(knn.score(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_manhattan() {
        let (x, y) = clusters();
        let mut knn = KNNClassifier::new(1, DistanceMetric::Manhattan);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&x).unwrap(), y);
        assert_eq!(DistanceMetric::Manhattan.distance(&[0.0, 0.0], &[1.0, -2.0]), 3.0);
    }

    #[test]
    fn test_tie_goes_to_nearest() {
        let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![7.0, 7.0, 2.0, 2.0];
        let mut knn = KNNClassifier::new(4, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();
        let q = Matrix::from_rows(&[vec![2.6], vec![1.4]]).unwrap();
        assert_eq!(knn.predict(&q).unwrap(), vec![2.0, 7.0]);
    }

    #[test]
    fn test_errors() {
        let (x, y) = clusters();
        let knn: KNNClassifier<f64> = KNNClassifier::default();
        assert!(knn.predict(&x).unwrap_err().is_not_fitted());

        let mut knn = KNNClassifier::new(10, DistanceMetric::Euclidean);
        assert!(matches!(knn.fit(&x, &y), Err(MlError::InvalidParameter(_))));

        let mut knn = KNNClassifier::new(1, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();
        let wide: Matrix<f64> = Matrix::zeros(1, 4);
        assert!(knn.predict(&wide).unwrap_err().is_shape_mismatch());
    }
}
