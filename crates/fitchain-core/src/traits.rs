//! The two capability contracts every pipeline step implements.
//!
//! - [`Transformer`]: learns parameters from a feature matrix and applies
//!   them to any matrix with the same column count.
//! - [`Estimator`]: learns a mapping from features to labels and predicts
//!   one label per row.
//!
//! Both follow a single-fit, many-use lifecycle: `fit` takes `&mut self`
//! and replaces any earlier state, everything else takes `&self`.

use crate::dtype::Float;
use crate::error::{MlError, MlResult};
use crate::matrix::Matrix;

/// Unsupervised feature transformation (scalers, projections).
pub trait Transformer<T: Float> {
    /// Learn parameters from `x`, overwriting any previous fit.
    fn fit(&mut self, x: &Matrix<T>) -> MlResult<()>;

    /// Apply the fitted parameters. Never mutates the transformer.
    ///
    /// # Errors
    /// - [`MlError::NotFitted`] before `fit`
    /// - [`MlError::FeatureMismatch`] when `x` has a different column count
    fn transform(&self, x: &Matrix<T>) -> MlResult<Matrix<T>>;

    fn fit_transform(&mut self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Column count seen during `fit`, `None` before.
    fn n_features_in(&self) -> Option<usize>;

    fn is_fitted(&self) -> bool {
        self.n_features_in().is_some()
    }

    /// Default step name used by `make_pipeline`.
    fn name(&self) -> &'static str;
}

/// Supervised classifier.
pub trait Estimator<T: Float> {
    /// Learn from `x` and `y`, overwriting any previous fit.
    ///
    /// # Errors
    /// [`MlError::RowMismatch`] when `x.rows() != y.len()`.
    fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()>;

    /// One label per row of `x`.
    fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>>;

    /// Fraction of rows where `predict(x)` equals `y`.
    fn score(&self, x: &Matrix<T>, y: &[T]) -> MlResult<f64> {
        check_rows(x, y)?;
        let pred = self.predict(x)?;
        Ok(accuracy(y, &pred))
    }

    /// Sorted distinct labels seen during `fit`; empty before.
    fn classes(&self) -> &[T];

    fn n_features_in(&self) -> Option<usize>;

    fn is_fitted(&self) -> bool {
        self.n_features_in().is_some()
    }

    fn name(&self) -> &'static str;
}

// ─── Shared validation ──────────────────────────────────────────────────────

/// Reject a label vector whose length differs from the row count.
pub fn check_rows<T: Float>(x: &Matrix<T>, y: &[T]) -> MlResult<()> {
    if x.rows() != y.len() {
        return Err(MlError::RowMismatch {
            rows: x.rows(),
            labels: y.len(),
        });
    }
    Ok(())
}

/// Reject a matrix whose column count differs from the fitted one.
pub fn check_features<T: Float>(expected: usize, x: &Matrix<T>) -> MlResult<()> {
    if x.cols() != expected {
        return Err(MlError::FeatureMismatch {
            expected,
            got: x.cols(),
        });
    }
    Ok(())
}

/// Validate the inputs of a fit call: non-empty, finite, aligned.
pub fn check_fit_input<T: Float>(x: &Matrix<T>, y: Option<&[T]>) -> MlResult<()> {
    if x.rows() == 0 || x.cols() == 0 {
        return Err(MlError::EmptyData(format!(
            "cannot fit on a {}x{} matrix",
            x.rows(),
            x.cols()
        )));
    }
    if x.has_non_finite() {
        return Err(MlError::InvalidParameter(
            "feature matrix contains NaN or infinite values".into(),
        ));
    }
    if let Some(y) = y {
        check_rows(x, y)?;
    }
    Ok(())
}

// ─── Labels ─────────────────────────────────────────────────────────────────

/// Sorted distinct values of `y`.
pub fn unique_classes<T: Float>(y: &[T]) -> MlResult<Vec<T>> {
    if y.iter().any(|v| v.is_nan()) {
        return Err(MlError::InvalidParameter("labels contain NaN".into()));
    }
    let mut classes = y.to_vec();
    // NaN was rejected above, so the comparison is total
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    classes.dedup();
    Ok(classes)
}

/// Position of `label` in a sorted class list.
pub fn class_index<T: Float>(classes: &[T], label: T) -> Option<usize> {
    classes.iter().position(|&c| c == label)
}

/// Fraction of equal entries. Returns 0.0 for empty input.
pub fn accuracy<T: Float>(y_true: &[T], y_pred: &[T]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(a, b)| a == b)
        .count();
    correct as f64 / y_true.len() as f64
}
