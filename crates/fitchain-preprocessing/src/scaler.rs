use fitchain_core::traits::{check_features, check_fit_input};
use fitchain_core::{Float, Matrix, MlError, MlResult, Transformer};
use tracing::warn;

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Uses the population standard deviation. Columns with zero variance are
/// only centered.
#[derive(Debug, Clone)]
pub struct StandardScaler<T: Float> {
    pub with_mean: bool,
    pub with_std: bool,
    mean: Option<Vec<T>>,
    scale: Option<Vec<T>>,
}

impl<T: Float> StandardScaler<T> {
    pub fn new() -> Self {
        StandardScaler {
            with_mean: true,
            with_std: true,
            mean: None,
            scale: None,
        }
    }

    pub fn with_mean(mut self, on: bool) -> Self {
        self.with_mean = on;
        self
    }

    pub fn with_std(mut self, on: bool) -> Self {
        self.with_std = on;
        self
    }

    /// Fitted per-column means.
    pub fn mean(&self) -> Option<&[T]> {
        self.mean.as_deref()
    }

    /// Fitted per-column divisors (1 for constant columns).
    pub fn scale(&self) -> Option<&[T]> {
        self.scale.as_deref()
    }

    /// Undo the scaling.
    pub fn inverse_transform(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        let (mean, scale) = self.params("inverse_transform")?;
        check_features(mean.len(), x)?;
        Ok(x.map_columns(|v, j| self.shift(mean, j) + v * self.divisor(scale, j)))
    }

    fn params(&self, operation: &'static str) -> MlResult<(&[T], &[T])> {
        match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => Ok((m, s)),
            _ => Err(MlError::not_fitted("StandardScaler", operation)),
        }
    }

    fn shift(&self, mean: &[T], j: usize) -> T {
        if self.with_mean { mean[j] } else { T::ZERO }
    }

    fn divisor(&self, scale: &[T], j: usize) -> T {
        if self.with_std { scale[j] } else { T::ONE }
    }
}

impl<T: Float> Default for StandardScaler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Transformer<T> for StandardScaler<T> {
    fn fit(&mut self, x: &Matrix<T>) -> MlResult<()> {
        check_fit_input(x, None)?;
        let mean = x.mean_axis0()?;
        let std = x.std_axis0()?;

        let constant = std.iter().filter(|s| s.abs() < T::EPSILON).count();
        if constant > 0 {
            warn!(columns = constant, "zero-variance columns are centered but not scaled");
        }
        let scale = std
            .into_iter()
            .map(|s| if s.abs() < T::EPSILON { T::ONE } else { s })
            .collect();

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        let (mean, scale) = self.params("transform")?;
        check_features(mean.len(), x)?;
        Ok(x.map_columns(|v, j| (v - self.shift(mean, j)) / self.divisor(scale, j)))
    }

    fn n_features_in(&self) -> Option<usize> {
        self.mean.as_ref().map(Vec::len)
    }

    fn name(&self) -> &'static str {
        "standard_scaler"
    }
}

/// Scale features to the [0, 1] range seen during fit.
#[derive(Debug, Clone)]
pub struct MinMaxScaler<T: Float> {
    min: Option<Vec<T>>,
    range: Option<Vec<T>>,
}

impl<T: Float> MinMaxScaler<T> {
    pub fn new() -> Self {
        MinMaxScaler {
            min: None,
            range: None,
        }
    }
}

impl<T: Float> Default for MinMaxScaler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Transformer<T> for MinMaxScaler<T> {
    fn fit(&mut self, x: &Matrix<T>) -> MlResult<()> {
        check_fit_input(x, None)?;
        let min = x.min_axis0()?;
        let max = x.max_axis0()?;
        let range = min
            .iter()
            .zip(&max)
            .map(|(&lo, &hi)| {
                let r = hi - lo;
                if r.abs() < T::EPSILON { T::ONE } else { r }
            })
            .collect();
        self.min = Some(min);
        self.range = Some(range);
        Ok(())
    }

    fn transform(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        let (min, range) = match (&self.min, &self.range) {
            (Some(m), Some(r)) => (m, r),
            _ => return Err(MlError::not_fitted("MinMaxScaler", "transform")),
        };
        check_features(min.len(), x)?;
        Ok(x.map_columns(|v, j| (v - min[j]) / range[j]))
    }

    fn n_features_in(&self) -> Option<usize> {
        self.min.as_ref().map(Vec::len)
    }

    fn name(&self) -> &'static str {
        "min_max_scaler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn train() -> Matrix<f64> {
        Matrix::from_rows(&[
            vec![1.0, 2.0, 7.0],
            vec![3.0, 4.0, 7.0],
            vec![5.0, 9.0, 7.0],
            vec![-2.0, 1.0, 7.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_standard_scaler_zero_mean_unit_std() {
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(&train()).unwrap();

        let mean = z.mean_axis0().unwrap();
        let std = z.std_axis0().unwrap();
        for j in 0..2 {
            assert_abs_diff_eq!(mean[j], 0.0, epsilon = 1e-10);
            assert_abs_diff_eq!(std[j], 1.0, epsilon = 1e-10);
        }
        // constant column: centered, not scaled
        assert_abs_diff_eq!(mean[2], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(std[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_is_repeatable() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&train()).unwrap();
        let test = Matrix::from_rows(&[vec![0.0, 0.0, 0.0], vec![10.0, 10.0, 10.0]]).unwrap();
        let a = scaler.transform(&test).unwrap();
        let b = scaler.transform(&test).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), (2, 3));
    }

    #[test]
    fn test_not_fitted_and_feature_mismatch() {
        let scaler: StandardScaler<f64> = StandardScaler::new();
        assert!(scaler.transform(&train()).unwrap_err().is_not_fitted());
        assert!(!scaler.is_fitted());

        let mut scaler = StandardScaler::new();
        scaler.fit(&train()).unwrap();
        let narrow: Matrix<f64> = Matrix::zeros(2, 2);
        let err = scaler.transform(&narrow).unwrap_err();
        assert_eq!(err, MlError::FeatureMismatch { expected: 3, got: 2 });
    }

    #[test]
    fn test_refit_overwrites() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&train()).unwrap();
        let other = Matrix::from_rows(&[vec![100.0], vec![200.0]]).unwrap();
        scaler.fit(&other).unwrap();
        assert_eq!(scaler.n_features_in(), Some(1));
        assert_eq!(scaler.mean().unwrap(), &[150.0]);
        assert_eq!(scaler.scale().unwrap(), &[50.0]);
    }

    #[test]
    fn test_inverse_transform() {
        let mut scaler = StandardScaler::new();
        let x = train();
        let z = scaler.fit_transform(&x).unwrap();
        let back = scaler.inverse_transform(&z).unwrap();
        for (a, b) in back.data().iter().zip(x.data()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_without_mean() {
        let mut scaler = StandardScaler::new().with_mean(false);
        let x = Matrix::from_rows(&[vec![2.0], vec![4.0]]).unwrap();
        let z = scaler.fit_transform(&x).unwrap();
        // std = 1 -> values unchanged
        assert_eq!(z.data(), &[2.0, 4.0]);
    }

    #[test]
    fn test_minmax_scaler() {
        let mut scaler = MinMaxScaler::new();
        let z = scaler.fit_transform(&train()).unwrap();
        let min = z.min_axis0().unwrap();
        let max = z.max_axis0().unwrap();
        for j in 0..2 {
            assert_abs_diff_eq!(min[j], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(max[j], 1.0, epsilon = 1e-12);
        }
        assert_eq!(max[2], 0.0);
        assert_eq!(scaler.name(), "min_max_scaler");
    }
}
