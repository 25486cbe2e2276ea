use fitchain_core::traits::{check_features, check_fit_input};
use fitchain_core::{Float, Matrix, MlError, MlResult, Transformer};
use tracing::debug;

const MAX_SWEEPS: usize = 100;

/// Principal Component Analysis.
///
/// Projects centered data onto the top `n_components` eigenvectors of the
/// sample covariance matrix (divisor `n - 1`). The covariance is only
/// `p x p`, so it is diagonalized in full with cyclic Jacobi rotations and
/// the eigenpairs are sorted by eigenvalue, largest first.
///
/// Each component is sign-normalized so that its largest-magnitude entry is
/// positive, which makes the projection deterministic.
#[derive(Debug, Clone)]
pub struct PCA<T: Float> {
    pub n_components: usize,
    components: Option<Matrix<T>>, // [n_components, n_features]
    explained_variance: Option<Vec<f64>>,
    total_variance: f64,
    mean: Option<Vec<T>>,
}

impl<T: Float> PCA<T> {
    pub fn new(n_components: usize) -> Self {
        PCA {
            n_components,
            components: None,
            explained_variance: None,
            total_variance: 0.0,
            mean: None,
        }
    }

    /// Principal axes, one per row.
    pub fn components(&self) -> Option<&Matrix<T>> {
        self.components.as_ref()
    }

    /// Variance captured by each component (eigenvalues, descending).
    pub fn explained_variance(&self) -> Option<&[f64]> {
        self.explained_variance.as_deref()
    }

    /// Share of the total variance captured by each component.
    ///
    /// Sums to 1.0 only when every component is kept.
    pub fn explained_variance_ratio(&self) -> Option<Vec<f64>> {
        self.explained_variance.as_ref().map(|ev| {
            if self.total_variance > 0.0 {
                ev.iter().map(|&v| v / self.total_variance).collect()
            } else {
                vec![0.0; ev.len()]
            }
        })
    }

    pub fn mean(&self) -> Option<&[T]> {
        self.mean.as_deref()
    }
}

fn center<T: Float>(x: &Matrix<T>, mean: &[T]) -> Matrix<T> {
    x.map_columns(|v, j| v - mean[j])
}

/// Eigen-decomposition of the symmetric row-major `p x p` matrix `a`.
///
/// Returns `(eigenvalue, eigenvector)` pairs sorted by eigenvalue,
/// largest first. Eigenvectors are orthonormal.
fn symmetric_eigen(mut a: Vec<f64>, p: usize) -> Vec<(f64, Vec<f64>)> {
    let mut v = vec![0.0; p * p];
    for i in 0..p {
        v[i * p + i] = 1.0;
    }
    let scale: f64 = a.iter().map(|x| x * x).sum();

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..p)
            .flat_map(|i| (i + 1..p).map(move |j| (i, j)))
            .map(|(i, j)| a[i * p + j] * a[i * p + j])
            .sum();
        if off <= f64::EPSILON * f64::EPSILON * scale {
            break;
        }
        for i in 0..p {
            for j in i + 1..p {
                let aij = a[i * p + j];
                if aij == 0.0 {
                    continue;
                }
                // rotation angle that zeroes a[i][j]
                let theta = (a[j * p + j] - a[i * p + i]) / (2.0 * aij);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..p {
                    let (aki, akj) = (a[k * p + i], a[k * p + j]);
                    a[k * p + i] = c * aki - s * akj;
                    a[k * p + j] = s * aki + c * akj;
                }
                for k in 0..p {
                    let (aik, ajk) = (a[i * p + k], a[j * p + k]);
                    a[i * p + k] = c * aik - s * ajk;
                    a[j * p + k] = s * aik + c * ajk;
                }
                for k in 0..p {
                    let (vki, vkj) = (v[k * p + i], v[k * p + j]);
                    v[k * p + i] = c * vki - s * vkj;
                    v[k * p + j] = s * vki + c * vkj;
                }
            }
        }
    }

    let mut pairs: Vec<(f64, Vec<f64>)> = (0..p)
        .map(|j| (a[j * p + j], (0..p).map(|k| v[k * p + j]).collect()))
        .collect();
    pairs.sort_by(|x, y| y.0.total_cmp(&x.0));
    pairs
}

/// Flip `v` so its largest-magnitude entry is positive.
fn fix_sign(v: &mut [f64]) {
    let mut pivot = 0.0f64;
    for &x in v.iter() {
        if x.abs() > pivot.abs() {
            pivot = x;
        }
    }
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

impl<T: Float> Transformer<T> for PCA<T> {
    fn fit(&mut self, x: &Matrix<T>) -> MlResult<()> {
        check_fit_input(x, None)?;
        let (n, p) = x.shape();
        if self.n_components == 0 || self.n_components > p {
            return Err(MlError::InvalidParameter(format!(
                "n_components must be in 1..={}, got {}",
                p, self.n_components
            )));
        }
        if n < 2 {
            return Err(MlError::EmptyData(
                "PCA needs at least 2 samples to estimate covariance".into(),
            ));
        }

        let mean = x.mean_axis0()?;
        let centered = center(x, &mean);
        let denom = T::from_usize(n - 1);
        let cov: Vec<f64> = centered
            .transpose()
            .matmul(&centered)?
            .into_data()
            .into_iter()
            .map(|v| (v / denom).to_f64())
            .collect();
        let total_variance: f64 = (0..p).map(|j| cov[j * p + j]).sum();

        let mut eigenvalues = Vec::with_capacity(self.n_components);
        let mut data: Vec<T> = Vec::with_capacity(self.n_components * p);
        for (lambda, mut v) in symmetric_eigen(cov, p).into_iter().take(self.n_components) {
            fix_sign(&mut v);
            // round-off can leave tiny negative eigenvalues on singular data
            eigenvalues.push(lambda.max(0.0));
            data.extend(v.into_iter().map(T::from_f64));
        }

        debug!(
            n_components = self.n_components,
            total_variance, "pca fitted"
        );
        self.components = Some(Matrix::new(data, self.n_components, p)?);
        self.explained_variance = Some(eigenvalues);
        self.total_variance = total_variance;
        self.mean = Some(mean);
        Ok(())
    }

    fn transform(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        let (mean, components) = match (&self.mean, &self.components) {
            (Some(m), Some(c)) => (m, c),
            _ => return Err(MlError::not_fitted("PCA", "transform")),
        };
        check_features(mean.len(), x)?;
        center(x, mean).matmul(&components.transpose())
    }

    fn n_features_in(&self) -> Option<usize> {
        self.mean.as_ref().map(Vec::len)
    }

    fn name(&self) -> &'static str {
        "pca"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn correlated() -> Matrix<f64> {
        Matrix::from_rows(&[
            vec![2.5, 2.4],
            vec![0.5, 0.7],
            vec![2.2, 2.9],
            vec![1.9, 2.2],
            vec![3.1, 3.0],
            vec![2.3, 2.7],
            vec![2.0, 1.6],
            vec![1.0, 1.1],
            vec![1.5, 1.6],
            vec![1.1, 0.9],
        ])
        .unwrap()
    }

    #[test]
    fn test_pca_first_component() {
        let mut pca = PCA::new(1);
        let reduced = pca.fit_transform(&correlated()).unwrap();
        assert_eq!(reduced.shape(), (10, 1));

        let comp = pca.components().unwrap();
        assert_abs_diff_eq!(comp[(0, 0)], 0.677873, epsilon = 1e-5);
        assert_abs_diff_eq!(comp[(0, 1)], 0.735179, epsilon = 1e-5);

        let ev = pca.explained_variance().unwrap();
        assert_abs_diff_eq!(ev[0], 1.284028, epsilon = 1e-5);
        let ratio = pca.explained_variance_ratio().unwrap();
        assert_abs_diff_eq!(ratio[0], 0.963185, epsilon = 1e-5);
    }

    #[test]
    fn test_all_components_explain_everything() {
        let mut pca = PCA::new(2);
        let z = pca.fit_transform(&correlated()).unwrap();
        let ratio = pca.explained_variance_ratio().unwrap();
        assert_abs_diff_eq!(ratio.iter().sum::<f64>(), 1.0, epsilon = 1e-8);
        assert!(ratio[0] >= ratio[1]);

        // projected columns are uncorrelated with the fitted variances
        let var = z.var_axis0(1).unwrap();
        let ev = pca.explained_variance().unwrap();
        assert_abs_diff_eq!(var[0], ev[0], epsilon = 1e-8);
        assert_abs_diff_eq!(var[1], ev[1], epsilon = 1e-8);
        let c = pca.components().unwrap();
        assert_abs_diff_eq!(dot(c.row(0), c.row(1)), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_deterministic() {
        let mut a = PCA::new(2);
        let mut b = PCA::new(2);
        let za = a.fit_transform(&correlated()).unwrap();
        let zb = b.fit_transform(&correlated()).unwrap();
        assert_eq!(za, zb);
    }

    #[test]
    fn test_invalid_components() {
        let mut pca: PCA<f64> = PCA::new(3);
        let err = pca.fit(&correlated()).unwrap_err();
        assert!(matches!(err, MlError::InvalidParameter(_)));
        assert!(!pca.is_fitted());

        let mut pca: PCA<f64> = PCA::new(0);
        assert!(pca.fit(&correlated()).is_err());
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let pca: PCA<f64> = PCA::new(1);
        assert!(pca.transform(&correlated()).unwrap_err().is_not_fitted());

        let mut pca = PCA::new(1);
        pca.fit(&correlated()).unwrap();
        let wide: Matrix<f64> = Matrix::zeros(2, 3);
        assert!(pca.transform(&wide).unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn test_near_equal_variances_stay_ordered() {
        let b = 0.99995f64.sqrt();
        let x = Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, b],
            vec![0.0, -b],
        ])
        .unwrap();
        let mut pca = PCA::new(2);
        pca.fit(&x).unwrap();

        let ev = pca.explained_variance().unwrap();
        assert!(ev[0] > ev[1], "not descending: {:?}", ev);
        assert_abs_diff_eq!(ev[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ev[1], 2.0 * 0.99995 / 3.0, epsilon = 1e-12);

        let c = pca.components().unwrap();
        assert_abs_diff_eq!(c[(0, 0)], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(c[(0, 1)], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ratios_non_increasing_on_mixed_columns() {
        // four columns with close variances and weak correlation
        let x = Matrix::from_rows(&[
            vec![1.0, 0.9, -1.1, 0.2],
            vec![-1.0, 1.1, 0.9, -0.1],
            vec![0.9, -1.0, 1.0, 1.0],
            vec![-1.1, -0.9, -1.0, -1.2],
            vec![0.1, 0.2, 0.1, 0.9],
            vec![1.1, -1.1, -0.8, -0.7],
        ])
        .unwrap();
        let mut pca = PCA::new(4);
        pca.fit(&x).unwrap();
        let ratio = pca.explained_variance_ratio().unwrap();
        assert!(ratio.windows(2).all(|w| w[0] >= w[1]), "{:?}", ratio);
        assert_abs_diff_eq!(ratio.iter().sum::<f64>(), 1.0, epsilon = 1e-10);

        let c = pca.components().unwrap();
        for i in 0..4 {
            assert_abs_diff_eq!(dot(c.row(i), c.row(i)), 1.0, epsilon = 1e-10);
            for j in i + 1..4 {
                assert_abs_diff_eq!(dot(c.row(i), c.row(j)), 0.0, epsilon = 1e-10);
            }
        }
    }
}
