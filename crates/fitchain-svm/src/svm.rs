use fitchain_core::traits::{check_features, check_fit_input, unique_classes};
use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Kernel type for SVM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    /// `exp(-gamma * |a - b|^2)`. Without `gamma`, uses
    /// `1 / (n_features * var(X))` computed at fit time.
    Rbf {
        #[serde(default)]
        gamma: Option<f64>,
    },
    Polynomial {
        degree: u32,
        #[serde(default)]
        coef0: f64,
    },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Rbf { gamma: None }
    }
}

/// Kernel with every parameter resolved against the training data.
#[derive(Debug, Clone, Copy)]
enum FittedKernel<T: Float> {
    Linear,
    Rbf { gamma: T },
    Polynomial { degree: u32, coef0: T },
}

impl<T: Float> FittedKernel<T> {
    fn resolve(kernel: Kernel, x: &Matrix<T>) -> MlResult<Self> {
        Ok(match kernel {
            Kernel::Linear => FittedKernel::Linear,
            Kernel::Rbf { gamma: Some(g) } if g > 0.0 => FittedKernel::Rbf {
                gamma: T::from_f64(g),
            },
            Kernel::Rbf { gamma: Some(g) } => {
                return Err(MlError::InvalidParameter(format!(
                    "rbf gamma must be positive, got {}",
                    g
                )))
            }
            Kernel::Rbf { gamma: None } => {
                let values = x.data();
                let n = T::from_usize(values.len());
                let mean = values.iter().copied().sum::<T>() / n;
                let var = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<T>() / n;
                let gamma = if var > T::EPSILON {
                    T::ONE / (T::from_usize(x.cols()) * var)
                } else {
                    T::ONE
                };
                FittedKernel::Rbf { gamma }
            }
            Kernel::Polynomial { degree: 0, .. } => {
                return Err(MlError::InvalidParameter(
                    "polynomial degree must be at least 1".into(),
                ))
            }
            Kernel::Polynomial { degree, coef0 } => FittedKernel::Polynomial {
                degree,
                coef0: T::from_f64(coef0),
            },
        })
    }

    fn eval(&self, a: &[T], b: &[T]) -> T {
        let dot = || a.iter().zip(b).map(|(&x, &y)| x * y).sum::<T>();
        match *self {
            FittedKernel::Linear => dot(),
            FittedKernel::Rbf { gamma } => {
                let sq: T = a.iter().zip(b).map(|(&x, &y)| (x - y) * (x - y)).sum();
                (-gamma * sq).exp()
            }
            FittedKernel::Polynomial { degree, coef0 } => (dot() + coef0).powi(degree as i32),
        }
    }
}

/// One trained +1/-1 machine: support vectors with `alpha_i * y_i`.
#[derive(Debug, Clone)]
struct BinarySvm<T: Float> {
    support: Matrix<T>,
    dual_coef: Vec<T>,
    bias: T,
}

impl<T: Float> BinarySvm<T> {
    fn decision(&self, kernel: &FittedKernel<T>, row: &[T]) -> T {
        self.support
            .iter_rows()
            .zip(&self.dual_coef)
            .map(|(sv, &c)| c * kernel.eval(sv, row))
            .sum::<T>()
            + self.bias
    }
}

/// Support Vector Classifier using simplified SMO.
///
/// Binary problems train one machine with the larger class label as the
/// positive side. More classes train one machine per class (one-vs-rest) and
/// predict the class with the largest decision value.
#[derive(Debug, Clone)]
pub struct SVC<T: Float> {
    pub c: T,
    pub kernel: Kernel,
    /// Maximum number of passes over the training set.
    pub max_iter: usize,
    pub tol: T,
    /// Seed for the random choice of the second multiplier.
    pub seed: u64,
    machines: Vec<BinarySvm<T>>,
    fitted_kernel: Option<FittedKernel<T>>,
    classes: Vec<T>,
    n_features: Option<usize>,
}

/// Consecutive passes without an update that count as converged.
const STABLE_PASSES: usize = 5;

impl<T: Float> SVC<T> {
    pub fn new(c: T, kernel: Kernel, max_iter: usize) -> Self {
        SVC {
            c,
            kernel,
            max_iter,
            tol: T::from_f64(1e-3),
            seed: 42,
            machines: Vec::new(),
            fitted_kernel: None,
            classes: Vec::new(),
            n_features: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of support vectors per machine.
    pub fn n_support(&self) -> Vec<usize> {
        self.machines.iter().map(|m| m.support.rows()).collect()
    }

    /// Raw decision values, one column per trained machine.
    pub fn decision_function(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        let (kernel, p) = match (&self.fitted_kernel, self.n_features) {
            (Some(k), Some(p)) => (k, p),
            _ => return Err(MlError::not_fitted("SVC", "decision_function")),
        };
        check_features(p, x)?;
        let mut out = Vec::with_capacity(x.rows() * self.machines.len());
        for row in x.iter_rows() {
            out.extend(self.machines.iter().map(|m| m.decision(kernel, row)));
        }
        Matrix::new(out, x.rows(), self.machines.len())
    }

    fn fit_binary(
        &self,
        x: &Matrix<T>,
        gram: &[T],
        labels: &[T],
        rng: &mut StdRng,
    ) -> BinarySvm<T> {
        let n = labels.len();
        let k = |i: usize, j: usize| gram[i * n + j];
        let mut alphas = vec![T::ZERO; n];
        let mut b = T::ZERO;

        let f = |alphas: &[T], b: T, i: usize| -> T {
            (0..n)
                .filter(|&j| alphas[j] > T::ZERO)
                .map(|j| alphas[j] * labels[j] * k(j, i))
                .sum::<T>()
                + b
        };

        let mut stable = 0;
        let mut iter = 0;
        while stable < STABLE_PASSES && iter < self.max_iter {
            let mut changed = 0;
            for i in 0..n {
                let yi = labels[i];
                let ei = f(&alphas, b, i) - yi;
                if !((yi * ei < -self.tol && alphas[i] < self.c)
                    || (yi * ei > self.tol && alphas[i] > T::ZERO))
                {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let yj = labels[j];
                let ej = f(&alphas, b, j) - yj;
                let (ai_old, aj_old) = (alphas[i], alphas[j]);

                let (lo, hi) = if yi != yj {
                    (T::ZERO.max(aj_old - ai_old), self.c.min(self.c + aj_old - ai_old))
                } else {
                    (T::ZERO.max(ai_old + aj_old - self.c), self.c.min(ai_old + aj_old))
                };
                if (lo - hi).abs() < T::EPSILON {
                    continue;
                }

                let eta = T::TWO * k(i, j) - k(i, i) - k(j, j);
                if eta >= T::ZERO {
                    continue;
                }

                let aj = (aj_old - yj * (ei - ej) / eta).max(lo).min(hi);
                if (aj - aj_old).abs() < T::from_f64(1e-5) {
                    continue;
                }
                let ai = ai_old + yi * yj * (aj_old - aj);
                alphas[i] = ai;
                alphas[j] = aj;

                let b1 = b - ei - yi * (ai - ai_old) * k(i, i) - yj * (aj - aj_old) * k(i, j);
                let b2 = b - ej - yi * (ai - ai_old) * k(i, j) - yj * (aj - aj_old) * k(j, j);
                b = if ai > T::ZERO && ai < self.c {
                    b1
                } else if aj > T::ZERO && aj < self.c {
                    b2
                } else {
                    (b1 + b2) / T::TWO
                };
                changed += 1;
            }
            stable = if changed == 0 { stable + 1 } else { 0 };
            iter += 1;
        }

        if stable < STABLE_PASSES {
            warn!(max_iter = self.max_iter, "SMO did not converge");
        } else {
            debug!(passes = iter, "SMO converged");
        }

        let support_idx: Vec<usize> = (0..n).filter(|&i| alphas[i] > T::EPSILON).collect();
        let support = x
            .select_rows(&support_idx)
            .unwrap_or_else(|_| Matrix::zeros(0, x.cols()));
        BinarySvm {
            support,
            dual_coef: support_idx.iter().map(|&i| alphas[i] * labels[i]).collect(),
            bias: b,
        }
    }
}

impl<T: Float> Default for SVC<T> {
    fn default() -> Self {
        Self::new(T::ONE, Kernel::default(), 200)
    }
}

impl<T: Float> Estimator<T> for SVC<T> {
    fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()> {
        check_fit_input(x, Some(y))?;
        if !(self.c > T::ZERO) {
            return Err(MlError::InvalidParameter(format!("C must be positive, got {}", self.c)));
        }
        let classes = unique_classes(y)?;
        if classes.len() < 2 {
            return Err(MlError::InvalidParameter("SVC needs at least 2 classes".into()));
        }
        let kernel = FittedKernel::resolve(self.kernel, x)?;

        let n = x.rows();
        let mut gram = vec![T::ZERO; n * n];
        for i in 0..n {
            for j in i..n {
                let v = kernel.eval(x.row(i), x.row(j));
                gram[i * n + j] = v;
                gram[j * n + i] = v;
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let positives: Vec<T> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };
        let machines = positives
            .iter()
            .map(|&pos| {
                let labels: Vec<T> = y
                    .iter()
                    .map(|&v| if v == pos { T::ONE } else { -T::ONE })
                    .collect();
                self.fit_binary(x, &gram, &labels, &mut rng)
            })
            .collect();

        self.machines = machines;
        self.fitted_kernel = Some(kernel);
        self.classes = classes;
        self.n_features = Some(x.cols());
        Ok(())
    }

    fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>> {
        let scores = self.decision_function(x)?;
        Ok(scores
            .iter_rows()
            .map(|row| {
                if let [f] = row {
                    if *f >= T::ZERO { self.classes[1] } else { self.classes[0] }
                } else {
                    let mut best = 0;
                    for (k, &s) in row.iter().enumerate() {
                        if s > row[best] {
                            best = k;
                        }
                    }
                    self.classes[best]
                }
            })
            .collect())
    }

    fn classes(&self) -> &[T] {
        &self.classes
    }

    fn n_features_in(&self) -> Option<usize> {
        self.n_features
    }

    fn name(&self) -> &'static str {
        "svc"
    }
}
