use fitchain_core::traits::{check_features, check_fit_input, unique_classes};
use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult};
use tracing::{debug, warn};

/// Weights and intercept of one binary sigmoid model.
#[derive(Debug, Clone)]
struct BinaryModel<T: Float> {
    weights: Vec<T>,
    bias: T,
}

impl<T: Float> BinaryModel<T> {
    fn decision(&self, row: &[T]) -> T {
        self.bias
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(&w, &v)| w * v)
                .sum::<T>()
    }
}

fn sigmoid<T: Float>(z: T) -> T {
    T::ONE / (T::ONE + (-z).exp())
}

/// Logistic regression trained by batch gradient descent.
///
/// Two classes train a single sigmoid model; more classes train one
/// model per class (one-vs-rest) and normalize their scores. `alpha` is the
/// L2 penalty on the weights (the intercept is not penalized).
#[derive(Debug, Clone)]
pub struct LogisticRegression<T: Float> {
    pub learning_rate: T,
    pub max_iter: usize,
    pub tol: T,
    pub alpha: T,
    models: Vec<BinaryModel<T>>,
    classes: Vec<T>,
    n_features: Option<usize>,
}

impl<T: Float> LogisticRegression<T> {
    pub fn new(learning_rate: T, max_iter: usize) -> Self {
        LogisticRegression {
            learning_rate,
            max_iter,
            tol: T::from_f64(1e-6),
            alpha: T::ZERO,
            models: Vec::new(),
            classes: Vec::new(),
            n_features: None,
        }
    }

    pub fn with_alpha(mut self, alpha: T) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_tol(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }

    fn validate(&self) -> MlResult<()> {
        if !(self.learning_rate > T::ZERO) {
            return Err(MlError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_iter == 0 {
            return Err(MlError::InvalidParameter("max_iter must be at least 1".into()));
        }
        if self.alpha < T::ZERO {
            return Err(MlError::InvalidParameter(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    /// Fit one sigmoid model against 0/1 targets.
    fn fit_binary(&self, x: &Matrix<T>, target: &[T]) -> BinaryModel<T> {
        let (n, p) = x.shape();
        let n_t = T::from_usize(n);
        let mut model = BinaryModel {
            weights: vec![T::ZERO; p],
            bias: T::ZERO,
        };

        for iter in 0..self.max_iter {
            let mut dw = vec![T::ZERO; p];
            let mut db = T::ZERO;
            for (row, &yi) in x.iter_rows().zip(target) {
                let error = sigmoid(model.decision(row)) - yi;
                for (d, &v) in dw.iter_mut().zip(row) {
                    *d += error * v;
                }
                db += error;
            }

            let mut max_grad = T::ZERO;
            for (w, d) in model.weights.iter_mut().zip(&dw) {
                let grad = *d / n_t + self.alpha * *w;
                *w -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }
            let grad_b = db / n_t;
            model.bias -= self.learning_rate * grad_b;
            max_grad = max_grad.max(grad_b.abs());

            if max_grad < self.tol {
                debug!(iterations = iter + 1, "logistic regression converged");
                return model;
            }
        }
        model
    }

    fn fitted(&self, operation: &'static str, x: &Matrix<T>) -> MlResult<()> {
        match self.n_features {
            Some(p) => check_features(p, x),
            None => Err(MlError::not_fitted("LogisticRegression", operation)),
        }
    }

    /// Class membership probabilities, one column per entry of `classes()`.
    pub fn predict_proba(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        self.fitted("predict_proba", x)?;
        let k = self.classes.len();
        let mut out = Vec::with_capacity(x.rows() * k);
        for row in x.iter_rows() {
            if let [model] = self.models.as_slice() {
                let p = sigmoid(model.decision(row));
                out.push(T::ONE - p);
                out.push(p);
            } else {
                let scores: Vec<T> = self
                    .models
                    .iter()
                    .map(|m| sigmoid(m.decision(row)))
                    .collect();
                let total: T = scores.iter().copied().sum();
                for s in scores {
                    out.push(if total > T::ZERO { s / total } else { T::ONE / T::from_usize(k) });
                }
            }
        }
        Matrix::new(out, x.rows(), k)
    }
}

impl<T: Float> Default for LogisticRegression<T> {
    fn default() -> Self {
        Self::new(T::from_f64(0.1), 1000)
    }
}

impl<T: Float> Estimator<T> for LogisticRegression<T> {
    fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()> {
        check_fit_input(x, Some(y))?;
        self.validate()?;
        let classes = unique_classes(y)?;
        if classes.len() < 2 {
            return Err(MlError::InvalidParameter(
                "logistic regression needs at least 2 classes".into(),
            ));
        }

        let binary_target = |class: T| -> Vec<T> {
            y.iter()
                .map(|&v| if v == class { T::ONE } else { T::ZERO })
                .collect()
        };
        let models: Vec<BinaryModel<T>> = if classes.len() == 2 {
            vec![self.fit_binary(x, &binary_target(classes[1]))]
        } else {
            classes
                .iter()
                .map(|&c| self.fit_binary(x, &binary_target(c)))
                .collect()
        };
        if models
            .iter()
            .any(|m| m.weights.iter().any(|w| !w.is_finite()) || !m.bias.is_finite())
        {
            warn!("logistic regression diverged; lower the learning rate");
            return Err(MlError::InvalidParameter(
                "gradient descent diverged to non-finite weights".into(),
            ));
        }

        self.models = models;
        self.classes = classes;
        self.n_features = Some(x.cols());
        Ok(())
    }

    fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .iter_rows()
            .map(|row| {
                let mut best = 0;
                for (k, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
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
        "logistic_regression"
    }
}
