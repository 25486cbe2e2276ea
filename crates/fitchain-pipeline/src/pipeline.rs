use fitchain_core::traits::{accuracy, check_rows};
use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult, Transformer};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use crate::step::{Step, StepRef};

/// A machine learning pipeline: named transformers followed by one named
/// estimator.
///
/// `fit` fits each transformer on the output of the previous one and then
/// the estimator on the final features. `predict` only calls `transform`, so
/// every parameter learned during `fit` is reused unchanged.
pub struct Pipeline<T: Float> {
    transformers: Vec<(String, Box<dyn Transformer<T>>)>,
    estimator: (String, Box<dyn Estimator<T>>),
    fitted: bool,
}

impl<T: Float> Pipeline<T> {
    /// Validate and assemble the steps in execution order.
    ///
    /// # Errors
    /// [`MlError::Configuration`] when the list is empty, a step name is
    /// empty or repeated, a non-final step is an estimator, or the final step
    /// is a transformer.
    pub fn new(steps: Vec<(String, Step<T>)>) -> MlResult<Self> {
        let n = steps.len();
        if n == 0 {
            return Err(MlError::Configuration("a pipeline needs at least one step".into()));
        }

        let mut seen = HashSet::new();
        for (name, _) in &steps {
            if name.trim().is_empty() {
                return Err(MlError::Configuration("step names must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(MlError::Configuration(format!("duplicate step name '{}'", name)));
            }
        }

        let mut transformers = Vec::with_capacity(n - 1);
        let mut estimator = None;
        for (i, (name, step)) in steps.into_iter().enumerate() {
            let last = i == n - 1;
            match (step, last) {
                (Step::Transform(t), false) => transformers.push((name, t)),
                (Step::Estimate(e), true) => estimator = Some((name, e)),
                (Step::Estimate(_), false) => {
                    return Err(MlError::Configuration(format!(
                        "step '{}' at position {} is an estimator; only the final step may be",
                        name, i
                    )))
                }
                (Step::Transform(_), true) => {
                    return Err(MlError::Configuration(format!(
                        "final step '{}' is a transformer; a pipeline must end with an estimator",
                        name
                    )))
                }
            }
        }
        let estimator = estimator
            .ok_or_else(|| MlError::Configuration("pipeline has no final estimator".into()))?;

        Ok(Pipeline {
            transformers,
            estimator,
            fitted: false,
        })
    }

    /// Fit every step on training data.
    ///
    /// Row counts of `x` and `y` are checked before any step runs. If a step
    /// fails the pipeline is left unfitted.
    pub fn fit(&mut self, x: &Matrix<T>, y: &[T]) -> MlResult<()> {
        check_rows(x, y)?;
        self.fitted = false;

        let mut owned: Option<Matrix<T>> = None;
        for (name, t) in self.transformers.iter_mut() {
            let input = owned.as_ref().unwrap_or(x);
            debug!(step = %name, rows = input.rows(), cols = input.cols(), "fitting transformer");
            let out = t.fit_transform(input)?;
            owned = Some(out);
        }

        let features = owned.as_ref().unwrap_or(x);
        let (name, est) = &mut self.estimator;
        debug!(
            step = %name,
            rows = features.rows(),
            cols = features.cols(),
            "fitting estimator"
        );
        est.fit(features, y)?;

        self.fitted = true;
        info!(steps = self.len(), rows = x.rows(), "pipeline fitted");
        Ok(())
    }

    /// Run only the transformer prefix, e.g. to inspect projected features.
    pub fn transform(&self, x: &Matrix<T>) -> MlResult<Matrix<T>> {
        self.ensure_fitted("transform")?;
        let mut current = x.clone();
        for (name, t) in &self.transformers {
            debug!(step = %name, rows = current.rows(), cols = current.cols(), "transforming");
            current = t.transform(&current)?;
        }
        Ok(current)
    }

    /// Transform with the fitted transformers, then predict.
    pub fn predict(&self, x: &Matrix<T>) -> MlResult<Vec<T>> {
        let features = self.transform(x)?;
        let (name, est) = &self.estimator;
        debug!(step = %name, rows = features.rows(), "predicting");
        est.predict(&features)
    }

    /// Accuracy of `predict(x)` against `y`.
    pub fn score(&self, x: &Matrix<T>, y: &[T]) -> MlResult<f64> {
        check_rows(x, y)?;
        let pred = self.predict(x)?;
        Ok(accuracy(y, &pred))
    }

    /// Labels the final estimator learned during `fit`.
    pub fn classes(&self) -> &[T] {
        self.estimator.1.classes()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.transformers
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(std::iter::once(self.estimator.0.as_str()))
            .collect()
    }

    /// Read-only access to a step by name.
    pub fn named_step(&self, name: &str) -> Option<StepRef<'_, T>> {
        if self.estimator.0 == name {
            return Some(StepRef::Estimate(self.estimator.1.as_ref()));
        }
        self.transformers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| StepRef::Transform(t.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.transformers.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn ensure_fitted(&self, operation: &'static str) -> MlResult<()> {
        if self.fitted {
            Ok(())
        } else {
            Err(MlError::not_fitted("Pipeline", operation))
        }
    }
}

impl<T: Float> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .field("fitted", &self.fitted)
            .finish()
    }
}

impl<T: Float> fmt::Display for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step_names().join(" -> "))
    }
}

/// Build a pipeline naming each step after its component.
///
/// Repeated names get `-2`, `-3`, ... suffixes in order of appearance.
pub fn make_pipeline<T: Float>(steps: Vec<Step<T>>) -> MlResult<Pipeline<T>> {
    let mut taken: HashSet<String> = HashSet::new();
    let named = steps
        .into_iter()
        .map(|step| {
            let name = unique_name(step.name(), &mut taken);
            (name, step)
        })
        .collect();
    Pipeline::new(named)
}

/// First of `base`, `base-2`, `base-3`, ... not already in `taken`.
pub(crate) fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut k = 2;
    while taken.contains(&name) {
        name = format!("{}-{}", base, k);
        k += 1;
    }
    taken.insert(name.clone());
    name
}
