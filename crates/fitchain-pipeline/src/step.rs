use fitchain_core::{Estimator, Float, Transformer};
use std::fmt;

/// One pipeline stage, tagged by capability.
///
/// Every stage but the last must be `Transform`; the last must be
/// `Estimate`. [`crate::Pipeline::new`] enforces this before any data is
/// seen.
pub enum Step<T: Float> {
    Transform(Box<dyn Transformer<T>>),
    Estimate(Box<dyn Estimator<T>>),
}

impl<T: Float> Step<T> {
    pub fn transformer(t: impl Transformer<T> + 'static) -> Self {
        Step::Transform(Box::new(t))
    }

    pub fn estimator(e: impl Estimator<T> + 'static) -> Self {
        Step::Estimate(Box::new(e))
    }

    /// Component's default name, e.g. `"standard_scaler"`.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Transform(t) => t.name(),
            Step::Estimate(e) => e.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Step::Transform(_) => "transformer",
            Step::Estimate(_) => "estimator",
        }
    }
}

impl<T: Float> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.name())
    }
}

/// Borrowed view of a step inside a pipeline.
#[derive(Clone, Copy)]
pub enum StepRef<'a, T: Float> {
    Transform(&'a dyn Transformer<T>),
    Estimate(&'a dyn Estimator<T>),
}

impl<'a, T: Float> StepRef<'a, T> {
    pub fn name(&self) -> &'static str {
        match self {
            StepRef::Transform(t) => t.name(),
            StepRef::Estimate(e) => e.name(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        match self {
            StepRef::Transform(t) => t.is_fitted(),
            StepRef::Estimate(e) => e.is_fitted(),
        }
    }

    pub fn n_features_in(&self) -> Option<usize> {
        match self {
            StepRef::Transform(t) => t.n_features_in(),
            StepRef::Estimate(e) => e.n_features_in(),
        }
    }

    pub fn as_transformer(&self) -> Option<&'a dyn Transformer<T>> {
        match *self {
            StepRef::Transform(t) => Some(t),
            StepRef::Estimate(_) => None,
        }
    }

    pub fn as_estimator(&self) -> Option<&'a dyn Estimator<T>> {
        match *self {
            StepRef::Estimate(e) => Some(e),
            StepRef::Transform(_) => None,
        }
    }
}
