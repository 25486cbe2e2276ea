use thiserror::Error;

/// Error type shared by every fitchain component.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MlError {
    #[error("{component} is not fitted: call fit() before {operation}()")]
    NotFitted {
        component: &'static str,
        operation: &'static str,
    },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Row mismatch: feature matrix has {rows} rows but {labels} labels were given")]
    RowMismatch { rows: usize, labels: usize },

    #[error("Feature mismatch: fitted on {expected} columns, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("Invalid pipeline configuration: {0}")]
    Configuration(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },
}

impl MlError {
    pub fn not_fitted(component: &'static str, operation: &'static str) -> Self {
        MlError::NotFitted {
            component,
            operation,
        }
    }

    /// True for every variant that reports a row or column count violation.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            MlError::ShapeMismatch { .. }
                | MlError::RowMismatch { .. }
                | MlError::FeatureMismatch { .. }
        )
    }

    pub fn is_not_fitted(&self) -> bool {
        matches!(self, MlError::NotFitted { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, MlError::Configuration(_))
    }
}

pub type MlResult<T> = Result<T, MlError>;
