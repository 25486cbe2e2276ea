use fitchain_core::traits::unique_classes;
use fitchain_core::{Matrix, MlError, MlResult};
use serde::Serialize;

/// A feature matrix aligned with one label per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Matrix<f64>,
    targets: Vec<f64>,
    feature_names: Vec<String>,
    class_names: Option<Vec<String>>,
    // label set the names were attached against; survives `subset`
    named_classes: Vec<f64>,
}

/// Shape and class balance of a dataset, for logs and reports.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub n_samples: usize,
    pub n_features: usize,
    pub class_counts: Vec<(String, usize)>,
}

impl Dataset {
    /// Build a dataset, checking that rows, labels and names line up.
    ///
    /// Pass an empty `feature_names` to get `x0, x1, ...`.
    pub fn new(
        features: Matrix<f64>,
        targets: Vec<f64>,
        feature_names: Vec<String>,
    ) -> MlResult<Self> {
        if features.rows() != targets.len() {
            return Err(MlError::RowMismatch {
                rows: features.rows(),
                labels: targets.len(),
            });
        }
        let feature_names = if feature_names.is_empty() {
            (0..features.cols()).map(|j| format!("x{}", j)).collect()
        } else {
            feature_names
        };
        if feature_names.len() != features.cols() {
            return Err(MlError::ShapeMismatch {
                expected: vec![features.cols()],
                got: vec![feature_names.len()],
            });
        }
        Ok(Dataset {
            features,
            targets,
            feature_names,
            class_names: None,
            named_classes: Vec::new(),
        })
    }

    /// Attach human-readable class names; class `k` of the sorted label set
    /// gets `names[k]`.
    pub fn with_class_names(mut self, names: Vec<String>) -> MlResult<Self> {
        let classes = self.classes()?;
        let n_classes = classes.len();
        if names.len() < n_classes {
            return Err(MlError::InvalidParameter(format!(
                "{} class names given for {} classes",
                names.len(),
                n_classes
            )));
        }
        self.class_names = Some(names);
        self.named_classes = classes;
        Ok(self)
    }

    pub fn features(&self) -> &Matrix<f64> {
        &self.features
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn class_names(&self) -> Option<&[String]> {
        self.class_names.as_deref()
    }

    pub fn n_samples(&self) -> usize {
        self.features.rows()
    }

    pub fn n_features(&self) -> usize {
        self.features.cols()
    }

    pub fn classes(&self) -> MlResult<Vec<f64>> {
        unique_classes(&self.targets)
    }

    /// Display name for a label: the attached class name when there is one,
    /// otherwise the label value itself.
    pub fn label_name(&self, label: f64) -> String {
        if let Some(names) = &self.class_names {
            if let Some(k) = self.named_classes.iter().position(|&c| c == label) {
                if let Some(name) = names.get(k) {
                    return name.clone();
                }
            }
        }
        format!("{}", label)
    }

    /// Rows selected by index, keeping names.
    pub fn subset(&self, indices: &[usize]) -> MlResult<Dataset> {
        let features = self.features.select_rows(indices)?;
        let targets = indices.iter().map(|&i| self.targets[i]).collect();
        Ok(Dataset {
            features,
            targets,
            feature_names: self.feature_names.clone(),
            class_names: self.class_names.clone(),
            named_classes: self.named_classes.clone(),
        })
    }

    pub fn into_parts(self) -> (Matrix<f64>, Vec<f64>) {
        (self.features, self.targets)
    }

    pub fn summary(&self) -> MlResult<DatasetSummary> {
        let classes = self.classes()?;
        let class_counts = classes
            .iter()
            .map(|&c| {
                let count = self.targets.iter().filter(|&&t| t == c).count();
                (self.label_name(c), count)
            })
            .collect();
        Ok(DatasetSummary {
            n_samples: self.n_samples(),
            n_features: self.n_features(),
            class_counts,
        })
    }
}
