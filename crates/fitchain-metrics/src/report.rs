use fitchain_core::{Float, MlError, MlResult};
use serde::Serialize;
use std::fmt;

use crate::classification::ConfusionMatrix;

/// Precision, recall, F1 and support of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged scores over every class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1/support plus accuracy and the macro and
/// support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: AverageScores,
    pub weighted_avg: AverageScores,
}

impl ClassificationReport {
    pub fn new<T: Float>(y_true: &[T], y_pred: &[T]) -> MlResult<Self> {
        Ok(Self::from_confusion(&ConfusionMatrix::new(y_true, y_pred)?))
    }

    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassScores> = cm
            .labels()
            .iter()
            .enumerate()
            .map(|(k, label)| ClassScores {
                label: label.to_string(),
                precision: cm.precision(k),
                recall: cm.recall(k),
                f1: cm.f1(k),
                support: cm.support(k),
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let k = classes.len().max(1) as f64;
        let macro_avg = AverageScores {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
            support: total,
        };
        let weighted = |score: fn(&ClassScores) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| score(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageScores {
            precision: weighted(|c: &ClassScores| c.precision),
            recall: weighted(|c: &ClassScores| c.recall),
            f1: weighted(|c: &ClassScores| c.f1),
            support: total,
        };

        ClassificationReport {
            accuracy: cm.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    /// Replace the numeric labels with display names, in class order.
    pub fn with_target_names<S: AsRef<str>>(mut self, names: &[S]) -> MlResult<Self> {
        if names.len() != self.classes.len() {
            return Err(MlError::InvalidParameter(format!(
                "{} target names given for {} classes",
                names.len(),
                self.classes.len()
            )));
        }
        for (class, name) in self.classes.iter_mut().zip(names) {
            class.label = name.as_ref().to_string();
        }
        Ok(self)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}
