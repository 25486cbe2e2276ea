use fitchain_core::traits::{class_index, unique_classes};
use fitchain_core::{Float, MlError, MlResult};
use serde::Serialize;
use std::fmt;

/// Fraction of correct predictions.
pub fn accuracy<T: Float>(y_true: &[T], y_pred: &[T]) -> MlResult<f64> {
    check_lengths(y_true, y_pred)?;
    Ok(fitchain_core::traits::accuracy(y_true, y_pred))
}

fn check_lengths<T: Float>(y_true: &[T], y_pred: &[T]) -> MlResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(MlError::ShapeMismatch {
            expected: vec![y_true.len()],
            got: vec![y_pred.len()],
        });
    }
    if y_true.is_empty() {
        return Err(MlError::EmptyData("no labels to score".into()));
    }
    Ok(())
}

/// Counts of (true label, predicted label) pairs.
///
/// `counts[i][j]` is the number of rows whose true label is `labels[i]` and
/// whose prediction is `labels[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    labels: Vec<f64>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build over the sorted union of labels seen in `y_true` and `y_pred`.
    pub fn new<T: Float>(y_true: &[T], y_pred: &[T]) -> MlResult<Self> {
        check_lengths(y_true, y_pred)?;
        let mut all = y_true.to_vec();
        all.extend_from_slice(y_pred);
        let labels = unique_classes(&all)?;
        Self::with_labels(y_true, y_pred, &labels)
    }

    /// Build over a fixed label order. Pairs involving a label outside
    /// `labels` are not counted.
    pub fn with_labels<T: Float>(y_true: &[T], y_pred: &[T], labels: &[T]) -> MlResult<Self> {
        check_lengths(y_true, y_pred)?;
        let k = labels.len();
        let mut counts = vec![vec![0usize; k]; k];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if let (Some(i), Some(j)) = (class_index(labels, t), class_index(labels, p)) {
                counts[i][j] += 1;
            }
        }
        Ok(ConfusionMatrix {
            labels: labels.iter().map(|v| v.to_f64()).collect(),
            counts,
        })
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn true_positives(&self, k: usize) -> usize {
        self.counts[k][k]
    }

    /// Rows predicted as class `k` that belong elsewhere.
    pub fn false_positives(&self, k: usize) -> usize {
        (0..self.n_classes())
            .filter(|&i| i != k)
            .map(|i| self.counts[i][k])
            .sum()
    }

    /// Rows of class `k` predicted as something else.
    pub fn false_negatives(&self, k: usize) -> usize {
        self.support(k) - self.true_positives(k)
    }

    /// Number of rows whose true label is class `k`.
    pub fn support(&self, k: usize) -> usize {
        self.counts[k].iter().sum()
    }

    pub fn precision(&self, k: usize) -> f64 {
        ratio(self.true_positives(k), self.true_positives(k) + self.false_positives(k))
    }

    pub fn recall(&self, k: usize) -> f64 {
        ratio(self.true_positives(k), self.support(k))
    }

    /// Harmonic mean of precision and recall, 0.0 when both are 0.
    pub fn f1(&self, k: usize) -> f64 {
        let (p, r) = (self.precision(k), self.recall(k));
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes()).map(|k| self.true_positives(k)).sum();
        ratio(correct, self.total())
    }
}

/// `num / den`, 0.0 for an empty denominator.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.labels.iter().map(|l| l.to_string()).collect();
        let count_width = self
            .counts
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);
        let width = names
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(1)
            .max(count_width)
            + 2;

        write!(f, "{:>w$}", "true\\pred", w = width.max(9))?;
        for name in &names {
            write!(f, "{:>width$}", name)?;
        }
        writeln!(f)?;
        for (name, row) in names.iter().zip(&self.counts) {
            write!(f, "{:>w$}", name, w = width.max(9))?;
            for c in row {
                write!(f, "{:>width$}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
