use fitchain_core::{Float, MlError, MlResult};
use std::collections::HashMap;

/// Encode categorical string labels as class indices `0..n_classes`.
///
/// Classes are sorted, so the encoding does not depend on row order.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    classes: Vec<String>,
    class_to_idx: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) {
        let mut unique: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        unique.sort();
        unique.dedup();
        self.class_to_idx = unique
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        self.classes = unique;
    }

    pub fn transform<T: Float, S: AsRef<str>>(&self, labels: &[S]) -> MlResult<Vec<T>> {
        if self.classes.is_empty() {
            return Err(MlError::not_fitted("LabelEncoder", "transform"));
        }
        labels
            .iter()
            .map(|l| {
                self.class_to_idx
                    .get(l.as_ref())
                    .map(|&i| T::from_usize(i))
                    .ok_or_else(|| {
                        MlError::InvalidParameter(format!("unknown label {:?}", l.as_ref()))
                    })
            })
            .collect()
    }

    pub fn fit_transform<T: Float, S: AsRef<str>>(&mut self, labels: &[S]) -> MlResult<Vec<T>> {
        self.fit(labels);
        self.transform(labels)
    }

    /// Map class indices back to their strings.
    pub fn inverse_transform<T: Float>(&self, encoded: &[T]) -> MlResult<Vec<String>> {
        encoded
            .iter()
            .map(|v| {
                let f = v.to_f64();
                let idx = f.round() as usize;
                if f < 0.0 || idx >= self.classes.len() {
                    return Err(MlError::InvalidParameter(format!("no class for code {}", f)));
                }
                Ok(self.classes[idx].clone())
            })
            .collect()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}
