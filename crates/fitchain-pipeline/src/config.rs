//! JSON description of a pipeline.
//!
//! ```json
//! { "steps": [
//!     { "kind": "standard_scaler" },
//!     { "kind": "pca", "n_components": 2 },
//!     { "kind": "knn", "name": "vote", "k": 5, "metric": "manhattan" }
//! ] }
//! ```
//!
//! Omitted hyperparameters take the component defaults. Steps without a
//! `name` are named after their kind, with `-2`, `-3`, ... on repeats.

use fitchain_core::{MlError, MlResult};
use fitchain_linear::LogisticRegression;
use fitchain_neighbors::{DistanceMetric, KNNClassifier};
use fitchain_preprocessing::{MinMaxScaler, StandardScaler, PCA};
use fitchain_svm::{Kernel, SVC};
use fitchain_tree::{DecisionTreeClassifier, RandomForestClassifier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::pipeline::{unique_name, Pipeline};
use crate::step::Step;

fn yes() -> bool {
    true
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_lr_iter() -> usize {
    1000
}
fn default_lr_tol() -> f64 {
    1e-6
}
fn default_k() -> usize {
    5
}
fn default_c() -> f64 {
    1.0
}
fn default_svc_iter() -> usize {
    200
}
fn default_svc_tol() -> f64 {
    1e-3
}
fn default_seed() -> u64 {
    42
}
fn default_forest_seed() -> Option<u64> {
    Some(42)
}
fn default_min_split() -> usize {
    2
}
fn default_min_leaf() -> usize {
    1
}
fn default_n_estimators() -> usize {
    100
}

/// Component and hyperparameters of one step, tagged by `"kind"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    StandardScaler {
        #[serde(default = "yes")]
        with_mean: bool,
        #[serde(default = "yes")]
        with_std: bool,
    },
    MinMaxScaler,
    Pca {
        n_components: usize,
    },
    LogisticRegression {
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        #[serde(default = "default_lr_iter")]
        max_iter: usize,
        #[serde(default = "default_lr_tol")]
        tol: f64,
        #[serde(default)]
        alpha: f64,
    },
    Knn {
        #[serde(default = "default_k")]
        k: usize,
        #[serde(default)]
        metric: DistanceMetric,
    },
    Svc {
        #[serde(default = "default_c")]
        c: f64,
        #[serde(default)]
        kernel: Kernel,
        #[serde(default = "default_svc_iter")]
        max_iter: usize,
        #[serde(default = "default_svc_tol")]
        tol: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
    DecisionTree {
        #[serde(default)]
        max_depth: Option<usize>,
        #[serde(default = "default_min_split")]
        min_samples_split: usize,
        #[serde(default = "default_min_leaf")]
        min_samples_leaf: usize,
    },
    RandomForest {
        #[serde(default = "default_n_estimators")]
        n_estimators: usize,
        #[serde(default)]
        max_depth: Option<usize>,
        #[serde(default)]
        max_features_ratio: Option<f64>,
        #[serde(default = "default_forest_seed")]
        seed: Option<u64>,
    },
}

impl StepKind {
    /// Instantiate the unfitted component.
    pub fn build(&self) -> MlResult<Step<f64>> {
        Ok(match self.clone() {
            StepKind::StandardScaler {
                with_mean,
                with_std,
            } => Step::transformer(
                StandardScaler::new()
                    .with_mean(with_mean)
                    .with_std(with_std),
            ),
            StepKind::MinMaxScaler => Step::transformer(MinMaxScaler::new()),
            StepKind::Pca { n_components } => {
                if n_components == 0 {
                    return Err(MlError::Configuration(
                        "pca.n_components must be at least 1".into(),
                    ));
                }
                Step::transformer(PCA::new(n_components))
            }
            StepKind::LogisticRegression {
                learning_rate,
                max_iter,
                tol,
                alpha,
            } => Step::estimator(
                LogisticRegression::new(learning_rate, max_iter)
                    .with_tol(tol)
                    .with_alpha(alpha),
            ),
            StepKind::Knn { k, metric } => Step::estimator(KNNClassifier::new(k, metric)),
            StepKind::Svc {
                c,
                kernel,
                max_iter,
                tol,
                seed,
            } => {
                let mut svc = SVC::new(c, kernel, max_iter).with_seed(seed);
                svc.tol = tol;
                Step::estimator(svc)
            }
            StepKind::DecisionTree {
                max_depth,
                min_samples_split,
                min_samples_leaf,
            } => Step::estimator(DecisionTreeClassifier::new(
                max_depth,
                min_samples_split,
                min_samples_leaf,
            )),
            StepKind::RandomForest {
                n_estimators,
                max_depth,
                max_features_ratio,
                seed,
            } => {
                let mut rf = RandomForestClassifier::new(n_estimators, max_depth).with_seed(seed);
                rf.max_features_ratio = max_features_ratio;
                Step::estimator(rf)
            }
        })
    }
}

/// One entry of `steps`: optional explicit name plus the component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub steps: Vec<StepConfig>,
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> MlResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| MlError::Configuration(format!("invalid pipeline JSON: {}", e)))
    }

    pub fn to_json(&self) -> MlResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MlError::Configuration(format!("cannot serialize pipeline: {}", e)))
    }

    /// Instantiate every step and validate the resulting order.
    pub fn build(&self) -> MlResult<Pipeline<f64>> {
        // generated names must not collide with explicit ones, wherever they appear
        let mut taken: HashSet<String> = self.steps.iter().filter_map(|s| s.name.clone()).collect();
        let mut steps = Vec::with_capacity(self.steps.len());
        for cfg in &self.steps {
            let step = cfg.kind.build()?;
            let name = match &cfg.name {
                Some(n) => n.clone(),
                None => unique_name(step.name(), &mut taken),
            };
            steps.push((name, step));
        }
        Pipeline::new(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::make_pipeline;
    use fitchain_datasets::load_iris;

    const JSON: &str = r#"{
        "steps": [
            { "kind": "standard_scaler" },
            { "kind": "pca", "n_components": 2 },
            { "kind": "knn", "k": 3, "metric": "manhattan" }
        ]
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let cfg = PipelineConfig::from_json(JSON).unwrap();
        assert_eq!(cfg.steps.len(), 3);
        assert_eq!(
            cfg.steps[0].kind,
            StepKind::StandardScaler {
                with_mean: true,
                with_std: true
            }
        );
        assert_eq!(
            cfg.steps[2].kind,
            StepKind::Knn {
                k: 3,
                metric: DistanceMetric::Manhattan
            }
        );
    }

    #[test]
    fn test_same_shape_as_code() {
        let from_json = PipelineConfig::from_json(JSON).unwrap().build().unwrap();
        let from_code = make_pipeline::<f64>(vec![
            Step::transformer(StandardScaler::new()),
            Step::transformer(PCA::new(2)),
            Step::estimator(KNNClassifier::new(3, DistanceMetric::Manhattan)),
        ])
        .unwrap();
        assert_eq!(from_json.step_names(), from_code.step_names());
    }

    #[test]
    fn test_built_pipeline_fits() {
        let (x, y) = load_iris().unwrap().into_parts();
        let mut pipe = PipelineConfig::from_json(JSON).unwrap().build().unwrap();
        pipe.fit(&x, &y).unwrap();
        assert!(pipe.score(&x, &y).unwrap() > 0.8);
    }

    #[test]
    fn test_explicit_and_generated_names() {
        let cfg = PipelineConfig::from_json(
            r#"{"steps": [
                {"kind": "min_max_scaler", "name": "min_max_scaler"},
                {"kind": "min_max_scaler"},
                {"kind": "svc", "name": "clf", "kernel": {"type": "linear"}}
            ]}"#,
        )
        .unwrap();
        let pipe = cfg.build().unwrap();
        assert_eq!(pipe.step_names(), vec!["min_max_scaler", "min_max_scaler-2", "clf"]);
    }

    #[test]
    fn test_invalid_configs() {
        let bad_kind = PipelineConfig::from_json(r#"{"steps": [{"kind": "neural_net"}]}"#);
        assert!(bad_kind.unwrap_err().is_configuration());

        let no_estimator = PipelineConfig::from_json(r#"{"steps": [{"kind": "standard_scaler"}]}"#)
            .unwrap()
            .build();
        assert!(no_estimator.unwrap_err().is_configuration());

        let empty = PipelineConfig::from_json(r#"{"steps": []}"#).unwrap().build();
        assert!(empty.unwrap_err().is_configuration());

        let zero_pca = PipelineConfig::from_json(
            r#"{"steps": [{"kind": "pca", "n_components": 0}, {"kind": "knn"}]}"#,
        )
        .unwrap()
        .build();
        assert!(zero_pca.unwrap_err().is_configuration());
    }

    #[test]
    fn test_round_trips_through_json() {
        let cfg = PipelineConfig::from_json(JSON).unwrap();
        let again = PipelineConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(cfg, again);
    }
}
