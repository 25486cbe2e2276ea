//! Built-in walkthrough on Iris: standardize, project onto two
//! principal components, then compare the classifiers on the same split.

use anyhow::Result;
use fitchain::core::Transformer;
use fitchain::preprocessing::{StandardScaler, PCA};
use std::path::Path;

use crate::experiment::{self, ExperimentConfig};

const DEMO: &str = r#"{
    "dataset": { "source": "iris" },
    "test_size": 0.3,
    "pipelines": [
        { "name": "logistic_regression", "steps": [
            { "kind": "standard_scaler" },
            { "kind": "pca", "n_components": 2 },
            { "kind": "logistic_regression" }
        ] },
        { "name": "knn", "steps": [
            { "kind": "standard_scaler" },
            { "kind": "pca", "n_components": 2 },
            { "kind": "knn", "k": 3 }
        ] },
        { "name": "svc", "steps": [
            { "kind": "standard_scaler" },
            { "kind": "pca", "n_components": 2 },
            { "kind": "svc", "kernel": { "type": "rbf" } }
        ] },
        { "name": "random_forest", "steps": [
            { "kind": "standard_scaler" },
            { "kind": "pca", "n_components": 2 },
            { "kind": "random_forest", "n_estimators": 50 }
        ] }
    ]
}"#;

pub fn config() -> Result<ExperimentConfig> {
    ExperimentConfig::from_json(DEMO)
}

/// Explained-variance ratio of each kept component, fit on the standardized
/// training partition the pipelines see.
pub fn explained_variance(config: &ExperimentConfig, n_components: usize) -> Result<Vec<f64>> {
    let dataset = config.dataset.load(Path::new("."), config.seed)?;
    let split = experiment::split(config, &dataset)?;
    let mut scaler = StandardScaler::<f64>::new();
    let mut pca = PCA::<f64>::new(n_components);
    pca.fit(&scaler.fit_transform(&split.x_train)?)?;
    Ok(pca.explained_variance_ratio().unwrap_or_default())
}

pub fn render() -> Result<String> {
    let config = config()?;
    let ratios = explained_variance(&config, 2)?;
    let result = experiment::run(&config, Path::new("."))?;

    let mut out = String::from("explained variance ratio:");
    for (i, r) in ratios.iter().enumerate() {
        out.push_str(&format!(" PC{}={:.3}", i + 1, r));
    }
    out.push_str(&format!(" (total {:.3})\n\n", ratios.iter().sum::<f64>()));
    out.push_str(&result.to_string());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::DatasetSource;

    #[test]
    fn test_demo_config() {
        let cfg = config().unwrap();
        assert_eq!(cfg.dataset, DatasetSource::Iris);
        assert_eq!(cfg.pipelines.len(), 4);
        for p in &cfg.pipelines {
            assert_eq!(p.pipeline.steps.len(), 3);
        }
    }

    #[test]
    fn test_explained_variance() {
        let ratios = explained_variance(&config().unwrap(), 2).unwrap();
        assert_eq!(ratios.len(), 2);
        assert!(ratios[0] >= ratios[1]);
        let total: f64 = ratios.iter().sum();
        assert!(total > 0.5 && total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_render_mentions_every_classifier() {
        let text = render().unwrap();
        for name in ["logistic_regression", "knn", "svc", "random_forest"] {
            assert!(text.contains(name), "missing {}", name);
        }
        assert!(text.contains("PC1="));
    }
}
