//! Experiment files: one dataset, one split, several pipelines compared on it.
//!
//! ```json
//! {
//!   "dataset": { "source": "csv", "path": "iris.csv", "label_column": "species" },
//!   "test_size": 0.3,
//!   "pipelines": [
//!     { "name": "knn", "steps": [ { "kind": "standard_scaler" }, { "kind": "knn" } ] }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use fitchain::data::{Dataset, DatasetSummary};
use fitchain::datasets::{load_iris, make_blobs, make_classification};
use fitchain::io::read_labeled_csv;
use fitchain::metrics::{ClassificationReport, ConfusionMatrix};
use fitchain::pipeline::PipelineConfig;
use fitchain::preprocessing::{train_test_split, train_test_split_stratified, Split};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn default_test_size() -> f64 {
    0.25
}
fn default_seed() -> u64 {
    42
}
fn yes() -> bool {
    true
}
fn default_n_samples() -> usize {
    150
}
fn default_n_features() -> usize {
    2
}
fn default_n_centers() -> usize {
    3
}
fn default_cluster_std() -> f64 {
    1.0
}
fn default_class_sep() -> f64 {
    1.0
}

/// Where the labeled data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DatasetSource {
    Iris,
    Blobs {
        #[serde(default = "default_n_samples")]
        n_samples: usize,
        #[serde(default = "default_n_features")]
        n_features: usize,
        #[serde(default = "default_n_centers")]
        n_centers: usize,
        #[serde(default = "default_cluster_std")]
        cluster_std: f64,
    },
    Classification {
        #[serde(default = "default_n_samples")]
        n_samples: usize,
        #[serde(default = "default_n_features")]
        n_features: usize,
        #[serde(default = "default_class_sep")]
        class_sep: f64,
    },
    /// Relative paths are resolved against the experiment file's directory.
    Csv { path: PathBuf, label_column: String },
}

impl DatasetSource {
    pub fn load(&self, base_dir: &Path, seed: u64) -> Result<Dataset> {
        let dataset = match self {
            DatasetSource::Iris => load_iris()?,
            DatasetSource::Blobs {
                n_samples,
                n_features,
                n_centers,
                cluster_std,
            } => make_blobs(*n_samples, *n_features, *n_centers, *cluster_std, Some(seed))?,
            DatasetSource::Classification {
                n_samples,
                n_features,
                class_sep,
            } => make_classification(*n_samples, *n_features, *class_sep, Some(seed))?,
            DatasetSource::Csv { path, label_column } => {
                let path = if path.is_relative() {
                    base_dir.join(path)
                } else {
                    path.clone()
                };
                read_labeled_csv(&path, label_column)
                    .with_context(|| format!("failed to load {}", path.display()))?
            }
        };
        Ok(dataset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPipeline {
    pub name: String,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub dataset: DatasetSource,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "yes")]
    pub stratify: bool,
    pub pipelines: Vec<NamedPipeline>,
}

impl ExperimentConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: ExperimentConfig =
            serde_json::from_str(text).context("invalid experiment JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.pipelines.is_empty() {
            bail!("experiment lists no pipelines");
        }
        let mut seen = HashSet::new();
        for p in &self.pipelines {
            if !seen.insert(p.name.as_str()) {
                bail!("pipeline name '{}' is used twice", p.name);
            }
        }
        Ok(())
    }
}

/// Outcome of one pipeline on the shared test partition.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub name: String,
    pub steps: Vec<String>,
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResult {
    pub dataset: DatasetSummary,
    pub n_train: usize,
    pub n_test: usize,
    pub results: Vec<PipelineResult>,
}

impl ExperimentResult {
    /// Best test accuracy first; ties keep config order.
    pub fn ranking(&self) -> Vec<&PipelineResult> {
        let mut ranked: Vec<&PipelineResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        ranked
    }
}

/// Per-pipeline reports followed by a comparison table.
impl fmt::Display for ExperimentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "dataset: {} samples x {} features, {} train / {} test",
            self.dataset.n_samples, self.dataset.n_features, self.n_train, self.n_test
        )?;
        for r in &self.results {
            writeln!(f, "\n== {} ({})", r.name, r.steps.join(" -> "))?;
            writeln!(f, "{}", r.report)?;
            writeln!(f, "{}", r.confusion)?;
        }
        let width = self
            .results
            .iter()
            .map(|r| r.name.len())
            .max()
            .unwrap_or(0)
            .max("pipeline".len());
        writeln!(f, "\n{:<width$}  {:>8}  {:>8}", "pipeline", "accuracy", "macro f1")?;
        for r in self.ranking() {
            writeln!(
                f,
                "{:<width$}  {:>8.4}  {:>8.4}",
                r.name, r.accuracy, r.report.macro_avg.f1
            )?;
        }
        Ok(())
    }
}

pub(crate) fn split(config: &ExperimentConfig, dataset: &Dataset) -> Result<Split<f64>> {
    let (x, y) = (dataset.features(), dataset.targets());
    let split = if config.stratify {
        train_test_split_stratified(x, y, config.test_size, Some(config.seed))?
    } else {
        train_test_split(x, y, config.test_size, Some(config.seed))?
    };
    Ok(split)
}

/// Load the dataset, split it once, then fit and score every pipeline on
/// the same partition.
pub fn run(config: &ExperimentConfig, base_dir: &Path) -> Result<ExperimentResult> {
    let dataset = config.dataset.load(base_dir, config.seed)?;
    let summary = dataset.summary()?;
    info!(
        samples = summary.n_samples,
        features = summary.n_features,
        classes = summary.class_counts.len(),
        "dataset loaded"
    );

    let split = split(config, &dataset)?;
    debug!(
        train = split.y_train.len(),
        test = split.y_test.len(),
        stratify = config.stratify,
        "split"
    );

    let mut results = Vec::with_capacity(config.pipelines.len());
    for named in &config.pipelines {
        let mut pipeline = named
            .pipeline
            .build()
            .with_context(|| format!("pipeline '{}'", named.name))?;
        pipeline
            .fit(&split.x_train, &split.y_train)
            .with_context(|| format!("fitting pipeline '{}'", named.name))?;
        let y_pred = pipeline.predict(&split.x_test)?;

        let confusion = ConfusionMatrix::new(&split.y_test, &y_pred)?;
        let names: Vec<String> = confusion
            .labels()
            .iter()
            .map(|&label| dataset.label_name(label))
            .collect();
        let report = ClassificationReport::from_confusion(&confusion).with_target_names(&names)?;
        info!(pipeline = %named.name, accuracy = report.accuracy, "evaluated");

        results.push(PipelineResult {
            name: named.name.clone(),
            steps: pipeline.step_names().into_iter().map(String::from).collect(),
            accuracy: report.accuracy,
            report,
            confusion,
        });
    }

    Ok(ExperimentResult {
        dataset: summary,
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
        results,
    })
}
