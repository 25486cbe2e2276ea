//! # fitchain
//!
//! Composable fit/transform pipelines for classical machine learning.
//!
//! ## Modules
//!
//! - **core** : `Matrix`, the `Transformer`/`Estimator` contracts, `MlError`
//! - **data** : `Dataset`: features, labels and names kept together
//! - **preprocessing** : StandardScaler, MinMaxScaler, LabelEncoder, PCA, train/test split
//! - **linear** : Logistic regression (one-vs-rest)
//! - **neighbors** : KNN classifier with Euclidean/Manhattan distance
//! - **svm** : SVC with linear, RBF and polynomial kernels
//! - **tree** : Decision tree (CART) and random forest
//! - **metrics** : accuracy, confusion matrix, classification report
//! - **datasets** : Iris, make_blobs, make_classification
//! - **io** : labeled CSV loading
//! - **pipeline** : `Pipeline`, `make_pipeline`, JSON pipeline configs

/// Matrix type, component contracts and errors.
pub use fitchain_core as core;

/// Labeled datasets.
pub use fitchain_data as data;

/// Data preprocessing.
pub use fitchain_preprocessing as preprocessing;

/// Linear models.
pub use fitchain_linear as linear;

/// Nearest neighbors.
pub use fitchain_neighbors as neighbors;

/// Support vector machines.
pub use fitchain_svm as svm;

/// Tree-based models.
pub use fitchain_tree as tree;

/// Evaluation metrics.
pub use fitchain_metrics as metrics;

/// Built-in datasets.
pub use fitchain_datasets as datasets;

/// CSV loading.
pub use fitchain_io as io;

/// Pipeline API.
pub use fitchain_pipeline as pipeline;

/// The names a typical experiment needs.
pub mod prelude {
    pub use fitchain_core::{Estimator, Float, Matrix, MlError, MlResult, Transformer};
    pub use fitchain_data::Dataset;
    pub use fitchain_datasets::{load_iris, make_blobs, make_classification};
    pub use fitchain_linear::LogisticRegression;
    pub use fitchain_metrics::{accuracy, ClassificationReport, ConfusionMatrix};
    pub use fitchain_neighbors::{DistanceMetric, KNNClassifier};
    pub use fitchain_pipeline::{make_pipeline, Pipeline, PipelineConfig, Step};
    pub use fitchain_preprocessing::{
        train_test_split, train_test_split_stratified, LabelEncoder, MinMaxScaler, Split,
        StandardScaler, PCA,
    };
    pub use fitchain_svm::{Kernel, SVC};
    pub use fitchain_tree::{DecisionTreeClassifier, RandomForestClassifier};
}
