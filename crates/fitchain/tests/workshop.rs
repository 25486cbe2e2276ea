//! End-to-end walkthrough: load, split, chain, fit once, evaluate.

use approx::assert_abs_diff_eq;
use fitchain::prelude::*;
use std::io::Write;

fn iris_split() -> (Dataset, Split<f64>) {
    let iris = load_iris().unwrap();
    let split =
        train_test_split_stratified(iris.features(), iris.targets(), 0.3, Some(42)).unwrap();
    (iris, split)
}

fn chain(estimator: Step<f64>) -> Pipeline<f64> {
    make_pipeline(vec![
        Step::transformer(StandardScaler::new()),
        Step::transformer(PCA::new(2)),
        estimator,
    ])
    .unwrap()
}

#[test]
fn split_covers_every_row_once() {
    let (iris, split) = iris_split();
    let n = iris.n_samples();
    assert_eq!(split.train_indices.len() + split.test_indices.len(), n);
    assert_eq!(split.x_train.rows() + split.x_test.rows(), n);

    let mut all: Vec<usize> = split
        .train_indices
        .iter()
        .chain(&split.test_indices)
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..n).collect::<Vec<_>>());

    // ceil(150 * 0.3)
    assert_eq!(split.y_test.len(), 45);
    let setosa_test = split.y_test.iter().filter(|&&c| c == 0.0).count();
    assert_eq!(setosa_test, 15);
    for class in [0.0, 1.0, 2.0] {
        assert!(split.y_train.contains(&class));
        assert!(split.y_test.contains(&class));
    }
}

#[test]
fn every_classifier_runs_through_the_chain() {
    let (_, split) = iris_split();
    let estimators: Vec<Step<f64>> = vec![
        Step::estimator(LogisticRegression::default()),
        Step::estimator(KNNClassifier::new(3, DistanceMetric::Euclidean)),
        Step::estimator(SVC::new(1.0, Kernel::Linear, 200)),
        Step::estimator(RandomForestClassifier::new(20, Some(4))),
        Step::estimator(DecisionTreeClassifier::default()),
    ];

    for estimator in estimators {
        let mut pipe = chain(estimator);
        pipe.fit(&split.x_train, &split.y_train).unwrap();

        let first = pipe.predict(&split.x_test).unwrap();
        let second = pipe.predict(&split.x_test).unwrap();
        assert_eq!(first, second, "{} is not stable", pipe);
        assert_eq!(first.len(), split.y_test.len());

        let acc = pipe.score(&split.x_test, &split.y_test).unwrap();
        assert!(acc >= 0.75, "{} scored {}", pipe, acc);
    }
}

#[test]
fn chain_matches_manual_steps() {
    let (_, split) = iris_split();

    let mut pipe = chain(Step::estimator(KNNClassifier::new(3, DistanceMetric::Euclidean)));
    pipe.fit(&split.x_train, &split.y_train).unwrap();

    let mut scaler = StandardScaler::<f64>::new();
    let mut pca = PCA::<f64>::new(2);
    let mut knn = KNNClassifier::<f64>::new(3, DistanceMetric::Euclidean);
    let train = pca.fit_transform(&scaler.fit_transform(&split.x_train).unwrap()).unwrap();
    knn.fit(&train, &split.y_train).unwrap();
    let test = pca.transform(&scaler.transform(&split.x_test).unwrap()).unwrap();

    assert_eq!(pipe.transform(&split.x_test).unwrap(), test);
    assert_eq!(pipe.predict(&split.x_test).unwrap(), knn.predict(&test).unwrap());

    let ratio = pca.explained_variance_ratio().unwrap();
    assert!(ratio[0] >= ratio[1]);
    assert!(ratio.iter().all(|&r| r > 0.0 && r <= 1.0));
}

#[test]
fn scaler_inside_chain_standardizes_training_data() {
    let (_, split) = iris_split();
    let mut scaler = StandardScaler::<f64>::new();
    let z = scaler.fit_transform(&split.x_train).unwrap();
    for (m, s) in z.mean_axis0().unwrap().iter().zip(z.std_axis0().unwrap()) {
        assert_abs_diff_eq!(*m, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(s, 1.0, epsilon = 1e-10);
    }
    assert_eq!(
        scaler.transform(&split.x_test).unwrap(),
        scaler.transform(&split.x_test).unwrap()
    );
}

#[test]
fn report_on_test_predictions() {
    let (iris, split) = iris_split();
    let mut pipe = chain(Step::estimator(LogisticRegression::default()));
    pipe.fit(&split.x_train, &split.y_train).unwrap();
    let y_pred = pipe.predict(&split.x_test).unwrap();

    let cm = ConfusionMatrix::new(&split.y_test, &y_pred).unwrap();
    assert_eq!(cm.total(), split.y_test.len());
    let names: Vec<String> = cm.labels().iter().map(|&l| iris.label_name(l)).collect();
    let report = ClassificationReport::from_confusion(&cm)
        .with_target_names(&names)
        .unwrap();

    assert_abs_diff_eq!(report.accuracy, accuracy(&split.y_test, &y_pred).unwrap());
    assert_eq!(report.weighted_avg.support, split.y_test.len());
    let text = report.to_string();
    assert!(text.contains("setosa"));
    assert!(text.contains("virginica"));
}

#[test]
fn lifecycle_errors() {
    let (_, split) = iris_split();
    let pipe = chain(Step::estimator(KNNClassifier::default()));
    assert!(pipe.predict(&split.x_test).unwrap_err().is_not_fitted());

    let no_estimator = make_pipeline(vec![
        Step::transformer(StandardScaler::<f64>::new()),
        Step::transformer(PCA::new(2)),
    ]);
    assert!(no_estimator.unwrap_err().is_configuration());

    let estimator_first = make_pipeline(vec![
        Step::estimator(KNNClassifier::default()),
        Step::transformer(StandardScaler::<f64>::new()),
    ]);
    assert!(estimator_first.unwrap_err().is_configuration());

    let mut pipe = chain(Step::estimator(KNNClassifier::new(3, DistanceMetric::Euclidean)));
    pipe.fit(&split.x_train, &split.y_train).unwrap();
    let narrow = split.x_test.select_cols(&[0, 1]).unwrap();
    assert!(pipe.predict(&narrow).unwrap_err().is_shape_mismatch());
}

#[test]
fn config_and_csv_workflow() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "a,b,label").unwrap();
    for i in 0..20 {
        let (x, label) = if i % 2 == 0 {
            (i as f64 * 0.1, "low")
        } else {
            (10.0 + i as f64 * 0.1, "high")
        };
        writeln!(file, "{},{},{}", x, x * 0.5 + 1.0, label).unwrap();
    }
    let ds = fitchain::io::read_labeled_csv(file.path(), "label").unwrap();
    assert_eq!(ds.classes().unwrap(), vec![0.0, 1.0]);
    assert_eq!(ds.label_name(0.0), "high");

    let mut pipe = PipelineConfig::from_json(
        r#"{"steps": [
            {"kind": "min_max_scaler"},
            {"kind": "logistic_regression", "max_iter": 500}
        ]}"#,
    )
    .unwrap()
    .build()
    .unwrap();

    let split = train_test_split(ds.features(), ds.targets(), 0.25, Some(7)).unwrap();
    pipe.fit(&split.x_train, &split.y_train).unwrap();
    assert_abs_diff_eq!(pipe.score(&split.x_test, &split.y_test).unwrap(), 1.0);
}
