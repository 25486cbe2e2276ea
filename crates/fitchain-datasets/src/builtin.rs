use fitchain_core::{Matrix, MlError, MlResult};
use fitchain_data::Dataset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const IRIS_FEATURES: [&str; 4] = [
    "sepal_length",
    "sepal_width",
    "petal_length",
    "petal_width",
];
const IRIS_CLASSES: [&str; 3] = ["setosa", "versicolor", "virginica"];

/// Load Fisher's Iris dataset: 150 rows, 50 per species, 4 features in
/// centimetres, labels 0/1/2 named after the species.
///
/// Rows follow the UCI ordering, with the two corrections scikit-learn
/// applies to setosa rows 35 and 38.
pub fn load_iris() -> MlResult<Dataset> {
    #[rustfmt::skip]
    let features: Vec<f64> = vec![
        // setosa
        5.1,3.5,1.4,0.2, 4.9,3.0,1.4,0.2, 4.7,3.2,1.3,0.2, 4.6,3.1,1.5,0.2,
        5.0,3.6,1.4,0.2, 5.4,3.9,1.7,0.4, 4.6,3.4,1.4,0.3, 5.0,3.4,1.5,0.2,
        4.4,2.9,1.4,0.2, 4.9,3.1,1.5,0.1, 5.4,3.7,1.5,0.2, 4.8,3.4,1.6,0.2,
        4.8,3.0,1.4,0.1, 4.3,3.0,1.1,0.1, 5.8,4.0,1.2,0.2, 5.7,4.4,1.5,0.4,
        5.4,3.9,1.3,0.4, 5.1,3.5,1.4,0.3, 5.7,3.8,1.7,0.3, 5.1,3.8,1.5,0.3,
        5.4,3.4,1.7,0.2, 5.1,3.7,1.5,0.4, 4.6,3.6,1.0,0.2, 5.1,3.3,1.7,0.5,
        4.8,3.4,1.9,0.2, 5.0,3.0,1.6,0.2, 5.0,3.4,1.6,0.4, 5.2,3.5,1.5,0.2,
        5.2,3.4,1.4,0.2, 4.7,3.2,1.6,0.2, 4.8,3.1,1.6,0.2, 5.4,3.4,1.5,0.4,
        5.2,4.1,1.5,0.1, 5.5,4.2,1.4,0.2, 4.9,3.1,1.5,0.2, 5.0,3.2,1.2,0.2,
        5.5,3.5,1.3,0.2, 4.9,3.6,1.4,0.1, 4.4,3.0,1.3,0.2, 5.1,3.4,1.5,0.2,
        5.0,3.5,1.3,0.3, 4.5,2.3,1.3,0.3, 4.4,3.2,1.3,0.2, 5.0,3.5,1.6,0.6,
        5.1,3.8,1.9,0.4, 4.8,3.0,1.4,0.3, 5.1,3.8,1.6,0.2, 4.6,3.2,1.4,0.2,
        5.3,3.7,1.5,0.2, 5.0,3.3,1.4,0.2,
        // versicolor
        7.0,3.2,4.7,1.4, 6.4,3.2,4.5,1.5, 6.9,3.1,4.9,1.5, 5.5,2.3,4.0,1.3,
        6.5,2.8,4.6,1.5, 5.7,2.8,4.5,1.3, 6.3,3.3,4.7,1.6, 4.9,2.4,3.3,1.0,
        6.6,2.9,4.6,1.3, 5.2,2.7,3.9,1.4, 5.0,2.0,3.5,1.0, 5.9,3.0,4.2,1.5,
        6.0,2.2,4.0,1.0, 6.1,2.9,4.7,1.4, 5.6,2.9,3.6,1.3, 6.7,3.1,4.4,1.4,
        5.6,3.0,4.5,1.5, 5.8,2.7,4.1,1.0, 6.2,2.2,4.5,1.5, 5.6,2.5,3.9,1.1,
        5.9,3.2,4.8,1.8, 6.1,2.8,4.0,1.3, 6.3,2.5,4.9,1.5, 6.1,2.8,4.7,1.2,
        6.4,2.9,4.3,1.3, 6.6,3.0,4.4,1.4, 6.8,2.8,4.8,1.4, 6.7,3.0,5.0,1.7,
        6.0,2.9,4.5,1.5, 5.7,2.6,3.5,1.0, 5.5,2.4,3.8,1.1, 5.5,2.4,3.7,1.0,
        5.8,2.7,3.9,1.2, 6.0,2.7,5.1,1.6, 5.4,3.0,4.5,1.5, 6.0,3.4,4.5,1.6,
        6.7,3.1,4.7,1.5, 6.3,2.3,4.4,1.3, 5.6,3.0,4.1,1.3, 5.5,2.5,4.0,1.3,
        5.5,2.6,4.4,1.2, 6.1,3.0,4.6,1.4, 5.8,2.6,4.0,1.2, 5.0,2.3,3.3,1.0,
        5.6,2.7,4.2,1.3, 5.7,3.0,4.2,1.2, 5.7,2.9,4.2,1.3, 6.2,2.9,4.3,1.3,
        5.1,2.5,3.0,1.1, 5.7,2.8,4.1,1.3,
        // virginica
        6.3,3.3,6.0,2.5, 5.8,2.7,5.1,1.9, 7.1,3.0,5.9,2.1, 6.3,2.9,5.6,1.8,
        6.5,3.0,5.8,2.2, 7.6,3.0,6.6,2.1, 4.9,2.5,4.5,1.7, 7.3,2.9,6.3,1.8,
        6.7,2.5,5.8,1.8, 7.2,3.6,6.1,2.5, 6.5,3.2,5.1,2.0, 6.4,2.7,5.3,1.9,
        6.8,3.0,5.5,2.1, 5.7,2.5,5.0,2.0, 5.8,2.8,5.1,2.4, 6.4,3.2,5.3,2.3,
        6.5,3.0,5.5,1.8, 7.7,3.8,6.7,2.2, 7.7,2.6,6.9,2.3, 6.0,2.2,5.0,1.5,
        6.9,3.2,5.7,2.3, 5.6,2.8,4.9,2.0, 7.7,2.8,6.7,2.0, 6.3,2.7,4.9,1.8,
        6.7,3.3,5.7,2.1, 7.2,3.2,6.0,1.8, 6.2,2.8,4.8,1.8, 6.1,3.0,4.9,1.8,
        6.4,2.8,5.6,2.1, 7.2,3.0,5.8,1.6, 7.4,2.8,6.1,1.9, 7.9,3.8,6.4,2.0,
        6.4,2.8,5.6,2.2, 6.3,2.8,5.1,1.5, 6.1,2.6,5.6,1.4, 7.7,3.0,6.1,2.3,
        6.3,3.4,5.6,2.4, 6.4,3.1,5.5,1.8, 6.0,3.0,4.8,1.8, 6.9,3.1,5.4,2.1,
        6.7,3.1,5.6,2.4, 6.9,3.1,5.1,2.3, 5.8,2.7,5.1,1.9, 6.8,3.2,5.9,2.3,
        6.7,3.3,5.7,2.5, 6.7,3.0,5.2,2.3, 6.3,2.5,5.0,1.9, 6.5,3.0,5.2,2.0,
        6.2,3.4,5.4,2.3, 5.9,3.0,5.1,1.8,
    ];
    let n = features.len() / IRIS_FEATURES.len();
    let labels: Vec<f64> = (0..n).map(|i| (i / 50) as f64).collect();

    Dataset::new(
        Matrix::new(features, n, IRIS_FEATURES.len())?,
        labels,
        IRIS_FEATURES.iter().map(|s| s.to_string()).collect(),
    )?
    .with_class_names(IRIS_CLASSES.iter().map(|s| s.to_string()).collect())
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Standard normal draw (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn check_sizes(n_samples: usize, n_features: usize, n_classes: usize) -> MlResult<()> {
    if n_features == 0 || n_classes == 0 || n_samples < n_classes {
        return Err(MlError::InvalidParameter(format!(
            "cannot generate {} samples with {} features over {} classes",
            n_samples, n_features, n_classes
        )));
    }
    Ok(())
}

/// Gaussian blobs: one isotropic cluster per center, centers about 5 units
/// apart, labels `0..n_centers`. Rows are grouped by center.
pub fn make_blobs(
    n_samples: usize,
    n_features: usize,
    n_centers: usize,
    cluster_std: f64,
    seed: Option<u64>,
) -> MlResult<Dataset> {
    check_sizes(n_samples, n_features, n_centers)?;
    if !(cluster_std > 0.0) {
        return Err(MlError::InvalidParameter(format!(
            "cluster_std must be positive, got {}",
            cluster_std
        )));
    }
    let mut rng = rng_from(seed);

    let centers: Vec<Vec<f64>> = (0..n_centers)
        .map(|c| {
            (0..n_features)
                .map(|_| c as f64 * 5.0 + rng.gen::<f64>())
                .collect()
        })
        .collect();

    let per_center = n_samples / n_centers;
    let mut features = Vec::with_capacity(n_samples * n_features);
    let mut labels = Vec::with_capacity(n_samples);
    for (c, center) in centers.iter().enumerate() {
        // the last center absorbs the remainder
        let count = if c == n_centers - 1 {
            n_samples - per_center * (n_centers - 1)
        } else {
            per_center
        };
        for _ in 0..count {
            features.extend(center.iter().map(|&m| m + gaussian(&mut rng) * cluster_std));
            labels.push(c as f64);
        }
    }

    Dataset::new(Matrix::new(features, n_samples, n_features)?, labels, vec![])
}

/// Two-class data separated by a random hyperplane through the origin.
///
/// Labels alternate `0, 1, 0, ...` so both classes are always present and
/// balanced. Each point is standard normal, mirrored across the plane when
/// it falls on the wrong side for its label, then pushed `class_sep / 2`
/// further away from it so larger values give an easier problem.
pub fn make_classification(
    n_samples: usize,
    n_features: usize,
    class_sep: f64,
    seed: Option<u64>,
) -> MlResult<Dataset> {
    check_sizes(n_samples, n_features, 2)?;
    if class_sep < 0.0 {
        return Err(MlError::InvalidParameter(format!(
            "class_sep must be non-negative, got {}",
            class_sep
        )));
    }
    let mut rng = rng_from(seed);

    let mut normal: Vec<f64> = (0..n_features).map(|_| gaussian(&mut rng)).collect();
    let norm = normal.iter().map(|v| v * v).sum::<f64>().sqrt().max(1e-12);
    for v in normal.iter_mut() {
        *v /= norm;
    }

    let mut features = Vec::with_capacity(n_samples * n_features);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let positive = i % 2 == 1;
        let mut point: Vec<f64> = (0..n_features).map(|_| gaussian(&mut rng)).collect();
        let side: f64 = point.iter().zip(&normal).map(|(a, b)| a * b).sum();
        // reflection across the plane keeps the point standard normal
        let mirror = if (side > 0.0) != positive { -2.0 * side } else { 0.0 };
        let shift = if positive { class_sep / 2.0 } else { -class_sep / 2.0 };
        for (p, n) in point.iter_mut().zip(&normal) {
            *p += (mirror + shift) * n;
        }
        features.extend(point);
        labels.push(if positive { 1.0 } else { 0.0 });
    }

    Dataset::new(Matrix::new(features, n_samples, n_features)?, labels, vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_load_iris() {
        let iris = load_iris().unwrap();
        assert_eq!(iris.features().shape(), (150, 4));
        assert_eq!(iris.classes().unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(iris.feature_names()[2], "petal_length");
        assert_eq!(iris.label_name(2.0), "virginica");
        assert_eq!(iris.features().row(50), &[7.0, 3.2, 4.7, 1.4]);
        assert_eq!(iris.features().row(149), &[5.9, 3.0, 5.1, 1.8]);
        assert_eq!(iris.targets()[50], 1.0);

        let counts: Vec<usize> = iris
            .summary()
            .unwrap()
            .class_counts
            .iter()
            .map(|(_, c)| *c)
            .collect();
        assert_eq!(counts, vec![50, 50, 50]);
    }

    #[test]
    fn test_iris_column_means() {
        let means = load_iris().unwrap().features().mean_axis0().unwrap();
        let expected = [5.843333, 3.057333, 3.758, 1.199333];
        for (m, e) in means.iter().zip(expected) {
            assert_abs_diff_eq!(*m, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_make_blobs() {
        let ds = make_blobs(31, 2, 3, 0.5, Some(1)).unwrap();
        assert_eq!(ds.features().shape(), (31, 2));
        let summary = ds.summary().unwrap();
        let counts: Vec<usize> = summary.class_counts.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![10, 10, 11]);

        let again = make_blobs(31, 2, 3, 0.5, Some(1)).unwrap();
        assert_eq!(ds.features(), again.features());
    }

    #[test]
    fn test_make_classification() {
        let ds = make_classification(200, 4, 2.0, Some(5)).unwrap();
        assert_eq!(ds.features().shape(), (200, 4));
        assert_eq!(ds.classes().unwrap(), vec![0.0, 1.0]);
        let positives = ds.targets().iter().filter(|&&t| t == 1.0).count();
        assert_eq!(positives, 100);
    }

    #[test]
    fn test_small_classification_has_both_classes() {
        for seed in 0..200 {
            let ds = make_classification(4, 2, 1.0, Some(seed)).unwrap();
            assert_eq!(ds.classes().unwrap(), vec![0.0, 1.0], "seed {}", seed);
        }
    }

    #[test]
    fn test_class_sep_pulls_classes_apart() {
        let ds = make_classification(60, 3, 4.0, Some(11)).unwrap();
        let x = ds.features();
        let mut mean = [[0.0f64; 3]; 2];
        for (row, &t) in x.iter_rows().zip(ds.targets()) {
            for (m, v) in mean[t as usize].iter_mut().zip(row) {
                *m += v / 30.0;
            }
        }
        let gap: f64 = (0..3).map(|j| (mean[1][j] - mean[0][j]).powi(2)).sum::<f64>().sqrt();
        assert!(gap > 4.0, "class means only {} apart", gap);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(make_blobs(2, 2, 3, 1.0, None).is_err());
        assert!(make_blobs(10, 0, 2, 1.0, None).is_err());
        assert!(make_blobs(10, 2, 2, 0.0, None).is_err());
        assert!(make_classification(1, 2, 1.0, None).is_err());
    }
}
