use fitchain_core::traits::{check_rows, class_index, unique_classes};
use fitchain_core::{Float, Matrix, MlError, MlResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Train/test partition of one dataset.
///
/// `train_indices` and `test_indices` are disjoint and together cover every
/// row of the source matrix exactly once.
#[derive(Debug, Clone)]
pub struct Split<T: Float> {
    pub x_train: Matrix<T>,
    pub x_test: Matrix<T>,
    pub y_train: Vec<T>,
    pub y_test: Vec<T>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Number of test rows for `n` samples: `ceil(n * test_size)`.
fn test_count(n: usize, test_size: f64) -> MlResult<usize> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(MlError::InvalidParameter(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(MlError::InvalidParameter(format!(
            "test_size {} leaves an empty partition for {} samples",
            test_size, n
        )));
    }
    Ok(n_test)
}

/// Shuffle `0..n` and cut it into `(train, test)`.
pub fn split_indices(
    n: usize,
    test_size: f64,
    seed: Option<u64>,
) -> MlResult<(Vec<usize>, Vec<usize>)> {
    let n_test = test_count(n, test_size)?;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng_from(seed));
    let test = indices.split_off(n - n_test);
    Ok((indices, test))
}

/// Like [`split_indices`], but each class keeps roughly its overall
/// proportion in both partitions and appears in both at least once.
pub fn stratified_split_indices<T: Float>(
    y: &[T],
    test_size: f64,
    seed: Option<u64>,
) -> MlResult<(Vec<usize>, Vec<usize>)> {
    let n = y.len();
    let n_test = test_count(n, test_size)?;
    let classes = unique_classes(y)?;
    let k = classes.len();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &label) in y.iter().enumerate() {
        if let Some(c) = class_index(&classes, label) {
            members[c].push(i);
        }
    }
    if let Some(c) = members.iter().position(|m| m.len() < 2) {
        return Err(MlError::InvalidParameter(format!(
            "class {} has fewer than 2 samples and cannot be stratified",
            classes[c]
        )));
    }
    if n_test < k || n - n_test < k {
        return Err(MlError::InvalidParameter(format!(
            "a stratified split of {} samples into {} test rows cannot hold {} classes on both sides",
            n, n_test, k
        )));
    }

    let alloc = allocate_test_rows(&members, n, n_test);

    let mut rng = rng_from(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (rows, &take) in members.iter_mut().zip(&alloc) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok((train, test))
}

/// Largest-remainder apportionment of `n_test` rows over classes, then
/// nudged so every class has at least one row on each side.
fn allocate_test_rows(members: &[Vec<usize>], n: usize, n_test: usize) -> Vec<usize> {
    let quotas: Vec<f64> = members
        .iter()
        .map(|m| m.len() as f64 * n_test as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();

    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut missing = n_test - alloc.iter().sum::<usize>();
    for &c in order.iter().cycle().take(members.len() * 2) {
        if missing == 0 {
            break;
        }
        if alloc[c] + 1 < members[c].len() {
            alloc[c] += 1;
            missing -= 1;
        }
    }

    for (a, m) in alloc.iter_mut().zip(members) {
        *a = (*a).clamp(1, m.len() - 1);
    }

    // clamping may have moved the total; rebalance within each class's room
    loop {
        let total: usize = alloc.iter().sum();
        if total == n_test {
            break;
        }
        let pick = if total < n_test {
            (0..alloc.len())
                .filter(|&c| alloc[c] + 1 < members[c].len())
                .max_by_key(|&c| members[c].len() - alloc[c])
        } else {
            (0..alloc.len()).filter(|&c| alloc[c] > 1).max_by_key(|&c| alloc[c])
        };
        match (pick, total < n_test) {
            (Some(c), true) => alloc[c] += 1,
            (Some(c), false) => alloc[c] -= 1,
            (None, _) => break,
        }
    }
    alloc
}

fn gather<T: Float>(
    x: &Matrix<T>,
    y: &[T],
    train_indices: Vec<usize>,
    test_indices: Vec<usize>,
) -> MlResult<Split<T>> {
    Ok(Split {
        x_train: x.select_rows(&train_indices)?,
        x_test: x.select_rows(&test_indices)?,
        y_train: train_indices.iter().map(|&i| y[i]).collect(),
        y_test: test_indices.iter().map(|&i| y[i]).collect(),
        train_indices,
        test_indices,
    })
}

/// Split data into training and test sets.
///
/// The test partition holds `ceil(n * test_size)` rows.
pub fn train_test_split<T: Float>(
    x: &Matrix<T>,
    y: &[T],
    test_size: f64,
    seed: Option<u64>,
) -> MlResult<Split<T>> {
    check_rows(x, y)?;
    let (train, test) = split_indices(x.rows(), test_size, seed)?;
    gather(x, y, train, test)
}

/// Split data into training and test sets, preserving class proportions.
pub fn train_test_split_stratified<T: Float>(
    x: &Matrix<T>,
    y: &[T],
    test_size: f64,
    seed: Option<u64>,
) -> MlResult<Split<T>> {
    check_rows(x, y)?;
    let (train, test) = stratified_split_indices(y, test_size, seed)?;
    gather(x, y, train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn data(n: usize) -> (Matrix<f64>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (2 * i) as f64]).collect();
        let y = (0..n).map(|i| (i % 3) as f64).collect();
        (Matrix::from_rows(&rows).unwrap(), y)
    }

    fn assert_partition(n: usize, train: &[usize], test: &[usize]) {
        assert_eq!(train.len() + test.len(), n);
        let a: HashSet<_> = train.iter().copied().collect();
        let b: HashSet<_> = test.iter().copied().collect();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.union(&b).count(), n);
    }

    #[test]
    fn test_train_test_split() {
        let (x, y) = data(5);
        let split = train_test_split(&x, &y, 0.4, Some(42)).unwrap();
        assert_eq!(split.x_train.rows(), 3);
        assert_eq!(split.x_test.rows(), 2);
        assert_eq!(split.y_train.len(), 3);
        assert_eq!(split.y_test.len(), 2);
        assert_partition(5, &split.train_indices, &split.test_indices);

        // rows travel with their labels
        for (k, &i) in split.test_indices.iter().enumerate() {
            assert_eq!(split.x_test.row(k), x.row(i));
            assert_eq!(split.y_test[k], y[i]);
        }
    }

    #[test]
    fn test_partition_property_over_sizes() {
        for n in 2..60 {
            for &ts in &[0.1, 0.25, 0.33, 0.5, 0.8] {
                if let Ok((train, test)) = split_indices(n, ts, Some(n as u64)) {
                    assert_partition(n, &train, &test);
                    assert_eq!(test.len(), (n as f64 * ts).ceil() as usize);
                }
            }
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = split_indices(40, 0.25, Some(7)).unwrap();
        let b = split_indices(40, 0.25, Some(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(split_indices(10, 0.0, None).is_err());
        assert!(split_indices(10, 1.0, None).is_err());
        assert!(split_indices(1, 0.5, None).is_err());
    }

    #[test]
    fn test_row_mismatch() {
        let (x, _) = data(5);
        let err = train_test_split(&x, &[0.0, 1.0], 0.2, Some(1)).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_stratified_keeps_classes_on_both_sides() {
        let (x, y) = data(30);
        let split = train_test_split_stratified(&x, &y, 0.2, Some(3)).unwrap();
        assert_partition(30, &split.train_indices, &split.test_indices);
        assert_eq!(split.y_test.len(), 6);
        for class in [0.0, 1.0, 2.0] {
            assert_eq!(split.y_test.iter().filter(|&&v| v == class).count(), 2);
            assert_eq!(split.y_train.iter().filter(|&&v| v == class).count(), 8);
        }
    }

    #[test]
    fn test_stratified_small_classes() {
        let y = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        let (train, test) = stratified_split_indices(&y, 0.2, Some(9)).unwrap();
        assert_partition(10, &train, &test);
        assert!(test.iter().any(|&i| y[i] == 1.0));
        assert!(train.iter().any(|&i| y[i] == 1.0));
    }

    #[test]
    fn test_stratified_rejects_singleton_class() {
        let y = vec![0.0, 0.0, 0.0, 1.0];
        assert!(stratified_split_indices(&y, 0.5, Some(1)).is_err());
    }
}
