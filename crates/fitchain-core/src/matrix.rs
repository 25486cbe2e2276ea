use crate::dtype::Float;
use crate::error::{MlError, MlResult};

use std::fmt;
use std::ops::Index;

/// Dense two-dimensional matrix: rows are samples, columns are features.
///
/// Stores data in a flat contiguous `Vec<T>` with row-major layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Float> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Matrix<T> {
    /// Create a matrix from row-major data.
    pub fn new(data: Vec<T>, rows: usize, cols: usize) -> MlResult<Self> {
        if data.len() != rows * cols {
            return Err(MlError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![data.len()],
            });
        }
        Ok(Matrix { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![T::ZERO; rows * cols],
            rows,
            cols,
        }
    }

    /// Create a matrix from a slice of equally long rows.
    pub fn from_rows(rows: &[Vec<T>]) -> MlResult<Self> {
        if rows.is_empty() {
            return Ok(Matrix::zeros(0, 0));
        }
        let cols = rows[0].len();
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(MlError::ShapeMismatch {
                expected: vec![cols],
                got: vec![bad.len()],
            });
        }
        let data: Vec<T> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Matrix::new(data, rows.len(), cols)
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Bounds-checked element access.
    pub fn get(&self, i: usize, j: usize) -> MlResult<T> {
        if i >= self.rows {
            return Err(MlError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: self.rows,
            });
        }
        if j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: self.cols,
            });
        }
        Ok(self.data[i * self.cols + j])
    }

    /// Borrow row `i`. Panics when `i` is out of range, like slice indexing.
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        // chunks_exact(0) panics, and a zero-column matrix has no row data anyway
        let width = self.cols.max(1);
        self.data
            .chunks_exact(width)
            .take(if self.cols == 0 { 0 } else { self.rows })
    }

    pub fn col(&self, j: usize) -> MlResult<Vec<T>> {
        if j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: self.cols,
            });
        }
        Ok((0..self.rows).map(|i| self.data[i * self.cols + j]).collect())
    }

    // ─── Selection ──────────────────────────────────────────────────────────

    /// Gather rows by index, in the given order (indices may repeat).
    pub fn select_rows(&self, indices: &[usize]) -> MlResult<Matrix<T>> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            if i >= self.rows {
                return Err(MlError::IndexOutOfBounds {
                    index: i,
                    axis: 0,
                    size: self.rows,
                });
            }
            data.extend_from_slice(self.row(i));
        }
        Matrix::new(data, indices.len(), self.cols)
    }

    /// Gather columns by index, in the given order.
    pub fn select_cols(&self, indices: &[usize]) -> MlResult<Matrix<T>> {
        if let Some(&bad) = indices.iter().find(|&&j| j >= self.cols) {
            return Err(MlError::IndexOutOfBounds {
                index: bad,
                axis: 1,
                size: self.cols,
            });
        }
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for row in self.iter_rows() {
            data.extend(indices.iter().map(|&j| row[j]));
        }
        Matrix::new(data, self.rows, indices.len())
    }

    // ─── Element-wise ───────────────────────────────────────────────────────

    /// Apply `f(value, column)` to every element.
    pub fn map_columns<F: Fn(T, usize) -> T>(&self, f: F) -> Matrix<T> {
        let cols = self.cols.max(1);
        Matrix {
            data: self
                .data
                .iter()
                .enumerate()
                .map(|(k, &x)| f(x, k % cols))
                .collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }

    // ─── Column reductions ──────────────────────────────────────────────────

    /// Per-column mean.
    pub fn mean_axis0(&self) -> MlResult<Vec<T>> {
        if self.rows == 0 {
            return Err(MlError::EmptyData("mean of a matrix with no rows".into()));
        }
        let mut sums = vec![T::ZERO; self.cols];
        for row in self.iter_rows() {
            for (s, &v) in sums.iter_mut().zip(row) {
                *s += v;
            }
        }
        let n = T::from_usize(self.rows);
        Ok(sums.into_iter().map(|s| s / n).collect())
    }

    /// Per-column variance with `ddof` delta degrees of freedom.
    pub fn var_axis0(&self, ddof: usize) -> MlResult<Vec<T>> {
        if self.rows <= ddof {
            return Err(MlError::EmptyData(format!(
                "variance needs more than {} rows, got {}",
                ddof, self.rows
            )));
        }
        let mean = self.mean_axis0()?;
        let mut acc = vec![T::ZERO; self.cols];
        for row in self.iter_rows() {
            for ((a, &v), &mu) in acc.iter_mut().zip(row).zip(&mean) {
                let d = v - mu;
                *a += d * d;
            }
        }
        let denom = T::from_usize(self.rows - ddof);
        Ok(acc.into_iter().map(|a| a / denom).collect())
    }

    /// Per-column population standard deviation.
    pub fn std_axis0(&self) -> MlResult<Vec<T>> {
        Ok(self.var_axis0(0)?.into_iter().map(T::sqrt).collect())
    }

    pub fn min_axis0(&self) -> MlResult<Vec<T>> {
        self.fold_axis0(T::INFINITY, T::min)
    }

    pub fn max_axis0(&self) -> MlResult<Vec<T>> {
        self.fold_axis0(-T::INFINITY, T::max)
    }

    fn fold_axis0(&self, init: T, f: fn(T, T) -> T) -> MlResult<Vec<T>> {
        if self.rows == 0 {
            return Err(MlError::EmptyData("reduction over a matrix with no rows".into()));
        }
        let mut acc = vec![init; self.cols];
        for row in self.iter_rows() {
            for (a, &v) in acc.iter_mut().zip(row) {
                *a = f(*a, v);
            }
        }
        Ok(acc)
    }

    // ─── Linear algebra ─────────────────────────────────────────────────────

    pub fn transpose(&self) -> Matrix<T> {
        let mut data = vec![T::ZERO; self.data.len()];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Matrix {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    pub fn matmul(&self, other: &Matrix<T>) -> MlResult<Matrix<T>> {
        if self.cols != other.rows {
            return Err(MlError::ShapeMismatch {
                expected: vec![self.cols, other.cols],
                got: vec![other.rows, other.cols],
            });
        }
        let (m, k, n) = (self.rows, self.cols, other.cols);
        let mut data = vec![T::ZERO; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                for j in 0..n {
                    data[i * n + j] += a * other.data[p * n + j];
                }
            }
        }
        Matrix::new(data, m, n)
    }
}

impl<T: Float> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[i * self.cols + j]
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

impl<T: Float> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "matrix([")?;
        for row in self.iter_rows().take(8) {
            write!(f, "  [")?;
            for (j, v) in row.iter().take(8).enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:.4}", v)?;
            }
            if self.cols > 8 {
                write!(f, ", ...")?;
            }
            writeln!(f, "],")?;
        }
        if self.rows > 8 {
            writeln!(f, "  ...")?;
        }
        write!(f, "], shape=({}, {}))", self.rows, self.cols)
    }
}
