// interface.rs — Numeric capability consumed by the coefficient compiler
//
// The compiler never reaches for a process-wide matrix backend. Every numeric
// primitive it needs is expressed on this trait and an implementation is
// passed in explicitly, so alternative backends (or instrumented ones in
// tests) can be swapped without touching the compiler.

use crate::algebra::Matrix;
use crate::slice::SliceDescr;
use std::fmt;

/// Matrix primitives the coefficient compiler is built on.
///
/// Implementations must use the crate-wide column-major vectorization
/// convention in `flatten`, and must keep results sparse whenever an operand
/// is sparse.
pub trait MatrixInterface {
    type Matrix: Clone + fmt::Debug;

    // ── Construction ────────────────────────────────────────────────────

    /// The n x n identity, in sparse form.
    fn identity(&self, n: usize) -> Self::Matrix;

    /// A 1x1 matrix holding a scalar literal.
    fn scalar(&self, v: f64) -> Self::Matrix;

    /// A sparse matrix from (row, col, value) triplets.
    fn sparse(&self, rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self::Matrix;

    // ── Queries ─────────────────────────────────────────────────────────

    fn rows(&self, m: &Self::Matrix) -> usize;
    fn cols(&self, m: &Self::Matrix) -> usize;

    fn is_scalar(&self, m: &Self::Matrix) -> bool {
        self.rows(m) == 1 && self.cols(m) == 1
    }

    /// The single entry of a 1x1 matrix.
    fn scalar_value(&self, m: &Self::Matrix) -> f64;

    // ── Elementwise and product operations ──────────────────────────────

    fn neg(&self, m: &Self::Matrix) -> Self::Matrix;
    fn add(&self, a: &Self::Matrix, b: &Self::Matrix) -> Self::Matrix;
    fn scale(&self, m: &Self::Matrix, factor: f64) -> Self::Matrix;
    fn matmul(&self, a: &Self::Matrix, b: &Self::Matrix) -> Self::Matrix;

    /// `copies` copies of `m` along the diagonal, in sparse form.
    fn block_diag(&self, m: &Self::Matrix, copies: usize) -> Self::Matrix;

    // ── Reshapes, reductions, selection ─────────────────────────────────

    /// Reshape to a single column, stacking columns (column-major vec).
    fn flatten(&self, m: &Self::Matrix) -> Self::Matrix;

    /// Matrix transpose of a value.
    fn transpose(&self, m: &Self::Matrix) -> Self::Matrix;

    /// Sum of all entries.
    fn sum_all(&self, m: &Self::Matrix) -> f64;

    /// Column sums as a 1 x cols row vector.
    fn sum_rows(&self, m: &Self::Matrix) -> Self::Matrix;

    /// The submatrix selected by per-axis slice descriptors.
    fn slice(&self, m: &Self::Matrix, row_key: &SliceDescr, col_key: &SliceDescr) -> Self::Matrix;

    /// Gather the given rows, in the given order.
    fn select_rows(&self, m: &Self::Matrix, rows: &[usize]) -> Self::Matrix;
}

/// The in-crate reference backend over [`algebra::Matrix`](crate::algebra::Matrix).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeInterface;

impl MatrixInterface for NativeInterface {
    type Matrix = Matrix;

    fn identity(&self, n: usize) -> Matrix {
        Matrix::identity(n)
    }

    fn scalar(&self, v: f64) -> Matrix {
        Matrix::scalar(v)
    }

    fn sparse(&self, rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Matrix {
        Matrix::Sparse(crate::algebra::Sparse::new(rows, cols, triplets.to_vec()))
    }

    fn rows(&self, m: &Matrix) -> usize {
        m.rows()
    }

    fn cols(&self, m: &Matrix) -> usize {
        m.cols()
    }

    fn scalar_value(&self, m: &Matrix) -> f64 {
        m.scalar_value()
    }

    fn neg(&self, m: &Matrix) -> Matrix {
        m.neg()
    }

    fn add(&self, a: &Matrix, b: &Matrix) -> Matrix {
        a.add(b)
    }

    fn scale(&self, m: &Matrix, factor: f64) -> Matrix {
        m.scale(factor)
    }

    fn matmul(&self, a: &Matrix, b: &Matrix) -> Matrix {
        a.matmul(b)
    }

    fn block_diag(&self, m: &Matrix, copies: usize) -> Matrix {
        m.block_diag(copies)
    }

    fn flatten(&self, m: &Matrix) -> Matrix {
        m.flatten()
    }

    fn transpose(&self, m: &Matrix) -> Matrix {
        m.transpose()
    }

    fn sum_all(&self, m: &Matrix) -> f64 {
        m.sum_all()
    }

    fn sum_rows(&self, m: &Matrix) -> Matrix {
        m.sum_rows()
    }

    fn slice(&self, m: &Matrix, row_key: &SliceDescr, col_key: &SliceDescr) -> Matrix {
        let rows: Vec<usize> = row_key.indices().collect();
        let cols: Vec<usize> = col_key.indices().collect();
        m.select(&rows, &cols)
    }

    fn select_rows(&self, m: &Matrix, rows: &[usize]) -> Matrix {
        m.select_rows(rows)
    }
}
