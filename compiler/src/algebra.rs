// algebra.rs — Self-contained dense/sparse matrix kernels
//
// Reference numeric backend for the coefficient compiler. Dense storage is
// column-major; sparse storage is coordinate triplets kept sorted by
// (col, row), coalesced, with explicit zeros dropped.
//
// Sparsity rule: any operation with a sparse operand yields a sparse result.
// Identity, permutation, and block-diagonal matrices are always sparse, since
// downstream coefficient shapes can be large.
//
// Preconditions: operand dimensions are validated by assertion; callers are
//   expected to respect the tree builder's shape invariant.
// Side effects: none.

use std::collections::HashMap;

// ── Dense matrices ──────────────────────────────────────────────────────────

/// A dense matrix in column-major order: entry (i, j) is `data[i + j*rows]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Dense {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols, "dense data length mismatch");
        Dense { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Dense {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row-major input (the order matrices are usually written).
    pub fn from_row_major(rows: usize, cols: usize, entries: &[f64]) -> Self {
        assert_eq!(entries.len(), rows * cols, "dense data length mismatch");
        let mut data = vec![0.0; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[i + j * rows] = entries[i * cols + j];
            }
        }
        Dense { rows, cols, data }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i + j * self.rows]
    }

    fn set(&mut self, i: usize, j: usize, v: f64) {
        self.data[i + j * self.rows] = v;
    }
}

// ── Sparse matrices ─────────────────────────────────────────────────────────

/// A sparse matrix as (row, col, value) triplets, sorted by (col, row).
#[derive(Debug, Clone, PartialEq)]
pub struct Sparse {
    pub rows: usize,
    pub cols: usize,
    triplets: Vec<(usize, usize, f64)>,
}

impl Sparse {
    /// Build from arbitrary triplets: sorts, coalesces duplicates, and drops
    /// explicit zeros.
    pub fn new(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        for &(i, j, _) in &triplets {
            assert!(i < rows && j < cols, "sparse triplet out of bounds");
        }
        triplets.sort_by_key(|&(i, j, _)| (j, i));
        let mut coalesced: Vec<(usize, usize, f64)> = Vec::with_capacity(triplets.len());
        for (i, j, v) in triplets {
            match coalesced.last_mut() {
                Some(last) if last.0 == i && last.1 == j => last.2 += v,
                _ => coalesced.push((i, j, v)),
            }
        }
        coalesced.retain(|&(_, _, v)| v != 0.0);
        Sparse {
            rows,
            cols,
            triplets: coalesced,
        }
    }

    pub fn identity(n: usize) -> Self {
        Sparse {
            rows: n,
            cols: n,
            triplets: (0..n).map(|i| (i, i, 1.0)).collect(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.triplets.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self
            .triplets
            .binary_search_by(|&(r, c, _)| (c, r).cmp(&(j, i)))
        {
            Ok(pos) => self.triplets[pos].2,
            Err(_) => 0.0,
        }
    }
}

// ── Matrix: the unified value type ──────────────────────────────────────────

/// A numeric matrix, dense or sparse. All compiler blocks and constant values
/// are carried in this type by the native backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Matrix {
    Dense(Dense),
    Sparse(Sparse),
}

impl Matrix {
    pub fn scalar(v: f64) -> Matrix {
        Matrix::Dense(Dense::new(1, 1, vec![v]))
    }

    pub fn identity(n: usize) -> Matrix {
        Matrix::Sparse(Sparse::identity(n))
    }

    pub fn rows(&self) -> usize {
        match self {
            Matrix::Dense(d) => d.rows,
            Matrix::Sparse(s) => s.rows,
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Matrix::Dense(d) => d.cols,
            Matrix::Sparse(s) => s.cols,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.rows() == 1 && self.cols() == 1
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Matrix::Sparse(_))
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self {
            Matrix::Dense(d) => d.get(i, j),
            Matrix::Sparse(s) => s.get(i, j),
        }
    }

    /// The (0, 0) entry of a 1x1 matrix.
    pub fn scalar_value(&self) -> f64 {
        assert!(self.is_scalar(), "scalar_value on a non-scalar matrix");
        self.get(0, 0)
    }

    /// All nonzero entries as (row, col, value) triplets.
    pub fn nonzeros(&self) -> Vec<(usize, usize, f64)> {
        match self {
            Matrix::Sparse(s) => s.triplets.clone(),
            Matrix::Dense(d) => {
                let mut out = Vec::new();
                for j in 0..d.cols {
                    for i in 0..d.rows {
                        let v = d.get(i, j);
                        if v != 0.0 {
                            out.push((i, j, v));
                        }
                    }
                }
                out
            }
        }
    }

    pub fn to_dense(&self) -> Dense {
        match self {
            Matrix::Dense(d) => d.clone(),
            Matrix::Sparse(s) => {
                let mut d = Dense::zeros(s.rows, s.cols);
                for &(i, j, v) in &s.triplets {
                    d.set(i, j, v);
                }
                d
            }
        }
    }

    /// Elementwise approximate equality, for verification code.
    pub fn approx_eq(&self, other: &Matrix, tol: f64) -> bool {
        if self.rows() != other.rows() || self.cols() != other.cols() {
            return false;
        }
        let a = self.to_dense();
        let b = other.to_dense();
        a.data
            .iter()
            .zip(&b.data)
            .all(|(x, y)| (x - y).abs() <= tol)
    }

    // ── Elementwise operations ──────────────────────────────────────────

    pub fn neg(&self) -> Matrix {
        self.scale(-1.0)
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        match self {
            Matrix::Dense(d) => Matrix::Dense(Dense {
                rows: d.rows,
                cols: d.cols,
                data: d.data.iter().map(|v| v * factor).collect(),
            }),
            Matrix::Sparse(s) => Matrix::Sparse(Sparse::new(
                s.rows,
                s.cols,
                s.triplets.iter().map(|&(i, j, v)| (i, j, v * factor)).collect(),
            )),
        }
    }

    pub fn add(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.rows(), other.rows(), "add: row mismatch");
        assert_eq!(self.cols(), other.cols(), "add: col mismatch");
        match (self, other) {
            (Matrix::Dense(a), Matrix::Dense(b)) => Matrix::Dense(Dense {
                rows: a.rows,
                cols: a.cols,
                data: a.data.iter().zip(&b.data).map(|(x, y)| x + y).collect(),
            }),
            _ => {
                let mut triplets = self.nonzeros();
                triplets.extend(other.nonzeros());
                Matrix::Sparse(Sparse::new(self.rows(), self.cols(), triplets))
            }
        }
    }

    // ── Products ────────────────────────────────────────────────────────

    pub fn matmul(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.cols(),
            other.rows(),
            "matmul: inner dimension mismatch"
        );
        match (self, other) {
            (Matrix::Dense(a), Matrix::Dense(b)) => {
                let mut out = Dense::zeros(a.rows, b.cols);
                for j in 0..b.cols {
                    for k in 0..a.cols {
                        let bkj = b.get(k, j);
                        if bkj == 0.0 {
                            continue;
                        }
                        for i in 0..a.rows {
                            out.data[i + j * a.rows] += a.get(i, k) * bkj;
                        }
                    }
                }
                Matrix::Dense(out)
            }
            _ => {
                // Index the right operand by row, then stream the left triplets.
                let mut rhs_by_row: HashMap<usize, Vec<(usize, f64)>> = HashMap::new();
                for (k, j, v) in other.nonzeros() {
                    rhs_by_row.entry(k).or_default().push((j, v));
                }
                let mut acc: HashMap<(usize, usize), f64> = HashMap::new();
                for (i, k, va) in self.nonzeros() {
                    if let Some(row) = rhs_by_row.get(&k) {
                        for &(j, vb) in row {
                            *acc.entry((i, j)).or_insert(0.0) += va * vb;
                        }
                    }
                }
                let triplets = acc.into_iter().map(|((i, j), v)| (i, j, v)).collect();
                Matrix::Sparse(Sparse::new(self.rows(), other.cols(), triplets))
            }
        }
    }

    /// Place `copies` copies of the matrix along the diagonal. Always sparse.
    pub fn block_diag(&self, copies: usize) -> Matrix {
        let (rows, cols) = (self.rows(), self.cols());
        let base = self.nonzeros();
        let mut triplets = Vec::with_capacity(base.len() * copies);
        for b in 0..copies {
            for &(i, j, v) in &base {
                triplets.push((i + b * rows, j + b * cols, v));
            }
        }
        Matrix::Sparse(Sparse::new(rows * copies, cols * copies, triplets))
    }

    // ── Reshapes and reductions ─────────────────────────────────────────

    /// Reshape into a single column, stacking columns (column-major vec).
    pub fn flatten(&self) -> Matrix {
        let size = self.rows() * self.cols();
        match self {
            Matrix::Dense(d) => Matrix::Dense(Dense {
                rows: size,
                cols: 1,
                data: d.data.clone(),
            }),
            Matrix::Sparse(s) => Matrix::Sparse(Sparse::new(
                size,
                1,
                s.triplets
                    .iter()
                    .map(|&(i, j, v)| (i + j * s.rows, 0, v))
                    .collect(),
            )),
        }
    }

    pub fn transpose(&self) -> Matrix {
        match self {
            Matrix::Dense(d) => {
                let mut out = Dense::zeros(d.cols, d.rows);
                for j in 0..d.cols {
                    for i in 0..d.rows {
                        out.set(j, i, d.get(i, j));
                    }
                }
                Matrix::Dense(out)
            }
            Matrix::Sparse(s) => Matrix::Sparse(Sparse::new(
                s.cols,
                s.rows,
                s.triplets.iter().map(|&(i, j, v)| (j, i, v)).collect(),
            )),
        }
    }

    pub fn sum_all(&self) -> f64 {
        match self {
            Matrix::Dense(d) => d.data.iter().sum(),
            Matrix::Sparse(s) => s.triplets.iter().map(|&(_, _, v)| v).sum(),
        }
    }

    /// Column sums as a 1 x cols row vector.
    pub fn sum_rows(&self) -> Matrix {
        match self {
            Matrix::Dense(d) => {
                let mut out = Dense::zeros(1, d.cols);
                for j in 0..d.cols {
                    out.data[j] = (0..d.rows).map(|i| d.get(i, j)).sum();
                }
                Matrix::Dense(out)
            }
            Matrix::Sparse(s) => Matrix::Sparse(Sparse::new(
                1,
                s.cols,
                s.triplets.iter().map(|&(_, j, v)| (0, j, v)).collect(),
            )),
        }
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Gather the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Matrix {
        match self {
            Matrix::Dense(d) => {
                let mut out = Dense::zeros(rows.len(), d.cols);
                for (new_i, &i) in rows.iter().enumerate() {
                    for j in 0..d.cols {
                        out.set(new_i, j, d.get(i, j));
                    }
                }
                Matrix::Dense(out)
            }
            Matrix::Sparse(s) => {
                let mut row_map: HashMap<usize, Vec<usize>> = HashMap::new();
                for (new_i, &i) in rows.iter().enumerate() {
                    row_map.entry(i).or_default().push(new_i);
                }
                let mut triplets = Vec::new();
                for &(i, j, v) in &s.triplets {
                    if let Some(targets) = row_map.get(&i) {
                        for &new_i in targets {
                            triplets.push((new_i, j, v));
                        }
                    }
                }
                Matrix::Sparse(Sparse::new(rows.len(), s.cols, triplets))
            }
        }
    }

    /// Select the submatrix given by explicit row and column index lists.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Matrix {
        match self {
            Matrix::Dense(d) => {
                let mut out = Dense::zeros(rows.len(), cols.len());
                for (new_j, &j) in cols.iter().enumerate() {
                    for (new_i, &i) in rows.iter().enumerate() {
                        out.set(new_i, new_j, d.get(i, j));
                    }
                }
                Matrix::Dense(out)
            }
            Matrix::Sparse(s) => {
                let mut row_map: HashMap<usize, Vec<usize>> = HashMap::new();
                for (new_i, &i) in rows.iter().enumerate() {
                    row_map.entry(i).or_default().push(new_i);
                }
                let mut col_map: HashMap<usize, Vec<usize>> = HashMap::new();
                for (new_j, &j) in cols.iter().enumerate() {
                    col_map.entry(j).or_default().push(new_j);
                }
                let mut triplets = Vec::new();
                for &(i, j, v) in &s.triplets {
                    if let (Some(ris), Some(cjs)) = (row_map.get(&i), col_map.get(&j)) {
                        for &new_i in ris {
                            for &new_j in cjs {
                                triplets.push((new_i, new_j, v));
                            }
                        }
                    }
                }
                Matrix::Sparse(Sparse::new(rows.len(), cols.len(), triplets))
            }
        }
    }
}
