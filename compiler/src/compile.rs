// compile.rs — The coefficient compiler
//
// Lowers an affine expression tree to its explicit sparse-matrix form: one
// coefficient block per variable occurrence plus constant contributions,
// using the column-major vectorization convention throughout.
//
// Preconditions: the tree satisfies the builder's shape invariant.
// Postconditions: summing `block * vec(value)` over the variable triples plus
//   the constant triples (reshaped) reproduces the node's vectorized output.
// Failure modes: `CompileError` — malformed trees and unsupported product
//   configurations fail loudly; no partial results are returned.
// Side effects: none; purely functional over the input tree.

use std::fmt;

use crate::coeff::Coeff;
use crate::id::CoeffId;
use crate::interface::MatrixInterface;
use crate::lin_op::{LinOp, LinOpKind};
use crate::shape::Shape;
use crate::slice::SliceDescr;

/// Default recursion guard. Operator trees are built by a modeling layer and
/// are rarely more than a few dozen levels deep; anything past this limit is
/// almost certainly a runaway builder, and failing beats a stack overflow.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

// ── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while compiling an expression tree.
///
/// All of these indicate a malformed or unsupported input tree, not a
/// transient condition: the computation is deterministic, so retrying a
/// failed compile returns the same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An operator received a different number of compiled-child triples
    /// than it supports (e.g. transpose expects exactly one).
    ArityMismatch { expected: usize, found: usize },
    /// A product or slicing case cannot be resolved under the supported
    /// combination rules.
    ShapeInconsistency { message: String },
    /// The tree is deeper than the configured recursion limit.
    RecursionLimit { limit: usize },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::ArityMismatch { expected, found } => {
                write!(
                    f,
                    "operator expects {} coefficient triple(s), found {}",
                    expected, found
                )
            }
            CompileError::ShapeInconsistency { message } => write!(f, "{}", message),
            CompileError::RecursionLimit { limit } => {
                write!(f, "expression tree exceeds recursion limit of {}", limit)
            }
        }
    }
}

impl std::error::Error for CompileError {}

fn shape_error<T>(message: impl Into<String>) -> Result<T, CompileError> {
    Err(CompileError::ShapeInconsistency {
        message: message.into(),
    })
}

// ── Public entry points ─────────────────────────────────────────────────────

/// Compile an expression with the default recursion limit.
pub fn compile<I: MatrixInterface>(
    op: &LinOp<I::Matrix>,
    intf: &I,
) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
    Compiler::new(intf).compile(op)
}

/// The coefficient compiler. Holds the numeric capability and the recursion
/// limit; carries no other state between calls.
pub struct Compiler<'a, I> {
    intf: &'a I,
    max_depth: usize,
}

impl<'a, I: MatrixInterface> Compiler<'a, I> {
    pub fn new(intf: &'a I) -> Self {
        Compiler {
            intf,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(intf: &'a I, max_depth: usize) -> Self {
        Compiler { intf, max_depth }
    }

    /// Compile `op` into its list of coefficient triples.
    pub fn compile(&self, op: &LinOp<I::Matrix>) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        self.node(op, 0)
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    fn node(
        &self,
        op: &LinOp<I::Matrix>,
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        if depth >= self.max_depth {
            return Err(CompileError::RecursionLimit {
                limit: self.max_depth,
            });
        }
        match &op.kind {
            // A variable's own flattened value is the identity map applied
            // to itself.
            LinOpKind::Variable(id) => Ok(vec![Coeff::new(
                CoeffId::Variable(*id),
                op.shape,
                self.intf.identity(op.shape.size()),
            )]),
            LinOpKind::Parameter(value)
            | LinOpKind::DenseConst(value)
            | LinOpKind::SparseConst(value) => Ok(vec![Coeff::new(
                CoeffId::Constant,
                op.shape,
                value.clone(),
            )]),
            LinOpKind::ScalarConst(v) => Ok(vec![Coeff::new(
                CoeffId::Constant,
                op.shape,
                self.intf.scalar(*v),
            )]),
            LinOpKind::Sum(terms) => self.sum(terms, depth),
            LinOpKind::Neg(arg) => self.neg(arg, depth),
            LinOpKind::Mul { lhs, rhs } => self.mul(op.shape, lhs, rhs, depth),
            LinOpKind::SumEntries(arg) => self.sum_entries(arg, depth),
            LinOpKind::Index {
                arg,
                row_key,
                col_key,
            } => self.index(op.shape, arg, row_key, col_key, depth),
            LinOpKind::Transpose(arg) => self.transpose(op.shape, arg, depth),
        }
    }

    // ── Composite cases ─────────────────────────────────────────────────

    /// Linearity: the triples of a sum are the concatenation of its terms'
    /// triples, in term order, without merging duplicate ids.
    fn sum(
        &self,
        terms: &[LinOp<I::Matrix>],
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        let mut coeffs = Vec::new();
        for term in terms {
            coeffs.extend(self.node(term, depth + 1)?);
        }
        Ok(coeffs)
    }

    fn neg(
        &self,
        arg: &LinOp<I::Matrix>,
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        let coeffs = self.node(arg, depth + 1)?;
        Ok(coeffs
            .into_iter()
            .map(|c| Coeff::new(c.id, c.shape, self.intf.neg(&c.block)))
            .collect())
    }

    /// Summing all entries of the output is a projection that can be applied
    /// once, before multiplying by the variable: variable blocks collapse to
    /// their column sums, the constant collapses to a scalar.
    fn sum_entries(
        &self,
        arg: &LinOp<I::Matrix>,
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        let coeffs = self.node(arg, depth + 1)?;
        Ok(coeffs
            .into_iter()
            .map(|c| {
                if c.is_constant() {
                    let total = self.intf.sum_all(&c.block);
                    Coeff::new(c.id, Shape::SCALAR, self.intf.scalar(total))
                } else {
                    Coeff::new(c.id, c.shape, self.intf.sum_rows(&c.block))
                }
            })
            .collect())
    }

    /// Matrix product. The left operand must compile to constants only; a
    /// live variable on the left is unsupported and fails loudly rather than
    /// producing a wrong matrix. Multiple left constant contributions (e.g.
    /// from a sum of constants) are summed before use — they share a shape
    /// because sum terms do.
    fn mul(
        &self,
        shape: Shape,
        lhs: &LinOp<I::Matrix>,
        rhs: &LinOp<I::Matrix>,
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        let lh_coeffs = self.node(lhs, depth + 1)?;
        let rh_coeffs = self.node(rhs, depth + 1)?;

        if lh_coeffs.iter().any(|c| !c.is_constant()) {
            return shape_error(
                "left operand of a product carries variable terms; \
                 only constant-left products are supported",
            );
        }
        let (first, rest) = match lh_coeffs.split_first() {
            Some(split) => split,
            None => return shape_error("left operand of a product compiled to no coefficients"),
        };
        let lh_shape = first.shape;
        let mut constant = first.block.clone();
        for c in rest {
            if c.shape != lh_shape {
                return shape_error(format!(
                    "left operand of a product mixes constant shapes {} and {}",
                    lh_shape, c.shape
                ));
            }
            constant = self.intf.add(&constant, &c.block);
        }

        let cols = shape.cols;
        let mut coeffs = Vec::with_capacity(rh_coeffs.len());
        for c in rh_coeffs {
            let block = if self.intf.is_scalar(&constant) || c.is_constant() || cols == 1 {
                // Scalar factor, constant right side, or single-column
                // output: the blocks multiply directly.
                self.mul_blocks(&constant, &c.block)
            } else if !lh_shape.is_scalar()
                && c.shape.is_scalar()
                && self.intf.is_scalar(&c.block)
            {
                // A bare promoted scalar variable on the right: the
                // constant, flattened to a column, scales the variable.
                self.mul_blocks(&self.intf.flatten(&constant), &c.block)
            } else {
                // General case: one independent copy of the constant per
                // output column of the vectorized right side. A nested
                // promoted-scalar product lands here too: its block is the
                // vec of the inner product, one column per output column.
                let diag = self.intf.block_diag(&constant, cols);
                if self.intf.cols(&diag) != self.intf.rows(&c.block) {
                    return shape_error(format!(
                        "product blocks are not conformable: {}x{} against {}x{}",
                        self.intf.rows(&diag),
                        self.intf.cols(&diag),
                        self.intf.rows(&c.block),
                        self.intf.cols(&c.block),
                    ));
                }
                self.intf.matmul(&diag, &c.block)
            };
            let out_shape = if c.is_constant() { shape } else { c.shape };
            coeffs.push(Coeff::new(c.id, out_shape, block));
        }
        Ok(coeffs)
    }

    /// Multiply two blocks, treating a 1x1 operand as a scalar factor.
    fn mul_blocks(&self, a: &I::Matrix, b: &I::Matrix) -> I::Matrix {
        if self.intf.is_scalar(a) {
            self.intf.scale(b, self.intf.scalar_value(a))
        } else if self.intf.is_scalar(b) {
            self.intf.scale(a, self.intf.scalar_value(b))
        } else {
            self.intf.matmul(a, b)
        }
    }

    /// Slicing. Constants are sliced directly. A variable block's row
    /// dimension linearizes (output row, output column) pairs column-major:
    /// one stacked block of `arg.rows` rows per output column. The column
    /// descriptor selects which blocks participate; the row descriptor is
    /// applied inside each selected block, offset by the block's position.
    fn index(
        &self,
        shape: Shape,
        arg: &LinOp<I::Matrix>,
        row_key: &SliceDescr,
        col_key: &SliceDescr,
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        let coeffs = self.node(arg, depth + 1)?;
        let arg_rows = arg.shape.rows;
        let mut out = Vec::with_capacity(coeffs.len());
        for c in coeffs {
            if c.is_constant() {
                let block = self.intf.slice(&c.block, row_key, col_key);
                out.push(Coeff::new(c.id, shape, block));
            } else {
                let mut rows = Vec::with_capacity(shape.size());
                for block_idx in col_key.indices() {
                    let offset = block_idx * arg_rows;
                    for r in row_key.indices() {
                        rows.push(offset + r);
                    }
                }
                let block = self.intf.select_rows(&c.block, &rows);
                out.push(Coeff::new(c.id, c.shape, block));
            }
        }
        Ok(out)
    }

    /// Transpose. Supported for a single contribution only: build the
    /// permutation `P` with `P[row*cols + col, col*rows + row] = 1` for the
    /// argument's (rows, cols), so that `P * vec(A) = vec(A^T)` under
    /// column-major vec, and compose it with the existing block. For a bare
    /// variable the existing block is the identity, so the result is `P`
    /// itself.
    fn transpose(
        &self,
        shape: Shape,
        arg: &LinOp<I::Matrix>,
        depth: usize,
    ) -> Result<Vec<Coeff<I::Matrix>>, CompileError> {
        let mut coeffs = self.node(arg, depth + 1)?;
        if coeffs.len() != 1 {
            return Err(CompileError::ArityMismatch {
                expected: 1,
                found: coeffs.len(),
            });
        }
        let c = coeffs.remove(0);
        if c.is_constant() {
            // Transposing a constant term needs no permutation machinery.
            let block = self.intf.transpose(&c.block);
            return Ok(vec![Coeff::new(c.id, shape, block)]);
        }
        let (rows, cols) = (arg.shape.rows, arg.shape.cols);
        let n = rows * cols;
        let mut triplets = Vec::with_capacity(n);
        for row in 0..rows {
            for col in 0..cols {
                triplets.push((row * cols + col, col * rows + row, 1.0));
            }
        }
        let perm = self.intf.sparse(n, n, &triplets);
        let block = self.intf.matmul(&perm, &c.block);
        Ok(vec![Coeff::new(c.id, c.shape, block)])
    }
}
