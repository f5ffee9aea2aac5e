// lin_op.rs — The affine expression IR
//
// An expression is an immutable tree of linear operator nodes, each tagged
// with its output shape. Trees come from an external builder (a modeling
// layer); this crate only reads them. The builder guarantees the shape
// invariant: every node's declared shape is consistent with its children
// under the operator's algebraic rule. The compiler trusts that invariant
// and does not re-derive shapes.

use crate::id::VarId;
use crate::shape::Shape;
use crate::slice::SliceDescr;

/// One node of the affine expression tree, generic over the matrix type `M`
/// used for constant payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct LinOp<M> {
    pub shape: Shape,
    pub kind: LinOpKind<M>,
}

/// Operator kinds. A closed enum: dispatch over it is exhaustive, so an
/// unrecognized operator is a compile error here, not a runtime fallthrough.
#[derive(Debug, Clone, PartialEq)]
pub enum LinOpKind<M> {
    /// An unknown variable with a declared shape.
    Variable(VarId),
    /// A parameter's current value, snapshotted by the builder.
    Parameter(M),
    /// A scalar literal.
    ScalarConst(f64),
    /// A dense constant matrix.
    DenseConst(M),
    /// A sparse constant matrix.
    SparseConst(M),
    /// Elementwise sum of same-shaped children.
    Sum(Vec<LinOp<M>>),
    /// Elementwise negation.
    Neg(Box<LinOp<M>>),
    /// Matrix product `lhs * rhs`.
    Mul {
        lhs: Box<LinOp<M>>,
        rhs: Box<LinOp<M>>,
    },
    /// Sum of all entries, producing a scalar.
    SumEntries(Box<LinOp<M>>),
    /// Row/column slicing of the argument.
    Index {
        arg: Box<LinOp<M>>,
        row_key: SliceDescr,
        col_key: SliceDescr,
    },
    /// Matrix transpose.
    Transpose(Box<LinOp<M>>),
}

impl<M> LinOp<M> {
    pub fn variable(id: VarId, shape: Shape) -> Self {
        LinOp {
            shape,
            kind: LinOpKind::Variable(id),
        }
    }

    pub fn parameter(value: M, shape: Shape) -> Self {
        LinOp {
            shape,
            kind: LinOpKind::Parameter(value),
        }
    }

    pub fn scalar_const(v: f64) -> Self {
        LinOp {
            shape: Shape::SCALAR,
            kind: LinOpKind::ScalarConst(v),
        }
    }

    pub fn dense_const(value: M, shape: Shape) -> Self {
        LinOp {
            shape,
            kind: LinOpKind::DenseConst(value),
        }
    }

    pub fn sparse_const(value: M, shape: Shape) -> Self {
        LinOp {
            shape,
            kind: LinOpKind::SparseConst(value),
        }
    }

    /// Sum of same-shaped terms. `terms` must be non-empty.
    pub fn sum(terms: Vec<LinOp<M>>) -> Self {
        debug_assert!(!terms.is_empty(), "sum requires at least one term");
        let shape = terms[0].shape;
        LinOp {
            shape,
            kind: LinOpKind::Sum(terms),
        }
    }

    pub fn neg(arg: LinOp<M>) -> Self {
        LinOp {
            shape: arg.shape,
            kind: LinOpKind::Neg(Box::new(arg)),
        }
    }

    /// Matrix product. The output shape is declared by the builder because
    /// scalar promotion (e.g. matrix times promoted scalar variable) is
    /// decided there, not re-derived here.
    pub fn mul(lhs: LinOp<M>, rhs: LinOp<M>, shape: Shape) -> Self {
        LinOp {
            shape,
            kind: LinOpKind::Mul {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }

    pub fn sum_entries(arg: LinOp<M>) -> Self {
        LinOp {
            shape: Shape::SCALAR,
            kind: LinOpKind::SumEntries(Box::new(arg)),
        }
    }

    /// Slice of `arg` by per-axis descriptors. The output shape follows from
    /// the descriptor lengths.
    pub fn index(arg: LinOp<M>, row_key: SliceDescr, col_key: SliceDescr) -> Self {
        let shape = Shape::new(row_key.len(), col_key.len());
        LinOp {
            shape,
            kind: LinOpKind::Index {
                arg: Box::new(arg),
                row_key,
                col_key,
            },
        }
    }

    pub fn transpose(arg: LinOp<M>) -> Self {
        let shape = arg.shape.transposed();
        LinOp {
            shape,
            kind: LinOpKind::Transpose(Box::new(arg)),
        }
    }
}
