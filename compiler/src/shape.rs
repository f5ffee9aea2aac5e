// shape.rs — 2D shapes for affine expression nodes
//
// Every node in the operator tree carries a logical (rows, cols) shape with
// rows >= 1 and cols >= 1; scalars are (1, 1). Shape consistency across a
// tree is the builder's responsibility — the compiler trusts it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The logical 2D shape of an expression node or declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    /// The scalar shape (1, 1).
    pub const SCALAR: Shape = Shape { rows: 1, cols: 1 };

    pub fn new(rows: usize, cols: usize) -> Self {
        debug_assert!(rows >= 1 && cols >= 1, "shapes have no zero dimensions");
        Shape { rows, cols }
    }

    /// Number of entries in the flattened (vectorized) form.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether this is the promoted scalar shape (1, 1).
    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    /// The shape of the transposed value.
    pub fn transposed(&self) -> Shape {
        Shape {
            rows: self.cols,
            cols: self.rows,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}
