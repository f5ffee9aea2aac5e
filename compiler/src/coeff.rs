// coeff.rs — Coefficient triples and same-id aggregation
//
// A compiled expression is a list of additive contributions. For a variable
// contribution, `block` is the linear map from the variable's vectorized
// value to the expression's vectorized output. For the constant contribution,
// `block` is the constant term itself, shaped like the expression.
//
// The compiler may emit the same id more than once (SUM concatenates without
// merging); the decomposition is additive, so summing same-id blocks is
// always valid.

use crate::id::CoeffId;
use crate::interface::MatrixInterface;
use crate::shape::Shape;

/// One additive contribution to an expression's vectorized output.
#[derive(Debug, Clone, PartialEq)]
pub struct Coeff<M> {
    pub id: CoeffId,
    /// The variable's declared (promoted) shape, or the constant term's shape.
    pub shape: Shape,
    pub block: M,
}

impl<M> Coeff<M> {
    pub fn new(id: CoeffId, shape: Shape, block: M) -> Self {
        Coeff { id, shape, block }
    }

    pub fn is_constant(&self) -> bool {
        self.id.is_constant()
    }
}

/// Group triples by id, summing same-id blocks elementwise. First-appearance
/// order is preserved, so output is deterministic. The constant group's sum
/// is a plain value accumulation; the shared elementwise add covers both.
pub fn aggregate<I: MatrixInterface>(
    coeffs: Vec<Coeff<I::Matrix>>,
    intf: &I,
) -> Vec<Coeff<I::Matrix>> {
    let mut merged: Vec<Coeff<I::Matrix>> = Vec::new();
    for coeff in coeffs {
        match merged.iter_mut().find(|c| c.id == coeff.id) {
            Some(existing) => existing.block = intf.add(&existing.block, &coeff.block),
            None => merged.push(coeff),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Matrix;
    use crate::id::VarId;
    use crate::interface::NativeInterface;

    #[test]
    fn aggregate_sums_duplicate_ids() {
        let intf = NativeInterface;
        let shape = Shape::new(2, 2);
        let coeffs = vec![
            Coeff::new(CoeffId::Variable(VarId(0)), shape, Matrix::identity(4)),
            Coeff::new(CoeffId::Constant, Shape::SCALAR, Matrix::scalar(1.0)),
            Coeff::new(CoeffId::Variable(VarId(0)), shape, Matrix::identity(4)),
        ];
        let merged = aggregate(coeffs, &intf);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, CoeffId::Variable(VarId(0)));
        assert!(merged[0]
            .block
            .approx_eq(&Matrix::identity(4).scale(2.0), 1e-12));
    }

    #[test]
    fn aggregate_preserves_first_appearance_order() {
        let intf = NativeInterface;
        let shape = Shape::SCALAR;
        let coeffs = vec![
            Coeff::new(CoeffId::Constant, shape, Matrix::scalar(1.0)),
            Coeff::new(CoeffId::Variable(VarId(3)), shape, Matrix::identity(1)),
            Coeff::new(CoeffId::Constant, shape, Matrix::scalar(2.0)),
        ];
        let merged = aggregate(coeffs, &intf);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, CoeffId::Constant);
        assert_eq!(merged[0].block.scalar_value(), 3.0);
        assert_eq!(merged[1].id, CoeffId::Variable(VarId(3)));
    }
}
