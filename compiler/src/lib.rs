// amc — Affine Matrix Compiler
//
// Lowers trees of abstract linear operators to explicit sparse-matrix
// coefficients: one block per variable plus an aggregate constant term.

pub mod algebra;
pub mod coeff;
pub mod compile;
pub mod id;
pub mod interface;
pub mod lin_op;
pub mod shape;
pub mod slice;
