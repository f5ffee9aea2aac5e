// End-to-end coefficient compilation cases.
//
// Exercises the compiler through the public API on small concrete
// expressions, including the downstream aggregation step that merges
// duplicate variable contributions.

use amc::algebra::{Dense, Matrix};
use amc::coeff::aggregate;
use amc::compile::{compile, CompileError, Compiler};
use amc::id::{CoeffId, VarId};
use amc::interface::NativeInterface;
use amc::lin_op::LinOp;
use amc::shape::Shape;
use amc::slice::SliceDescr;

const TOL: f64 = 1e-12;

fn dense(rows: usize, cols: usize, entries: &[f64]) -> Matrix {
    Matrix::Dense(Dense::from_row_major(rows, cols, entries))
}

fn var(id: u32, rows: usize, cols: usize) -> LinOp<Matrix> {
    LinOp::variable(VarId(id), Shape::new(rows, cols))
}

#[test]
fn affine_expression_aggregates_to_one_block_per_variable() {
    // 2*x + c + x for x of shape (2, 1): one merged block [[3,0],[0,3]]
    // plus the constant c.
    let x = var(0, 2, 1);
    let c = dense(2, 1, &[5.0, 7.0]);
    let expr = LinOp::sum(vec![
        LinOp::mul(LinOp::scalar_const(2.0), x.clone(), Shape::new(2, 1)),
        LinOp::dense_const(c.clone(), Shape::new(2, 1)),
        x,
    ]);
    let coeffs = compile(&expr, &NativeInterface).unwrap();
    assert_eq!(coeffs.len(), 3);

    let merged = aggregate(coeffs, &NativeInterface);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, CoeffId::Variable(VarId(0)));
    assert!(merged[0]
        .block
        .approx_eq(&Matrix::identity(2).scale(3.0), TOL));
    assert_eq!(merged[1].id, CoeffId::Constant);
    assert!(merged[1].block.approx_eq(&c, TOL));
}

#[test]
fn two_variables_stay_separate_after_aggregation() {
    let expr = LinOp::sum(vec![var(0, 2, 1), LinOp::neg(var(1, 2, 1))]);
    let merged = aggregate(compile(&expr, &NativeInterface).unwrap(), &NativeInterface);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, CoeffId::Variable(VarId(0)));
    assert!(merged[0].block.approx_eq(&Matrix::identity(2), TOL));
    assert_eq!(merged[1].id, CoeffId::Variable(VarId(1)));
    assert!(merged[1].block.approx_eq(&Matrix::identity(2).neg(), TOL));
}

#[test]
fn sliced_product_composes_selection_with_the_product_map() {
    // (A * x)[0:1, 0:2] for A (2x2), x (2x2): first row of each column.
    let a = dense(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let x = var(0, 2, 2);
    let prod = LinOp::mul(
        LinOp::dense_const(a, Shape::new(2, 2)),
        x,
        Shape::new(2, 2),
    );
    let expr = LinOp::index(prod, SliceDescr::new(0, 1, 1), SliceDescr::full(2));
    let coeffs = compile(&expr, &NativeInterface).unwrap();
    assert_eq!(coeffs.len(), 1);
    // Rows 0 and 2 of blockdiag(A, 2): [1 2 0 0; 0 0 1 2].
    let expected = dense(
        2,
        4,
        &[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0],
    );
    assert!(coeffs[0].block.approx_eq(&expected, TOL));
}

#[test]
fn transpose_then_slice_walks_the_permuted_layout() {
    // x^T[0:1, 0:2] of x (2, 2) selects x[0,0] and x[1,0].
    let x = var(0, 2, 2);
    let expr = LinOp::index(
        LinOp::transpose(x),
        SliceDescr::new(0, 1, 1),
        SliceDescr::full(2),
    );
    let coeffs = compile(&expr, &NativeInterface).unwrap();
    let expected = dense(
        2,
        4,
        &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    );
    assert!(coeffs[0].block.approx_eq(&expected, TOL));
}

#[test]
fn parameter_values_flow_through_like_constants() {
    // p + x where p is a parameter snapshot.
    let p_val = dense(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let expr = LinOp::sum(vec![
        LinOp::parameter(p_val.clone(), Shape::new(2, 2)),
        var(0, 2, 2),
    ]);
    let merged = aggregate(compile(&expr, &NativeInterface).unwrap(), &NativeInterface);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, CoeffId::Constant);
    assert!(merged[0].block.approx_eq(&p_val, TOL));
}

#[test]
fn nonlinear_product_fails_loudly() {
    // x * y has live variables on both sides; the compiler must refuse
    // rather than emit a wrong matrix.
    let expr = LinOp::mul(var(0, 2, 2), var(1, 2, 2), Shape::new(2, 2));
    match compile(&expr, &NativeInterface) {
        Err(CompileError::ShapeInconsistency { message }) => {
            assert!(message.contains("variable"));
        }
        other => panic!("expected ShapeInconsistency, got {:?}", other),
    }
}

#[test]
fn recursion_limit_is_configurable() {
    let mut expr = var(0, 1, 1);
    for _ in 0..100 {
        expr = LinOp::neg(expr);
    }
    let intf = NativeInterface;
    assert!(Compiler::with_max_depth(&intf, 50).compile(&expr).is_err());
    assert!(Compiler::with_max_depth(&intf, 200).compile(&expr).is_ok());
}

#[test]
fn errors_format_for_diagnostics() {
    let err = CompileError::ArityMismatch {
        expected: 1,
        found: 3,
    };
    assert_eq!(
        err.to_string(),
        "operator expects 1 coefficient triple(s), found 3"
    );
    let err = CompileError::RecursionLimit { limit: 16 };
    assert!(err.to_string().contains("16"));
}
