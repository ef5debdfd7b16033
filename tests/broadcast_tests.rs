use tengrid::backend::Backend;
use tengrid::ops::dispatch::Dispatcher;
use tengrid::ops::{Compat, OpKind, classify, cpu};
use tengrid::tensor;
use tengrid::tensors::{Shape, Tensor, TensorError};

#[test]
fn test_classify_priority_order() {
    // exact match wins over everything, including 1x1 against 1x1
    assert_eq!(classify(Shape::new(2, 3), Shape::new(2, 3), OpKind::Add), Compat::ShapeMatch);
    assert_eq!(classify(Shape::new(1, 1), Shape::new(1, 1), OpKind::Add), Compat::ShapeMatch);
    // a 1x1 right operand is a scalar even when the left is a row or column
    assert_eq!(classify(Shape::new(1, 3), Shape::new(1, 1), OpKind::Add), Compat::IsScalar);
    assert_eq!(classify(Shape::new(3, 1), Shape::new(1, 1), OpKind::Mul), Compat::IsScalar);
    assert_eq!(classify(Shape::new(2, 3), Shape::new(2, 1), OpKind::Add), Compat::ColVector);
    assert_eq!(classify(Shape::new(2, 3), Shape::new(1, 3), OpKind::Add), Compat::RowVector);
    assert_eq!(classify(Shape::new(2, 3), Shape::new(3, 2), OpKind::Add), Compat::Incompatible);
    assert_eq!(classify(Shape::new(2, 3), Shape::new(3, 4), OpKind::MatMul), Compat::ColsRowsMatch);
    assert_eq!(classify(Shape::new(2, 3), Shape::new(2, 3), OpKind::MatMul), Compat::Incompatible);
}

#[test]
fn test_same_shape_addition() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let b = tensor!([[2.0, 4.0, 5.0], [6.0, 1.0, 3.0]]);
    let c = &a + &b;
    assert_eq!(c.shape, a.shape);
    assert_eq!(c.data, vec![3.0, 6.0, 8.0, 10.0, 6.0, 9.0]);
}

#[test]
fn test_scalar_broadcast() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let c = &a + 5.0;
    assert_eq!(c.shape, a.shape);
    assert_eq!(c.data, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);

    // a 1x1 tensor operand takes the same path
    let d = &a * &Tensor::scalar(2.0);
    assert_eq!(d.data, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
}

#[test]
fn test_row_vector_broadcast() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let row = tensor!([[1.0, 2.0, 3.0]]);
    let c = &a + &row;
    assert_eq!(c.shape, a.shape);
    assert_eq!(c.data, vec![2.0, 4.0, 6.0, 5.0, 7.0, 9.0]);
}

#[test]
fn test_column_vector_broadcast() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let col = Tensor::new(Shape::new(2, 1), vec![1.0, 4.0]).unwrap();
    let c = &a + &col;
    assert_eq!(c.shape, a.shape);
    assert_eq!(c.data, vec![2.0, 3.0, 4.0, 8.0, 9.0, 10.0]);
}

#[test]
fn test_subtraction_and_multiplication() {
    let a = tensor!([[5.0, 6.0], [7.0, 8.0]]);
    let b = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!((&a - &b).data, vec![4.0, 4.0, 4.0, 4.0]);
    assert_eq!((&a * &b).data, vec![5.0, 12.0, 21.0, 32.0]);
    assert_eq!((&a / &b).data, vec![5.0, 3.0, 7.0 / 3.0, 2.0]);
}

#[test]
fn test_division_by_zero_yields_nan() {
    let a = tensor!([[1.0, 2.0]]);
    let b = tensor!([[0.0, 0.0]]);
    let c = &a / &b;
    assert!(c.data[0].is_nan());
    assert!(c.data[1].is_nan());

    // zero scalar divisor floods every cell
    let d = &a / 0.0;
    assert!(d.data.iter().all(|v| v.is_nan()));
}

#[test]
fn test_nan_operand_propagates() {
    let a = tensor!([[f64::NAN, 1.0]]);
    let b = tensor!([[1.0, 1.0]]);
    let c = &a + &b;
    assert!(c.data[0].is_nan());
    assert_eq!(c.data[1], 2.0);
}

#[test]
fn test_nan_scalar_floods_output() {
    let a = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    let c = &a + f64::NAN;
    assert_eq!(c.shape, a.shape);
    assert!(c.data.iter().all(|v| v.is_nan()));
}

#[test]
fn test_incompatible_shapes_are_error() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let b = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    let err = Dispatcher::default().elementwise(&a, &b, OpKind::Add).unwrap_err();
    assert_eq!(
        err,
        TensorError::Incompatible { lhs: Shape::new(2, 3), rhs: Shape::new(2, 2) }
    );
}

#[test]
fn test_incompatible_operator_panics() {
    let result = std::panic::catch_unwind(|| {
        let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let b = tensor!([[1.0, 2.0], [3.0, 4.0]]);
        &a + &b
    });
    assert!(result.is_err());
}

#[test]
fn test_scalar_arity_is_error() {
    // the raw kernel rejects a scalar buffer of the wrong length
    let err = cpu::elementwise(&[1.0, 2.0], &[1.0, 2.0], OpKind::Add, Compat::IsScalar)
        .unwrap_err();
    assert_eq!(err, TensorError::ScalarArity { len: 2 });
}

#[test]
fn test_result_keeps_left_shape() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let row = tensor!([[1.0, 2.0, 3.0]]);
    let col = Tensor::new(Shape::new(2, 1), vec![1.0, 2.0]).unwrap();
    assert_eq!((&a + &row).shape, a.shape);
    assert_eq!((&a + &col).shape, a.shape);
    assert_eq!((&a + 1.0).shape, a.shape);
}

#[test]
fn test_gpu_dispatcher_falls_back() {
    // without an accelerator the GPU dispatcher must still produce the
    // CPU result, not an error
    let a = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    let b = tensor!([[10.0, 20.0], [30.0, 40.0]]);
    let c = Dispatcher::new(Backend::Gpu).elementwise(&a, &b, OpKind::Add).unwrap();
    assert_eq!(c.data, vec![11.0, 22.0, 33.0, 44.0]);
}
