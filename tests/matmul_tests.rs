use rand::Rng;

use tengrid::ops::MatmulKernel;
use tengrid::ops::cpu::{matmul_naive, matmul_tiled};
use tengrid::ops::dispatch::Dispatcher;
use tengrid::tensor;
use tengrid::tensors::{Shape, TensorError};

// Loose enough to absorb f32 accelerator execution and tile summation order.
fn close(x: f64, y: f64) -> bool {
    (x - y).abs() <= 1e-2 * f64::max(1.0, x.abs().max(y.abs()))
}

#[test]
fn test_matmul_2x3_by_3x2() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let b = tensor!([[2.0, 4.0], [5.0, 6.0], [1.0, 3.0]]);
    let c = a.matmul(&b).unwrap();
    assert_eq!(c.shape, Shape::new(2, 2));
    // small integers are exact on every backend, f32 included
    assert_eq!(c.data, vec![15.0, 19.0, 44.0, 55.0]);
}

#[test]
fn test_matmul_kernel_variants_agree() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let b = tensor!([[2.0, 4.0], [5.0, 6.0], [1.0, 3.0]]);
    let d = Dispatcher::default();
    let naive = d.matmul_with(&a, &b, MatmulKernel::Naive).unwrap();
    let tiled = d.matmul_with(&a, &b, MatmulKernel::Tiled).unwrap();
    assert_eq!(naive.data, vec![15.0, 19.0, 44.0, 55.0]);
    assert_eq!(tiled.data, vec![15.0, 19.0, 44.0, 55.0]);
}

#[test]
fn test_matmul_identity() {
    let a = tensor!([[1.5, -2.0], [0.25, 8.0]]);
    let id = tensor!([[1.0, 0.0], [0.0, 1.0]]);
    assert_eq!(a.matmul(&id).unwrap(), a);
    assert_eq!(id.matmul(&a).unwrap(), a);
}

#[test]
fn test_matmul_incompatible_is_error() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let b = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    let err = a.matmul(&b).unwrap_err();
    assert_eq!(
        err,
        TensorError::Incompatible { lhs: Shape::new(2, 3), rhs: Shape::new(2, 2) }
    );
}

#[test]
fn test_tiled_matches_naive_with_partial_tile() {
    // k = 37 leaves a 5-wide remainder after two full tiles
    let (m, k, n) = (9, 37, 11);
    let mut rng = rand::rng();
    let a: Vec<f64> = (0..m * k).map(|_| rng.random_range(-25.0..25.0)).collect();
    let b: Vec<f64> = (0..k * n).map(|_| rng.random_range(-25.0..25.0)).collect();

    let naive = matmul_naive(&a, &b, m, k, n);
    let tiled = matmul_tiled(&a, &b, m, k, n);
    assert_eq!(naive.len(), m * n);
    for (i, (&x, &y)) in naive.iter().zip(tiled.iter()).enumerate() {
        assert!(close(x, y), "cell {i}: naive {x} vs tiled {y}");
    }
}

#[test]
fn test_tiled_matches_naive_with_exact_tiles() {
    let (m, k, n) = (16, 32, 16);
    let mut rng = rand::rng();
    let a: Vec<f64> = (0..m * k).map(|_| rng.random_range(-25.0..25.0)).collect();
    let b: Vec<f64> = (0..k * n).map(|_| rng.random_range(-25.0..25.0)).collect();

    let naive = matmul_naive(&a, &b, m, k, n);
    let tiled = matmul_tiled(&a, &b, m, k, n);
    for (i, (&x, &y)) in naive.iter().zip(tiled.iter()).enumerate() {
        assert!(close(x, y), "cell {i}: naive {x} vs tiled {y}");
    }
}

#[test]
fn test_dispatcher_kernels_agree_on_random_input() {
    let (m, k, n) = (7, 21, 5);
    let mut rng = rand::rng();
    let a_data: Vec<f64> = (0..m * k).map(|_| rng.random_range(-25.0..25.0)).collect();
    let b_data: Vec<f64> = (0..k * n).map(|_| rng.random_range(-25.0..25.0)).collect();
    let a = tengrid::tensors::Tensor::new(Shape::new(m, k), a_data.clone()).unwrap();
    let b = tengrid::tensors::Tensor::new(Shape::new(k, n), b_data.clone()).unwrap();

    let d = Dispatcher::default();
    let naive = d.matmul_with(&a, &b, MatmulKernel::Naive).unwrap();
    let tiled = d.matmul_with(&a, &b, MatmulKernel::Tiled).unwrap();
    let reference = matmul_naive(&a_data, &b_data, m, k, n);

    assert_eq!(naive.shape, Shape::new(m, n));
    for ((&x, &y), &r) in naive.data.iter().zip(tiled.data.iter()).zip(reference.iter()) {
        assert!(close(x, r), "naive {x} vs reference {r}");
        assert!(close(y, r), "tiled {y} vs reference {r}");
    }
}
