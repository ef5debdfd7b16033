//! Parallel CPU backend tensor kernels.
//!
//! # CPU Backend
//!
//! This module provides the CPU implementations of the element-wise kernel
//! set and the two matrix-multiply kernels. It is the default backend for
//! element-wise operations and the fallback for every accelerator path.
//!
//! ## Implemented Kernels
//!
//! - `elementwise`: routes a classified operand pair to one of four
//!   broadcast kernels — same-shape, scalar, column vector, row vector
//! - `matmul_naive`: plain dot-product matmul, one row of output per task
//! - `matmul_tiled`: the same product with the inner dimension blocked into
//!   tiles of [`TILE`], numerically matching the accelerator's tiled kernel
//!   up to summation order
//!
//! ## Parallelism
//!
//! All kernels fan out over independent output cells with
//! [`rayon`](https://docs.rs/rayon) parallel iterators; each output index is
//! written exactly once and no state is shared across cells. Row and column
//! counts are derived from the operand buffer lengths, so the kernels work
//! on raw buffers without a shape argument.
//!
//! ## Numeric Policy
//!
//! Every cell goes through [`crate::ops::apply`]: NaN operands propagate and
//! zero divisors yield NaN. The scalar kernel short-circuits a NaN scalar
//! into an all-NaN output.

use rayon::prelude::*;

use crate::ops::{Compat, OpKind, TILE, apply};
use crate::tensors::TensorError;

/// Runs the element-wise kernel selected by `compat` over two flat buffers.
///
/// `a` is the full-size left operand; `b` is the (possibly broadcast) right
/// operand. The output buffer always has `a.len()` cells, each written
/// exactly once.
///
/// # Errors
/// [`TensorError::ScalarArity`] if `compat` is [`Compat::IsScalar`] and `b`
/// does not hold exactly one value. Raised before any numeric work.
pub fn elementwise(a: &[f64], b: &[f64], op: OpKind, compat: Compat) -> Result<Vec<f64>, TensorError> {
    match compat {
        Compat::IsScalar => with_scalar(a, b, op),
        Compat::ColVector => Ok(with_col_vector(a, b, op)),
        Compat::RowVector => Ok(with_row_vector(a, b, op)),
        _ => Ok(with_same_shape(a, b, op)),
    }
}

/// `out[i] = f(a[i], b[0])`. A NaN scalar floods the output with NaN.
fn with_scalar(a: &[f64], b: &[f64], op: OpKind) -> Result<Vec<f64>, TensorError> {
    if b.len() != 1 {
        return Err(TensorError::ScalarArity { len: b.len() });
    }
    let scalar = b[0];
    if scalar.is_nan() {
        return Ok(vec![f64::NAN; a.len()]);
    }
    Ok(a.par_iter().map(|&x| apply(op, x, scalar)).collect())
}

/// `out[r, c] = f(a[r, c], b[r])`; `b` holds one value per row.
fn with_col_vector(a: &[f64], b: &[f64], op: OpKind) -> Vec<f64> {
    let rows = b.len();
    let cols = a.len() / rows;
    let mut out = vec![0.0; a.len()];
    out.par_chunks_mut(cols).enumerate().for_each(|(r, out_row)| {
        let scalar = b[r];
        for (c, cell) in out_row.iter_mut().enumerate() {
            *cell = apply(op, a[r * cols + c], scalar);
        }
    });
    out
}

/// `out[r, c] = f(a[r, c], b[c])`; `b` holds one value per column.
fn with_row_vector(a: &[f64], b: &[f64], op: OpKind) -> Vec<f64> {
    let cols = b.len();
    let mut out = vec![0.0; a.len()];
    out.par_chunks_mut(cols).enumerate().for_each(|(r, out_row)| {
        for (c, cell) in out_row.iter_mut().enumerate() {
            *cell = apply(op, a[r * cols + c], b[c]);
        }
    });
    out
}

/// `out[i] = f(a[i], b[i])` over equal-length buffers.
fn with_same_shape(a: &[f64], b: &[f64], op: OpKind) -> Vec<f64> {
    a.par_iter()
        .zip(b.par_iter())
        .map(|(&x, &y)| apply(op, x, y))
        .collect()
}

/// Naive matrix multiplication `C = A x B` over flat row-major buffers.
///
/// `A` is `m x k`, `B` is `k x n`, the result is `m x n`. Rows of the output
/// are computed in parallel; each cell is one independent dot product. The
/// caller guarantees the inner dimensions match.
pub fn matmul_naive(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for j in 0..n {
            let mut sum = 0.0;
            for l in 0..k {
                sum += a[i * k + l] * b[l * n + j];
            }
            row[j] = sum;
        }
    });
    out
}

/// Tile-blocked matrix multiplication, the host mirror of the accelerator's
/// tiled kernel.
///
/// The inner dimension is walked in blocks of [`TILE`]; a partial final
/// block is clamped to `k`, so any inner dimension is accepted. Accumulation
/// order within a row matches the tiled accelerator kernel, so the two agree
/// up to per-block summation rounding against [`matmul_naive`].
pub fn matmul_tiled(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for k0 in (0..k).step_by(TILE) {
            let k1 = (k0 + TILE).min(k);
            for (j, cell) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for l in k0..k1 {
                    acc += a[i * k + l] * b[l * n + j];
                }
                *cell += acc;
            }
        }
    });
    out
}
