//! # Operation Layer
//!
//! This module defines the shared operation vocabulary — operation kinds,
//! the broadcast-compatibility verdict, the matmul kernel selector, and the
//! per-cell numeric policy — and hosts the compute backends.
//!
//! ## Submodules
//!
//! - [`cpu`] — Multi-threaded CPU kernels built on `rayon` (default backend
//!   and the fallback for every accelerator path)
//! - [`wgpu`] *(opt-in)* — GPU compute-shader kernels using `wgpu`
//! - [`dispatch`] — The dispatch façade routing operations to a backend
//!
//! ## Backend Selection
//!
//! Element-wise operations run on the device the
//! [`dispatch::Dispatcher`] was configured with. Matrix multiplication is
//! the exception: it is always offered to the accelerator kernel executor
//! first, whatever the configured device, and only runs on the CPU when no
//! executor is available.
//!
//! ## Numeric Policy
//!
//! All kernels on all backends share one per-cell rule, applied through
//! [`apply`]:
//!
//! - a NaN in either operand produces a NaN output cell
//! - division by exact zero produces NaN, never an infinity or a panic
//!
//! ## Extending the Backend
//!
//! To add a new operation kind:
//!
//! 1. Extend [`OpKind`] and [`apply`]
//! 2. Implement it in each backend (`cpu::...`, `wgpu::...`)
//! 3. Route it in [`dispatch`]

pub mod cpu;
pub mod dispatch;
#[cfg(feature = "wgpu")]
pub mod wgpu;

use crate::tensors::Shape;

/// The kind of a binary tensor operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Element-wise addition.
    Add,
    /// Element-wise subtraction.
    Sub,
    /// Element-wise multiplication.
    Mul,
    /// Element-wise division.
    Div,
    /// Matrix multiplication.
    MatMul,
}

/// Shape-compatibility verdict for a pair of operand shapes.
///
/// Determines which kernel pattern applies. Computed fresh for every
/// operation by [`classify`]; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compat {
    /// Operand shapes are equal.
    ShapeMatch,
    /// Right operand is a 1x1 scalar.
    IsScalar,
    /// Right operand is a single column broadcast across all columns.
    ColVector,
    /// Right operand is a single row broadcast across all rows.
    RowVector,
    /// Inner dimensions match for matrix multiplication.
    ColsRowsMatch,
    /// The shapes fit no supported pattern.
    Incompatible,
}

/// Which matrix-multiply kernel variant to launch.
///
/// Both variants compute the same product; the tiled kernel stages 16x16
/// blocks of the operands into shared scratch memory to cut redundant reads
/// across the inner dimension, and differs from the naive kernel only in
/// floating-point summation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatmulKernel {
    /// One independent dot product per output cell.
    #[default]
    Naive,
    /// Tile-blocked kernel with shared-memory reuse (tile size 16).
    Tiled,
}

/// Tile edge length of the blocked matmul kernels, in cells.
pub const TILE: usize = 16;

/// Classifies a pair of operand shapes for the given operation kind.
///
/// Pure function; total over all shape pairs. For element-wise kinds the
/// checks run in priority order — exact match, scalar, column vector, row
/// vector — and the first satisfied condition wins, so a `1x1` right operand
/// against a single-row or single-column left operand is always classified
/// as a scalar.
pub fn classify(lhs: Shape, rhs: Shape, op: OpKind) -> Compat {
    if op == OpKind::MatMul {
        if lhs.cols == rhs.rows {
            return Compat::ColsRowsMatch;
        }
        return Compat::Incompatible;
    }
    if lhs == rhs {
        return Compat::ShapeMatch;
    }
    if rhs.rows == 1 && rhs.cols == 1 {
        return Compat::IsScalar;
    }
    if lhs.rows == rhs.rows && rhs.cols == 1 {
        return Compat::ColVector;
    }
    if lhs.cols == rhs.cols && rhs.rows == 1 {
        return Compat::RowVector;
    }
    Compat::Incompatible
}

/// Applies the per-cell numeric policy shared by every kernel and backend.
///
/// NaN in either operand propagates; a zero divisor yields NaN. `MatMul`
/// never reaches a per-cell kernel, so that arm yields NaN like any other
/// unsupported per-cell kind.
pub(crate) fn apply(op: OpKind, a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    match op {
        OpKind::Add => a + b,
        OpKind::Sub => a - b,
        OpKind::Mul => a * b,
        OpKind::Div => {
            if b == 0.0 {
                f64::NAN
            } else {
                a / b
            }
        }
        OpKind::MatMul => f64::NAN,
    }
}
