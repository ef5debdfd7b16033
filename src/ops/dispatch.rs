//! Operation Dispatch Layer
//!
//! This module routes classified tensor operations to a compute backend.
//!
//! The [`Dispatcher`] holds the configured device as an explicit value —
//! there is no process-global backend state. Element-wise operations run on
//! that device; matrix multiplication is deliberately asymmetric and always
//! rides the accelerator kernel executor first, even when the configured
//! device is the CPU.
//!
//! # Design Highlights
//! - **Classify first**: incompatible operand shapes are rejected before any
//!   kernel runs, and no partial output exists on error
//! - **Fallback logic**: an unavailable or failing accelerator degrades to
//!   the CPU kernels; the failure text is surfaced, not swallowed
//! - **Winning shape**: element-wise results take the left operand's shape,
//!   matmul results take `[rows(A), cols(B)]`
//!
//! # Example
//! ```rust
//! use tengrid::backend::Backend;
//! use tengrid::ops::OpKind;
//! use tengrid::ops::dispatch::Dispatcher;
//! use tengrid::tensor;
//!
//! let dispatcher = Dispatcher::new(Backend::Cpu);
//! let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
//! let b = tensor!([[2.0, 4.0, 5.0], [6.0, 1.0, 3.0]]);
//! let sum = dispatcher.elementwise(&a, &b, OpKind::Add).unwrap();
//! assert_eq!(sum.data, vec![3.0, 6.0, 8.0, 10.0, 6.0, 9.0]);
//! ```

use crate::backend::Backend;
use crate::ops::{Compat, MatmulKernel, OpKind, classify, cpu};
use crate::tensors::{Shape, Tensor, TensorError};

/// The dispatch façade: selects a compute backend per operation.
///
/// Construction fixes the device for element-wise work; the value is
/// read-only afterwards. Cheap to construct and copy — holding one for the
/// life of a program and building one per call are equally fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatcher {
    backend: Backend,
}

impl Dispatcher {
    /// Creates a dispatcher for the given device.
    pub const fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// The configured device.
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Runs a broadcast element-wise operation on the configured device.
    ///
    /// The operands are classified fresh, the verdict picks the kernel
    /// pattern, and the result takes the left operand's shape. A `MatMul`
    /// kind is routed to [`Dispatcher::matmul`].
    ///
    /// # Errors
    /// [`TensorError::Incompatible`] if the shapes fit no broadcast
    /// pattern; [`TensorError::ScalarArity`] if a scalar operand does not
    /// hold exactly one value. Both are raised before any kernel runs.
    pub fn elementwise(&self, a: &Tensor, b: &Tensor, op: OpKind) -> Result<Tensor, TensorError> {
        if op == OpKind::MatMul {
            return self.matmul(a, b);
        }

        let compat = classify(a.shape, b.shape, op);
        if compat == Compat::Incompatible {
            return Err(TensorError::Incompatible { lhs: a.shape, rhs: b.shape });
        }

        if self.backend == Backend::Gpu {
            #[cfg(feature = "wgpu")]
            {
                match super::wgpu::elementwise(&a.data, &b.data, a.shape, op, compat) {
                    Ok(data) => return Tensor::new(a.shape, data),
                    Err(e) => eprintln!("tengrid: accelerator element-wise failed ({e}); using cpu"),
                }
            }
        }

        let data = cpu::elementwise(&a.data, &b.data, op, compat)?;
        Tensor::new(a.shape, data)
    }

    /// Matrix multiplication with the default (naive) kernel variant.
    ///
    /// # Errors
    /// [`TensorError::Incompatible`] unless `a.shape.cols == b.shape.rows`.
    pub fn matmul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
        self.matmul_with(a, b, MatmulKernel::default())
    }

    /// Matrix multiplication with an explicit kernel variant.
    ///
    /// Always offered to the accelerator kernel executor first, whatever the
    /// configured device; the CPU reference kernel of the same variant runs
    /// when no executor is available, after surfacing its diagnostic.
    ///
    /// # Errors
    /// [`TensorError::Incompatible`] unless `a.shape.cols == b.shape.rows`.
    pub fn matmul_with(
        &self,
        a: &Tensor,
        b: &Tensor,
        kernel: MatmulKernel,
    ) -> Result<Tensor, TensorError> {
        if classify(a.shape, b.shape, OpKind::MatMul) != Compat::ColsRowsMatch {
            return Err(TensorError::Incompatible { lhs: a.shape, rhs: b.shape });
        }

        let (m, k, n) = (a.shape.rows, a.shape.cols, b.shape.cols);
        let out_shape = Shape::new(m, n);

        #[cfg(feature = "wgpu")]
        {
            match super::wgpu::matmul(&a.data, &b.data, m, k, n, kernel) {
                Ok(data) => return Tensor::new(out_shape, data),
                Err(e) => eprintln!("tengrid: accelerator matmul failed ({e}); using cpu"),
            }
        }

        let data = match kernel {
            MatmulKernel::Naive => cpu::matmul_naive(&a.data, &b.data, m, k, n),
            MatmulKernel::Tiled => cpu::matmul_tiled(&a.data, &b.data, m, k, n),
        };
        Tensor::new(out_shape, data)
    }
}
