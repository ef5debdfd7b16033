//! tengrid: a minimal 2-D tensor engine in Rust.
//!
//! Element-wise arithmetic with NumPy-style broadcasting, matrix
//! multiplication, and slice-based view/assignment over a flat row-major
//! buffer, dispatched across two interchangeable compute backends: a
//! parallel CPU backend built on `rayon`, and a GPU compute-kernel backend
//! built on `wgpu` (feature `wgpu`).
//!
//! # Features
//!
//! - Fixed-rank 2-D tensors with checked construction and typed errors.
//! - Broadcast classification (exact match, scalar, column vector, row
//!   vector) with a fixed priority order.
//! - Four element-wise kernels sharing one numeric policy: NaN operands
//!   propagate, division by zero yields NaN — never a panic or an infinity.
//! - Matrix multiplication in two numerically-consistent kernel variants
//!   (naive and 16x16 tiled), always offered to the accelerator first and
//!   falling back to the CPU reference.
//! - Row, column, and submatrix views supporting materialize and assign.
//!
//! # Modules
//!
//! - [`tensors`] — Core tensor type, shape model, views, typed errors.
//! - [`backend`] — The device selection enum.
//! - [`ops`] — Operation vocabulary, numeric policy, compute backends, and
//!   the dispatch façade.
//!
//! # Example
//!
//! ```rust
//! use tengrid::tensor;
//!
//! let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
//! let b = tensor!([[2.0, 4.0], [5.0, 6.0], [1.0, 3.0]]);
//!
//! let shifted = &a + 5.0;
//! assert_eq!(shifted.data, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
//!
//! let product = a.matmul(&b).unwrap();
//! assert_eq!(product.data, vec![15.0, 19.0, 44.0, 55.0]);
//! ```

pub mod backend;
pub mod ops;
pub mod tensors;
