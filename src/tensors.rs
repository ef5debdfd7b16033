//! Core tensor data structures.
//!
//! # Core Tensor Utilities
//!
//! This module defines the 2-D tensor type at the heart of the engine, its
//! shape model, and the view/proxy surface for slice-based access.
//!
//! It supports:
//! - Construction of 2-D tensors with a `[rows, cols]` shape and a flat
//!   row-major data buffer
//! - Element-wise arithmetic with NumPy-style broadcasting (scalar, row
//!   vector, column vector, same shape), via [`crate::ops::dispatch`]
//! - Matrix multiplication
//! - Row, column, and submatrix views that can be materialized into owned
//!   tensors or assigned from one
//! - A `tensor!` macro for 2-D literals
//!
//! ## Design Highlights
//! - Shape is a fixed-rank pair (`rows`, `cols`), both strictly positive,
//!   and `data.len() == rows * cols` holds for every constructed tensor
//! - Tensors are value types: `Clone` copies the buffer, moves transfer it
//! - Element-wise operators return new tensors; mutation happens only through
//!   `set`/`IndexMut` and view assignment
//! - All contract violations surface as [`TensorError`], never as aborts
//!
//! ## Example
//!
//! ```rust
//! use tengrid::tensors::{Shape, Tensor};
//! let t = Tensor::new(Shape::new(2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(t.shape.rows, 2);
//! assert_eq!(t.shape.cols, 3);
//! ```

use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul, Range, Sub};

use crate::ops::OpKind;
use crate::ops::dispatch::Dispatcher;

/// Fixed-rank shape of a 2-D tensor.
///
/// Both dimensions are strictly positive for every constructed [`Tensor`];
/// `Shape` itself is a plain value and carries no invariant of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Shape {
    /// Creates a shape from row and column counts.
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of elements a tensor of this shape holds.
    pub const fn numel(&self) -> usize {
        self.rows * self.cols
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Errors raised by tensor construction, operations, and view assignment.
///
/// Every fatal contract violation in the engine maps to one of these
/// variants; numeric edge cases (NaN operands, zero divisors) are *not*
/// errors and resolve to NaN output cells instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// Data length does not match the shape product, or a dimension is zero.
    ShapeMismatch {
        /// The declared shape.
        shape: Shape,
        /// The number of data elements supplied.
        len: usize,
    },
    /// A 2-D literal has rows of unequal length.
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// The operand shapes fit none of the broadcast patterns.
    Incompatible {
        /// Left operand shape.
        lhs: Shape,
        /// Right operand shape.
        rhs: Shape,
    },
    /// A scalar operand buffer does not hold exactly one value.
    ScalarArity {
        /// The number of values it holds.
        len: usize,
    },
    /// A view assignment source does not match the addressed region.
    ViewShapeMismatch {
        /// Shape of the addressed region.
        expected: Shape,
        /// Shape of the source tensor.
        found: Shape,
    },
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorError::ShapeMismatch { shape, len } => {
                write!(f, "shape {shape} is incompatible with {len} data elements")
            }
            TensorError::RaggedRows { row, expected, found } => {
                write!(f, "row {row} has {found} elements, expected {expected}")
            }
            TensorError::Incompatible { lhs, rhs } => {
                write!(f, "operand shapes {lhs} and {rhs} are incompatible")
            }
            TensorError::ScalarArity { len } => {
                write!(f, "scalar operand must hold exactly one value, found {len}")
            }
            TensorError::ViewShapeMismatch { expected, found } => {
                write!(f, "source shape {found} does not match target region {expected}")
            }
        }
    }
}

impl std::error::Error for TensorError {}

/// A 2-D tensor: a shape plus a flat, row-major, owned data buffer.
///
/// The invariant `data.len() == shape.numel()` holds for every value of this
/// type; all construction paths check it and fail with
/// [`TensorError::ShapeMismatch`] otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// The `[rows, cols]` shape.
    pub shape: Shape,
    /// Flattened cell values in row-major order.
    pub data: Vec<f64>,
}

impl Tensor {
    /// Creates a tensor with the given shape and flat row-major data.
    ///
    /// # Errors
    /// [`TensorError::ShapeMismatch`] if either dimension is zero or the
    /// data length differs from `shape.numel()`.
    pub fn new(shape: Shape, data: Vec<f64>) -> Result<Self, TensorError> {
        if shape.rows == 0 || shape.cols == 0 || data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch { shape, len: data.len() });
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor from nested row vectors.
    ///
    /// # Errors
    /// [`TensorError::ShapeMismatch`] on empty input,
    /// [`TensorError::RaggedRows`] if rows have unequal lengths.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TensorError> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(TensorError::RaggedRows {
                    row: i,
                    expected: ncols,
                    found: row.len(),
                });
            }
        }
        let mut data = Vec::with_capacity(nrows * ncols);
        for row in rows {
            data.extend(row);
        }
        Self::new(Shape::new(nrows, ncols), data)
    }

    /// Creates a tensor of the given shape filled with zeros.
    ///
    /// # Errors
    /// [`TensorError::ShapeMismatch`] if either dimension is zero.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self, TensorError> {
        Self::filled(rows, cols, 0.0)
    }

    /// Creates a tensor of the given shape filled with one value.
    ///
    /// # Errors
    /// [`TensorError::ShapeMismatch`] if either dimension is zero.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Result<Self, TensorError> {
        let shape = Shape::new(rows, cols);
        Self::new(shape, vec![value; shape.numel()])
    }

    /// Wraps a single value as a 1x1 tensor, the form scalar operands take.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Shape::new(1, 1),
            data: vec![value],
        }
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Reads the cell at `(row, col)`.
    ///
    /// # Panics
    /// Panics if either index is out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self[(row, col)]
    }

    /// Writes the cell at `(row, col)`.
    ///
    /// # Panics
    /// Panics if either index is out of range.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] = value;
    }

    /// A read-only view of row `index` (shape `1 x cols`).
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn row(&self, index: usize) -> TensorView<'_> {
        TensorView { parent: self, region: Region::row(self.shape, index) }
    }

    /// A writable view of row `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn row_mut(&mut self, index: usize) -> TensorViewMut<'_> {
        let region = Region::row(self.shape, index);
        TensorViewMut { parent: self, region }
    }

    /// A read-only view of column `index` (shape `rows x 1`).
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn column(&self, index: usize) -> TensorView<'_> {
        TensorView { parent: self, region: Region::column(self.shape, index) }
    }

    /// A writable view of column `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn column_mut(&mut self, index: usize) -> TensorViewMut<'_> {
        let region = Region::column(self.shape, index);
        TensorViewMut { parent: self, region }
    }

    /// A read-only view of the rectangle `rows x cols` (half-open ranges).
    ///
    /// # Panics
    /// Panics if either range is empty or exceeds the tensor bounds.
    pub fn submatrix(&self, rows: Range<usize>, cols: Range<usize>) -> TensorView<'_> {
        TensorView { parent: self, region: Region::submatrix(self.shape, rows, cols) }
    }

    /// A writable view of the rectangle `rows x cols` (half-open ranges).
    ///
    /// # Panics
    /// Panics if either range is empty or exceeds the tensor bounds.
    pub fn submatrix_mut(&mut self, rows: Range<usize>, cols: Range<usize>) -> TensorViewMut<'_> {
        let region = Region::submatrix(self.shape, rows, cols);
        TensorViewMut { parent: self, region }
    }

    /// Matrix multiplication `self @ rhs` on the default dispatcher.
    ///
    /// The multiply always rides the accelerator kernel executor when one is
    /// available, regardless of the configured element-wise device; see
    /// [`Dispatcher::matmul`].
    ///
    /// # Errors
    /// [`TensorError::Incompatible`] unless `self.shape.cols == rhs.shape.rows`.
    pub fn matmul(&self, rhs: &Tensor) -> Result<Tensor, TensorError> {
        Dispatcher::default().matmul(self, rhs)
    }
}

impl Index<(usize, usize)> for Tensor {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.shape.rows, "row index {row} out of range for {}", self.shape);
        assert!(col < self.shape.cols, "column index {col} out of range for {}", self.shape);
        &self.data[row * self.shape.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Tensor {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(row < self.shape.rows, "row index {row} out of range for {}", self.shape);
        assert!(col < self.shape.cols, "column index {col} out of range for {}", self.shape);
        &mut self.data[row * self.shape.cols + col]
    }
}

/// The region of a parent tensor a view addresses.
///
/// A tagged variant over row, column, and rectangular access, carrying the
/// index arithmetic for mapping region cells to flat parent indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// A single row.
    Row(usize),
    /// A single column.
    Column(usize),
    /// A rectangle of half-open row and column ranges.
    Submatrix {
        /// Row range `[start, end)`.
        rows: Range<usize>,
        /// Column range `[start, end)`.
        cols: Range<usize>,
    },
}

impl Region {
    fn row(parent: Shape, index: usize) -> Self {
        assert!(index < parent.rows, "row index {index} out of range for {parent}");
        Region::Row(index)
    }

    fn column(parent: Shape, index: usize) -> Self {
        assert!(index < parent.cols, "column index {index} out of range for {parent}");
        Region::Column(index)
    }

    fn submatrix(parent: Shape, rows: Range<usize>, cols: Range<usize>) -> Self {
        assert!(
            rows.start < rows.end && rows.end <= parent.rows,
            "row range {rows:?} invalid for {parent}"
        );
        assert!(
            cols.start < cols.end && cols.end <= parent.cols,
            "column range {cols:?} invalid for {parent}"
        );
        Region::Submatrix { rows, cols }
    }

    /// Shape of the addressed region within a parent of shape `parent`.
    pub fn shape(&self, parent: Shape) -> Shape {
        match self {
            Region::Row(_) => Shape::new(1, parent.cols),
            Region::Column(_) => Shape::new(parent.rows, 1),
            Region::Submatrix { rows, cols } => Shape::new(rows.len(), cols.len()),
        }
    }

    fn copy_out(&self, parent: &Tensor) -> Tensor {
        let shape = self.shape(parent.shape);
        let stride = parent.shape.cols;
        let mut data = Vec::with_capacity(shape.numel());
        match self {
            Region::Row(i) => {
                data.extend_from_slice(&parent.data[i * stride..i * stride + stride]);
            }
            Region::Column(j) => {
                for i in 0..parent.shape.rows {
                    data.push(parent.data[i * stride + j]);
                }
            }
            Region::Submatrix { rows, cols } => {
                for i in rows.clone() {
                    data.extend_from_slice(
                        &parent.data[i * stride + cols.start..i * stride + cols.end],
                    );
                }
            }
        }
        Tensor { shape, data }
    }

    fn copy_in(&self, parent: &mut Tensor, src: &Tensor) -> Result<(), TensorError> {
        let expected = self.shape(parent.shape);
        if src.shape != expected {
            return Err(TensorError::ViewShapeMismatch { expected, found: src.shape });
        }
        let stride = parent.shape.cols;
        match self {
            Region::Row(i) => {
                parent.data[i * stride..i * stride + stride].copy_from_slice(&src.data);
            }
            Region::Column(j) => {
                for i in 0..parent.shape.rows {
                    parent.data[i * stride + j] = src.data[i];
                }
            }
            Region::Submatrix { rows, cols } => {
                for (src_row, i) in rows.clone().enumerate() {
                    let dst = &mut parent.data[i * stride + cols.start..i * stride + cols.end];
                    dst.copy_from_slice(&src.data[src_row * cols.len()..(src_row + 1) * cols.len()]);
                }
            }
        }
        Ok(())
    }
}

/// A transient, read-only reference into a region of a tensor.
///
/// Borrows the parent for its lifetime and owns nothing.
#[derive(Debug)]
pub struct TensorView<'a> {
    parent: &'a Tensor,
    region: Region,
}

impl TensorView<'_> {
    /// Shape of the addressed region.
    pub fn shape(&self) -> Shape {
        self.region.shape(self.parent.shape)
    }

    /// Copies the addressed cells into a freshly owned tensor.
    pub fn materialize(&self) -> Tensor {
        self.region.copy_out(self.parent)
    }
}

/// A transient, writable reference into a region of a tensor.
///
/// Supports both materializing the region and overwriting it from a source
/// tensor of exactly the region's shape.
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    parent: &'a mut Tensor,
    region: Region,
}

impl TensorViewMut<'_> {
    /// Shape of the addressed region.
    pub fn shape(&self) -> Shape {
        self.region.shape(self.parent.shape)
    }

    /// Copies the addressed cells into a freshly owned tensor.
    pub fn materialize(&self) -> Tensor {
        self.region.copy_out(self.parent)
    }

    /// Overwrites the addressed region from `src`.
    ///
    /// Cells outside the region are untouched; on error nothing is written.
    ///
    /// # Errors
    /// [`TensorError::ViewShapeMismatch`] unless `src.shape` equals the
    /// region shape exactly.
    pub fn assign_from(&mut self, src: &Tensor) -> Result<(), TensorError> {
        self.region.copy_in(self.parent, src)
    }
}

fn binop(lhs: &Tensor, rhs: &Tensor, op: OpKind) -> Tensor {
    match Dispatcher::default().elementwise(lhs, rhs, op) {
        Ok(out) => out,
        Err(e) => panic!("{e}"),
    }
}

macro_rules! impl_tensor_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&Tensor> for &Tensor {
            type Output = Tensor;

            /// # Panics
            /// Panics if the operand shapes fit no broadcast pattern. Use
            /// [`Dispatcher::elementwise`] for a fallible form.
            fn $method(self, rhs: &Tensor) -> Tensor {
                binop(self, rhs, $op)
            }
        }

        impl $trait for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: Tensor) -> Tensor {
                binop(&self, &rhs, $op)
            }
        }

        impl $trait<f64> for &Tensor {
            type Output = Tensor;

            /// Lowers the scalar to a 1x1 tensor and broadcasts it.
            fn $method(self, rhs: f64) -> Tensor {
                binop(self, &Tensor::scalar(rhs), $op)
            }
        }

        impl $trait<f64> for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: f64) -> Tensor {
                binop(&self, &Tensor::scalar(rhs), $op)
            }
        }
    };
}

impl_tensor_binop!(Add, add, OpKind::Add);
impl_tensor_binop!(Sub, sub, OpKind::Sub);
impl_tensor_binop!(Mul, mul, OpKind::Mul);
impl_tensor_binop!(Div, div, OpKind::Div);

/// Defines a 2-D tensor from a nested literal array.
///
/// # Panics
/// Panics if the rows have mismatched lengths.
///
/// # Example
/// ```
/// use tengrid::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape.rows, 2);
/// assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([ $( [ $( $x:expr ),+ $(,)? ] ),+ $(,)? ]) => {{
        let rows: Vec<Vec<f64>> = vec![ $( vec![ $( $x ),+ ] ),+ ];
        match $crate::tensors::Tensor::from_rows(rows) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        }
    }};
}
