//! Backend selection module.
//!
//! This module defines the available computation backends for element-wise
//! tensor operations.
//!
//! # Supported Backends
//!
//! - `Cpu` — Parallel CPU backend built on `rayon` (default).
//! - `Gpu` — Compute-kernel accelerator backend built on `wgpu`
//!   (requires the `wgpu` feature; falls back to CPU when no adapter is
//!   available).
//!
//! The active backend is not process-global state: it is a plain value held
//! by [`crate::ops::dispatch::Dispatcher`] at construction, read-only for
//! the dispatcher's lifetime. Matrix multiplication ignores this selection
//! and always rides the accelerator kernel executor when one exists.

/// Enumeration of supported computation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Parallel CPU backend (default).
    #[default]
    Cpu,
    /// Compute-kernel accelerator backend using `wgpu`.
    Gpu,
}
