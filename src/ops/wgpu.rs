//! GPU-accelerated tensor kernels using WGPU.
//!
//! This module implements the accelerator side of the engine as WGSL compute
//! shaders dispatched over a 2-D grid:
//!
//! - `matmul` — matrix multiplication, naive and tiled kernel variants
//! - `elementwise` — the four broadcast patterns of the element-wise kernel
//!   set, with the engine's NaN/zero-division policy written out in the
//!   shader
//!
//! The device, queue, and all compute pipelines are initialized once per
//! process and cached. Host data is `f64`; it is cast to `f32` for the GPU
//! and back, so accelerator results agree with the CPU backend to `f32`
//! precision while the NaN/zero-division policy holds exactly.
//!
//! When no adapter is available, every entry point returns a [`GpuFailure`]
//! carrying the initialization diagnostic; the dispatch layer falls back to
//! the CPU kernels in that case.

use briny::prelude::*;
use wgpu::util::DeviceExt;

use crate::ops::{Compat, MatmulKernel, OpKind};
use crate::tensors::Shape;

const MATMUL_NAIVE: &str = include_str!("shaders/matmul_naive.wgsl");
const MATMUL_TILED: &str = include_str!("shaders/matmul_tiled.wgsl");
const ELEMENTWISE: &str = include_str!("shaders/elementwise.wgsl");

/// A failure anywhere on the accelerator path.
///
/// Build, validation, and device diagnostics are carried as text so the
/// dispatch layer can surface them before falling back to the CPU.
#[derive(Debug)]
pub enum GpuFailure {
    /// No suitable adapter could be acquired.
    Adapter(wgpu::RequestAdapterError),
    /// The adapter refused to hand out a device.
    Device(wgpu::RequestDeviceError),
    /// A shader source failed validation before compilation.
    Validation(ValidationError),
    /// Any other diagnostic, including buffer readback problems.
    Message(String),
}

impl std::fmt::Display for GpuFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuFailure::Adapter(e) => write!(f, "adapter error: {e}"),
            GpuFailure::Device(e) => write!(f, "device error: {e}"),
            GpuFailure::Validation(e) => write!(f, "shader validation error: {e}"),
            GpuFailure::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GpuFailure {}

impl From<ValidationError> for GpuFailure {
    fn from(e: ValidationError) -> Self {
        GpuFailure::Validation(e)
    }
}

impl From<&str> for GpuFailure {
    fn from(msg: &str) -> Self {
        GpuFailure::Message(msg.to_string())
    }
}

impl From<String> for GpuFailure {
    fn from(msg: String) -> Self {
        GpuFailure::Message(msg)
    }
}

/// Holds the WGPU device and queue used for executing compute pipelines.
pub struct GpuContext {
    /// The actual GPU device.
    pub device: wgpu::Device,
    /// The submission queue of that device.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Initializes a GPU context, selecting the default adapter and creating
    /// a device and queue.
    ///
    /// Uses `pollster::block_on` to wait on WGPU's async setup calls, with
    /// default limits and no extra features for broad compatibility.
    ///
    /// # Errors
    /// [`GpuFailure::Adapter`] or [`GpuFailure::Device`] if acquisition
    /// fails (typically: headless host with no GPU).
    pub fn new() -> Result<Self, GpuFailure> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .map_err(GpuFailure::Adapter)?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(GpuFailure::Device)?;

        Ok(Self { device, queue })
    }
}

/// Secure wrapper for WGSL source code.
pub struct WgslSource<'a>(pub &'a str);

impl Validate for WgslSource<'_> {
    fn validate(&self) -> Result<(), ValidationError> {
        let src = self.0;

        // Basic sanity checks
        if src.len() > 65536 {
            return Err(ValidationError);
        }

        if !src.contains("fn main") {
            return Err(ValidationError);
        }

        if src.contains("import") || src.contains("#include") {
            return Err(ValidationError); // Disallow source inclusion
        }

        let forbidden = ["asm", "unsafe", "std::"];
        if forbidden.iter().any(|bad| src.contains(bad)) {
            return Err(ValidationError);
        }

        Ok(())
    }
}

/// Validates a WGSL source and compiles it into a labeled shader module.
pub fn load_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, GpuFailure> {
    WgslSource(source).validate()?;

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

/// A compiled compute pipeline plus the bind group layout it expects.
struct PipelineSet {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// All shaders in this module bind the same four slots: a uniform parameter
/// block, two read-only input buffers, and one writable output buffer.
fn pipeline_set(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<PipelineSet, GpuFailure> {
    let module = load_shader(device, label, source)?;

    let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage_entry(1, true),
            storage_entry(2, true),
            storage_entry(3, false),
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some("main"),
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    });

    Ok(PipelineSet { bind_group_layout, pipeline })
}

/// Process-wide accelerator state: one context, one pipeline per kernel.
struct GpuState {
    context: GpuContext,
    matmul_naive: PipelineSet,
    matmul_tiled: PipelineSet,
    elementwise: PipelineSet,
}

impl GpuState {
    fn init() -> Result<Self, GpuFailure> {
        let context = GpuContext::new()?;
        let matmul_naive = pipeline_set(&context.device, "matmul_naive", MATMUL_NAIVE)?;
        let matmul_tiled = pipeline_set(&context.device, "matmul_tiled", MATMUL_TILED)?;
        let elementwise = pipeline_set(&context.device, "elementwise", ELEMENTWISE)?;
        Ok(Self { context, matmul_naive, matmul_tiled, elementwise })
    }
}

lazy_static::lazy_static! {
    static ref GPU: Result<GpuState, String> = GpuState::init().map_err(|e| e.to_string());
}

fn state() -> Result<&'static GpuState, GpuFailure> {
    match &*GPU {
        Ok(state) => Ok(state),
        Err(msg) => Err(GpuFailure::Message(msg.clone())),
    }
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn u32_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn f32_from_bytes(data: &[u8]) -> Result<Vec<f32>, GpuFailure> {
    if data.len() % 4 != 0 {
        return Err("readback buffer length is not a multiple of f32".into());
    }
    Ok(data
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Uploads the operands, launches one compute pass over `groups`, and reads
/// the output buffer back. All kernels in this module share this uniform +
/// two-input + one-output binding shape.
fn run_kernel(
    context: &GpuContext,
    set: &PipelineSet,
    params: [u32; 4],
    a: &[f32],
    b: &[f32],
    out_len: usize,
    groups: (u32, u32),
) -> Result<Vec<f32>, GpuFailure> {
    let device = &context.device;
    let queue = &context.queue;
    let out_bytes = (out_len * 4) as u64;

    let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("params"),
        contents: &u32_bytes(&params),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let a_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("a"),
        contents: &f32_bytes(a),
        usage: wgpu::BufferUsages::STORAGE,
    });

    let b_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("b"),
        contents: &f32_bytes(b),
        usage: wgpu::BufferUsages::STORAGE,
    });

    let out_buf = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("out"),
        size: out_bytes,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("kernel_bind_group"),
        layout: &set.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: params_buf.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: a_buf.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: b_buf.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 3, resource: out_buf.as_entire_binding() },
        ],
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("kernel_encoder") });

    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("kernel_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&set.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(groups.0, groups.1, 1);
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("staging"),
        size: out_bytes,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    encoder.copy_buffer_to_buffer(&out_buf, 0, &staging, 0, out_bytes);
    queue.submit(Some(encoder.finish()));

    staging.slice(..).map_async(wgpu::MapMode::Read, |_| {});
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| GpuFailure::Message(format!("device poll failed: {e:?}")))?;

    let view = staging.slice(..).get_mapped_range();
    let out = f32_from_bytes(&view)?;
    drop(view);
    staging.unmap();

    Ok(out)
}

/// Matrix multiplication `C = A x B` on the GPU.
///
/// `A` is `m x k`, `B` is `k x n`, both flat row-major `f64` cast to `f32`
/// for the kernel. The execution grid covers the `m x n` output; the tiled
/// variant bounds-guards partial tiles, so any `k` is accepted.
///
/// # Errors
/// [`GpuFailure`] if no adapter is available or the dispatch fails; callers
/// fall back to [`crate::ops::cpu`].
pub fn matmul(
    a: &[f64],
    b: &[f64],
    m: usize,
    k: usize,
    n: usize,
    kernel: MatmulKernel,
) -> Result<Vec<f64>, GpuFailure> {
    let state = state()?;
    let set = match kernel {
        MatmulKernel::Naive => &state.matmul_naive,
        MatmulKernel::Tiled => &state.matmul_tiled,
    };

    let a32: Vec<f32> = a.iter().map(|&v| v as f32).collect();
    let b32: Vec<f32> = b.iter().map(|&v| v as f32).collect();
    let dims = [m as u32, k as u32, n as u32, 0u32];
    let groups = ((n as u32).div_ceil(16), (m as u32).div_ceil(16));

    let out = run_kernel(&state.context, set, dims, &a32, &b32, m * n, groups)?;
    Ok(out.into_iter().map(|v| v as f64).collect())
}

/// A broadcast element-wise operation on the GPU.
///
/// `shape` is the output (left operand) shape; `compat` selects the
/// broadcast pattern the shader applies to `b`. The NaN-propagation and
/// zero-division policy is written out in the shader, so results match the
/// CPU kernels exactly on those cells.
///
/// # Errors
/// [`GpuFailure`] if `compat`/`op` fit no shader mode, no adapter is
/// available, or the dispatch fails.
pub fn elementwise(
    a: &[f64],
    b: &[f64],
    shape: Shape,
    op: OpKind,
    compat: Compat,
) -> Result<Vec<f64>, GpuFailure> {
    let state = state()?;

    let mode = match compat {
        Compat::ShapeMatch => 0u32,
        Compat::IsScalar => 1u32,
        Compat::ColVector => 2u32,
        Compat::RowVector => 3u32,
        _ => return Err("verdict fits no element-wise shader mode".into()),
    };
    let opcode = match op {
        OpKind::Add => 0u32,
        OpKind::Sub => 1u32,
        OpKind::Mul => 2u32,
        OpKind::Div => 3u32,
        OpKind::MatMul => return Err("matmul is not an element-wise kernel".into()),
    };

    let a32: Vec<f32> = a.iter().map(|&v| v as f32).collect();
    let b32: Vec<f32> = b.iter().map(|&v| v as f32).collect();
    let params = [shape.rows as u32, shape.cols as u32, mode, opcode];
    let groups = ((shape.cols as u32).div_ceil(16), (shape.rows as u32).div_ceil(16));

    let out = run_kernel(&state.context, &state.elementwise, params, &a32, &b32, shape.numel(), groups)?;
    Ok(out.into_iter().map(|v| v as f64).collect())
}
