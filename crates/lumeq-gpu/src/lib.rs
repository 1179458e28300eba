//! lumeq GPU: accelerator backends and the equalization pipeline.
//!
//! This crate owns every device resource. The wgpu backend runs the
//! histogram, LUT-apply and color-space kernels as WGSL compute shaders; the
//! CPU backend runs the same kernels under rayon and is used as a fallback
//! and as the reference in tests.

pub mod accelerator;
pub mod buffers;
pub mod config;
pub mod cpu;
pub mod device;
pub mod error;
pub mod handle;
pub mod kernels;
pub mod pipeline;
pub mod wgpu_accelerator;

pub use accelerator::Accelerator;
pub use config::{BackendPreference, EngineConfig};
pub use cpu::CpuAccelerator;
pub use error::GpuError;
pub use handle::AcceleratorHandle;
pub use pipeline::{CancelToken, EqualizationPipeline, SharedPipeline};
pub use wgpu_accelerator::GpuAccelerator;

/// wgpu features the kernels need. Storage-buffer atomics are core WGSL.
pub fn required_features() -> wgpu::Features {
    wgpu::Features::empty()
}
