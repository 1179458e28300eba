//! Compute pipelines for the four equalization kernels.

use std::num::NonZeroU64;

/// Invocations per workgroup in every shader.
pub const WORKGROUP_SIZE: u32 = 256;

/// A compiled compute pipeline and its bind group layout.
pub struct Kernel {
    pub pipeline: wgpu::ComputePipeline,
    pub layout: wgpu::BindGroupLayout,
    pub name: &'static str,
}

/// Every pipeline the accelerator dispatches, built once at bind time.
pub struct Kernels {
    pub histogram: Kernel,
    pub apply_lut: Kernel,
    pub rgb_to_ycbcr: Kernel,
    pub ycbcr_to_rgb: Kernel,
}

impl Kernels {
    pub fn new(device: &wgpu::Device) -> Self {
        let histogram = create_kernel(
            device,
            "histogram",
            include_str!("../shaders/histogram.wgsl"),
            &[
                storage_ro_entry(0, 4),
                storage_rw_entry(1, 1024), // 256 bins
                uniform_entry(2, 16),
            ],
        );

        let apply_lut = create_kernel(
            device,
            "apply_lut",
            include_str!("../shaders/apply_lut.wgsl"),
            &[
                storage_ro_entry(0, 4),
                storage_rw_entry(1, 4),
                storage_ro_entry(2, 1024), // 256 entries
                uniform_entry(3, 16),
            ],
        );

        let color_entries = [
            storage_ro_entry(0, 4),
            storage_rw_entry(1, 4),
            uniform_entry(2, 16),
        ];
        let rgb_to_ycbcr = create_kernel(
            device,
            "rgb_to_ycbcr",
            include_str!("../shaders/rgb_to_ycbcr.wgsl"),
            &color_entries,
        );
        let ycbcr_to_rgb = create_kernel(
            device,
            "ycbcr_to_rgb",
            include_str!("../shaders/ycbcr_to_rgb.wgsl"),
            &color_entries,
        );

        Self {
            histogram,
            apply_lut,
            rgb_to_ycbcr,
            ycbcr_to_rgb,
        }
    }
}

/// Workgroup grid covering `items` invocations.
///
/// Grids wider than `max_per_dim` fold into a second dimension; shaders
/// recover the linear index as `gid.x + gid.y * num_workgroups.x * 256`.
pub fn dispatch_size(items: u32, max_per_dim: u32) -> (u32, u32) {
    let groups = items.div_ceil(WORKGROUP_SIZE).max(1);
    if groups <= max_per_dim {
        (groups, 1)
    } else {
        (max_per_dim, groups.div_ceil(max_per_dim))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn storage_ro_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn storage_rw_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn create_kernel(
    device: &wgpu::Device,
    name: &'static str,
    wgsl_source: &str,
    layout_entries: &[wgpu::BindGroupLayoutEntry],
) -> Kernel {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("lumeq_{name}_shader")),
        source: wgpu::ShaderSource::Wgsl(wgsl_source.into()),
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("lumeq_{name}_layout")),
        entries: layout_entries,
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("lumeq_{name}_pipeline_layout")),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });

    // Entry point names match the kernel names.
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("lumeq_{name}_pipeline")),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some(name),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });

    Kernel {
        pipeline,
        layout,
        name,
    }
}
