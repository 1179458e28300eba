//! wgpu compute backend.
//!
//! Every kernel call uploads its inputs, dispatches one compute pass, and
//! reads the result back before returning. All device buffers are
//! [`DeviceBuffer`] guards local to the call, so they are destroyed on every
//! exit path. Validation and out-of-memory errors raised while the call runs
//! are captured with error scopes and surfaced as `DeviceOperation`.

use lumeq_core::histogram::BINS;
use lumeq_core::{ColorRange, DeviceDescriptor, EqualizeError, Histogram, Lut, Result};

use crate::accelerator::Accelerator;
use crate::buffers::{BufferTracker, DeviceBuffer, read_back};
use crate::config::EngineConfig;
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::kernels::{Kernel, Kernels, dispatch_size};

/// Accelerator backed by a wgpu device.
pub struct GpuAccelerator {
    kernels: Kernels,
    tracker: BufferTracker,
    buffer_limit: u64,
    descriptor: DeviceDescriptor,
    ctx: GpuContext,
}

impl GpuAccelerator {
    /// Bind an adapter and build every pipeline.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let ctx = GpuContext::new(config)?;
        Self::from_context(ctx, config)
    }

    /// Build pipelines on an already-bound context.
    pub fn from_context(ctx: GpuContext, config: &EngineConfig) -> Result<Self> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let kernels = Kernels::new(&ctx.device);
        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(EqualizeError::Initialization(format!(
                "compute pipeline creation failed: {err}"
            )));
        }
        let descriptor = ctx.descriptor(config);
        let device_limit = u64::from(ctx.device.limits().max_storage_buffer_binding_size);
        let buffer_limit = config
            .max_buffer_bytes
            .map_or(device_limit, |cap| cap.min(device_limit));
        tracing::info!("GPU accelerator ready: {descriptor}");
        Ok(Self {
            kernels,
            tracker: BufferTracker::default(),
            buffer_limit,
            descriptor,
            ctx,
        })
    }

    /// Device buffers currently alive. Zero between calls.
    pub fn live_buffers(&self) -> usize {
        self.tracker.live()
    }

    fn upload(&self, label: &str, bytes: &[u8]) -> Result<DeviceBuffer> {
        let limit = self.buffer_limit;
        if bytes.len() as u64 > limit {
            return Err(EqualizeError::DeviceOperation(format!(
                "{label}: {} bytes exceed the buffer limit of {limit}",
                bytes.len()
            )));
        }
        Ok(DeviceBuffer::upload(
            &self.ctx.device,
            &self.tracker,
            label,
            bytes,
            wgpu::BufferUsages::STORAGE,
        ))
    }

    fn output(&self, label: &str, len: usize) -> DeviceBuffer {
        DeviceBuffer::zeroed(
            &self.ctx.device,
            &self.tracker,
            label,
            len,
            wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn params(&self, words: [u32; 4]) -> DeviceBuffer {
        DeviceBuffer::uniform(&self.ctx.device, &self.tracker, "lumeq_params", words)
    }

    /// Record one compute pass over `items` invocations and submit it.
    fn dispatch(
        &self,
        kernel: &Kernel,
        bindings: &[&DeviceBuffer],
        items: u32,
        clear: Option<&DeviceBuffer>,
    ) {
        let entries: Vec<wgpu::BindGroupEntry> = bindings
            .iter()
            .enumerate()
            .map(|(i, buf)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buf.buffer().as_entire_binding(),
            })
            .collect();
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("lumeq_{}_bg", kernel.name)),
            layout: &kernel.layout,
            entries: &entries,
        });

        let max_dim = self.ctx.device.limits().max_compute_workgroups_per_dimension;
        let (x, y) = dispatch_size(items, max_dim);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("lumeq_{}_encoder", kernel.name)),
            });
        if let Some(buf) = clear {
            encoder.clear_buffer(buf.buffer(), 0, None);
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&format!("lumeq_{}_pass", kernel.name)),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(x, y, 1);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Run `op` inside validation and out-of-memory error scopes.
    fn scoped<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = op();
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(oom) {
            tracing::error!("GPU error: {err}");
            return Err(GpuError::Validation(err.to_string()).into());
        }
        result
    }

    fn convert(&self, kernel: &Kernel, src: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        self.scoped(|| {
            let len = word_len(src.len())?;
            let input = self.upload("lumeq_color_in", src)?;
            let output = self.output("lumeq_color_out", src.len());
            let params = self.params([len, range.shader_flag(), 0, 0]);
            self.dispatch(kernel, &[&input, &output, &params], len.div_ceil(12), None);
            Ok(self.read(&output, src.len())?)
        })
    }

    fn read<T: bytemuck::Pod>(
        &self,
        buf: &DeviceBuffer,
        count: usize,
    ) -> std::result::Result<Vec<T>, GpuError> {
        read_back(&self.ctx.device, &self.ctx.queue, &self.tracker, buf, count)
    }
}

impl Accelerator for GpuAccelerator {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn histogram(&self, plane: &[u8]) -> Result<Histogram> {
        self.scoped(|| {
            let len = word_len(plane.len())?;
            let input = self.upload("lumeq_histogram_in", plane)?;
            let bins = self.output("lumeq_histogram_bins", BINS * 4);
            let params = self.params([len, 0, 0, 0]);
            self.dispatch(
                &self.kernels.histogram,
                &[&input, &bins, &params],
                len.div_ceil(4),
                Some(&bins),
            );
            let counts: Vec<u32> = self.read(&bins, BINS)?;
            let mut out = [0u32; BINS];
            out.copy_from_slice(&counts);
            Ok(Histogram::from_bins(out))
        })
    }

    fn apply_lut(&self, plane: &[u8], lut: &Lut) -> Result<Vec<u8>> {
        self.scoped(|| {
            let len = word_len(plane.len())?;
            let table: Vec<u32> = lut.as_array().iter().map(|&v| v as u32).collect();
            let input = self.upload("lumeq_lut_in", plane)?;
            let output = self.output("lumeq_lut_out", plane.len());
            let table = self.upload("lumeq_lut_table", bytemuck::cast_slice(&table))?;
            let params = self.params([len, 0, 0, 0]);
            self.dispatch(
                &self.kernels.apply_lut,
                &[&input, &output, &table, &params],
                len.div_ceil(4),
                None,
            );
            Ok(self.read(&output, plane.len())?)
        })
    }

    fn rgb_to_ycbcr(&self, rgb: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        self.convert(&self.kernels.rgb_to_ycbcr, rgb, range)
    }

    fn ycbcr_to_rgb(&self, ycc: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        self.convert(&self.kernels.ycbcr_to_rgb, ycc, range)
    }
}

/// Byte length as the `u32` the shaders index with.
fn word_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        EqualizeError::DeviceOperation(format!("{len} bytes exceed the 32-bit kernel index range"))
    })
}
