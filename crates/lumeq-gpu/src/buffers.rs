//! Per-call device buffers and host readback.
//!
//! Every buffer a kernel call touches is a [`DeviceBuffer`]: it is created
//! inside the call and destroyed when it goes out of scope, on success and on
//! error alike. A shared [`BufferTracker`] counts the ones still alive.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::error::GpuError;

/// Smallest buffer handed to a storage binding.
const MIN_BUFFER_SIZE: u64 = 16;

/// Counts live [`DeviceBuffer`]s.
#[derive(Debug, Clone, Default)]
pub struct BufferTracker {
    live: Arc<AtomicUsize>,
}

impl BufferTracker {
    /// Buffers created and not yet destroyed.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// A transient GPU buffer, destroyed on drop.
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    tracker: BufferTracker,
}

impl DeviceBuffer {
    fn track(buffer: wgpu::Buffer, tracker: &BufferTracker) -> Self {
        tracker.live.fetch_add(1, Ordering::AcqRel);
        Self {
            buffer,
            tracker: tracker.clone(),
        }
    }

    /// Upload host bytes, padded with zeros to a whole number of `u32` words.
    pub fn upload(
        device: &wgpu::Device,
        tracker: &BufferTracker,
        label: &str,
        bytes: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Self {
        let size = padded_size(bytes.len()) as usize;
        let mut contents = Vec::with_capacity(size);
        contents.extend_from_slice(bytes);
        contents.resize(size, 0);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &contents,
            usage,
        });
        Self::track(buffer, tracker)
    }

    /// Allocate a zero-initialized buffer large enough for `len` bytes.
    pub fn zeroed(
        device: &wgpu::Device,
        tracker: &BufferTracker,
        label: &str,
        len: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded_size(len),
            usage,
            mapped_at_creation: false,
        });
        Self::track(buffer, tracker)
    }

    /// A 16-byte uniform block.
    pub fn uniform(
        device: &wgpu::Device,
        tracker: &BufferTracker,
        label: &str,
        words: [u32; 4],
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&words),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        Self::track(buffer, tracker)
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.tracker.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Copy `src` into a staging buffer, block until mapped, and return the
/// first `count` elements.
pub fn read_back<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    tracker: &BufferTracker,
    src: &DeviceBuffer,
    count: usize,
) -> Result<Vec<T>, GpuError> {
    let size = src.size();
    let staging = DeviceBuffer::zeroed(
        device,
        tracker,
        "lumeq_readback_staging",
        size as usize,
        wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("lumeq_readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(src.buffer(), 0, staging.buffer(), 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.buffer().slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::wait_indefinitely())?;
    rx.recv().map_err(|_| GpuError::MapCallbackDropped)??;

    let data = slice.get_mapped_range();
    let values: &[T] = bytemuck::cast_slice(&data);
    let out = values[..count.min(values.len())].to_vec();
    drop(data);
    staging.buffer().unmap();
    Ok(out)
}

/// Byte size of a buffer holding `len` bytes: whole words, at least 16.
pub fn padded_size(len: usize) -> u64 {
    (len.next_multiple_of(4) as u64).max(MIN_BUFFER_SIZE)
}
