//! CPU backend using rayon for parallelization.

use std::sync::atomic::{AtomicU32, Ordering};

use lumeq_core::color::{self, ColorRange};
use lumeq_core::histogram::BINS;
use lumeq_core::{DeviceDescriptor, EqualizeError, Histogram, Lut, Result};
use rayon::prelude::*;

use crate::accelerator::Accelerator;

/// Pixels counted privately by one task before merging into the shared bins.
const HISTOGRAM_CHUNK: usize = 64 * 1024;

/// Runs every kernel on a dedicated rayon pool.
pub struct CpuAccelerator {
    pool: rayon::ThreadPool,
    descriptor: DeviceDescriptor,
}

impl CpuAccelerator {
    /// Pool sized to the machine.
    pub fn new() -> Result<Self> {
        Self::with_threads(0)
    }

    /// Pool with `threads` workers (0 = rayon's default).
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lumeq-cpu-{i}"))
            .build()
            .map_err(|e| EqualizeError::Initialization(e.to_string()))?;
        let descriptor = DeviceDescriptor::cpu(pool.current_num_threads());
        tracing::info!("Using CPU backend: {descriptor}");
        Ok(Self { pool, descriptor })
    }
}

impl Accelerator for CpuAccelerator {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn histogram(&self, plane: &[u8]) -> Result<Histogram> {
        let bins: Vec<AtomicU32> = (0..BINS).map(|_| AtomicU32::new(0)).collect();
        self.pool.install(|| {
            plane.par_chunks(HISTOGRAM_CHUNK).for_each(|chunk| {
                let mut local = [0u32; BINS];
                for &v in chunk {
                    local[v as usize] += 1;
                }
                for (bin, n) in bins.iter().zip(local) {
                    if n != 0 {
                        bin.fetch_add(n, Ordering::Relaxed);
                    }
                }
            });
        });
        let mut out = [0u32; BINS];
        for (dst, bin) in out.iter_mut().zip(&bins) {
            *dst = bin.load(Ordering::Relaxed);
        }
        Ok(Histogram::from_bins(out))
    }

    fn apply_lut(&self, plane: &[u8], lut: &Lut) -> Result<Vec<u8>> {
        Ok(self
            .pool
            .install(|| plane.par_iter().map(|&v| lut.map(v)).collect()))
    }

    fn rgb_to_ycbcr(&self, rgb: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        Ok(self.convert(rgb, |px| color::rgb_to_ycbcr(px, range)))
    }

    fn ycbcr_to_rgb(&self, ycc: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        Ok(self.convert(ycc, |px| color::ycbcr_to_rgb(px, range)))
    }
}

impl CpuAccelerator {
    fn convert(&self, src: &[u8], f: impl Fn([u8; 3]) -> [u8; 3] + Sync) -> Vec<u8> {
        let mut out = vec![0u8; src.len()];
        self.pool.install(|| {
            out.par_chunks_exact_mut(3)
                .zip(src.par_chunks_exact(3))
                .for_each(|(dst, px)| dst.copy_from_slice(&f([px[0], px[1], px[2]])));
        });
        out
    }
}
