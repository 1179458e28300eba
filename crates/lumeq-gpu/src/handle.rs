//! Lifetime owner of the bound accelerator.

use lumeq_core::{DeviceDescriptor, EqualizeError, Result};

use crate::accelerator::Accelerator;
use crate::config::{BackendPreference, EngineConfig};
use crate::cpu::CpuAccelerator;
use crate::wgpu_accelerator::GpuAccelerator;

/// Owns one accelerator from bind until [`dispose`](Self::dispose).
///
/// Any use after dispose fails with [`EqualizeError::UseAfterDispose`].
pub struct AcceleratorHandle {
    inner: Option<Box<dyn Accelerator>>,
}

impl AcceleratorHandle {
    /// Bind a backend according to `config.backend`.
    ///
    /// `Auto` tries the GPU first and falls back to the CPU backend; `Gpu`
    /// fails with `Initialization` when no adapter can be bound.
    pub fn bind(config: &EngineConfig) -> Result<Self> {
        let accelerator: Box<dyn Accelerator> = match config.backend {
            BackendPreference::Cpu => Box::new(CpuAccelerator::new()?),
            BackendPreference::Gpu => Box::new(GpuAccelerator::new(config)?),
            BackendPreference::Auto => match GpuAccelerator::new(config) {
                Ok(gpu) => Box::new(gpu),
                Err(e) => {
                    tracing::warn!("GPU unavailable ({e}), falling back to CPU backend");
                    Box::new(CpuAccelerator::new()?)
                }
            },
        };
        Ok(Self {
            inner: Some(accelerator),
        })
    }

    /// Wrap an already-constructed accelerator.
    pub fn from_accelerator(accelerator: impl Accelerator + 'static) -> Self {
        Self {
            inner: Some(Box::new(accelerator)),
        }
    }

    /// The bound accelerator.
    pub fn accelerator(&self) -> Result<&dyn Accelerator> {
        self.inner.as_deref().ok_or(EqualizeError::UseAfterDispose)
    }

    /// Device name and core count.
    pub fn descriptor(&self) -> Result<&DeviceDescriptor> {
        Ok(self.accelerator()?.descriptor())
    }

    pub fn name(&self) -> Result<&str> {
        Ok(&self.descriptor()?.name)
    }

    pub fn core_count(&self) -> Result<u32> {
        Ok(self.descriptor()?.core_count)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_none()
    }

    /// Release the accelerator. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(accelerator) = self.inner.take() {
            tracing::debug!("Disposing accelerator {}", accelerator.descriptor().name);
        }
    }
}

impl Drop for AcceleratorHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for AcceleratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(a) => f
                .debug_struct("AcceleratorHandle")
                .field("device", &a.descriptor().name)
                .finish(),
            None => f.write_str("AcceleratorHandle(disposed)"),
        }
    }
}
