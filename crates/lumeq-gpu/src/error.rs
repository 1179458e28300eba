//! wgpu failure modes and their mapping into [`EqualizeError`].

use lumeq_core::EqualizeError;

/// Errors raised while binding or driving a wgpu device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoSuitableAdapter,

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("buffer map failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("buffer map callback dropped")]
    MapCallbackDropped,

    #[error("{0}")]
    Validation(String),
}

impl From<GpuError> for EqualizeError {
    fn from(e: GpuError) -> Self {
        match e {
            GpuError::NoSuitableAdapter | GpuError::DeviceRequest(_) => {
                EqualizeError::Initialization(e.to_string())
            }
            other => EqualizeError::DeviceOperation(other.to_string()),
        }
    }
}
