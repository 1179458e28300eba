//! wgpu adapter selection and device creation.
//!
//! Adapters are enumerated explicitly rather than through `request_adapter`
//! so software rasterizers (llvmpipe, WARP) are never picked by accident.
//! Candidates must support compute shaders, which covers the storage-buffer
//! atomics the histogram kernel needs. Ranking is by device type, ordered by
//! the configured power preference.

use lumeq_core::DeviceDescriptor;

use crate::config::EngineConfig;
use crate::error::GpuError;

/// A bound wgpu device and the adapter it came from.
///
/// `_instance` is declared last so it outlives `device` and `queue`.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    _instance: wgpu::Instance,
}

impl GpuContext {
    /// Bind the best adapter allowed by `config`. Blocks until ready.
    pub fn new(config: &EngineConfig) -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async(config))
    }

    async fn init_async(config: &EngineConfig) -> Result<Self, GpuError> {
        let backends = wgpu::Backends::from_env().unwrap_or(wgpu::Backends::PRIMARY);
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapters = instance.enumerate_adapters(backends);
        for a in &adapters {
            let info = a.get_info();
            tracing::debug!(
                "Adapter candidate: {} ({:?}, {:?})",
                info.name,
                info.backend,
                info.device_type
            );
        }

        let adapter = adapters
            .into_iter()
            .filter(|a| {
                a.get_downlevel_capabilities()
                    .flags
                    .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
            })
            .filter_map(|a| {
                let rank = adapter_rank(
                    a.get_info().device_type,
                    config.power_preference,
                    config.allow_software_adapter,
                )?;
                Some((rank, a))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, a)| a)
            .ok_or(GpuError::NoSuitableAdapter)?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            "Using GPU adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumeq_device"),
                required_features: crate::required_features(),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
            _instance: instance,
        })
    }

    /// Descriptor for this device, using configured architecture details.
    pub fn descriptor(&self, config: &EngineConfig) -> DeviceDescriptor {
        DeviceDescriptor::gpu(
            self.adapter_info.name.clone(),
            format!(
                "{:?} {:?}",
                self.adapter_info.backend, self.adapter_info.device_type
            ),
            config.architecture,
            config.multiprocessors,
        )
    }
}

/// Preference order for an adapter type; lower is better, `None` rejects.
pub fn adapter_rank(
    device_type: wgpu::DeviceType,
    power: wgpu::PowerPreference,
    allow_software: bool,
) -> Option<u8> {
    let (discrete, integrated) = match power {
        wgpu::PowerPreference::LowPower => (1, 0),
        _ => (0, 1),
    };
    match device_type {
        wgpu::DeviceType::DiscreteGpu => Some(discrete),
        wgpu::DeviceType::IntegratedGpu => Some(integrated),
        wgpu::DeviceType::VirtualGpu => Some(2),
        wgpu::DeviceType::Other => Some(3),
        wgpu::DeviceType::Cpu if allow_software => Some(4),
        wgpu::DeviceType::Cpu => None,
    }
}
