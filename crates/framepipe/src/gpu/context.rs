//! Headless device acquisition for the GPU stage

use crate::{config::GpuStageConfig, error::InitError};

/// Instance, adapter, device and queue owned by one GPU stage, plus the sampler its program reads through
pub(crate) struct DeviceContext {
    _instance: wgpu::Instance,
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    sampler: wgpu::Sampler,
}

impl DeviceContext {
    /// Acquires an adapter and a device without any window surface
    ///
    /// # Arguments
    /// * `config` - Backend and adapter preferences
    ///
    /// # Returns
    /// The acquired context, or the reason no device could be obtained
    pub(crate) async fn acquire(config: &GpuStageConfig) -> Result<Self, InitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                force_fallback_adapter: config.force_fallback_adapter,
                compatible_surface: None,
            })
            .await?;

        let adapter_info = adapter.get_info();
        tracing::info!(name = %adapter_info.name, backend = ?adapter_info.backend, device_type = ?adapter_info.device_type, "using graphics adapter");

        // Downlevel limits keep software adapters usable; texture and buffer size caps come from the adapter
        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits.clone())
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Swirl Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: Default::default(),
            })
            .await?;

        let sampler = create_sampler(&device);

        Ok(Self {
            _instance: instance,
            adapter_info,
            device,
            queue,
            sampler,
        })
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub(crate) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Limits the device was created with
    pub(crate) fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Destroys the logical device; every resource created from it becomes invalid
    pub(crate) fn destroy(self) {
        tracing::debug!(name = %self.adapter_info.name, "releasing graphics device");
        self.device.destroy();
    }
}

/// Creates the sampler the swirl program reads the input frame through
///
/// Coordinates that leave `[0, 1]` wrap around, and reads between texel centers are linearly interpolated.
fn create_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Frame Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        // Frames are uploaded without mip levels
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
