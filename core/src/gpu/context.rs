//! Headless GPU context for printf capture.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

use super::backend::WgpuBackend;
use crate::channel::ChannelError;

/// Errors that can occur while acquiring a GPU.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// GPU context holding the device and queue that dispatches and readbacks run on.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a context without a surface.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::METAL
                | wgpu::Backends::VULKAN
                | wgpu::Backends::DX12
                | wgpu::Backends::GL,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gpu-printf"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::info!("Using GPU adapter {}", adapter.get_info().name);

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking variant of [`GpuContext::new`] for callers without an executor.
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Allocate a printf buffer of `capacity_words` bound at bind group `group_index`.
    pub fn printf_backend(
        &self,
        capacity_words: usize,
        group_index: u32,
    ) -> Result<WgpuBackend, ChannelError> {
        WgpuBackend::new(
            self.device.clone(),
            self.queue.clone(),
            capacity_words,
            group_index,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_context_creation() {
        let ctx = GpuContext::new().await;
        // May fail on CI without GPU, so just check it doesn't panic
        if let Ok(ctx) = ctx {
            let info = ctx.adapter_info();
            assert!(!info.name.is_empty());
        }
    }
}
