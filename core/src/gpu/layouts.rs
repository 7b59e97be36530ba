//! Bind group layout builders for the printf buffer.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages};

/// Builder for creating bind group layouts.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    /// Create a new bind group layout builder.
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            entries: Vec::new(),
        }
    }

    /// Add a storage buffer entry.
    pub fn storage(mut self, binding: u32, visibility: ShaderStages, read_only: bool) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Build the bind group layout.
    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Layout of the printf bind group: one read-write storage buffer at `binding`.
pub fn create_printf_layout(device: &Device, binding: u32) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("printf_bind_group_layout")
        .storage(binding, ShaderStages::COMPUTE, false)
        .build(device)
}
