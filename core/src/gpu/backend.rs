//! wgpu implementation of the printf channel backend.
//!
//! The device buffer is a read-write storage buffer that compute shaders bind
//! as
//!
//! ```wgsl
//! @group(N) @binding(0) var<storage, read_write> printf_buffer: array<atomic<u32>>;
//! ```
//!
//! Copy-back goes through a `MAP_READ` staging buffer. The staging buffer is
//! mapped only long enough to copy its bytes into host memory.

use std::sync::Arc;
use wgpu::{BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue};

use super::layouts::create_printf_layout;
use crate::channel::{ChannelBackend, ChannelError};
use crate::wire::HEADER_WORDS;

/// Binding slot of the printf buffer inside its bind group.
pub const PRINTF_BINDING: u32 = 0;

const WORD_BYTES: u64 = std::mem::size_of::<u32>() as u64;

/// Storage buffer, staging buffer and bind group for one printf channel.
pub struct WgpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    capacity_words: usize,
    buffer: Buffer,
    staging: Buffer,
    layout: BindGroupLayout,
    bind_group: BindGroup,
    group_index: u32,
    host: Vec<u8>,
    bound: bool,
}

impl WgpuBackend {
    /// Allocate a printf channel of `capacity_words` words, set at bind group `group_index`.
    pub fn new(
        device: Arc<Device>,
        queue: Arc<Queue>,
        capacity_words: usize,
        group_index: u32,
    ) -> Result<Self, ChannelError> {
        if capacity_words < HEADER_WORDS {
            return Err(ChannelError::CapacityTooSmall {
                requested: capacity_words,
                min: HEADER_WORDS,
            });
        }

        let limits = device.limits();
        let max_bytes = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        let size = capacity_words as u64 * WORD_BYTES;
        if size > max_bytes {
            return Err(ChannelError::CapacityTooLarge {
                requested: capacity_words,
                max: (max_bytes / WORD_BYTES) as usize,
            });
        }

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("printf_buffer"),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("printf_staging"),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = create_printf_layout(&device, PRINTF_BINDING);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("printf_bind_group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: PRINTF_BINDING,
                resource: buffer.as_entire_binding(),
            }],
        });

        log::debug!(
            "Allocated printf channel: {} words at group {}",
            capacity_words,
            group_index
        );

        Ok(Self {
            device,
            queue,
            capacity_words,
            buffer,
            staging,
            layout,
            bind_group,
            group_index,
            host: Vec::with_capacity(size as usize),
            bound: false,
        })
    }

    /// Layout to include in compute pipeline layouts at [`WgpuBackend::group_index`].
    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &BindGroup {
        &self.bind_group
    }

    pub fn group_index(&self) -> u32 {
        self.group_index
    }

    /// The device-side storage buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Attach the printf buffer to a compute pass.
    ///
    /// Only attaches while the channel is armed; returns whether it did.
    pub fn bind(&self, pass: &mut wgpu::ComputePass<'_>) -> bool {
        if !self.bound {
            log::warn!("Printf channel is not armed, shader output will be lost");
            return false;
        }
        pass.set_bind_group(self.group_index, &self.bind_group, &[]);
        true
    }

    /// Write words into the device buffer from the host, starting at `offset_words`.
    pub fn upload(&self, offset_words: usize, words: &[u32]) {
        self.queue.write_buffer(
            &self.buffer,
            offset_words as u64 * WORD_BYTES,
            bytemuck::cast_slice(words),
        );
    }

    fn size_bytes(&self) -> u64 {
        self.capacity_words as u64 * WORD_BYTES
    }
}

impl ChannelBackend for WgpuBackend {
    fn capacity_words(&self) -> usize {
        self.capacity_words
    }

    fn bind_for_write(&mut self) {
        self.bound = true;
    }

    fn unbind_write(&mut self) {
        self.bound = false;
    }

    fn copy_to_mirror(&mut self) -> Result<(), ChannelError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("printf_copy_encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &self.staging, 0, self.size_bytes());
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn clear_to_zero(&mut self) -> Result<(), ChannelError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("printf_clear_encoder"),
            });
        encoder.clear_buffer(&self.buffer, 0, None);
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn map(&mut self) -> Result<(), ChannelError> {
        let slice = self.staging.slice(..);

        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ChannelError::DevicePoll(e.to_string()))?;

        rx.recv()
            .map_err(|e| ChannelError::MapFailed(e.to_string()))?
            .map_err(|e| ChannelError::MapFailed(format!("{:?}", e)))?;

        {
            let data = slice.get_mapped_range();
            self.host.clear();
            self.host.extend_from_slice(&data);
        }
        self.staging.unmap();

        Ok(())
    }

    fn mapped(&self) -> &[u8] {
        &self.host
    }

    fn unmap(&mut self) {
        self.host.clear();
    }
}
