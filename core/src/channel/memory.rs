//! Host-memory channel backend.
//!
//! Stands in for the device buffer when no GPU is involved: tests, benches
//! and CPU-side producers.

use super::{ChannelBackend, ChannelError};
use crate::wire::{RecordEncoder, HEADER_WORDS};

/// Call counts per backend primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub binds: u64,
    pub unbinds: u64,
    pub copies: u64,
    pub clears: u64,
    pub maps: u64,
    pub unmaps: u64,
}

/// Device buffer and mirror held in host memory.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    device: Vec<u32>,
    mirror: Vec<u32>,
    bound: bool,
    mapped: bool,
    failing_drains: usize,
    stats: BackendStats,
}

impl MemoryBackend {
    pub fn new(capacity_words: usize) -> Result<Self, ChannelError> {
        if capacity_words < HEADER_WORDS {
            return Err(ChannelError::CapacityTooSmall {
                requested: capacity_words,
                min: HEADER_WORDS,
            });
        }
        Ok(Self {
            device: vec![0; capacity_words],
            mirror: vec![0; capacity_words],
            bound: false,
            mapped: false,
            failing_drains: 0,
            stats: BackendStats::default(),
        })
    }

    /// The simulated device buffer.
    pub fn device(&self) -> &[u32] {
        &self.device
    }

    /// Raw write access, for producers that build the buffer by hand.
    pub fn device_mut(&mut self) -> &mut [u32] {
        &mut self.device
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Make the next `count` copy-backs fail with [`ChannelError::CopyFailed`].
    pub fn fail_next_drains(&mut self, count: usize) {
        self.failing_drains = count;
    }

    /// Write records the way a dispatched shader would.
    ///
    /// Writes only land while the buffer is bound. Returns words written.
    pub fn produce(&mut self, records: &RecordEncoder) -> usize {
        if !self.bound {
            log::warn!("Printf buffer is not bound, dropping {} words", records.len());
            return 0;
        }
        records.write_into(&mut self.device)
    }
}

impl ChannelBackend for MemoryBackend {
    fn capacity_words(&self) -> usize {
        self.device.len()
    }

    fn bind_for_write(&mut self) {
        self.stats.binds += 1;
        self.bound = true;
    }

    fn unbind_write(&mut self) {
        self.stats.unbinds += 1;
        self.bound = false;
    }

    fn copy_to_mirror(&mut self) -> Result<(), ChannelError> {
        if self.failing_drains > 0 {
            self.failing_drains -= 1;
            return Err(ChannelError::CopyFailed(
                "simulated device loss".to_string(),
            ));
        }
        self.stats.copies += 1;
        self.mirror.copy_from_slice(&self.device);
        Ok(())
    }

    fn clear_to_zero(&mut self) -> Result<(), ChannelError> {
        self.stats.clears += 1;
        self.device.fill(0);
        Ok(())
    }

    fn map(&mut self) -> Result<(), ChannelError> {
        self.stats.maps += 1;
        self.mapped = true;
        Ok(())
    }

    fn mapped(&self) -> &[u8] {
        bytemuck::cast_slice(&self.mirror)
    }

    fn unmap(&mut self) {
        self.stats.unmaps += 1;
        self.mapped = false;
    }
}
