//! Capacity-bounded printf channel.
//!
//! A channel owns a fixed-size device buffer and a host-visible mirror, and
//! runs the two-phase cycle around a dispatch:
//!
//! - armed: the device buffer is bound for writing by the GPU producer
//! - drained: the buffer is copied to the mirror, cleared, and the mirror is
//!   mapped for reading
//!
//! The phases never overlap, so no locking is involved. The copy-back is the
//! synchronisation point with the GPU.

mod memory;

pub use memory::{BackendStats, MemoryBackend};

use crate::wire::WordStream;

/// Errors from the device side of the channel.
///
/// Any of these during a drain means the capture is unavailable for this frame.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Printf channel needs at least {min} words, got {requested}")]
    CapacityTooSmall { requested: usize, min: usize },
    #[error("Printf channel of {requested} words exceeds the device limit of {max} words")]
    CapacityTooLarge { requested: usize, max: usize },
    #[error("Copy-back from device buffer failed: {0}")]
    CopyFailed(String),
    #[error("GPU buffer mapping failed: {0}")]
    MapFailed(String),
    #[error("Device poll failed: {0}")]
    DevicePoll(String),
}

/// Device access primitives a channel is built on.
///
/// `allocate` is the implementor's constructor; the buffer lives as long as
/// the backend.
pub trait ChannelBackend {
    /// Size of the device buffer in 32-bit words.
    fn capacity_words(&self) -> usize;

    /// Make the device buffer the printf write target.
    fn bind_for_write(&mut self);

    /// Remove the write binding.
    fn unbind_write(&mut self);

    /// Copy the whole device buffer into the host-visible mirror.
    fn copy_to_mirror(&mut self) -> Result<(), ChannelError>;

    /// Zero the device buffer. Ordered after any preceding copy.
    fn clear_to_zero(&mut self) -> Result<(), ChannelError>;

    /// Map the mirror for reading, blocking until prior device writes are visible.
    fn map(&mut self) -> Result<(), ChannelError>;

    /// Mirror contents; only meaningful between `map` and `unmap`.
    fn mapped(&self) -> &[u8];

    fn unmap(&mut self);
}

/// Arm/drain orchestration over a backend.
#[derive(Debug)]
pub struct Channel<B: ChannelBackend> {
    backend: B,
    armed: bool,
    drains: u64,
}

impl<B: ChannelBackend> Channel<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            armed: false,
            drains: 0,
        }
    }

    pub fn capacity_words(&self) -> usize {
        self.backend.capacity_words()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of drains attempted, failed ones included.
    pub fn drain_count(&self) -> u64 {
        self.drains
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Bind the device buffer for an upcoming dispatch. Idempotent.
    pub fn arm(&mut self) {
        if !self.armed {
            self.backend.bind_for_write();
            self.armed = true;
        }
    }

    /// Remove the write binding. Idempotent.
    pub fn disarm(&mut self) {
        if self.armed {
            self.backend.unbind_write();
            self.armed = false;
        }
    }

    /// Arm until the returned guard is dropped.
    pub fn arm_scoped(&mut self) -> ArmGuard<'_, B> {
        self.arm();
        ArmGuard { channel: self }
    }

    /// Copy the device buffer back, clear it, and map the copy for reading.
    ///
    /// The device buffer is zeroed before the snapshot is handed out, so the
    /// next capture starts clean. The snapshot unmaps when dropped.
    pub fn drain(&mut self) -> Result<Snapshot<'_, B>, ChannelError> {
        if self.armed {
            log::debug!("Draining an armed printf channel, disarming first");
            self.disarm();
        }
        self.drains += 1;
        self.backend.copy_to_mirror()?;
        self.backend.clear_to_zero()?;
        self.backend.map()?;
        Ok(Snapshot {
            backend: &mut self.backend,
        })
    }
}

/// Keeps a channel armed; disarms on drop.
pub struct ArmGuard<'a, B: ChannelBackend> {
    channel: &'a mut Channel<B>,
}

impl<B: ChannelBackend> ArmGuard<'_, B> {
    /// Backend access for the dispatch, e.g. to attach the bound buffer.
    pub fn backend(&mut self) -> &mut B {
        self.channel.backend_mut()
    }
}

impl<B: ChannelBackend> Drop for ArmGuard<'_, B> {
    fn drop(&mut self) {
        self.channel.disarm();
    }
}

/// Read access to a drained buffer; unmaps on drop.
pub struct Snapshot<'a, B: ChannelBackend> {
    backend: &'a mut B,
}

impl<B: ChannelBackend> Snapshot<'_, B> {
    pub fn bytes(&self) -> &[u8] {
        self.backend.mapped()
    }

    pub fn words(&self) -> WordStream<'_> {
        WordStream::from_bytes(self.backend.mapped())
    }
}

impl<B: ChannelBackend> Drop for Snapshot<'_, B> {
    fn drop(&mut self) {
        self.backend.unmap();
    }
}
