//! GPU side of the printf channel using wgpu.
//!
//! Provides headless device acquisition and the storage/staging buffer pair
//! that backs a [`crate::channel::Channel`] on real hardware.

pub mod backend;
pub mod context;
pub mod layouts;

pub use backend::{WgpuBackend, PRINTF_BINDING};
pub use context::{GpuContext, GpuError};
pub use layouts::{create_printf_layout, BindGroupLayoutBuilder};
