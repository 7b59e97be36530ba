//! GPU Printf Core
//!
//! Host side of a shader printf channel: compute shaders write typed debug
//! records into a storage buffer, and this crate copies the buffer back,
//! decodes it and hands out readable text.
//!
//! # Features
//!
//! - Self-describing record stream: chars, 32/64-bit integers, floats, matrices
//! - Capacity-bounded channel with copy-back, clear and scoped mapping
//! - Per-frame capture controller with a decode-once policy
//! - printf-style float formatting
//! - GPU backend via wgpu, host-memory backend for tests and simulation

pub mod capture;
pub mod channel;
pub mod decode;
pub mod format;
pub mod gpu;
pub mod logging;
pub mod wire;

// Re-export commonly used types
pub use capture::{CaptureState, FrameId, PrintfConfig, PrintfError, ShaderPrintf};
pub use channel::{Channel, ChannelBackend, ChannelError, MemoryBackend};
pub use decode::{DecodeError, DecodedText, Decoder};
pub use format::{FloatFormat, FormatError};
pub use gpu::{GpuContext, GpuError, WgpuBackend};
pub use logging::init_logging;
pub use wire::{Matrix, Record, RecordEncoder, RecordKind};
