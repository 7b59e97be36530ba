//! Per-frame printf capture.
//!
//! Bracket a dispatch with [`ShaderPrintf::before`] and [`ShaderPrintf::after`]:
//!
//! ```no_run
//! # use gpu_printf::{FrameId, ShaderPrintf, MemoryBackend};
//! # let backend = MemoryBackend::new(1024).unwrap();
//! let mut printf = ShaderPrintf::init(backend, true);
//! printf.set_float_format("%.3f").unwrap();
//!
//! let frame = FrameId(0);
//! printf.before(frame);
//! // dispatch the compute shader here
//! printf.after(frame);
//! if printf.has_output() {
//!     print!("{}", printf.output());
//! }
//! ```

mod config;

pub use config::PrintfConfig;

use std::fmt;

use crate::channel::{Channel, ChannelBackend, ChannelError, MemoryBackend};
use crate::decode::{DecodeError, Decoder};
use crate::format::{FloatFormat, FormatError};
use crate::gpu::{GpuContext, GpuError, WgpuBackend};

/// Errors raised while setting up a capture.
///
/// Nothing here is raised by [`ShaderPrintf::after`]; capture-time problems
/// degrade to empty or partial output.
#[derive(Debug, thiserror::Error)]
pub enum PrintfError {
    #[error("Invalid float format: {0}")]
    Format(#[from] FormatError),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Suffix {0:?} is not a single-byte character")]
    InvalidSuffix(char),
}

/// Monotonic frame identifier supplied by the caller's frame loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

impl FrameId {
    pub fn next(self) -> Self {
        FrameId(self.0.wrapping_add(1))
    }
}

impl From<u64> for FrameId {
    fn from(value: u64) -> Self {
        FrameId(value)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a capture is in its cycle. `Idle` is both initial and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Armed,
    Draining,
}

/// Captures shader printf output around a dispatch.
pub struct ShaderPrintf<B: ChannelBackend> {
    channel: Channel<B>,
    decoder: Decoder,
    config: PrintfConfig,
    state: CaptureState,
    output: String,
    last_issue: Option<DecodeError>,
    decodes: u64,
}

impl<B: ChannelBackend> ShaderPrintf<B> {
    /// Default configuration with the given decode-once policy.
    pub fn init(backend: B, decode_once: bool) -> Self {
        let config = PrintfConfig {
            capacity_words: backend.capacity_words(),
            decode_once,
            ..Default::default()
        };
        Self::from_parts(backend, config, Decoder::default())
    }

    pub fn new(backend: B, config: PrintfConfig) -> Result<Self, PrintfError> {
        let decoder = Decoder::new(config.parsed_float_format()?, config.suffix_byte()?);
        let config = PrintfConfig {
            capacity_words: backend.capacity_words(),
            ..config
        };
        Ok(Self::from_parts(backend, config, decoder))
    }

    fn from_parts(backend: B, config: PrintfConfig, decoder: Decoder) -> Self {
        Self {
            channel: Channel::new(backend),
            decoder,
            config,
            state: CaptureState::Idle,
            output: String::new(),
            last_issue: None,
            decodes: 0,
        }
    }

    /// Set the float pattern used for `Float` and `Matrix` values.
    pub fn set_float_format(&mut self, pattern: &str) -> Result<&mut Self, FormatError> {
        let format = FloatFormat::parse(pattern)?;
        self.config.float_format = pattern.to_string();
        self.decoder.set_float_format(format);
        Ok(self)
    }

    /// Call before dispatching the shader.
    pub fn before(&mut self, frame: FrameId) {
        if self.state != CaptureState::Idle {
            log::debug!(
                "Printf capture re-armed on frame {} while {:?}",
                frame,
                self.state
            );
        }
        self.output.clear();
        self.last_issue = None;
        self.state = CaptureState::Armed;
        self.channel.arm();
    }

    /// Call after the dispatch has been recorded; drains and decodes the output.
    pub fn after(&mut self, frame: FrameId) {
        self.channel.disarm();
        if self.state != CaptureState::Armed {
            log::debug!("Printf capture finished on frame {} without before()", frame);
        }
        self.state = CaptureState::Draining;

        if self.config.decode_once && self.decodes > 0 {
            log::trace!("Skipping printf drain on frame {}", frame);
            self.state = CaptureState::Idle;
            return;
        }

        let decoded = match self.channel.drain() {
            Ok(snapshot) => self.decoder.decode_snapshot(snapshot.bytes()),
            Err(e) => {
                log::warn!("Printf capture unavailable on frame {}: {}", frame, e);
                self.output.clear();
                self.last_issue = None;
                self.state = CaptureState::Idle;
                return;
            }
        };

        if let Some(issue) = &decoded.issue {
            log::warn!("Printf output on frame {} is incomplete: {}", frame, issue);
        }
        if decoded.unknown_records > 0 {
            log::debug!(
                "Printf output on frame {} had {} unknown records",
                frame,
                decoded.unknown_records
            );
        }

        self.output = decoded.text;
        self.last_issue = decoded.issue;
        self.decodes += 1;
        self.state = CaptureState::Idle;
    }

    /// Run `dispatch` between [`ShaderPrintf::before`] and [`ShaderPrintf::after`].
    ///
    /// `after` runs whatever `dispatch` returns, so an `Err` still disarms.
    /// The dispatch runs under an [`crate::channel::ArmGuard`], so a panic also disarms.
    pub fn capture<R>(&mut self, frame: FrameId, dispatch: impl FnOnce(&mut B) -> R) -> R {
        self.before(frame);
        let result = {
            let mut armed = self.channel.arm_scoped();
            dispatch(armed.backend())
        };
        self.after(frame);
        result
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Why the latest output is partial, if it is.
    pub fn last_issue(&self) -> Option<&DecodeError> {
        self.last_issue.as_ref()
    }

    /// Number of successful decodes.
    pub fn decode_count(&self) -> u64 {
        self.decodes
    }

    /// Allow the next [`ShaderPrintf::after`] to decode again under the decode-once policy.
    pub fn reset_decode_count(&mut self) {
        self.decodes = 0;
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &PrintfConfig {
        &self.config
    }

    pub fn channel(&self) -> &Channel<B> {
        &self.channel
    }

    pub fn backend(&self) -> &B {
        self.channel.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.channel.backend_mut()
    }
}

impl ShaderPrintf<MemoryBackend> {
    /// Capture backed by host memory, sized from `config`.
    pub fn in_memory(config: PrintfConfig) -> Result<Self, PrintfError> {
        let backend = MemoryBackend::new(config.capacity_words)?;
        Self::new(backend, config)
    }
}

impl ShaderPrintf<WgpuBackend> {
    /// Capture on a GPU, sized from `config`, bound at bind group `group_index`.
    pub fn with_wgpu(
        ctx: &GpuContext,
        config: PrintfConfig,
        group_index: u32,
    ) -> Result<Self, PrintfError> {
        let backend = ctx.printf_backend(config.capacity_words, group_index)?;
        Self::new(backend, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RecordEncoder;

    fn printf(decode_once: bool) -> ShaderPrintf<MemoryBackend> {
        ShaderPrintf::init(MemoryBackend::new(256).unwrap(), decode_once)
    }

    #[test]
    fn test_state_cycle() {
        let mut p = printf(false);
        assert_eq!(p.state(), CaptureState::Idle);
        p.before(FrameId(1));
        assert_eq!(p.state(), CaptureState::Armed);
        assert!(p.channel().is_armed());
        p.after(FrameId(1));
        assert_eq!(p.state(), CaptureState::Idle);
        assert!(!p.channel().is_armed());
    }

    #[test]
    fn test_output_from_produced_records() {
        let mut p = printf(false);
        p.before(FrameId(0));
        p.backend_mut().produce(RecordEncoder::new().ints(&[1, -2]));
        p.after(FrameId(0));
        assert!(p.has_output());
        assert_eq!(p.output(), "1, -2\n");
        assert_eq!(p.decode_count(), 1);
        assert!(p.last_issue().is_none());
    }

    #[test]
    fn test_before_clears_output() {
        let mut p = printf(true);
        p.capture(FrameId(0), |b| b.produce(RecordEncoder::new().char(b'x')));
        assert!(p.has_output());
        p.before(FrameId(1));
        assert!(!p.has_output());
    }

    #[test]
    fn test_set_float_format_validates() {
        let mut p = printf(false);
        assert!(p.set_float_format("%f %f").is_err());
        assert!(matches!(
            p.set_float_format("%.70000f"),
            Err(FormatError::OutOfRange { .. })
        ));
        assert_eq!(p.config().float_format, "%.3f");
        p.set_float_format("%.1f").unwrap();
        assert_eq!(p.config().float_format, "%.1f");
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = PrintfConfig {
            float_format: "no conversion".to_string(),
            ..Default::default()
        };
        let result = ShaderPrintf::new(MemoryBackend::new(16).unwrap(), config);
        assert!(matches!(result, Err(PrintfError::Format(_))));
    }

    #[test]
    fn test_frame_id() {
        assert_eq!(FrameId(41).next(), FrameId(42));
        assert_eq!(FrameId::from(7).to_string(), "#7");
    }
}
