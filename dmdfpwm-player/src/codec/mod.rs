//! Codec seam
//!
//! The container carries one independently encoded stream per channel. A
//! [`FrameCodec`] decodes one channel's frames in order; implementations keep
//! filter state between calls, so one instance must serve exactly one channel.

mod dfpwm;

pub use dfpwm::Dfpwm;

use thiserror::Error;

/// Codec-level failure for one frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Stateful per-channel decoder
pub trait FrameCodec: Send {
    /// Decode the next frame of this channel into signed 8-bit samples
    fn decode(&mut self, input: &[u8]) -> Result<Vec<i8>, CodecError>;

    /// Short codec name for logs
    fn name(&self) -> &'static str;
}

/// Creates one fresh codec instance per channel
pub type CodecFactory = Box<dyn Fn() -> Box<dyn FrameCodec> + Send + Sync>;

/// Factory for the reference DFPWM codec
pub fn dfpwm_factory() -> CodecFactory {
    Box::new(|| Box::new(Dfpwm::new()))
}
