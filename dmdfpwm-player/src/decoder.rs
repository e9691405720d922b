//! Per-channel frame decoder
//!
//! Wraps one stateful codec instance. Frames must be fed in time order;
//! decoders of different channels are independent of each other.

use crate::codec::FrameCodec;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::trace;

/// Decoder for one channel of a track
pub struct FrameDecoder {
    channel: usize,
    frame_byte_size: usize,
    codec: Box<dyn FrameCodec>,
    frames_decoded: u64,
    frames_failed: u64,
}

impl FrameDecoder {
    pub fn new(channel: usize, frame_byte_size: u16, codec: Box<dyn FrameCodec>) -> Self {
        Self {
            channel,
            frame_byte_size: frame_byte_size as usize,
            codec,
            frames_decoded: 0,
            frames_failed: 0,
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Decode the next frame of this channel
    ///
    /// Samples come back shared so one payload can be handed to several sinks.
    /// A frame of the wrong size is rejected before it reaches the codec, so
    /// the codec state is left as it was.
    ///
    /// # Errors
    /// `Error::Decode` for a wrong-sized frame or a codec failure
    pub fn decode(&mut self, raw: &[u8]) -> Result<Arc<[i8]>> {
        if raw.len() != self.frame_byte_size {
            self.frames_failed += 1;
            return Err(Error::Decode {
                channel: self.channel,
                reason: format!(
                    "frame is {} bytes, expected {}",
                    raw.len(),
                    self.frame_byte_size
                ),
            });
        }

        match self.codec.decode(raw) {
            Ok(samples) => {
                self.frames_decoded += 1;
                trace!(
                    channel = self.channel,
                    codec = self.codec.name(),
                    samples = samples.len(),
                    "Decoded frame"
                );
                Ok(samples.into())
            }
            Err(e) => {
                self.frames_failed += 1;
                Err(Error::Decode {
                    channel: self.channel,
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_failed(&self) -> u64 {
        self.frames_failed
    }
}
