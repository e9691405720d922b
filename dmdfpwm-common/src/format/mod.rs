//! dMDFPWM container layout
//!
//! ```text
//! offset  size  field
//! 0       7     magic "DMDFPWM"
//! 7       1     version (1)
//! 8       4 LE  payload length (bytes after this 16-byte header)
//! 12      2 LE  channel count
//! 14      2 LE  frame byte size (per channel per time unit)
//! 16      1     metadata length M
//! 17      M     metadata, JSON object
//! 17+M    2 LE  channel config length C
//! 19+M    C     channel config, JSON array
//! 19+M+C  ...   audio: frames of (frame byte size x channel count) bytes
//! ```
//!
//! Version 1 fixes the channel config prefix at two bytes little-endian.
//! Containers with any other version byte are rejected rather than guessed at.

mod reader;
mod writer;

pub use reader::{read_frame, read_track};
pub use writer::{interleave, ContainerWriter};

use crate::track::Track;

pub const MAGIC: &[u8; 7] = b"DMDFPWM";
pub const FORMAT_VERSION: u8 = 1;

/// Fixed header: magic, version, payload length, channel count, frame byte size
pub const HEADER_LEN: u64 = 16;
pub const METADATA_PREFIX_LEN: u64 = 1;
pub const CONFIG_PREFIX_LEN: u64 = 2;

/// Filler for incomplete trailing chunks (an idle DFPWM bit pattern)
pub const SILENCE_BYTE: u8 = 0x55;

/// Raw bytes of one time unit, all channels, in channel order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    index: u32,
    frame_byte_size: usize,
    bytes: Vec<u8>,
}

impl Frame {
    pub(crate) fn new(index: u32, track: &Track, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), track.bytes_per_frame() as usize);
        Self {
            index,
            frame_byte_size: track.frame_byte_size as usize,
            bytes,
        }
    }

    /// 1-based time unit this frame covers
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn channel_count(&self) -> usize {
        self.bytes.len() / self.frame_byte_size
    }

    /// Codec bytes of one channel
    ///
    /// # Panics
    /// If `channel` is not below the track's channel count
    pub fn channel(&self, channel: usize) -> &[u8] {
        let start = channel * self.frame_byte_size;
        &self.bytes[start..start + self.frame_byte_size]
    }

    /// Per-channel slices in channel order
    pub fn channels(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes.chunks_exact(self.frame_byte_size)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
