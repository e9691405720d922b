//! Test helpers for dmdfpwm-common integration tests
//!
//! - `RangeServer`: in-process HTTP server answering `Range` requests
//! - `build_container`: container bytes with deterministic audio

#![allow(dead_code)]

pub mod range_server;

pub use range_server::{RangeServer, ServeMode};

use dmdfpwm_common::{ChannelConfig, ContainerWriter, TrackMetadata};
use std::io::Write;

/// Deterministic per-channel byte pattern so frames can be identified
pub fn channel_bytes(channel: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 7 + channel * 31) % 251) as u8)
        .collect()
}

/// Container with `channels` named channels of `frames` full time units
pub fn build_container(names: &[&str], frame_byte_size: u16, frames: usize) -> Vec<u8> {
    let data: Vec<Vec<u8>> = (0..names.len())
        .map(|ch| channel_bytes(ch, frame_byte_size as usize * frames))
        .collect();

    ContainerWriter::new(frame_byte_size)
        .metadata(TrackMetadata::new("Artist", "Title", "Album"))
        .channels(names.iter().map(|n| ChannelConfig::named(*n)).collect())
        .encode(&data)
        .unwrap()
}

/// Write `bytes` to a temp file that lives as long as the returned handle
pub fn temp_container(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
