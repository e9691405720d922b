//! Test helper modules for dmdfpwm-player integration tests
//!
//! - `ScriptedSink`: sink that rejects on cue and records every call
//! - `MemorySource`: in-memory byte source that records reads
//! - `RangeServer`: in-process HTTP server answering `Range` requests

#![allow(dead_code)]

pub mod memory_source;
pub mod range_server;
pub mod scripted_sink;

pub use memory_source::{MemorySource, SourceLog};
pub use range_server::RangeServer;
pub use scripted_sink::{ScriptedSink, SinkLog};

use dmdfpwm_common::{ChannelConfig, ContainerWriter, TrackMetadata};

/// Deterministic per-channel byte pattern
pub fn channel_bytes(channel: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 13 + channel * 71) % 256) as u8)
        .collect()
}

/// Container with named channels and `frames` full time units
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
