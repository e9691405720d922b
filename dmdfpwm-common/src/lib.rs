//! # dMDFPWM Common Library
//!
//! Container-level code shared by the player and tooling:
//! - Track model (header fields, metadata, channel configs)
//! - Byte sources (local file, HTTP range requests)
//! - Container reader and writer
//! - Configuration file loading

pub mod config;
pub mod error;
pub mod format;
pub mod source;
pub mod track;

pub use error::{Error, Result};
pub use format::{read_frame, read_track, ContainerWriter, Frame};
pub use source::{open_source, ByteSource, FileSource, HttpRangeSource, SourceOptions};
pub use track::{ChannelConfig, Track, TrackMetadata, SAMPLE_RATE};
