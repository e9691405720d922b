//! Track descriptor and channel configuration model
//!
//! A [`Track`] is built once by the format reader and stays read-only for the
//! lifetime of a playback session.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output sample rate assumed by every consumer of the container
pub const SAMPLE_RATE: u32 = 48_000;

/// Metadata keys that are always present after parsing
pub const REQUIRED_METADATA_KEYS: [&str; 3] = ["artist", "title", "album"];

/// Descriptor of one channel as stored in the container's config block
///
/// `filter` and `bitrate` are descriptive only; the player never applies them.
/// The real channel index is the position in [`Track::channel_configs`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl ChannelConfig {
    /// Named channel with no other fields
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Free-text track metadata
///
/// Always carries `artist`, `title` and `album` (empty when absent in the file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    entries: BTreeMap<String, String>,
}

impl TrackMetadata {
    /// Build metadata from arbitrary entries, filling in the required keys
    pub fn from_entries(mut entries: BTreeMap<String, String>) -> Self {
        for key in REQUIRED_METADATA_KEYS {
            entries.entry(key.to_string()).or_default();
        }
        Self { entries }
    }

    pub fn new(artist: &str, title: &str, album: &str) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("artist".to_string(), artist.to_string());
        entries.insert("title".to_string(), title.to_string());
        entries.insert("album".to_string(), album.to_string());
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn artist(&self) -> &str {
        self.get("artist").unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.get("title").unwrap_or_default()
    }

    pub fn album(&self) -> &str {
        self.get("album").unwrap_or_default()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self::from_entries(BTreeMap::new())
    }
}

/// Immutable description of an opened container
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub version: u8,
    pub payload_length: u32,
    pub channel_count: u16,
    /// Bytes of codec data per channel per time unit ("chunk size")
    pub frame_byte_size: u16,
    pub metadata: TrackMetadata,
    /// Length never exceeds `channel_count`
    pub channel_configs: Vec<ChannelConfig>,
    /// Absolute offset of the first audio frame
    pub data_offset: u64,
    pub total_frames: u32,
}

impl Track {
    /// Bytes covering all channels for one time unit
    pub fn bytes_per_frame(&self) -> u32 {
        self.frame_byte_size as u32 * self.channel_count as u32
    }

    /// Samples produced per channel per time unit (one per encoded bit)
    pub fn samples_per_frame(&self) -> usize {
        self.frame_byte_size as usize * 8
    }

    /// Config for a channel, `None` for channels past the end of the config list
    pub fn channel_config(&self, channel: usize) -> Option<&ChannelConfig> {
        self.channel_configs.get(channel)
    }

    pub fn channel_name(&self, channel: usize) -> Option<&str> {
        self.channel_config(channel).and_then(|c| c.name.as_deref())
    }

    /// Absolute byte range `(offset, length)` of time unit `frame` (1-based)
    pub fn frame_range(&self, frame: u32) -> Result<(u64, u32)> {
        if frame == 0 || frame > self.total_frames {
            return Err(Error::FrameOutOfRange {
                frame,
                total: self.total_frames,
            });
        }
        let bytes_per_frame = self.bytes_per_frame();
        let offset = self.data_offset + (frame as u64 - 1) * bytes_per_frame as u64;
        Ok((offset, bytes_per_frame))
    }

    /// Playback length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 * self.samples_per_frame() as f64 / SAMPLE_RATE as f64
    }
}
