//! Header, metadata and channel config parsing

use super::{Frame, CONFIG_PREFIX_LEN, FORMAT_VERSION, HEADER_LEN, MAGIC, METADATA_PREFIX_LEN};
use crate::error::{Error, Result};
use crate::source::ByteSource;
use crate::track::{ChannelConfig, Track, TrackMetadata};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Parse the container header sections into a [`Track`]
///
/// The source is only borrowed; the caller keeps ownership of its handle.
///
/// # Errors
/// - `Error::Format` for bad magic, unsupported version, zero-sized frames or
///   length fields that do not add up
/// - `Error::Truncated` / `Error::Source` from the underlying reads
pub async fn read_track(source: &mut dyn ByteSource) -> Result<Track> {
    // Identify the container before asking for the rest of the header
    let ident_len = MAGIC.len() + 1;
    let ident = match source.read(0, ident_len as u32).await {
        Ok(ident) => ident,
        Err(Error::Truncated { actual, .. }) => {
            return Err(Error::format(format!(
                "{} bytes is too short for a dMDFPWM header",
                actual
            )));
        }
        Err(e) => return Err(e),
    };

    if ident.len() < ident_len || &ident[..MAGIC.len()] != MAGIC {
        return Err(Error::format("bad magic"));
    }

    let version = ident[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(Error::format(format!("unsupported version {}", version)));
    }

    let fields_len = (HEADER_LEN + METADATA_PREFIX_LEN) as usize - ident_len;
    let fields = source.read(ident_len as u64, fields_len as u32).await?;
    if fields.len() < fields_len {
        return Err(Error::Truncated {
            offset: ident_len as u64,
            expected: fields_len as u32,
            actual: fields.len(),
        });
    }

    let payload_length = u32::from_le_bytes([fields[0], fields[1], fields[2], fields[3]]);
    let channel_count = u16::from_le_bytes([fields[4], fields[5]]);
    let frame_byte_size = u16::from_le_bytes([fields[6], fields[7]]);
    let metadata_len = fields[8] as u64;

    let bytes_per_frame = channel_count as u64 * frame_byte_size as u64;
    if bytes_per_frame == 0 {
        return Err(Error::format(format!(
            "zero-sized frames (channels={}, frame byte size={})",
            channel_count, frame_byte_size
        )));
    }

    // Metadata plus the config length prefix in one read
    let metadata_offset = HEADER_LEN + METADATA_PREFIX_LEN;
    let block = source
        .read(metadata_offset, (metadata_len + CONFIG_PREFIX_LEN) as u32)
        .await?;
    let (metadata_bytes, prefix) = block.split_at(metadata_len as usize);
    let config_len = u16::from_le_bytes([prefix[0], prefix[1]]) as u64;

    let config_offset = metadata_offset + metadata_len + CONFIG_PREFIX_LEN;
    let config_bytes = source.read(config_offset, config_len as u32).await?;

    let metadata = parse_metadata(metadata_bytes);
    let channel_configs = parse_channel_configs(&config_bytes, channel_count);

    let data_offset = config_offset + config_len;

    // Everything between the fixed header and the audio counts towards payload_length
    let preamble = METADATA_PREFIX_LEN + metadata_len + CONFIG_PREFIX_LEN + config_len;
    let available = (payload_length as u64)
        .checked_sub(preamble)
        .ok_or_else(|| {
            Error::format(format!(
                "inconsistent payload length: {} < {} bytes of metadata and config",
                payload_length, preamble
            ))
        })?;

    let total_frames = (available / bytes_per_frame) as u32;

    if let Some(len) = source.total_len() {
        let needed = data_offset + total_frames as u64 * bytes_per_frame;
        if len < needed {
            warn!(
                source = %source.describe(),
                len,
                needed,
                "Source is shorter than the header claims; playback will hit truncated data"
            );
        }
    }

    let track = Track {
        version,
        payload_length,
        channel_count,
        frame_byte_size,
        metadata,
        channel_configs,
        data_offset,
        total_frames,
    };

    info!(
        source = %source.describe(),
        channels = track.channel_count,
        frame_byte_size = track.frame_byte_size,
        frames = track.total_frames,
        title = %track.metadata.title(),
        "Opened dMDFPWM track"
    );

    Ok(track)
}

/// Read time unit `frame` (1-based) of `track`
///
/// # Errors
/// `Error::FrameOutOfRange` for `frame == 0` or `frame > total_frames`,
/// `Error::Truncated` when the source hands back fewer bytes than the unit
/// holds; source errors otherwise.
pub async fn read_frame(source: &mut dyn ByteSource, track: &Track, frame: u32) -> Result<Frame> {
    let (offset, length) = track.frame_range(frame)?;
    let bytes = source.read(offset, length).await?;

    if bytes.len() < length as usize {
        return Err(Error::Truncated {
            offset,
            expected: length,
            actual: bytes.len(),
        });
    }
    if bytes.len() > length as usize {
        return Err(Error::Source(format!(
            "{} returned {} bytes for a {}-byte read at {}",
            source.describe(),
            bytes.len(),
            length,
            offset
        )));
    }

    Ok(Frame::new(frame, track, bytes))
}

fn parse_metadata(bytes: &[u8]) -> TrackMetadata {
    let object = match serde_json::from_slice::<serde_json::Map<String, Value>>(bytes) {
        Ok(object) => object,
        Err(e) => {
            if !bytes.is_empty() {
                warn!("Unreadable metadata block, using empty metadata: {}", e);
            }
            return TrackMetadata::default();
        }
    };

    let entries: BTreeMap<String, String> = object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect();

    TrackMetadata::from_entries(entries)
}

fn parse_channel_configs(bytes: &[u8], channel_count: u16) -> Vec<ChannelConfig> {
    if bytes.is_empty() {
        return Vec::new();
    }

    let mut configs = match serde_json::from_slice::<Vec<ChannelConfig>>(bytes) {
        Ok(configs) => configs,
        Err(e) => {
            warn!("Unreadable channel config block, treating all channels as unnamed: {}", e);
            return Vec::new();
        }
    };

    if configs.len() > channel_count as usize {
        warn!(
            entries = configs.len(),
            channel_count, "Ignoring channel config entries beyond the channel count"
        );
        configs.truncate(channel_count as usize);
    }

    for (position, config) in configs.iter().enumerate() {
        if let Some(index) = config.index {
            if index as usize != position {
                debug!(position, index, "Channel config index differs from its position");
            }
        }
    }

    configs
}
