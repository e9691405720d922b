//! Container serialisation from already-encoded per-channel streams

use super::{CONFIG_PREFIX_LEN, FORMAT_VERSION, MAGIC, METADATA_PREFIX_LEN, SILENCE_BYTE};
use crate::error::{Error, Result};
use crate::track::{ChannelConfig, TrackMetadata};
use std::io::Write;
use tracing::debug;

/// Builds a version 1 container around per-channel DFPWM byte streams
#[derive(Debug, Clone)]
pub struct ContainerWriter {
    frame_byte_size: u16,
    metadata: TrackMetadata,
    channels: Vec<ChannelConfig>,
}

impl ContainerWriter {
    pub fn new(frame_byte_size: u16) -> Self {
        Self {
            frame_byte_size,
            metadata: TrackMetadata::default(),
            channels: Vec::new(),
        }
    }

    pub fn metadata(mut self, metadata: TrackMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Channel descriptors; entries without an `index` get their position
    pub fn channels(mut self, channels: Vec<ChannelConfig>) -> Self {
        self.channels = channels
            .into_iter()
            .enumerate()
            .map(|(position, mut config)| {
                config.index.get_or_insert(position as u32);
                config
            })
            .collect();
        self
    }

    /// Serialise into a byte vector; one entry of `channel_data` per channel
    pub fn encode(&self, channel_data: &[Vec<u8>]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out, channel_data)?;
        Ok(out)
    }

    /// Write the container, returning the number of bytes written
    ///
    /// # Errors
    /// `Error::Format` when a section does not fit its length prefix or the
    /// channel layout is inconsistent.
    pub fn write_to<W: Write>(&self, writer: &mut W, channel_data: &[Vec<u8>]) -> Result<u64> {
        if self.frame_byte_size == 0 {
            return Err(Error::format("frame byte size must be positive"));
        }

        let channel_count = u16::try_from(channel_data.len())
            .map_err(|_| Error::format(format!("too many channels: {}", channel_data.len())))?;
        if channel_count == 0 {
            return Err(Error::format("at least one channel is required"));
        }
        if self.channels.len() > channel_data.len() {
            return Err(Error::format(format!(
                "{} channel configs for {} channels",
                self.channels.len(),
                channel_count
            )));
        }

        let metadata_json = serde_json::to_vec(self.metadata.entries())
            .map_err(|e| Error::format(format!("metadata serialisation failed: {}", e)))?;
        let metadata_len = u8::try_from(metadata_json.len()).map_err(|_| {
            Error::format(format!("metadata block is {} bytes (max 255)", metadata_json.len()))
        })?;

        let config_json = serde_json::to_vec(&self.channels)
            .map_err(|e| Error::format(format!("channel config serialisation failed: {}", e)))?;
        let config_len = u16::try_from(config_json.len()).map_err(|_| {
            Error::format(format!("channel config block is {} bytes (max 65535)", config_json.len()))
        })?;

        let audio = interleave(channel_data, self.frame_byte_size as usize);

        let payload_length = METADATA_PREFIX_LEN
            + metadata_json.len() as u64
            + CONFIG_PREFIX_LEN
            + config_json.len() as u64
            + audio.len() as u64;
        let payload_length = u32::try_from(payload_length)
            .map_err(|_| Error::format(format!("payload of {} bytes exceeds 4 GiB", payload_length)))?;

        writer.write_all(MAGIC)?;
        writer.write_all(&[FORMAT_VERSION])?;
        writer.write_all(&payload_length.to_le_bytes())?;
        writer.write_all(&channel_count.to_le_bytes())?;
        writer.write_all(&self.frame_byte_size.to_le_bytes())?;
        writer.write_all(&[metadata_len])?;
        writer.write_all(&metadata_json)?;
        writer.write_all(&config_len.to_le_bytes())?;
        writer.write_all(&config_json)?;
        writer.write_all(&audio)?;

        debug!(
            channels = channel_count,
            frame_byte_size = self.frame_byte_size,
            audio_bytes = audio.len(),
            "Wrote dMDFPWM container"
        );

        Ok(16 + payload_length as u64)
    }
}

/// Interleave per-channel streams into `chunk_size` blocks, channel-major per
/// time unit
///
/// The number of time units follows the longest stream; shorter streams and
/// the final partial chunk are padded with [`SILENCE_BYTE`].
pub fn interleave<T: AsRef<[u8]>>(channel_data: &[T], chunk_size: usize) -> Vec<u8> {
    if channel_data.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let longest = channel_data.iter().map(|d| d.as_ref().len()).max().unwrap_or(0);
    let chunks = longest.div_ceil(chunk_size);

    let mut out = Vec::with_capacity(chunks * chunk_size * channel_data.len());
    for chunk in 0..chunks {
        let start = chunk * chunk_size;
        for data in channel_data {
            let data = data.as_ref();
            let end = (start + chunk_size).min(data.len());
            let taken: &[u8] = if start < end { &data[start..end] } else { &[] };
            out.extend_from_slice(taken);
            out.resize(out.len() + (chunk_size - taken.len()), SILENCE_BYTE);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_pads_short_channels() {
        let a = vec![1u8, 2, 3, 4, 5];
        let b = vec![9u8, 9];
        let out = interleave(&[a, b], 3);
        assert_eq!(
            out,
            vec![
                1, 2, 3, 9, 9, SILENCE_BYTE, // time unit 1
                4, 5, SILENCE_BYTE, SILENCE_BYTE, SILENCE_BYTE, SILENCE_BYTE, // time unit 2
            ]
        );
    }

    #[test]
    fn test_interleave_empty() {
        let none: [Vec<u8>; 0] = [];
        assert!(interleave(&none, 4).is_empty());
    }

    #[test]
    fn test_header_fields() {
        let writer = ContainerWriter::new(4)
            .metadata(TrackMetadata::new("a", "t", "b"))
            .channels(vec![ChannelConfig::named("FL"), ChannelConfig::named("FR")]);
        let bytes = writer.encode(&[vec![0; 8], vec![1; 8]]).unwrap();

        assert_eq!(&bytes[0..7], b"DMDFPWM");
        assert_eq!(bytes[7], 1);
        let payload_length = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(payload_length as usize, bytes.len() - 16);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 4);
    }

    #[test]
    fn test_rejects_more_configs_than_channels() {
        let writer = ContainerWriter::new(4).channels(vec![
            ChannelConfig::named("FL"),
            ChannelConfig::named("FR"),
        ]);
        assert!(matches!(writer.encode(&[vec![0; 4]]), Err(Error::Format(_))));
    }

    #[test]
    fn test_rejects_oversized_metadata() {
        let long = "x".repeat(300);
        let writer = ContainerWriter::new(4).metadata(TrackMetadata::new(&long, "", ""));
        assert!(matches!(writer.encode(&[vec![0; 4]]), Err(Error::Format(_))));
    }

    #[test]
    fn test_fills_missing_index() {
        let writer = ContainerWriter::new(4).channels(vec![
            ChannelConfig::named("FL"),
            ChannelConfig::named("FR"),
        ]);
        assert_eq!(writer.channels[1].index, Some(1));
    }
}
