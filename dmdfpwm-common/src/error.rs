//! Common error types for dMDFPWM container access

use thiserror::Error;

/// Common result type for container and source operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening or reading a dMDFPWM container
#[derive(Error, Debug)]
pub enum Error {
    /// Header or section layout is not a valid version 1 container
    #[error("Format error: {0}")]
    Format(String),

    /// Source returned fewer bytes than requested
    #[error("Truncated data at offset {offset}: expected {expected} bytes, got {actual}")]
    Truncated {
        offset: u64,
        expected: u32,
        actual: usize,
    },

    /// Transport or file I/O failure
    #[error("Source error: {0}")]
    Source(String),

    /// Time unit outside `1..=total_frames`
    #[error("Frame {frame} out of range (track has {total} frames)")]
    FrameOutOfRange { frame: u32, total: u32 },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error outside of a byte source (config files, writers)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for format errors
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}
