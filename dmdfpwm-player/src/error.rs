//! Error types for dmdfpwm-player
//!
//! Container and source failures come from `dmdfpwm_common::Error` and are
//! wrapped unchanged; playback adds decode, routing and sink failures.

use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum Error {
    /// Container, truncation or source failure
    #[error(transparent)]
    Container(#[from] dmdfpwm_common::Error),

    /// One channel's frame could not be decoded (recoverable per frame)
    #[error("Decode error on channel {channel}: {reason}")]
    Decode { channel: usize, reason: String },

    /// Routing left every channel without a sink
    #[error("No sink available for any channel")]
    SinkUnavailable,

    /// Sinks did not drain within the configured wait
    #[error("Sinks stalled without draining: {sinks:?}")]
    SinkStalled { sinks: Vec<String> },

    /// Playback was cancelled from outside
    #[error("Playback cancelled")]
    Cancelled,

    /// Player configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;
