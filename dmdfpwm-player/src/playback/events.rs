//! Playback progress events
//!
//! Sent by the synchronizer over an optional unbounded channel. Nothing in the
//! playback loop depends on anyone listening.

/// Events emitted while a track plays
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Playback loop entered
    ///
    /// # Fields
    /// * `total_frames` - time units in the track
    /// * `channels` - channel count of the track
    /// * `sinks` - distinct sinks receiving audio
    Started {
        total_frames: u32,
        channels: usize,
        sinks: usize,
    },

    /// Time unit `frame` was accepted by every assigned sink
    Progress { frame: u32, total: u32, percent: f64 },

    /// One channel's frame could not be decoded and was skipped
    DecodeWarning {
        frame: u32,
        channel: usize,
        reason: String,
    },

    /// Every time unit was delivered
    Finished { frames_played: u32 },

    /// Playback stopped early; sinks have been stopped
    Aborted { reason: String },
}

/// Summary returned by a completed playback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub frames_played: u32,
    /// Per-channel decode failures that were skipped
    pub decode_failures: u64,
}
