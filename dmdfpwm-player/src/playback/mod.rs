//! Playback loop: fetch, decode and deliver time units to sinks

pub mod events;
pub mod synchronizer;

pub use events::{PlaybackEvent, PlaybackReport};
pub use synchronizer::{PlaybackSettings, PlaybackSynchronizer};
