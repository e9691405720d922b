//! # dmdfpwm Player Library (dmdfpwm-player)
//!
//! Streams a dMDFPWM container one time unit at a time, decodes every
//! channel with its own DFPWM decoder, and keeps all routed sinks in lock
//! step through a per-unit delivery barrier.
//!
//! **Architecture:** source → [`playback::PlaybackSynchronizer`] →
//! [`decoder::FrameDecoder`] per channel → [`router::SinkAssignment`] →
//! [`sink::Sink`]s, with drain notifications flowing back over one channel.

pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod playback;
pub mod router;
pub mod sink;

pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use playback::{PlaybackEvent, PlaybackReport, PlaybackSettings, PlaybackSynchronizer};
pub use router::{RoutingConfig, SinkAssignment, SinkRouter};
pub use sink::{drain_channel, DrainEvents, DrainNotifier, QueueSink, Sink, SinkId, SinkSet};
