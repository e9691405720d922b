//! Playback synchronizer
//!
//! Walks a track one time unit at a time. Each unit is fetched as a single
//! ranged read, split per channel, decoded, and handed to every sink routed
//! to that channel. A unit is only finished once every (channel, sink) pair
//! has accepted it (the delivery barrier); only then is the next unit
//! fetched. The first `prefill_frames` units are submitted once without
//! waiting so sinks start with some audio queued.
//!
//! The synchronizer is a single task. It owns the sinks and the receiving
//! end of the drain channel, so retries never race with other submitters.

use super::events::{PlaybackEvent, PlaybackReport};
use crate::codec::CodecFactory;
use crate::decoder::FrameDecoder;
use crate::error::{Error, Result};
use crate::router::SinkAssignment;
use crate::sink::{DrainEvents, SinkId, SinkSet};
use dmdfpwm_common::{read_frame, ByteSource, Frame, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Tunables of one playback session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// Time units submitted up front without waiting on the barrier
    pub prefill_frames: u32,

    /// Longest wait for a barrier to clear; `None` waits forever
    pub drain_timeout: Option<Duration>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            prefill_frames: 1,
            drain_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Decoded samples of one time unit, `None` for skipped channels
type DecodedFrame = Vec<Option<Arc<[i8]>>>;

/// Drives one track through its sinks
pub struct PlaybackSynchronizer {
    source: Box<dyn ByteSource>,
    track: Arc<Track>,
    sinks: SinkSet,
    assignment: SinkAssignment,
    drains: DrainEvents,
    decoders: Vec<FrameDecoder>,
    settings: PlaybackSettings,
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
    report: PlaybackReport,
}

impl PlaybackSynchronizer {
    /// Create a synchronizer; one codec instance is built per channel
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn ByteSource>,
        track: Arc<Track>,
        sinks: SinkSet,
        assignment: SinkAssignment,
        drains: DrainEvents,
        codecs: &CodecFactory,
        settings: PlaybackSettings,
        cancel: CancellationToken,
    ) -> Self {
        let decoders = (0..track.channel_count as usize)
            .map(|ch| FrameDecoder::new(ch, track.frame_byte_size, codecs()))
            .collect();

        Self {
            source,
            track,
            sinks,
            assignment,
            drains,
            decoders,
            settings,
            cancel,
            events: None,
            report: PlaybackReport::default(),
        }
    }

    /// Send progress and warning events to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    /// Hand the sinks back, e.g. to let them play out their queued tail
    pub fn into_sinks(self) -> SinkSet {
        self.sinks
    }

    /// Play the whole track
    ///
    /// On success the source is closed and the sinks keep whatever audio they
    /// have queued. On any error (including cancellation) every assigned
    /// sink is stopped and the source is closed before the error is returned.
    ///
    /// # Errors
    /// - `Error::SinkUnavailable` if no channel has a sink
    /// - `Error::Container` for fetch, truncation and format failures
    /// - `Error::SinkStalled` if a barrier does not clear within `drain_timeout`
    /// - `Error::Cancelled` when the cancellation token fires
    pub async fn run(&mut self) -> Result<PlaybackReport> {
        let result = self.play().await;

        match &result {
            Ok(report) => {
                info!(
                    frames = report.frames_played,
                    decode_failures = report.decode_failures,
                    "Playback finished"
                );
                self.close_source().await;
                self.emit(PlaybackEvent::Finished {
                    frames_played: report.frames_played,
                });
            }
            Err(e) => {
                warn!("Playback aborted: {}", e);
                for id in self.assignment.all_sinks() {
                    self.sinks.stop(&id);
                }
                self.close_source().await;
                self.emit(PlaybackEvent::Aborted {
                    reason: e.to_string(),
                });
            }
        }

        result
    }

    async fn play(&mut self) -> Result<PlaybackReport> {
        self.assignment.require_audible()?;

        let total = self.track.total_frames;
        let prefill = self.settings.prefill_frames.min(total);

        info!(
            source = %self.source.describe(),
            frames = total,
            channels = self.track.channel_count,
            pairs = self.assignment.total(),
            prefill,
            "Starting playback"
        );
        self.emit(PlaybackEvent::Started {
            total_frames: total,
            channels: self.track.channel_count as usize,
            sinks: self.assignment.all_sinks().len(),
        });

        self.report = PlaybackReport::default();

        for t in 1..=total {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let frame = self.fetch(t).await?;
            let decoded = self.decode(&frame);

            if t <= prefill {
                self.submit_once(t, &decoded);
            } else {
                self.deliver(t, &decoded).await?;
            }

            self.report.frames_played = t;
            self.emit(PlaybackEvent::Progress {
                frame: t,
                total,
                percent: t as f64 * 100.0 / total as f64,
            });
        }

        Ok(self.report.clone())
    }

    /// Fetch time unit `t`, racing the read against cancellation
    async fn fetch(&mut self, t: u32) -> Result<Frame> {
        let cancel = &self.cancel;
        let source = self.source.as_mut();
        let track = self.track.as_ref();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            frame = read_frame(source, track, t) => {
                trace!(frame = t, "Fetched time unit");
                Ok(frame?)
            }
        }
    }

    /// Decode every routed channel; failures skip only that channel
    fn decode(&mut self, frame: &Frame) -> DecodedFrame {
        let t = frame.index();
        let mut decoded = Vec::with_capacity(self.decoders.len());

        for ch in 0..self.decoders.len() {
            if self.assignment.sinks_for(ch).is_empty() {
                decoded.push(None);
                continue;
            }

            match self.decoders[ch].decode(frame.channel(ch)) {
                Ok(samples) => decoded.push(Some(samples)),
                Err(e) => {
                    warn!(frame = t, channel = ch, "Skipping channel: {}", e);
                    self.report.decode_failures += 1;
                    let reason = match e {
                        Error::Decode { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    self.emit(PlaybackEvent::DecodeWarning {
                        frame: t,
                        channel: ch,
                        reason,
                    });
                    decoded.push(None);
                }
            }
        }

        decoded
    }

    /// (channel, sink) pairs that have samples to deliver this unit
    fn pairs(&self, decoded: &DecodedFrame) -> Vec<(usize, SinkId)> {
        decoded
            .iter()
            .enumerate()
            .filter(|(_, samples)| samples.is_some())
            .flat_map(|(ch, _)| {
                self.assignment
                    .sinks_for(ch)
                    .iter()
                    .map(move |id| (ch, id.clone()))
            })
            .collect()
    }

    /// Prefill: one submission per pair, rejections ignored
    fn submit_once(&mut self, t: u32, decoded: &DecodedFrame) {
        for (ch, id) in self.pairs(decoded) {
            if let Some(samples) = &decoded[ch] {
                if !self.sinks.submit(&id, samples) {
                    debug!(frame = t, channel = ch, sink = %id, "Prefill rejected, not retrying");
                }
            }
        }
    }

    /// Delivery barrier for time unit `t`
    async fn deliver(&mut self, t: u32, decoded: &DecodedFrame) -> Result<()> {
        let mut pending = self.pairs(decoded);
        let deadline = self.settings.drain_timeout.map(|d| Instant::now() + d);

        // Notifications from earlier units carry no information for this one
        self.drains.clear();

        let mut round = 0u32;
        loop {
            let sinks = &mut self.sinks;
            pending.retain(|(ch, id)| match &decoded[*ch] {
                Some(samples) => !sinks.submit(id, samples),
                None => false,
            });

            if pending.is_empty() {
                if round > 0 {
                    debug!(frame = t, rounds = round, "Barrier cleared after retries");
                }
                return Ok(());
            }

            round += 1;
            trace!(frame = t, pending = pending.len(), round, "Waiting for sink drain");
            self.wait_for_drain(deadline, &pending).await?;
        }
    }

    /// Block until any sink drains, the deadline passes, or playback is cancelled
    async fn wait_for_drain(
        &mut self,
        deadline: Option<Instant>,
        pending: &[(usize, SinkId)],
    ) -> Result<()> {
        let cancel = &self.cancel;
        let drains = &mut self.drains;

        let drained = async {
            match deadline {
                Some(at) => tokio::time::timeout_at(at, drains.next()).await.ok(),
                None => Some(drains.next().await),
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = drained => outcome,
        };

        match outcome {
            Some(Some(id)) => {
                trace!(sink = %id, "Sink drained");
                Ok(())
            }
            // Timed out, or no sink can ever notify again
            Some(None) | None => Err(stalled(pending)),
        }
    }

    async fn close_source(&mut self) {
        if let Err(e) = self.source.close().await {
            warn!(source = %self.source.describe(), "Failed to close source: {}", e);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

fn stalled(pending: &[(usize, SinkId)]) -> Error {
    let mut sinks: Vec<String> = pending.iter().map(|(_, id)| id.to_string()).collect();
    sinks.sort();
    sinks.dedup();
    Error::SinkStalled { sinks }
}
