//! Audio sinks
//!
//! A sink is an output endpoint with its own buffer. `submit` either takes a
//! whole payload or rejects it because the buffer is full; when a sink's
//! buffer drains it announces its id on the shared drain channel so the
//! dispatcher can retry pending submissions.
//!
//! Sink discovery is not done here: the player is handed a list of sinks.

mod queue;

pub use queue::{QueueSink, QueueSinkOptions};

use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Stable identifier of a sink (e.g. a peripheral name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(String);

impl SinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SinkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SinkId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Output endpoint accepting decoded samples
pub trait Sink: Send {
    fn id(&self) -> &SinkId;

    /// Offer a payload; `false` means the buffer is full and nothing was taken
    fn submit(&mut self, samples: &[i8]) -> bool;

    /// Discard everything queued and silence the output
    fn stop(&mut self);

    /// Samples accepted but not yet played
    fn pending_samples(&self) -> usize {
        0
    }
}

/// Sending half of the drain channel, cloned into every sink
#[derive(Debug, Clone)]
pub struct DrainNotifier {
    tx: mpsc::UnboundedSender<SinkId>,
}

impl DrainNotifier {
    /// Announce that `id` has room again
    pub fn notify(&self, id: &SinkId) {
        // Receiver gone means playback is over; nothing left to wake
        let _ = self.tx.send(id.clone());
    }
}

/// Receiving half of the drain channel, owned by the dispatcher
#[derive(Debug)]
pub struct DrainEvents {
    rx: mpsc::UnboundedReceiver<SinkId>,
}

impl DrainEvents {
    /// Wait for the next drained sink; `None` once every notifier is dropped
    pub async fn next(&mut self) -> Option<SinkId> {
        self.rx.recv().await
    }

    /// Drop notifications that arrived before now
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Create a drain channel
pub fn drain_channel() -> (DrainNotifier, DrainEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DrainNotifier { tx }, DrainEvents { rx })
}

/// Sinks available to a playback session, in discovery order
pub struct SinkSet {
    sinks: Vec<Box<dyn Sink>>,
    index: HashMap<SinkId, usize>,
}

impl SinkSet {
    /// Build a set; later sinks reusing an earlier id are dropped
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        let mut kept: Vec<Box<dyn Sink>> = Vec::with_capacity(sinks.len());
        let mut index = HashMap::new();

        for sink in sinks {
            if index.contains_key(sink.id()) {
                warn!(sink = %sink.id(), "Duplicate sink id, ignoring");
                continue;
            }
            index.insert(sink.id().clone(), kept.len());
            kept.push(sink);
        }

        Self { sinks: kept, index }
    }

    /// Ids in discovery order
    pub fn ids(&self) -> Vec<SinkId> {
        self.sinks.iter().map(|s| s.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn contains(&self, id: &SinkId) -> bool {
        self.index.contains_key(id)
    }

    /// Submit to one sink; unknown ids never accept
    pub fn submit(&mut self, id: &SinkId, samples: &[i8]) -> bool {
        match self.index.get(id) {
            Some(&i) => self.sinks[i].submit(samples),
            None => false,
        }
    }

    pub fn stop(&mut self, id: &SinkId) {
        if let Some(&i) = self.index.get(id) {
            debug!(sink = %id, "Stopping sink");
            self.sinks[i].stop();
        }
    }

    pub fn stop_all(&mut self) {
        for sink in &mut self.sinks {
            sink.stop();
        }
    }

    /// Samples still queued across all sinks
    pub fn pending_samples(&self) -> usize {
        self.sinks.iter().map(|s| s.pending_samples()).sum()
    }
}
