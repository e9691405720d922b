//! Virtual sink with a bounded sample queue and a real-time output task
//!
//! The dispatcher owns the producer half of a lock-free SPSC ring; a tokio
//! task owns the consumer half and pulls one block per tick at the track
//! sample rate, writing signed 8-bit PCM to any `Write`. When the task frees
//! space after a rejected submission it announces the sink on the drain
//! channel.

use super::{DrainNotifier, Sink, SinkId};
use dmdfpwm_common::SAMPLE_RATE;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Sizing of a [`QueueSink`]
#[derive(Debug, Clone, Copy)]
pub struct QueueSinkOptions {
    /// Ring capacity in samples
    pub capacity: usize,

    /// Samples played per output tick
    pub block: usize,

    /// Playback rate used to pace the output task
    pub sample_rate: u32,
}

impl Default for QueueSinkOptions {
    fn default() -> Self {
        Self {
            // Two one-second DFPWM frames
            capacity: 2 * SAMPLE_RATE as usize,
            // 50ms
            block: SAMPLE_RATE as usize / 20,
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// Flags shared between the sink handle and its output task
#[derive(Default)]
struct QueueFlags {
    /// Clear the ring on the next tick
    flush: AtomicBool,
    /// Output task should exit
    closed: AtomicBool,
    /// A submission was rejected since the last drain notification
    waiting: AtomicBool,
}

/// Bounded, paced virtual output
pub struct QueueSink {
    id: SinkId,
    producer: HeapProd<i8>,
    capacity: usize,
    flags: Arc<QueueFlags>,
}

impl QueueSink {
    /// Create the sink and spawn its output task on the current runtime
    pub fn spawn<W>(
        id: impl Into<SinkId>,
        options: QueueSinkOptions,
        writer: W,
        notifier: DrainNotifier,
    ) -> Self
    where
        W: Write + Send + 'static,
    {
        let id = id.into();
        let capacity = options.capacity.max(1);
        let (producer, consumer) = HeapRb::<i8>::new(capacity).split();
        let flags = Arc::new(QueueFlags::default());

        debug!(sink = %id, capacity, block = options.block, "Starting queue sink");

        tokio::spawn(run_output(
            id.clone(),
            consumer,
            options,
            writer,
            Arc::clone(&flags),
            notifier,
        ));

        Self {
            id,
            producer,
            capacity,
            flags,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Sink for QueueSink {
    fn id(&self) -> &SinkId {
        &self.id
    }

    fn submit(&mut self, samples: &[i8]) -> bool {
        if samples.len() > self.capacity {
            warn!(
                sink = %self.id,
                samples = samples.len(),
                capacity = self.capacity,
                "Payload larger than sink capacity can never be accepted"
            );
        }

        // Raise the flag before looking at vacancy so a block popped in
        // between is always followed by a notification
        self.flags.waiting.store(true, Ordering::SeqCst);
        if self.producer.vacant_len() < samples.len() {
            return false;
        }

        self.flags.waiting.store(false, Ordering::SeqCst);
        self.producer.push_slice(samples);
        true
    }

    fn stop(&mut self) {
        self.flags.flush.store(true, Ordering::Release);
        self.flags.waiting.store(false, Ordering::Release);
    }

    fn pending_samples(&self) -> usize {
        if self.flags.flush.load(Ordering::Acquire) {
            0
        } else {
            self.producer.occupied_len()
        }
    }
}

impl Drop for QueueSink {
    // Output task exits on its next tick and flushes the writer
    fn drop(&mut self) {
        self.flags.closed.store(true, Ordering::Release);
    }
}

async fn run_output<W: Write>(
    id: SinkId,
    mut consumer: HeapCons<i8>,
    options: QueueSinkOptions,
    mut writer: W,
    flags: Arc<QueueFlags>,
    notifier: DrainNotifier,
) {
    let block = options.block.max(1);
    let period = Duration::from_secs_f64(block as f64 / options.sample_rate.max(1) as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut samples = vec![0i8; block];
    let mut bytes = Vec::with_capacity(block);
    let mut write_failed = false;

    loop {
        interval.tick().await;

        if flags.closed.load(Ordering::Acquire) {
            break;
        }

        if flags.flush.swap(false, Ordering::AcqRel) {
            let mut cleared = 0usize;
            while consumer.try_pop().is_some() {
                cleared += 1;
            }
            debug!(sink = %id, cleared, "Flushed queued samples");
            continue;
        }

        let n = consumer.pop_slice(&mut samples);
        if n > 0 && !write_failed {
            bytes.clear();
            bytes.extend(samples[..n].iter().map(|&s| s as u8));
            if let Err(e) = writer.write_all(&bytes) {
                warn!(sink = %id, "Sink output write failed, discarding further audio: {}", e);
                write_failed = true;
            }
        }

        // Runs on empty ticks too: a waiting producer may have missed the last pop
        if flags.waiting.swap(false, Ordering::SeqCst) {
            notifier.notify(&id);
        }
    }

    if let Err(e) = writer.flush() {
        warn!(sink = %id, "Sink output flush failed: {}", e);
    }
    debug!(sink = %id, "Queue sink output stopped");
}
