//! Sink with scripted rejections

use dmdfpwm_player::sink::{DrainNotifier, Sink, SinkId};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
pub struct SinkLog {
    /// Every submit call, accepted or not
    pub attempts: usize,
    /// Payloads taken, in order
    pub accepted: Vec<Vec<i8>>,
    pub stop_calls: usize,
}

pub struct ScriptedSink {
    id: SinkId,
    rejects_left: usize,
    stuck: bool,
    notifier: DrainNotifier,
    log: Arc<Mutex<SinkLog>>,
}

impl ScriptedSink {
    /// Sink that accepts everything
    pub fn new(id: &str, notifier: DrainNotifier) -> Self {
        Self {
            id: SinkId::new(id),
            rejects_left: 0,
            stuck: false,
            notifier,
            log: Arc::new(Mutex::new(SinkLog::default())),
        }
    }

    /// Reject the first `n` submissions, announcing a drain after each
    pub fn reject_first(mut self, n: usize) -> Self {
        self.rejects_left = n;
        self
    }

    /// Reject everything and never drain
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<SinkLog>> {
        Arc::clone(&self.log)
    }

    pub fn boxed(self) -> Box<dyn Sink> {
        Box::new(self)
    }
}

impl Sink for ScriptedSink {
    fn id(&self) -> &SinkId {
        &self.id
    }

    fn submit(&mut self, samples: &[i8]) -> bool {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;

        if self.stuck {
            return false;
        }

        if self.rejects_left > 0 {
            self.rejects_left -= 1;
            self.notifier.notify(&self.id);
            return false;
        }

        log.accepted.push(samples.to_vec());
        true
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stop_calls += 1;
    }
}
