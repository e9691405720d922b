//! In-memory byte source recording every read

use async_trait::async_trait;
use dmdfpwm_common::{ByteSource, Error, Result};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
pub struct SourceLog {
    /// `(offset, length)` of every read, in order
    pub reads: Vec<(u64, u32)>,
    pub closed: bool,
}

pub struct MemorySource {
    data: Arc<Vec<u8>>,
    log: Arc<Mutex<SourceLog>>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            log: Arc::new(Mutex::new(SourceLog::default())),
        }
    }

    /// Shared handle to the read log, valid after the source is moved away
    pub fn log(&self) -> Arc<Mutex<SourceLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read(&mut self, offset: u64, length: u32) -> Result<Vec<u8>> {
        let mut log = self.log.lock().unwrap();
        if log.closed {
            return Err(Error::Source("read after close".to_string()));
        }
        log.reads.push((offset, length));

        let len = self.data.len() as u64;
        let start = offset.min(len) as usize;
        let end = (offset + length as u64).min(len) as usize;
        if end - start < length as usize {
            return Err(Error::Truncated {
                offset,
                expected: length,
                actual: end - start,
            });
        }
        Ok(self.data[start..end].to_vec())
    }

    fn total_len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.data.len())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}
