//! Random-access byte sources
//!
//! A [`ByteSource`] hides whether container bytes come from a local file or
//! from a remote resource fetched with HTTP range requests. The format reader
//! and the playback loop only ever see this trait; [`open_source`] is the one
//! place that looks at the location to pick an implementation.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

mod file;
mod http;

pub use file::FileSource;
pub use http::HttpRangeSource;

/// Uniform random-access read over container bytes
#[async_trait]
pub trait ByteSource: Send {
    /// Read exactly `length` bytes starting at `offset`
    ///
    /// # Errors
    /// - `Error::Truncated` if fewer than `length` bytes are available
    /// - `Error::Source` on transport or I/O failure, or after `close`
    async fn read(&mut self, offset: u64, length: u32) -> Result<Vec<u8>>;

    /// Total size of the underlying resource, when known
    fn total_len(&self) -> Option<u64>;

    /// Human readable location for logs
    fn describe(&self) -> String;

    /// Release the underlying handle; idempotent
    async fn close(&mut self) -> Result<()>;
}

/// Options applied when opening a source
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Upper bound on bytes per HTTP range request; larger reads are split
    pub max_request_bytes: Option<u32>,

    /// Per-request timeout for remote sources
    pub request_timeout: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            max_request_bytes: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// True when `location` should be fetched over HTTP(S)
pub fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Open a local path or an http(s) URL as a byte source
pub async fn open_source(location: &str, options: &SourceOptions) -> Result<Box<dyn ByteSource>> {
    if is_remote(location) {
        let mut source = HttpRangeSource::new(location, options.request_timeout)?;
        if let Some(max) = options.max_request_bytes {
            source = source.with_max_request_bytes(max);
        }
        Ok(Box::new(source))
    } else {
        Ok(Box::new(FileSource::open(location).await?))
    }
}
