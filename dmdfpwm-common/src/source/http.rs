//! Remote byte source over HTTP range requests

use super::ByteSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, trace};

const USER_AGENT: &str = concat!("dmdfpwm/", env!("CARGO_PKG_VERSION"));

/// Random access to a remote container through `Range: bytes=a-b` requests
///
/// The server must answer with `206 Partial Content`; a plain `200 OK` means
/// range requests are unsupported and is reported as a source error.
pub struct HttpRangeSource {
    url: String,
    client: reqwest::Client,
    max_request_bytes: Option<u32>,
    total_len: Option<u64>,
    closed: bool,
}

impl HttpRangeSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Source(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, client))
    }

    pub fn with_client(url: &str, client: reqwest::Client) -> Self {
        Self {
            url: url.to_string(),
            client,
            max_request_bytes: None,
            total_len: None,
            closed: false,
        }
    }

    /// Split reads larger than `max` bytes into consecutive range requests
    pub fn with_max_request_bytes(mut self, max: u32) -> Self {
        self.max_request_bytes = Some(max.max(1));
        self
    }

    /// One ranged GET for `[offset, offset + length)`
    async fn fetch_range(&mut self, offset: u64, length: u32) -> Result<Vec<u8>> {
        let end = offset + length as u64 - 1;
        trace!(url = %self.url, offset, end, "Range request");

        let response = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={}-{}", offset, end))
            .send()
            .await
            .map_err(|e| Error::Source(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(Error::Truncated {
                offset,
                expected: length,
                actual: 0,
            });
        }

        if status == StatusCode::OK {
            return Err(Error::Source(format!(
                "{} does not support range requests",
                self.url
            )));
        }

        if status != StatusCode::PARTIAL_CONTENT {
            return Err(Error::Source(format!("HTTP {} from {}", status, self.url)));
        }

        if let Some((start, total)) = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
        {
            if start != offset {
                return Err(Error::Source(format!(
                    "{} answered a request at {} with a range starting at {}",
                    self.url, offset, start
                )));
            }
            if total.is_some() {
                self.total_len = total;
            }
        }

        let mut body = response
            .bytes()
            .await
            .map_err(|e| Error::Source(format!("Reading body from {} failed: {}", self.url, e)))?
            .to_vec();

        if body.len() < length as usize {
            return Err(Error::Truncated {
                offset,
                expected: length,
                actual: body.len(),
            });
        }

        body.truncate(length as usize);
        Ok(body)
    }
}

/// First byte and total size from a `Content-Range: bytes a-b/total` header
fn parse_content_range(value: &str) -> Option<(u64, Option<u64>)> {
    let (range, total) = value.trim().strip_prefix("bytes")?.rsplit_once('/')?;
    let (start, _) = range.trim().split_once('-')?;
    Some((start.trim().parse().ok()?, total.trim().parse().ok()))
}

#[async_trait]
impl ByteSource for HttpRangeSource {
    async fn read(&mut self, offset: u64, length: u32) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Source(format!("{} is closed", self.url)));
        }
        if length == 0 {
            return Ok(Vec::new());
        }

        let chunk = self.max_request_bytes.unwrap_or(length).min(length);
        if chunk == length {
            return self.fetch_range(offset, length).await;
        }

        debug!(url = %self.url, offset, length, chunk, "Splitting range read");

        let mut out = Vec::with_capacity(length as usize);
        let mut done: u32 = 0;
        while done < length {
            let part = chunk.min(length - done);
            match self.fetch_range(offset + done as u64, part).await {
                Ok(bytes) => out.extend_from_slice(&bytes),
                // Report the shortfall against the whole read
                Err(Error::Truncated { actual, .. }) => {
                    return Err(Error::Truncated {
                        offset,
                        expected: length,
                        actual: done as usize + actual,
                    });
                }
                Err(e) => return Err(e),
            }
            done += part;
        }

        Ok(out)
    }

    fn total_len(&self) -> Option<u64> {
        self.total_len
    }

    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
