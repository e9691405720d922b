//! File-backed byte source

use super::ByteSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Seek-then-read access to a local container file
pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
    len: u64,
}

impl FileSource {
    /// Open `path` for random-access reads
    ///
    /// # Errors
    /// `Error::Source` if the file cannot be opened or stat'ed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path)
            .await
            .map_err(|e| Error::Source(format!("Failed to open {}: {}", path.display(), e)))?;

        let len = file
            .metadata()
            .await
            .map_err(|e| Error::Source(format!("Failed to stat {}: {}", path.display(), e)))?
            .len();

        debug!(path = %path.display(), len, "Opened file source");

        Ok(Self {
            path,
            file: Some(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn read(&mut self, offset: u64, length: u32) -> Result<Vec<u8>> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Source(format!("{} is closed", self.path.display())))?;

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| Error::Source(format!("Seek to {} failed: {}", offset, e)))?;

        let mut buf = vec![0u8; length as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let n = file
                .read(&mut buf[filled..])
                .await
                .map_err(|e| Error::Source(format!("Read at {} failed: {}", offset, e)))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled < buf.len() {
            return Err(Error::Truncated {
                offset,
                expected: length,
                actual: filled,
            });
        }

        Ok(buf)
    }

    fn total_len(&self) -> Option<u64> {
        Some(self.len)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "Closed file source");
        }
        Ok(())
    }
}
