use crate::nem12::decode::trim_line_end;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error after line {line}: {source}")]
    Io {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Sequential reader of physical lines.
///
/// Lines longer than the read buffer are reassembled before they are handed
/// out, so a buffer boundary never splits a record.
pub struct LineReader<R> {
    inner: BufReader<R>,
    line_no: u64,
    bytes_read: u64,
}

impl LineReader<File> {
    /// Open a file for reading with the given buffer size
    pub async fn open(path: &Path, buffer_size: usize) -> Result<Self, ReaderError> {
        let file = File::open(path).await.map_err(|source| ReaderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file, buffer_size))
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, buffer_size: usize) -> Self {
        Self {
            inner: BufReader::with_capacity(buffer_size.max(1), inner),
            line_no: 0,
            bytes_read: 0,
        }
    }

    /// Read the next line into `buf`, without its line terminator.
    ///
    /// Returns the 1-based line number, or `None` at end of input. A final
    /// line without a terminator is still returned.
    pub async fn next_line(&mut self, buf: &mut Vec<u8>) -> Result<Option<u64>, ReaderError> {
        buf.clear();
        let n = self
            .inner
            .read_until(b'\n', buf)
            .await
            .map_err(|source| ReaderError::Io {
                line: self.line_no,
                source,
            })?;

        if n == 0 {
            return Ok(None);
        }

        self.bytes_read += n as u64;
        self.line_no += 1;

        let trimmed = trim_line_end(buf).len();
        buf.truncate(trimmed);

        Ok(Some(self.line_no))
    }

    /// Lines read so far
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    /// Bytes consumed so far, including line terminators
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
