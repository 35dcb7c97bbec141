//! Chunk sources over async readers

use std::path::Path;

use contracts::{ChunkReader, ContractError};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, Stdin};
use tracing::{debug, instrument};

/// Source that fills each chunk completely from an async reader
///
/// Only the final chunk of the stream may be shorter than the buffer. A read
/// error after part of a chunk was filled is held back: the partial chunk is
/// returned first and the error on the next call.
pub struct ReaderSource<R> {
    name: String,
    reader: R,
    eof: bool,
    pending: Option<ContractError>,
}

impl<R> ReaderSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            eof: false,
            pending: None,
        }
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<R: AsyncRead + Unpin + Send> ChunkReader for ReaderSource<R> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ContractError> {
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        if self.eof {
            return Ok(0);
        }

        let mut filled = 0;
        while filled < buf.len() {
            let n = match self.reader.read(&mut buf[filled..]).await {
                Ok(n) => n,
                Err(e) => {
                    let err = ContractError::source_read(&self.name, e.to_string());
                    if filled == 0 {
                        return Err(err);
                    }
                    debug!(source = %self.name, filled, error = %err, "Read failed mid-chunk");
                    self.pending = Some(err);
                    break;
                }
            };
            if n == 0 {
                self.eof = true;
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Source reading a file from start to end
pub type FileSource = ReaderSource<File>;

impl ReaderSource<File> {
    /// Open `path` for reading
    #[instrument(name = "file_source_open", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path)
            .await
            .map_err(|e| ContractError::source_read(&name, e.to_string()))?;
        debug!(source = %name, "FileSource opened");
        Ok(Self::new(name, file))
    }
}

/// Source reading the process's stdin
pub type StdinSource = ReaderSource<Stdin>;

impl ReaderSource<Stdin> {
    pub fn stdin() -> Self {
        Self::new("stdin", tokio::io::stdin())
    }
}
