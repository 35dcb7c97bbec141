//! WriterSink - adapts any `AsyncWrite` into a chunk writer

use contracts::{ChunkWriter, ContractError};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

/// Sink that writes every chunk in full to an async writer
///
/// `close` flushes and shuts the writer down; it is a no-op the second time.
///
/// `write_chunk` is not atomic. If the tee detaches the output while a write
/// is in flight, the write is dropped after the writer may already have
/// taken part of the chunk, so the destination can end with a torn tail that
/// the output's `written` counter does not include.
pub struct WriterSink<W> {
    name: String,
    writer: W,
    closed: bool,
}

impl<W> WriterSink<W> {
    /// Wrap `writer`
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            closed: false,
        }
    }

    /// Sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: AsyncWrite + Unpin + Send> ChunkWriter for WriterSink<W> {
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        if self.closed {
            return Err(ContractError::sink_write(&self.name, "write after close"));
        }
        self.writer
            .write_all(buf)
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        Ok(buf.len())
    }

    #[instrument(name = "writer_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.writer
            .flush()
            .await
            .map_err(|e| ContractError::sink_write(&self.name, format!("flush failed: {e}")))?;
        self.writer
            .shutdown()
            .await
            .map_err(|e| ContractError::sink_write(&self.name, format!("shutdown failed: {e}")))?;

        debug!(sink = %self.name, "WriterSink closed");
        Ok(())
    }
}
