//! LogSink - logs chunk summary via tracing

use contracts::{ChunkWriter, ContractError};
use tracing::{debug, info, instrument};

/// Sink that logs chunk summaries for debugging
///
/// The bytes themselves are not logged.
pub struct LogSink {
    name: String,
    chunks: u64,
    bytes: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunks: 0,
            bytes: 0,
        }
    }

    /// Sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn log_chunk_summary(&self, buf: &[u8]) {
        let head_len = buf.len().min(8);
        debug!(
            sink = %self.name,
            index = self.chunks,
            len = buf.len(),
            head = ?&buf[..head_len],
            "Chunk received"
        );
    }
}

impl ChunkWriter for LogSink {
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        self.log_chunk_summary(buf);
        self.chunks += 1;
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    #[instrument(name = "log_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            chunks = self.chunks,
            bytes = self.bytes,
            "LogSink closed"
        );
        Ok(())
    }
}
