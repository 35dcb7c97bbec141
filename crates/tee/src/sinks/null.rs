//! NullSink - discards everything

use contracts::{ChunkWriter, ContractError};

/// Sink that accepts and discards every chunk
#[derive(Debug, Default)]
pub struct NullSink {
    bytes: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes discarded so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl ChunkWriter for NullSink {
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
