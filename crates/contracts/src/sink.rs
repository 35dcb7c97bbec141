//! ChunkWriter trait - tee output interface
//!
//! Defines the abstract interface for output destinations.

use crate::ContractError;

/// Output destination
///
/// All sink implementations must implement this trait. A tee owns one
/// writer per output and drives it from a single worker task.
#[trait_variant::make(ChunkWriter: Send)]
pub trait LocalChunkWriter {
    /// Write one chunk
    ///
    /// Returns the number of bytes written. Anything less than `buf.len()`
    /// is treated as a failed write by the caller.
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize, ContractError>;

    /// Close the destination
    ///
    /// Called exactly once, after the last chunk for this output.
    async fn close(&mut self) -> Result<(), ContractError>;
}
