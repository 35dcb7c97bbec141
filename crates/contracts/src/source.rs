//! ChunkReader trait - tee input interface
//!
//! Defines the abstract byte source feeding the distributor.

use crate::ContractError;

/// Sequential fixed-size byte source
///
/// The distributor hands every call a buffer of exactly `chunk_size` bytes.
#[trait_variant::make(ChunkReader: Send)]
pub trait LocalChunkReader {
    /// Fill `buf` with the next bytes of the stream
    ///
    /// Implementations should fill the buffer completely unless the stream
    /// ends first. `Ok(0)` signals end-of-stream.
    ///
    /// # Errors
    /// Returns read error (should include context)
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ContractError>;
}
