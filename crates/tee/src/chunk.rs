//! Chunk - shared handle over one pooled buffer
//!
//! Every clone of a [`Chunk`] is one holder. The distributor keeps one
//! handle while dispatching and each output queue that accepts the chunk
//! owns another. The buffer goes back to the pool exactly once, when the
//! last handle is dropped, whichever path drops it (written by a sink
//! worker, evicted, timed out, cancelled, or drained at shutdown).

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;

use crate::pool::BufferPool;

/// Reference-counted view of one source read
#[derive(Clone)]
pub struct Chunk {
    inner: Arc<ChunkInner>,
}

struct ChunkInner {
    seq: u64,
    buf: BytesMut,
    pool: Arc<BufferPool>,
}

impl Chunk {
    /// Wrap a filled buffer
    ///
    /// `buf.len()` is the valid length of the chunk.
    pub fn new(seq: u64, buf: BytesMut, pool: Arc<BufferPool>) -> Self {
        Self {
            inner: Arc::new(ChunkInner { seq, buf, pool }),
        }
    }

    /// Position of this chunk in the source stream (0-based)
    #[inline]
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    /// Valid bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.buf.is_empty()
    }

    /// Number of live handles to this chunk
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Drop for ChunkInner {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.release(buf);
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("seq", &self.seq())
            .field("len", &self.len())
            .field("holders", &self.holders())
            .finish()
    }
}
