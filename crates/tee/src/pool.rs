//! Lock-free buffer pool shared by the distributor and every output
//!
//! Hands out `BytesMut` buffers of exactly `chunk_size` bytes and takes them
//! back once the last holder of a [`Chunk`](crate::Chunk) lets go. Backing
//! storage is reused and never zeroed; a reused buffer still holds the bytes
//! of its previous chunk and callers overwrite them.
//!
//! Acquire/release counters make leaks observable: once a tee run has
//! returned, [`PoolStats::outstanding`] must be zero.

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pool of reusable fixed-size buffers
///
/// When the pool is empty a fresh buffer is allocated; when it is full a
/// released buffer is freed instead of pooled.
#[derive(Debug)]
pub struct BufferPool {
    /// Idle buffers
    queue: ArrayQueue<BytesMut>,
    /// Size of every buffer handed out
    chunk_size: usize,
    acquired: AtomicU64,
    released: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BufferPool {
    /// Create a pool holding up to `pool_size` idle buffers of `chunk_size` bytes
    ///
    /// All idle slots are pre-allocated.
    pub fn new(pool_size: usize, chunk_size: usize) -> Self {
        let queue = ArrayQueue::new(pool_size.max(1));
        for _ in 0..queue.capacity() {
            let _ = queue.push(BytesMut::zeroed(chunk_size));
        }

        Self {
            queue,
            chunk_size,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Take a buffer of exactly `chunk_size` bytes
    ///
    /// Fresh allocations are zero-filled once. A reused buffer is only
    /// extended past the valid length of its previous chunk, so a buffer
    /// that carried a full chunk comes back without any fill.
    pub fn acquire(&self) -> BytesMut {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        let mut buf = match self.queue.pop() {
            Some(buf) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                BytesMut::zeroed(self.chunk_size)
            }
        };
        buf.resize(self.chunk_size, 0);
        buf
    }

    /// Return a buffer
    ///
    /// Releasing a buffer twice is a caller bug the pool cannot detect.
    pub fn release(&self, buf: BytesMut) {
        self.released.fetch_add(1, Ordering::Relaxed);
        if buf.capacity() >= self.chunk_size {
            // Freed here when the pool is already full.
            let _ = self.queue.push(buf);
        }
    }

    /// Size of every buffer handed out
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of idle buffers
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Get snapshot of pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            available: self.available(),
        }
    }
}

/// Point-in-time snapshot of pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
    pub hits: u64,
    pub misses: u64,
    pub available: usize,
}

impl PoolStats {
    /// Buffers handed out and not yet returned
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }

    /// Fraction of acquisitions served from idle buffers (1.0 when unused)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
