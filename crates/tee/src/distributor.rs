//! Distributor - reads the source and fans each chunk out to every live output

use std::sync::Arc;

use contracts::ChunkReader;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::channel::{Delivery, OutputSender};
use crate::chunk::Chunk;
use crate::error::TeeError;
use crate::pool::BufferPool;

/// Single producer feeding every output queue
///
/// Never writes to a sink; it only enqueues.
pub(crate) struct Distributor<R> {
    source: R,
    pool: Arc<BufferPool>,
    outputs: Vec<OutputSender>,
    chunks_read: u64,
    bytes_read: u64,
}

impl<R: ChunkReader> Distributor<R> {
    pub fn new(source: R, pool: Arc<BufferPool>, outputs: Vec<OutputSender>) -> Self {
        Self {
            source,
            pool,
            outputs,
            chunks_read: 0,
            bytes_read: 0,
        }
    }

    /// Chunks and bytes read so far
    pub fn totals(&self) -> (u64, u64) {
        (self.chunks_read, self.bytes_read)
    }

    /// Run until end-of-stream, a read error, zero live outputs, or cancellation
    ///
    /// Every output queue is closed before returning, whatever the reason.
    #[instrument(name = "distributor_run", skip_all, fields(outputs = self.outputs.len()))]
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), TeeError> {
        info!(
            outputs = self.outputs.len(),
            chunk_size = self.pool.chunk_size(),
            "Distributor started"
        );

        let result = self.pump(cancel).await;

        for output in &self.outputs {
            output.close();
        }

        match &result {
            Ok(()) => info!(chunks = self.chunks_read, bytes = self.bytes_read, "Source exhausted"),
            Err(e) => warn!(chunks = self.chunks_read, error = %e, "Distributor stopped early"),
        }
        result
    }

    async fn pump(&mut self, cancel: &CancellationToken) -> Result<(), TeeError> {
        loop {
            if cancel.is_cancelled() {
                return Err(TeeError::Cancelled);
            }

            let mut buf = self.pool.acquire();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.source.read_chunk(&mut buf[..]) => Some(r),
            };
            let n = match read {
                None => {
                    self.pool.release(buf);
                    return Err(TeeError::Cancelled);
                }
                Some(Ok(0)) => {
                    self.pool.release(buf);
                    return Ok(());
                }
                Some(Err(e)) => {
                    self.pool.release(buf);
                    return Err(TeeError::Source(e));
                }
                Some(Ok(n)) => n.min(buf.len()),
            };
            buf.truncate(n);

            let live: Vec<&OutputSender> = self.outputs.iter().filter(|o| o.is_live()).collect();
            observability::record_live_outputs(live.len());
            if live.is_empty() {
                self.pool.release(buf);
                return Err(TeeError::AllOutputsFailed);
            }

            let seq = self.chunks_read;
            self.chunks_read += 1;
            self.bytes_read += n as u64;
            observability::record_chunk_read(n);

            let chunk = Chunk::new(seq, buf, Arc::clone(&self.pool));
            let deliveries = join_all(live.iter().map(|o| o.dispatch(chunk.clone(), cancel))).await;

            let queued = deliveries.iter().filter(|d| d.is_queued()).count();
            let detached = deliveries
                .iter()
                .filter(|d| matches!(d, Delivery::Detached))
                .count();
            if detached > 0 || queued < live.len() {
                debug!(seq, live = live.len(), queued, detached, "Chunk not queued everywhere");
            }
            if seq > 0 && seq % 1024 == 0 {
                debug!(chunks = seq, "Distributor progress");
            }
        }
    }
}
