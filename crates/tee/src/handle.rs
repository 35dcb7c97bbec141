//! OutputHandle - runs one output's sink worker on its own task

use std::sync::Arc;

use async_channel::Receiver;
use contracts::ChunkWriter;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::channel::OutputReceiver;
use crate::chunk::Chunk;
use crate::error::OutputError;
use crate::state::OutputState;

/// Type-erased "start the worker for this writer"
///
/// Lets a tee hold outputs with different writer types in one list.
pub(crate) trait SpawnWorker: Send {
    fn spawn(self: Box<Self>, receiver: OutputReceiver) -> OutputHandle;
}

/// A writer waiting for its worker to be started
pub(crate) struct PendingWriter<W>(pub W);

impl<W: ChunkWriter + 'static> SpawnWorker for PendingWriter<W> {
    fn spawn(self: Box<Self>, receiver: OutputReceiver) -> OutputHandle {
        OutputHandle::spawn(self.0, receiver)
    }
}

/// Handle to a running sink worker
pub(crate) struct OutputHandle {
    state: Arc<OutputState>,
    worker_handle: JoinHandle<()>,
}

impl OutputHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<W: ChunkWriter + 'static>(sink: W, receiver: OutputReceiver) -> Self {
        let state = Arc::clone(&receiver.state);
        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, receiver).await;
        });

        Self {
            state,
            worker_handle,
        }
    }

    /// Wait for the worker to finish
    ///
    /// A panicked worker is recorded on the output instead of propagated.
    #[instrument(name = "output_handle_join", skip(self), fields(output = %self.state.name()))]
    pub async fn join(self) {
        if let Err(e) = self.worker_handle.await {
            error!(output = %self.state.name(), error = ?e, "Worker task panicked");
            self.state.fail(OutputError::WorkerPanicked);
        }
        debug!(output = %self.state.name(), "Sink worker joined");
    }
}

/// Marks the output failed and closes its queue if the worker unwinds,
/// so the distributor never waits on a queue nobody drains.
struct PanicGuard<'a> {
    state: &'a OutputState,
    rx: &'a Receiver<Chunk>,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.state.fail(OutputError::WorkerPanicked);
            self.rx.close();
        }
    }
}

/// Drain one output queue into its sink
///
/// Writes stop after the first failure, but the queue is still drained
/// until closed so the distributor is never blocked on it. `close` runs
/// exactly once, after the queue is closed and empty.
#[instrument(
    name = "sink_worker_loop",
    skip(sink, receiver),
    fields(output = %receiver.state.name())
)]
async fn sink_worker<W: ChunkWriter>(mut sink: W, receiver: OutputReceiver) {
    let OutputReceiver { rx, state, abandon } = receiver;
    let name = state.name().to_string();
    let _guard = PanicGuard { state: &state, rx: &rx };

    debug!(output = %name, "Sink worker started");

    while let Ok(chunk) = rx.recv().await {
        let len = rx.len();
        state.set_queue_len(len);
        observability::record_queue_depth(&name, len);

        if !state.is_live() {
            // Failed or detached: release without writing.
            continue;
        }

        let result = tokio::select! {
            biased;
            _ = abandon.cancelled() => None,
            r = sink.write_chunk(chunk.as_bytes()) => Some(r),
        };

        match result {
            None => {
                // The sink may hold a prefix of this chunk; it is not counted.
                debug!(output = %name, seq = chunk.seq(), "Write abandoned after detach");
            }
            Some(Ok(n)) => {
                let n = n.min(chunk.len());
                state.add_written(n);
                if n < chunk.len() {
                    error!(
                        output = %name,
                        seq = chunk.seq(),
                        written = n,
                        expected = chunk.len(),
                        "Short write"
                    );
                    observability::record_output_failure(&name);
                    state.fail(OutputError::ShortWrite {
                        written: n,
                        expected: chunk.len(),
                    });
                } else {
                    state.inc_chunks_written();
                    observability::record_chunk_written(&name, n);
                }
            }
            Some(Err(e)) => {
                error!(
                    output = %name,
                    seq = chunk.seq(),
                    error = %e,
                    "Write failed"
                );
                observability::record_output_failure(&name);
                state.fail(OutputError::Write(Arc::new(e)));
                // Keep draining.
            }
        }
    }

    // Cleanup
    if let Err(e) = sink.close().await {
        error!(output = %name, error = %e, "Close failed on shutdown");
        state.record_error(OutputError::Close(Arc::new(e)));
    }

    debug!(output = %name, "Sink worker stopped");
}
