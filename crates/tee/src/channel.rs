//! Output channel - bounded per-output chunk queue plus its full-queue policy
//!
//! The policy is applied on the producer side only, once per chunk, by the
//! distributor. The consumer side ([`OutputReceiver`]) is identical for
//! every policy.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{OutputConfig, Policy};
use observability::DropReason;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::chunk::Chunk;
use crate::error::OutputError;
use crate::state::OutputState;

/// What happened to one chunk for one output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Chunk is in the queue
    Queued,
    /// Chunk is in the queue; the oldest queued chunk was evicted for it
    QueuedAfterEviction,
    /// Chunk was not queued
    Dropped(DropReason),
    /// Stall timeout elapsed; chunk dropped and output detached
    Detached,
    /// Consumer side is gone; chunk not queued
    Closed,
}

impl Delivery {
    /// True if this output now holds the chunk
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued | Self::QueuedAfterEviction)
    }
}

/// Create the producer and consumer halves for one output
pub fn output_channel(
    config: &OutputConfig,
    state: Arc<OutputState>,
) -> (OutputSender, OutputReceiver) {
    let (tx, rx) = async_channel::bounded(config.queue_depth.max(1));
    let abandon = CancellationToken::new();

    let sender = OutputSender {
        name: config.name.clone(),
        policy: config.policy,
        stall_timeout: config.stall_timeout(),
        tx,
        evict: rx.clone(),
        state: Arc::clone(&state),
        abandon: abandon.clone(),
    };
    let receiver = OutputReceiver {
        rx,
        state,
        abandon,
    };
    (sender, receiver)
}

/// Producer half, owned by the distributor
pub struct OutputSender {
    name: String,
    policy: Policy,
    stall_timeout: Duration,
    tx: Sender<Chunk>,
    /// Producer-side handle on the queue, used only to evict the oldest chunk
    evict: Receiver<Chunk>,
    state: Arc<OutputState>,
    /// Fired on detach so the worker gives up a write still in flight
    abandon: CancellationToken,
}

impl OutputSender {
    #[cfg(test)]
    pub fn state(&self) -> &Arc<OutputState> {
        &self.state
    }

    /// Neither failed nor detached
    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    /// Queue `chunk` according to this output's policy
    ///
    /// Lossy never waits. Lossless waits for space or cancellation.
    /// Detach waits at most the stall timeout. Whenever the chunk is not
    /// queued its handle is dropped here, before returning.
    pub async fn dispatch(&self, chunk: Chunk, cancel: &CancellationToken) -> Delivery {
        let chunk = match self.tx.try_send(chunk) {
            Ok(()) => return self.queued(Delivery::Queued),
            Err(TrySendError::Closed(_)) => return Delivery::Closed,
            Err(TrySendError::Full(chunk)) => chunk,
        };

        match self.policy {
            Policy::Lossy => self.evict_and_push(chunk),
            Policy::Lossless => self.wait_for_space(chunk, cancel).await,
            Policy::Detach => self.wait_or_detach(chunk, cancel).await,
        }
    }

    /// Close the queue; the worker drains what is left and exits
    pub fn close(&self) {
        self.tx.close();
    }

    #[cfg(test)]
    pub fn queue_len(&self) -> usize {
        self.tx.len()
    }

    /// Best effort: the worker may drain the queue between the eviction and
    /// the retry, in which case nothing was evicted; the retry may still
    /// find the queue full, in which case the new chunk is dropped.
    fn evict_and_push(&self, chunk: Chunk) -> Delivery {
        let evicted = match self.evict.try_recv() {
            Ok(oldest) => {
                trace!(output = %self.name, seq = oldest.seq(), "evicting oldest chunk");
                drop(oldest);
                self.note_drop(DropReason::Evicted);
                true
            }
            Err(_) => false,
        };

        match self.tx.try_send(chunk) {
            Ok(()) if evicted => self.queued(Delivery::QueuedAfterEviction),
            Ok(()) => self.queued(Delivery::Queued),
            Err(TrySendError::Full(chunk)) => {
                trace!(output = %self.name, seq = chunk.seq(), "queue still full, dropping new chunk");
                drop(chunk);
                self.note_drop(DropReason::Rejected)
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    async fn wait_for_space(&self, chunk: Chunk, cancel: &CancellationToken) -> Delivery {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => self.note_drop(DropReason::Cancelled),
            sent = self.tx.send(chunk) => match sent {
                Ok(()) => self.queued(Delivery::Queued),
                Err(_) => Delivery::Closed,
            },
        }
    }

    async fn wait_or_detach(&self, chunk: Chunk, cancel: &CancellationToken) -> Delivery {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => self.note_drop(DropReason::Cancelled),
            sent = tokio::time::timeout(self.stall_timeout, self.tx.send(chunk)) => match sent {
                Ok(Ok(())) => self.queued(Delivery::Queued),
                Ok(Err(_)) => Delivery::Closed,
                Err(_) => self.detach(),
            },
        }
    }

    fn detach(&self) -> Delivery {
        self.state.detach(OutputError::Stalled {
            timeout: self.stall_timeout,
        });
        self.note_drop(DropReason::Stalled);
        self.abandon.cancel();
        observability::record_output_detached(&self.name);
        warn!(
            output = %self.name,
            timeout_ms = self.stall_timeout.as_millis() as u64,
            "Output stalled, detached"
        );
        Delivery::Detached
    }

    fn queued(&self, delivery: Delivery) -> Delivery {
        let len = self.tx.len();
        self.state.set_queue_len(len);
        observability::record_queue_depth(&self.name, len);
        delivery
    }

    fn note_drop(&self, reason: DropReason) -> Delivery {
        self.state.inc_dropped();
        observability::record_chunk_dropped(&self.name, reason);
        Delivery::Dropped(reason)
    }
}

/// Consumer half, owned by the output's sink worker
pub struct OutputReceiver {
    pub(crate) rx: Receiver<Chunk>,
    pub(crate) state: Arc<OutputState>,
    pub(crate) abandon: CancellationToken,
}
