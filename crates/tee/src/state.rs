//! Per-output runtime state
//!
//! Counters and liveness flags shared between the distributor (which reads
//! liveness and records policy drops) and the output's own sink worker
//! (which records writes and failures). `failed` and `detached` only ever
//! go from false to true, so a stale "still live" read is at worst one
//! chunk late and that chunk is released by the worker without a write.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use contracts::{OutputConfig, Policy};

use crate::error::OutputError;

/// Mutable state of a single output
#[derive(Debug)]
pub struct OutputState {
    name: String,
    policy: Policy,
    /// Current queue length (approximate)
    queue_len: AtomicUsize,
    /// Total bytes accepted by the sink
    written: AtomicU64,
    /// Total chunks written in full
    chunks_written: AtomicU64,
    /// Total chunks dropped by policy or cancellation
    dropped: AtomicU64,
    failed: AtomicBool,
    detached: AtomicBool,
    /// First error wins
    error: OnceLock<OutputError>,
}

impl OutputState {
    /// Create fresh state for an output
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            name: config.name.clone(),
            policy: config.policy,
            queue_len: AtomicUsize::new(0),
            written: AtomicU64::new(0),
            chunks_written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            error: OnceLock::new(),
        }
    }

    /// Output name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output policy
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Neither failed nor detached
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.failed.load(Ordering::Acquire) && !self.detached.load(Ordering::Acquire)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Bytes written so far
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Chunks dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Add bytes accepted by the sink
    pub fn add_written(&self, bytes: usize) {
        self.written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Increment fully written chunk count
    pub fn inc_chunks_written(&self) {
        self.chunks_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment dropped chunk count
    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an error without changing liveness
    ///
    /// Returns false if an earlier error was already recorded.
    pub fn record_error(&self, error: OutputError) -> bool {
        self.error.set(error).is_ok()
    }

    /// Mark the output failed
    ///
    /// The error is stored before the flag flips, so whoever observes
    /// `failed` also observes an error.
    pub fn fail(&self, error: OutputError) {
        self.record_error(error);
        self.failed.store(true, Ordering::Release);
    }

    /// Mark the output detached
    pub fn detach(&self, error: OutputError) {
        self.record_error(error);
        self.detached.store(true, Ordering::Release);
    }

    /// First recorded error, if any
    pub fn error(&self) -> Option<&OutputError> {
        self.error.get()
    }

    /// Get snapshot of current state
    pub fn report(&self) -> OutputReport {
        OutputReport {
            name: self.name.clone(),
            policy: self.policy,
            written: self.written(),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
            dropped: self.dropped(),
            queue_len: self.queue_len(),
            failed: self.is_failed(),
            detached: self.is_detached(),
            error: self.error().cloned(),
        }
    }
}

/// Snapshot of one output (final result once a run returns)
#[derive(Debug, Clone)]
pub struct OutputReport {
    pub name: String,
    pub policy: Policy,
    /// Total bytes written to the sink
    pub written: u64,
    /// Total chunks written in full
    pub chunks_written: u64,
    /// Total chunks dropped
    pub dropped: u64,
    /// Queue length at snapshot time
    pub queue_len: usize,
    pub failed: bool,
    pub detached: bool,
    /// Terminal error, None if the output completed cleanly
    pub error: Option<OutputError>,
}

impl OutputReport {
    /// Completed without error
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}
