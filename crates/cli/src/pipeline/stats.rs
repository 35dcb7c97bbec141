//! Run summary and statistics.

use std::time::Duration;

use tee::{OutputReport, PoolStats, RunOutcome, TeeError};

/// Statistics from a tee run
#[derive(Debug)]
pub struct RunSummary {
    /// Chunks read from the input
    pub chunks_read: u64,

    /// Bytes read from the input
    pub bytes_read: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-output results
    pub outputs: Vec<OutputReport>,

    /// Buffer pool counters after shutdown
    pub pool: PoolStats,

    /// Why the run stopped early (None on end of input)
    pub status: Option<TeeError>,
}

impl RunSummary {
    pub fn from_outcome(outcome: RunOutcome, duration: Duration) -> Self {
        Self {
            chunks_read: outcome.chunks_read,
            bytes_read: outcome.bytes_read,
            duration,
            outputs: outcome.reports,
            pool: outcome.pool,
            status: outcome.status.err(),
        }
    }

    /// Input throughput in MiB/s
    pub fn throughput_mib(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_read as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        }
    }

    /// Outputs that ended with an error
    pub fn failed_outputs(&self) -> usize {
        self.outputs.iter().filter(|r| !r.is_clean()).count()
    }

    /// Print detailed summary (stderr, stdout may carry data)
    pub fn print_summary(&self) {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║                      Tee Statistics                          ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");

        eprintln!("📊 Overview");
        eprintln!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Chunks read: {}", self.chunks_read);
        eprintln!("   ├─ Bytes read: {}", self.bytes_read);
        eprintln!("   ├─ Throughput: {:.2} MiB/s", self.throughput_mib());
        match &self.status {
            None => eprintln!("   └─ Status: completed"),
            Some(e) => eprintln!("   └─ Status: {}", e),
        }

        eprintln!("\n📤 Outputs ({})", self.outputs.len());
        for (i, report) in self.outputs.iter().enumerate() {
            let prefix = if i == self.outputs.len() - 1 { "└─" } else { "├─" };
            let state = if report.detached {
                "detached"
            } else if report.failed {
                "failed"
            } else {
                "ok"
            };
            eprintln!(
                "   {} {} ({}): written={} dropped={} [{}]",
                prefix, report.name, report.policy, report.written, report.dropped, state
            );
            if let Some(ref e) = report.error {
                eprintln!("   {}     error: {}", if i == self.outputs.len() - 1 { " " } else { "│" }, e);
            }
        }

        eprintln!("\n♻️  Buffer Pool");
        eprintln!("   ├─ Acquired: {}", self.pool.acquired);
        eprintln!("   ├─ Released: {}", self.pool.released);
        eprintln!("   └─ Hit rate: {:.1}%", self.pool.hit_rate() * 100.0);

        eprintln!();
    }
}
