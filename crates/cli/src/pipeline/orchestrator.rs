//! Pipeline orchestrator - wires input, tee and shutdown signals together.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::TeeBlueprint;
use tee::{create_tee, CancellationToken, ChunkReader, FileSource, StdinSource, Tee};
use tracing::{info, warn};

use super::RunSummary;
use crate::error::CliError;

/// Where the input stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    Stdin,
    File(std::path::PathBuf),
}

impl InputSpec {
    /// "-" is stdin, anything else a file path
    pub fn parse(input: &str) -> Self {
        if input == "-" {
            Self::Stdin
        } else {
            Self::File(input.into())
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated tee configuration
    pub blueprint: TeeBlueprint,

    /// Input stream
    pub input: InputSpec,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the tee to completion
    ///
    /// Ctrl+C, SIGTERM and the timeout all cancel the run. The summary is
    /// returned even when the tee stopped with an error.
    pub async fn run(self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let tee = create_tee(blueprint)
            .await
            .context("Failed to create tee outputs")?;
        info!(
            outputs = blueprint.outputs.len(),
            chunk_size = blueprint.chunk_size,
            pool_size = blueprint.resolved_pool_size(),
            "Tee ready"
        );

        let timeout = self.config.timeout;
        let outcome = match &self.config.input {
            InputSpec::Stdin => execute(tee, StdinSource::stdin(), timeout).await,
            InputSpec::File(path) => {
                let source = FileSource::open(path)
                    .await
                    .map_err(|e| CliError::input_open(path.display().to_string(), e.to_string()))?;
                execute(tee, source, timeout).await
            }
        };

        let summary = RunSummary::from_outcome(outcome, start_time.elapsed());
        info!(
            duration_secs = summary.duration.as_secs_f64(),
            bytes = summary.bytes_read,
            "Pipeline shutdown complete"
        );
        Ok(summary)
    }
}

async fn execute<R: ChunkReader>(tee: Tee, source: R, timeout: Option<Duration>) -> tee::RunOutcome {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_shutdown(cancel.clone(), timeout));

    info!(outputs = ?tee.output_names(), "Starting tee...");
    let outcome = tee.run(source, cancel).await;
    watcher.abort();
    outcome
}

/// Cancel on Ctrl+C, SIGTERM, or once `timeout` elapses
async fn cancel_on_shutdown(cancel: CancellationToken, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => warn!("Received shutdown signal, stopping tee..."),
        _ = deadline => warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Run timed out, stopping tee..."),
    }
    cancel.cancel();
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
