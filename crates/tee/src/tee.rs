//! Tee - coordinator owning the outputs, their workers and the buffer pool

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use contracts::{ChunkReader, ChunkWriter, OutputConfig, OutputSpec, Policy, SinkType, TeeBlueprint};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::channel::output_channel;
use crate::distributor::Distributor;
use crate::error::TeeError;
use crate::handle::{OutputHandle, PendingWriter, SpawnWorker};
use crate::pool::{BufferPool, PoolStats};
use crate::sinks::{FileSink, LogSink, NetworkSink, NullSink, StdoutSink};
use crate::state::{OutputReport, OutputState};

/// One output: its static configuration bound to a destination writer
pub struct Output {
    config: OutputConfig,
    writer: Box<dyn SpawnWorker>,
}

impl Output {
    /// Bind `config` to `writer`
    pub fn new<W: ChunkWriter + 'static>(config: OutputConfig, writer: W) -> Self {
        Self {
            config,
            writer: Box::new(PendingWriter(writer)),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").field("config", &self.config).finish()
    }
}

/// Builder for creating a Tee
#[derive(Debug)]
pub struct TeeBuilder {
    chunk_size: usize,
    pool_size: Option<usize>,
    outputs: Vec<Output>,
}

impl TeeBuilder {
    /// Idle buffer capacity of the pool
    ///
    /// Defaults to the sum of all queue depths plus one per output plus one.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    /// Add an output
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Add several outputs
    pub fn outputs(mut self, outputs: impl IntoIterator<Item = Output>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    /// Validate and build the tee
    #[instrument(
        name = "tee_builder_build",
        skip(self),
        fields(chunk_size = self.chunk_size, outputs = self.outputs.len())
    )]
    pub fn build(self) -> Result<Tee, TeeError> {
        if self.chunk_size == 0 {
            return Err(TeeError::invalid_config("chunk size must be greater than 0"));
        }
        if self.outputs.is_empty() {
            return Err(TeeError::invalid_config("at least one output is required"));
        }
        if self.pool_size == Some(0) {
            return Err(TeeError::invalid_config("pool size must be greater than 0"));
        }

        let mut names = HashSet::new();
        for output in &self.outputs {
            let config = output.config();
            if config.name.is_empty() {
                return Err(TeeError::invalid_config("output name must not be empty"));
            }
            if !names.insert(config.name.as_str()) {
                return Err(TeeError::invalid_config(format!(
                    "duplicate output name '{}'",
                    config.name
                )));
            }
            if config.queue_depth == 0 {
                return Err(TeeError::invalid_config(format!(
                    "output '{}': queue depth must be greater than 0",
                    config.name
                )));
            }
            if config.policy == Policy::Detach && config.stall_timeout_ms == 0 {
                return Err(TeeError::invalid_config(format!(
                    "output '{}': detach policy requires a stall timeout",
                    config.name
                )));
            }
        }

        let pool_size = self.pool_size.unwrap_or_else(|| {
            self.outputs
                .iter()
                .map(|o| o.config.queue_depth)
                .sum::<usize>()
                + self.outputs.len()
                + 1
        });
        let pool = Arc::new(BufferPool::new(pool_size, self.chunk_size));
        let states = self
            .outputs
            .iter()
            .map(|o| Arc::new(OutputState::new(&o.config)))
            .collect();

        debug!(pool_size, "Tee built");
        Ok(Tee {
            pool,
            outputs: self.outputs,
            states,
        })
    }
}

/// Multi-output tee
///
/// One source stream, duplicated to every output. Each output has its own
/// bounded queue and worker, so a slow or failing output only affects
/// others as far as its policy allows.
pub struct Tee {
    pool: Arc<BufferPool>,
    outputs: Vec<Output>,
    states: Vec<Arc<OutputState>>,
}

impl Tee {
    /// Start building a tee reading `chunk_size` bytes at a time
    pub fn builder(chunk_size: usize) -> TeeBuilder {
        TeeBuilder {
            chunk_size,
            pool_size: None,
            outputs: Vec::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.pool.chunk_size()
    }

    /// Output names in configuration order
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(Output::name).collect()
    }

    /// Live per-output state, readable while `run` is in progress
    pub fn monitors(&self) -> Vec<Arc<OutputState>> {
        self.states.iter().map(Arc::clone).collect()
    }

    /// The tee's buffer pool
    pub fn pool(&self) -> Arc<BufferPool> {
        Arc::clone(&self.pool)
    }

    /// Run to completion
    ///
    /// Starts one worker per output, runs the distributor until the source
    /// ends, fails, every output is gone, or `cancel` fires, then closes all
    /// queues and waits for every worker before assembling the reports.
    #[instrument(name = "tee_run", skip_all, fields(outputs = self.outputs.len()))]
    pub async fn run<R: ChunkReader>(self, source: R, cancel: CancellationToken) -> RunOutcome {
        let Tee {
            pool,
            outputs,
            states,
        } = self;

        info!(
            outputs = outputs.len(),
            chunk_size = pool.chunk_size(),
            "Tee started"
        );

        let mut senders = Vec::with_capacity(outputs.len());
        let mut handles: Vec<OutputHandle> = Vec::with_capacity(outputs.len());
        for (output, state) in outputs.into_iter().zip(&states) {
            let (sender, receiver) = output_channel(&output.config, Arc::clone(state));
            handles.push(output.writer.spawn(receiver));
            senders.push(sender);
        }

        let mut distributor = Distributor::new(source, Arc::clone(&pool), senders);
        let status = distributor.run(&cancel).await;
        let (chunks_read, bytes_read) = distributor.totals();
        drop(distributor);

        join_all(handles.into_iter().map(OutputHandle::join)).await;

        let reports: Vec<OutputReport> = states.iter().map(|s| s.report()).collect();
        for report in &reports {
            match &report.error {
                None => debug!(output = %report.name, written = report.written, dropped = report.dropped, "Output finished"),
                Some(e) => warn!(output = %report.name, written = report.written, dropped = report.dropped, error = %e, "Output finished with error"),
            }
        }

        let outcome = RunOutcome {
            reports,
            status,
            chunks_read,
            bytes_read,
            pool: pool.stats(),
        };
        info!(
            chunks = outcome.chunks_read,
            bytes = outcome.bytes_read,
            ok = outcome.status.is_ok(),
            "Tee finished"
        );
        outcome
    }
}

impl fmt::Debug for Tee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tee")
            .field("chunk_size", &self.chunk_size())
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Everything a run produced
///
/// `reports` is populated even when `status` is an error.
#[derive(Debug)]
pub struct RunOutcome {
    /// One report per output, in configuration order
    pub reports: Vec<OutputReport>,
    /// Why the distributor stopped (Ok on end-of-stream)
    pub status: Result<(), TeeError>,
    pub chunks_read: u64,
    pub bytes_read: u64,
    /// Pool counters after every worker exited
    pub pool: PoolStats,
}

impl RunOutcome {
    /// Report of the named output
    pub fn report(&self, name: &str) -> Option<&OutputReport> {
        self.reports.iter().find(|r| r.name == name)
    }

    /// Source exhausted and every output clean
    pub fn is_success(&self) -> bool {
        self.status.is_ok() && self.reports.iter().all(OutputReport::is_clean)
    }

    /// Split into a plain result
    pub fn into_result(self) -> Result<Vec<OutputReport>, TeeError> {
        self.status.map(|()| self.reports)
    }
}

/// Build an output's writer from its sink configuration
#[instrument(
    name = "tee_create_output",
    skip(spec),
    fields(output = %spec.output.name, sink_type = ?spec.sink.sink_type)
)]
pub async fn create_output(spec: &OutputSpec) -> Result<Output, TeeError> {
    let name = &spec.output.name;
    let config = spec.output.clone();
    let params = &spec.sink.params;
    let creation = |e: contracts::ContractError| TeeError::sink_creation(name, e.to_string());

    let output = match spec.sink.sink_type {
        SinkType::File => Output::new(config, FileSink::from_params(name, params).await.map_err(creation)?),
        SinkType::Network => {
            Output::new(config, NetworkSink::from_params(name, params).await.map_err(creation)?)
        }
        SinkType::Stdout => Output::new(config, StdoutSink::stdout(name)),
        SinkType::Log => Output::new(config, LogSink::new(name)),
        SinkType::Null => Output::new(config, NullSink::new()),
    };
    Ok(output)
}

/// Convenience function to create a tee from a blueprint
#[instrument(name = "tee_create", skip(blueprint), fields(outputs = blueprint.outputs.len()))]
pub async fn create_tee(blueprint: &TeeBlueprint) -> Result<Tee, TeeError> {
    let mut outputs = Vec::with_capacity(blueprint.outputs.len());
    for spec in &blueprint.outputs {
        outputs.push(create_output(spec).await?);
    }

    Tee::builder(blueprint.chunk_size)
        .pool_size(blueprint.resolved_pool_size())
        .outputs(outputs)
        .build()
}
