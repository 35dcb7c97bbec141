//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{InputSpec, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_tee(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(chunk_size) = args.chunk_size {
        info!(chunk_size, "Overriding chunk size from CLI");
        blueprint.chunk_size = chunk_size;
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Invalid --chunk-size override")?;
    }

    info!(
        chunk_size = blueprint.chunk_size,
        outputs = blueprint.outputs.len(),
        input = %args.input,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        input: InputSpec::parse(&args.input),
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let summary = pipeline.run().await.context("Tee execution failed")?;
    summary.print_summary();

    if summary.failed_outputs() > 0 {
        warn!(
            failed = summary.failed_outputs(),
            total = summary.outputs.len(),
            "Some outputs did not complete"
        );
    }

    match summary.status {
        None => {
            info!("Fanout Tee finished");
            Ok(())
        }
        Some(e) => Err(CliError::from(e).into()),
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::TeeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Chunk size: {} bytes", blueprint.chunk_size);
    println!("Pool size: {} buffers", blueprint.resolved_pool_size());

    println!("\nOutputs ({}):", blueprint.outputs.len());
    for spec in &blueprint.outputs {
        let output = &spec.output;
        println!(
            "  - {} ({:?}) policy={} depth={}",
            output.name, spec.sink.sink_type, output.policy, output.queue_depth
        );
    }

    println!();
}
