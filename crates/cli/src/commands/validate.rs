//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Policy, SinkType, TeeBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    chunk_size: usize,
    pool_size: usize,
    output_count: usize,
    lossless: usize,
    lossy: usize,
    detach: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let count = |policy: Policy| {
                blueprint
                    .outputs
                    .iter()
                    .filter(|o| o.output.policy == policy)
                    .count()
            };

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    chunk_size: blueprint.chunk_size,
                    pool_size: blueprint.resolved_pool_size(),
                    output_count: blueprint.outputs.len(),
                    lossless: count(Policy::Lossless),
                    lossy: count(Policy::Lossy),
                    detach: count(Policy::Detach),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &TeeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Every output may lose data
    if blueprint.outputs.iter().all(|o| o.output.policy == Policy::Lossy) {
        warnings.push("All outputs are lossy - no output is guaranteed a complete copy".to_string());
    }

    // Interleaved writes to one stream
    let stdout_count = blueprint
        .outputs
        .iter()
        .filter(|o| o.sink.sink_type == SinkType::Stdout)
        .count();
    if stdout_count > 1 {
        warnings.push(format!(
            "{} outputs write to stdout - their data will interleave",
            stdout_count
        ));
    }

    // Detach outputs with no slack
    for spec in &blueprint.outputs {
        let output = &spec.output;
        if output.policy == Policy::Detach && output.queue_depth == 1 {
            warnings.push(format!(
                "Output '{}' uses detach with queue depth 1 - a single slow write may detach it",
                output.name
            ));
        }
    }

    if let Some(pool_size) = blueprint.pool_size {
        let derived = TeeBlueprint {
            pool_size: None,
            ..blueprint.clone()
        }
        .resolved_pool_size();
        if pool_size < derived {
            warnings.push(format!(
                "pool_size {} is below the {} buffers the queues can hold - extra buffers will be allocated",
                pool_size, derived
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Chunk size: {}", summary.chunk_size);
            println!("  Pool size: {}", summary.pool_size);
            println!(
                "  Outputs: {} (lossless {}, lossy {}, detach {})",
                summary.output_count, summary.lossless, summary.lossy, summary.detach
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
