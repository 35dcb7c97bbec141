//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::TeeBlueprint;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    chunk_size: usize,
    pool_size: usize,
    pool_size_derived: bool,
    outputs: Vec<OutputInfo>,
}

#[derive(Serialize)]
struct OutputInfo {
    name: String,
    policy: String,
    queue_depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stall_timeout_ms: Option<u64>,
    sink_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &TeeBlueprint, args: &InfoArgs) -> ConfigInfo {
    let outputs = blueprint
        .outputs
        .iter()
        .map(|spec| {
            let output = &spec.output;
            OutputInfo {
                name: output.name.clone(),
                policy: output.policy.to_string(),
                queue_depth: output.queue_depth,
                stall_timeout_ms: (output.policy == contracts::Policy::Detach)
                    .then_some(output.stall_timeout_ms),
                sink_type: format!("{:?}", spec.sink.sink_type).to_lowercase(),
                params: if args.params {
                    spec.sink.params.clone().into_iter().collect()
                } else {
                    BTreeMap::new()
                },
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        chunk_size: blueprint.chunk_size,
        pool_size: blueprint.resolved_pool_size(),
        pool_size_derived: blueprint.pool_size.is_none(),
        outputs,
    }
}

fn print_config_info(blueprint: &TeeBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Fanout Tee Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📦 Buffers");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Chunk size: {} bytes", blueprint.chunk_size);
    match blueprint.pool_size {
        Some(n) => println!("   └─ Pool size: {}", n),
        None => println!("   └─ Pool size: {} (derived)", blueprint.resolved_pool_size()),
    }

    println!("\n📤 Outputs ({})", blueprint.outputs.len());
    for (i, spec) in blueprint.outputs.iter().enumerate() {
        let is_last = i == blueprint.outputs.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let output = &spec.output;

        println!(
            "   {} {} ({:?}, {}, depth {})",
            prefix, output.name, spec.sink.sink_type, output.policy, output.queue_depth
        );
        if output.policy == contracts::Policy::Detach {
            println!("   {}  └─ stall timeout: {} ms", child_prefix, output.stall_timeout_ms);
        }
        if args.params {
            let params: BTreeMap<_, _> = spec.sink.params.iter().collect();
            for (key, value) in params {
                println!("   {}  └─ {} = {}", child_prefix, key, value);
            }
        }
    }

    println!();
}
