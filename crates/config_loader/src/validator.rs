//! 配置校验模块
//!
//! 校验规则：
//! - chunk_size > 0 且不超过 MAX_CHUNK_SIZE
//! - 至少一个输出
//! - 输出名称非空且唯一
//! - queue_depth > 0
//! - Detach 策略的 stall_timeout_ms > 0
//! - sink 必填参数齐全

use std::collections::HashSet;

use contracts::{ContractError, Policy, SinkType, TeeBlueprint};

/// 块大小上限 (16 MiB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// 校验 TeeBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &TeeBlueprint) -> Result<(), ContractError> {
    validate_chunk_size(blueprint)?;
    validate_output_names(blueprint)?;
    validate_queues(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验块大小
fn validate_chunk_size(blueprint: &TeeBlueprint) -> Result<(), ContractError> {
    if blueprint.chunk_size == 0 || blueprint.chunk_size > MAX_CHUNK_SIZE {
        return Err(ContractError::config_validation(
            "chunk_size",
            format!(
                "chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {}",
                blueprint.chunk_size
            ),
        ));
    }
    if blueprint.pool_size == Some(0) {
        return Err(ContractError::config_validation(
            "pool_size",
            "pool_size must be > 0",
        ));
    }
    Ok(())
}

/// 校验输出名称非空且唯一
fn validate_output_names(blueprint: &TeeBlueprint) -> Result<(), ContractError> {
    if blueprint.outputs.is_empty() {
        return Err(ContractError::config_validation(
            "outputs",
            "at least one output is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, spec) in blueprint.outputs.iter().enumerate() {
        let name = &spec.output.name;
        if name.is_empty() {
            return Err(ContractError::config_validation(
                format!("outputs[{idx}].name"),
                "output name cannot be empty",
            ));
        }
        if !seen.insert(name) {
            return Err(ContractError::config_validation(
                format!("outputs[name={name}]"),
                "duplicate output name",
            ));
        }
    }
    Ok(())
}

/// 校验队列深度与停滞超时
fn validate_queues(blueprint: &TeeBlueprint) -> Result<(), ContractError> {
    for spec in &blueprint.outputs {
        let output = &spec.output;
        if output.queue_depth == 0 {
            return Err(ContractError::config_validation(
                format!("outputs[{}].queue_depth", output.name),
                "queue_depth must be > 0",
            ));
        }
        if output.policy == Policy::Detach && output.stall_timeout_ms == 0 {
            return Err(ContractError::config_validation(
                format!("outputs[{}].stall_timeout_ms", output.name),
                "stall_timeout_ms must be > 0 for detach policy",
            ));
        }
    }
    Ok(())
}

/// 校验 sink 必填参数
fn validate_sinks(blueprint: &TeeBlueprint) -> Result<(), ContractError> {
    for spec in &blueprint.outputs {
        let required = match spec.sink.sink_type {
            SinkType::File => Some("path"),
            SinkType::Network => Some("addr"),
            SinkType::Stdout | SinkType::Log | SinkType::Null => None,
        };
        if let Some(key) = required {
            let present = spec
                .sink
                .params
                .get(key)
                .is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("outputs[{}].sink.params.{key}", spec.output.name),
                    format!("{:?} sink requires '{key}'", spec.sink.sink_type),
                ));
            }
        }
    }
    Ok(())
}
