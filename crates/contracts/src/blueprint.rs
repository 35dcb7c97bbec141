//! TeeBlueprint - Config Loader 输出
//!
//! 描述完整的 tee 配置：块大小、缓冲池、输出列表及其背压策略。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 默认块大小 (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的 tee 配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeeBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 每次读取的块大小 (字节)，整个 tee 生命周期内固定
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// 缓冲池空闲缓冲区上限 (None = 按输出队列深度推导)
    #[serde(default)]
    pub pool_size: Option<usize>,

    /// 输出列表
    pub outputs: Vec<OutputSpec>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl TeeBlueprint {
    /// 缓冲池大小：显式配置优先，否则为所有队列深度之和 + 输出数 + 1
    ///
    /// 推导值覆盖稳态下可能同时存活的全部块。
    pub fn resolved_pool_size(&self) -> usize {
        self.pool_size.unwrap_or_else(|| {
            self.outputs
                .iter()
                .map(|o| o.output.queue_depth)
                .sum::<usize>()
                + self.outputs.len()
                + 1
        })
    }

    /// 所有输出的运行时配置
    pub fn output_configs(&self) -> Vec<OutputConfig> {
        self.outputs.iter().map(|o| o.output.clone()).collect()
    }
}

/// 单个输出：运行时配置 + 目的地
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    /// 运行时配置 (名称、策略、队列深度、停滞超时)
    #[serde(flatten)]
    pub output: OutputConfig,

    /// 目的地
    pub sink: SinkConfig,
}

/// 输出的静态配置，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出名称 (用于日志/指标/结果)
    pub name: String,

    /// 队列满时的背压策略
    #[serde(default)]
    pub policy: Policy,

    /// 队列深度 (以块计)
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// 停滞超时 (毫秒)，仅 Detach 策略使用
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
}

fn default_queue_depth() -> usize {
    16
}

fn default_stall_timeout_ms() -> u64 {
    1000
}

impl OutputConfig {
    /// 使用默认队列深度与超时创建
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
            queue_depth: default_queue_depth(),
            stall_timeout_ms: default_stall_timeout_ms(),
        }
    }

    /// 设置队列深度
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// 设置停滞超时
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// 停滞超时
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

/// 背压策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// 队列满时等待，不丢数据
    #[default]
    Lossless,
    /// 队列满时淘汰最旧块，失败则丢弃新块，从不阻塞
    Lossy,
    /// 队列满时最多等待停滞超时，超时后永久摘除该输出
    Detach,
}

impl Policy {
    /// 策略名称 (小写)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lossless => "lossless",
            Self::Lossy => "lossy",
            Self::Detach => "detach",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目的地配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 类型
    pub sink_type: SinkType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 文件输出 (params: path, append)
    File,
    /// 标准输出
    Stdout,
    /// 日志输出 (仅记录块摘要)
    Log,
    /// 网络输出 (TCP, params: addr)
    Network,
    /// 丢弃
    Null,
}
