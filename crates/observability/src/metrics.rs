//! Tee 指标记录模块
//!
//! 通过 `metrics` facade 记录分发与写出计数，导出器由调用方安装。
//! 未安装 recorder 时所有调用均为空操作。

use metrics::{counter, gauge};

/// 块丢弃原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Lossy 策略淘汰最旧块
    Evicted,
    /// 队列满且淘汰失败，丢弃新块
    Rejected,
    /// Detach 超时
    Stalled,
    /// 等待期间收到取消信号
    Cancelled,
}

impl DropReason {
    /// 标签值
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evicted => "evicted",
            Self::Rejected => "rejected",
            Self::Stalled => "stalled",
            Self::Cancelled => "cancelled",
        }
    }
}

/// 记录一次源读取
pub fn record_chunk_read(bytes: usize) {
    counter!("fanout_tee_chunks_read_total").increment(1);
    counter!("fanout_tee_bytes_read_total").increment(bytes as u64);
}

/// 记录一次成功写出
pub fn record_chunk_written(output: &str, bytes: usize) {
    counter!(
        "fanout_tee_chunks_written_total",
        "output" => output.to_string()
    )
    .increment(1);
    counter!(
        "fanout_tee_bytes_written_total",
        "output" => output.to_string()
    )
    .increment(bytes as u64);
}

/// 记录一次块丢弃
pub fn record_chunk_dropped(output: &str, reason: DropReason) {
    counter!(
        "fanout_tee_chunks_dropped_total",
        "output" => output.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// 记录输出被摘除
pub fn record_output_detached(output: &str) {
    counter!(
        "fanout_tee_outputs_detached_total",
        "output" => output.to_string()
    )
    .increment(1);
}

/// 记录输出写失败
pub fn record_output_failure(output: &str) {
    counter!(
        "fanout_tee_output_failures_total",
        "output" => output.to_string()
    )
    .increment(1);
}

/// 记录输出队列深度
pub fn record_queue_depth(output: &str, depth: usize) {
    gauge!(
        "fanout_tee_queue_depth",
        "output" => output.to_string()
    )
    .set(depth as f64);
}

/// 记录存活输出数
pub fn record_live_outputs(live: usize) {
    gauge!("fanout_tee_live_outputs").set(live as f64);
}
