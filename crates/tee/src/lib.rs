//! # Tee
//!
//! 单输入、多输出的数据复制模块。
//!
//! 负责：
//! - 按固定块大小读取源数据，零拷贝共享给所有输出
//! - 每个输出独立的有界队列与背压策略 (lossless / lossy / detach)
//! - 隔离慢输出与失败输出，汇总每个输出的最终结果

mod channel;
mod chunk;
mod distributor;
pub mod error;
mod handle;
pub mod pool;
pub mod sinks;
pub mod sources;
mod state;
mod tee;

pub use chunk::Chunk;
pub use contracts::{ChunkReader, ChunkWriter, OutputConfig, Policy};
pub use error::{OutputError, TeeError};
pub use pool::{BufferPool, PoolStats};
pub use sinks::{FileSink, LogSink, NetworkSink, NullSink, StdoutSink, WriterSink};
pub use sources::{FileSource, ReaderSource, StdinSource};
pub use state::{OutputReport, OutputState};
pub use tee::{create_output, create_tee, Output, RunOutcome, Tee, TeeBuilder};
pub use tokio_util::sync::CancellationToken;
