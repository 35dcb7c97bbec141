//! Sink implementations
//!
//! Byte-stream destinations share [`WriterSink`]; LogSink and NullSink
//! are standalone.

mod file;
mod log;
mod network;
mod null;
mod stdout;
mod writer;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkSink, NetworkSinkConfig};
pub use self::null::NullSink;
pub use self::stdout::StdoutSink;
pub use self::writer::WriterSink;
