//! StdoutSink - writes the stream to standard output

use tokio::io::Stdout;

use super::WriterSink;

/// Sink that writes chunks to stdout
pub type StdoutSink = WriterSink<Stdout>;

impl WriterSink<Stdout> {
    /// Create a sink over the process's stdout
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, tokio::io::stdout())
    }
}
