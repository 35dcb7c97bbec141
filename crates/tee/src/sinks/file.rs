//! FileSink - appends or truncates a file and writes chunks to it

use contracts::ContractError;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tracing::{debug, instrument};

use super::WriterSink;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Destination file
    pub path: PathBuf,
    /// Append instead of truncating
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        let append = match params.get("append").map(String::as_str) {
            Some("true") => true,
            Some("false") | None => false,
            Some(other) => return Err(format!("invalid append value '{}'", other)),
        };

        Ok(Self { path, append })
    }
}

/// Sink that writes the stream to a file
pub type FileSink = WriterSink<File>;

impl WriterSink<File> {
    /// Open the destination file
    ///
    /// Parent directories are created if missing.
    #[instrument(name = "file_sink_open", skip(name, config), fields(path = %config.path.display()))]
    pub async fn open(name: impl Into<String>, config: &FileSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if config.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(&config.path).await?;

        debug!(sink = %name, append = config.append, "FileSink opened");
        Ok(Self::new(name, file))
    }

    /// Create from params (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation("sink.params", e))?;
        Self::open(name.clone(), &config)
            .await
            .map_err(|e| ContractError::sink_connection(name, e.to_string()))
    }
}
