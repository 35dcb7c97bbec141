//! NetworkSink - TCP byte stream

use contracts::ContractError;
use std::collections::HashMap;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::WriterSink;

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address (`host:port`, resolved at connect time)
    pub addr: String,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = params
            .get("addr")
            .filter(|a| !a.is_empty())
            .cloned()
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let nodelay = match params.get("nodelay").map(String::as_str) {
            Some("true") | None => true,
            Some("false") => false,
            Some(other) => return Err(format!("invalid nodelay value '{}'", other)),
        };

        Ok(Self { addr, nodelay })
    }
}

/// Sink that streams chunks over TCP
pub type NetworkSink = WriterSink<TcpStream>;

impl WriterSink<TcpStream> {
    /// Connect to the target
    #[instrument(name = "network_sink_connect", skip(name, config), fields(target = %config.addr))]
    pub async fn connect(name: impl Into<String>, config: &NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let stream = TcpStream::connect(&config.addr).await?;
        stream.set_nodelay(config.nodelay)?;

        debug!(sink = %name, target = %config.addr, "NetworkSink connected");
        Ok(Self::new(name, stream))
    }

    /// Create from params (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation("sink.params", e))?;
        Self::connect(name.clone(), &config)
            .await
            .map_err(|e| ContractError::sink_connection(name, e.to_string()))
    }
}
