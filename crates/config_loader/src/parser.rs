//! 配置格式
//!
//! TOML 为主要格式，JSON 可选；格式由文件扩展名推断，解析与序列化都经由
//! [`ConfigFormat`] 完成。

use std::error::Error;
use std::path::Path;

use contracts::{ContractError, TeeBlueprint};

type BoxError = Box<dyn Error + Send + Sync>;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 从文件路径推断格式
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// 反序列化为蓝图 (不做校验)
    pub fn parse(self, content: &str) -> Result<TeeBlueprint, ContractError> {
        let parsed: Result<TeeBlueprint, BoxError> = match self {
            Self::Toml => toml::from_str(content).map_err(Into::into),
            Self::Json => serde_json::from_str(content).map_err(Into::into),
        };
        parsed.map_err(|e| ContractError::ConfigParse {
            message: format!("{} parse error: {e}", self.label()),
            source: Some(e),
        })
    }

    /// 序列化蓝图
    pub fn render(self, blueprint: &TeeBlueprint) -> Result<String, ContractError> {
        let rendered: Result<String, BoxError> = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(Into::into),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(Into::into),
        };
        rendered.map_err(|e| {
            ContractError::config_parse(format!("{} serialize error: {e}", self.label()))
        })
    }
}
