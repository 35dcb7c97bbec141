//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `TeeBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("tee.toml")).unwrap();
//! println!("Outputs: {}", blueprint.outputs.len());
//! ```

mod parser;
mod validator;

pub use contracts::TeeBlueprint;
pub use parser::ConfigFormat;
pub use validator::MAX_CHUNK_SIZE;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is detected from the extension (.toml / .json).
    ///
    /// # Errors
    /// - Unsupported format
    /// - File read failure
    /// - Parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<TeeBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration content
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<TeeBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate an already constructed blueprint
    pub fn validate(blueprint: &TeeBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize to TOML
    pub fn to_toml(blueprint: &TeeBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.render(blueprint)
    }

    /// Serialize to JSON
    pub fn to_json(blueprint: &TeeBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.render(blueprint)
    }
}
