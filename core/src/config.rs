//! Configuration for a single inspection run.
//!
//! `InspectConfig` centralizes the container conventions (extension, model entry
//! name), archive limits, scratch placement and the engine to query, so none of
//! them are hardcoded at call sites.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::ContainerLimits;
use crate::engine::{StdioEngine, TabularEngine, UnavailableEngine};
use crate::error_codes;

pub const DEFAULT_CONTAINER_EXTENSION: &str = "pbix";
pub const DEFAULT_MODEL_ENTRY_NAME: &str = "DataModel";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program implementing the stdio engine bridge. `None` leaves the model
    /// step without an engine, which degrades to "model absent".
    pub program: Option<String>,
    pub args: Vec<String>,
}

impl EngineConfig {
    pub fn build(&self) -> Box<dyn TabularEngine> {
        match &self.program {
            Some(program) => Box::new(StdioEngine::new(program.clone(), self.args.clone())),
            None => Box::new(UnavailableEngine),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub container_extension: String,
    pub model_entry_name: String,
    pub max_entries: usize,
    pub max_model_bytes: u64,
    /// Parent directory for scratch workspaces; the system temp dir when unset.
    pub scratch_root: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl Default for InspectConfig {
    fn default() -> Self {
        let limits = ContainerLimits::default();
        Self {
            container_extension: DEFAULT_CONTAINER_EXTENSION.to_string(),
            model_entry_name: DEFAULT_MODEL_ENTRY_NAME.to_string(),
            max_entries: limits.max_entries,
            max_model_bytes: limits.max_entry_uncompressed_bytes,
            scratch_root: None,
            engine: EngineConfig::default(),
        }
    }
}

impl InspectConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: InspectConfig = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn container_limits(&self) -> ContainerLimits {
        ContainerLimits {
            max_entries: self.max_entries,
            max_entry_uncompressed_bytes: self.max_model_bytes,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let extension = self.container_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ConfigError::EmptyField {
                field: "container_extension",
            });
        }
        if self.model_entry_name.is_empty() {
            return Err(ConfigError::EmptyField {
                field: "model_entry_name",
            });
        }
        if self.max_entries == 0 {
            return Err(ConfigError::NonPositiveLimit {
                field: "max_entries",
                value: 0,
            });
        }
        if self.max_model_bytes == 0 {
            return Err(ConfigError::NonPositiveLimit {
                field: "max_model_bytes",
                value: 0,
            });
        }
        if let Some(program) = &self.engine.program {
            if program.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    field: "engine.program",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveLimit { field: &'static str, value: u64 },
    #[error("invalid config document: {message}")]
    Parse { message: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        error_codes::CONFIG_INVALID
    }
}
