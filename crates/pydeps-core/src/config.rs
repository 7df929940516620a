use pydeps_schema::{classify_runtime, RuntimeTag, ServiceManifest, PYTHON_FAMILY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MEMORY_SIZE: u32 = 1024;
pub const DEFAULT_TIMEOUT: u32 = 15 * 60;
pub const DEFAULT_LOCK_TOOL: &str = "pipenv";
pub const DEFAULT_DESCRIPTION: &str = "Python dependencies generated by serverless-pydeps.";

const MEMORY_RANGE: std::ops::RangeInclusive<u32> = 128..=10_240;
const TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 1..=900;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid pydeps config: {0}")]
    Parse(String),
    #[error("memory_size {0} MB is outside 128..=10240")]
    MemorySize(u32),
    #[error("timeout {0}s is outside 1..=900")]
    Timeout(u32),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Tunables for the generated packaging resources, read from `[custom.pydeps]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PydepsConfig {
    /// Packager memory in MB; dependency resolution is memory hungry.
    #[serde(default = "default_memory_size")]
    pub memory_size: u32,
    /// Packager execution ceiling in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    /// External tool that flattens a `Pipfile` into pinned requirements.
    #[serde(default = "default_lock_tool")]
    pub lock_tool: String,
    /// Runtime tags starting with this prefix get a dependency layer.
    #[serde(default = "default_runtime_prefix")]
    pub runtime_prefix: String,
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for PydepsConfig {
    fn default() -> Self {
        Self {
            memory_size: default_memory_size(),
            timeout: default_timeout(),
            lock_tool: default_lock_tool(),
            runtime_prefix: default_runtime_prefix(),
            description: default_description(),
        }
    }
}

impl PydepsConfig {
    /// Read the `[custom.pydeps]` section of a manifest; absent means defaults.
    pub fn from_manifest(manifest: &ServiceManifest) -> Result<Self, ConfigError> {
        let config: Self = match &manifest.custom.pydeps {
            Some(table) => toml::Value::Table(table.clone())
                .try_into()
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
            None => Self::default(),
        };
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Load a standalone JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MEMORY_RANGE.contains(&self.memory_size) {
            return Err(ConfigError::MemorySize(self.memory_size));
        }
        if !TIMEOUT_RANGE.contains(&self.timeout) {
            return Err(ConfigError::Timeout(self.timeout));
        }
        if self.lock_tool.trim().is_empty() {
            return Err(ConfigError::Empty("lock_tool"));
        }
        if self.runtime_family().is_empty() {
            return Err(ConfigError::Empty("runtime_prefix"));
        }
        Ok(())
    }

    /// The runtime prefix in tag form, so `python` and `Python` select the
    /// same runtimes.
    pub fn runtime_family(&self) -> RuntimeTag {
        classify_runtime(&self.runtime_prefix)
    }

    fn normalized(mut self) -> Self {
        self.runtime_prefix = self.runtime_family().into_inner();
        self
    }
}

fn default_memory_size() -> u32 {
    DEFAULT_MEMORY_SIZE
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT
}

fn default_lock_tool() -> String {
    DEFAULT_LOCK_TOOL.to_owned()
}

fn default_runtime_prefix() -> String {
    PYTHON_FAMILY.to_owned()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_owned()
}
