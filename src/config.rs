//! Manager configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! resources_dir = "resources"
//!
//! [view]
//! directory = "views"        # global template root, joined with the alias
//! override_dir = "overrides" # global override root, joined with the alias
//!
//! [driver.button]            # default params for the `button` alias
//! tag = "button"
//!
//! [partials]                 # aliases registered by the CLI
//! button = "TagDriver"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::params::Params;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Directory holding the crate's built-in templates
pub fn default_resources_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources")
}

/// Global view roots
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub directory: Option<PathBuf>,
    pub override_dir: Option<PathBuf>,
}

/// Configuration consumed by [`crate::PartialManager`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    /// Base of built-in resources; defaults to the crate's `resources/`
    pub resources_dir: Option<PathBuf>,

    pub view: ViewConfig,

    /// Per-alias default params, merged ahead of caller params
    pub driver: IndexMap<String, Value>,

    /// Aliases to register, mapped to a driver type name
    pub partials: IndexMap<String, String>,
}

impl PartialConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Set the global view directory
    pub fn with_view_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.view.directory = Some(directory.into());
        self
    }

    /// Set the global override directory
    pub fn with_override_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.view.override_dir = Some(directory.into());
        self
    }

    /// Set the resources directory
    pub fn with_resources_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.resources_dir = Some(directory.into());
        self
    }

    /// Set default params for one alias
    pub fn with_driver_params(mut self, alias: impl Into<String>, params: Value) -> Self {
        self.driver.insert(alias.into(), params);
        self
    }

    /// Register an alias for the CLI
    pub fn with_partial(mut self, alias: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.partials.insert(alias.into(), type_name.into());
        self
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.resources_dir
            .clone()
            .unwrap_or_else(default_resources_dir)
    }

    /// Default params configured for `alias` (empty when none)
    pub fn driver_params(&self, alias: &str) -> Params {
        self.driver
            .get(alias)
            .cloned()
            .map(Params::from)
            .unwrap_or_default()
    }
}

impl FromStr for PartialConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}
