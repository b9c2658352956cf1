//! Parser configuration, loaded from YAML or JSON.
//!
//! ```yaml
//! endpoint-annotation: endpoint
//! open-api-base:
//!   title: Users API
//!   version: 2.0.0
//! plugins:
//!   use: [backbone, nonnull]
//!   nonnull:
//!     disable-optional-types: false
//!     annotations:
//!       - name: required
//!         makes-nullable: false
//!         score: 50
//! ```

use crate::error::{Error, Result};
use crate::openapi::Info;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_ENDPOINT_ANNOTATION: &str = "endpoint";
pub const DEFAULT_ENDPOINT_EXPOSED_ANNOTATION: &str = "endpoint_exposed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ParserConfig {
    /// Attribute that marks a type as an endpoint
    pub endpoint_annotation: String,
    /// Attribute that marks a trait whose methods an endpoint exposes
    pub endpoint_exposed_annotation: String,
    pub open_api_base: Info,
    pub plugins: PluginsConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            endpoint_annotation: DEFAULT_ENDPOINT_ANNOTATION.to_string(),
            endpoint_exposed_annotation: DEFAULT_ENDPOINT_EXPOSED_ANNOTATION.to_string(),
            open_api_base: Info::default(),
            plugins: PluginsConfig::default(),
        }
    }
}

/// Which plugins run, and the raw options handed to each of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginsConfig {
    #[serde(rename = "use", default = "default_plugin_ids")]
    pub use_plugins: Vec<String>,
    /// Keyed by plugin id
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            use_plugins: default_plugin_ids(),
            options: BTreeMap::new(),
        }
    }
}

fn default_plugin_ids() -> Vec<String> {
    vec!["backbone".to_string(), "nonnull".to_string()]
}

impl ParserConfig {
    /// Loads a configuration file; `.json` is read as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading parser configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let config = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        };
        config.map_err(|e| {
            Error::configuration(format!("invalid configuration file {}: {}", path.display(), e))
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Options for one plugin; `Null` when none were given.
    pub fn plugin_config(&self, id: &str) -> &serde_json::Value {
        self.plugins.options.get(id).unwrap_or(&serde_json::Value::Null)
    }

    pub fn with_plugin_config(mut self, id: &str, options: serde_json::Value) -> Self {
        self.plugins.options.insert(id.to_string(), options);
        self
    }
}
