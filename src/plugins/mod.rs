//! Built-in plugins, selectable by id from the configuration.

pub mod backbone;
pub mod nonnull;

pub use backbone::{backbone_plugin, BACKBONE_PLUGIN_ID};
pub use nonnull::{NonnullPlugin, NONNULL_PLUGIN_ID};

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::plugin::Plugin;

/// Creates a built-in plugin.
pub fn by_id(id: &str) -> Result<Box<dyn Plugin>> {
    match id {
        BACKBONE_PLUGIN_ID => Ok(Box::new(backbone_plugin()?)),
        NONNULL_PLUGIN_ID => Ok(Box::new(NonnullPlugin::new())),
        other => Err(Error::configuration(format!(
            "unknown plugin `{}` (available: {}, {})",
            other, BACKBONE_PLUGIN_ID, NONNULL_PLUGIN_ID
        ))),
    }
}

/// Creates the plugins listed under `plugins.use`, in listed order.
pub fn from_config(config: &ParserConfig) -> Result<Vec<Box<dyn Plugin>>> {
    config
        .plugins
        .use_plugins
        .iter()
        .map(|id| by_id(id))
        .collect()
}
