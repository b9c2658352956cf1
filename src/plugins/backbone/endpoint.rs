use super::associate;
use crate::error::{Error, Result};
use crate::node::{AnyNode, EndpointNode, NodeDependencies, PathId};
use crate::plugin::{Plugin, PluginId, ScanContext, Walk};
use log::debug;

/// Extension recording which type implements an endpoint's operations
pub const CLASS_NAME_EXTENSION: &str = "x-class-name";

/// Emits one endpoint per root class and publishes its tag.
pub struct EndpointPlugin;

impl Plugin for EndpointPlugin {
    fn id(&self) -> PluginId {
        "endpoint"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        match cx.node() {
            AnyNode::Root(root) => Ok(deps.append_children(
                root.source().iter().map(|class| EndpointNode::of(class.clone())),
            )),
            _ => Ok(deps),
        }
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let marker = walk.storage.config.endpoint_annotation.clone();
        let AnyNode::Endpoint(endpoint) = walk.node_mut(path) else {
            return Ok(());
        };

        let class = endpoint.source().clone();
        let name = class
            .annotation(&marker)
            .and_then(|annotation| annotation.value())
            .unwrap_or(&class.simple_name)
            .to_string();
        validate_name(&name, &class.name)?;
        debug!("Endpoint {} is named `{}`", class.name, name);

        let tag = endpoint.target_mut();
        tag.name = name;
        tag.extensions.insert(
            CLASS_NAME_EXTENSION.to_string(),
            serde_json::Value::String(class.name.clone()),
        );
        associate(path, walk);
        Ok(())
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let AnyNode::Endpoint(endpoint) = walk.tree.node(path) else {
            return Ok(());
        };
        let tag = endpoint.target().clone();
        let class_name = endpoint.source().name.clone();

        let document = walk.tree.root_document_mut();
        if let Some(existing) = document.tags.iter().find(|t| t.name == tag.name) {
            return Err(Error::structural(format!(
                "endpoint name `{}` is claimed by both {} and {}",
                tag.name,
                existing
                    .extensions
                    .get(CLASS_NAME_EXTENSION)
                    .and_then(|v| v.as_str())
                    .unwrap_or("<unknown>"),
                class_name
            )));
        }
        document.tags.push(tag);
        Ok(())
    }
}

/// Endpoint names become path segments and operation ids.
fn validate_name(name: &str, class: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "endpoint {} has invalid name `{}`",
            class, name
        )))
    }
}
