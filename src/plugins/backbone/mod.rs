//! Structural plugins that turn endpoints, methods and entities into the
//! document skeleton: tags, `POST` operations and component schemas.
//!
//! Members run in registration order within the `backbone` composite:
//! endpoints first, then the member plugins that emit children for them, and
//! type signatures last so that they see every signature the others emitted.

pub mod endpoint;
pub mod entity;
pub mod method;
pub mod type_signature;

pub use endpoint::EndpointPlugin;
pub use entity::{EntityPlugin, FieldPlugin};
pub use method::{MethodParameterPlugin, MethodPlugin};
pub use type_signature::TypeSignaturePlugin;

use crate::error::Result;
use crate::node::{PathId, Tree};
use crate::openapi::Schema;
use crate::plugin::{CompositePlugin, PluginId, Walk};

pub const BACKBONE_PLUGIN_ID: PluginId = "backbone";

pub fn backbone_plugin() -> Result<CompositePlugin> {
    CompositePlugin::new(
        BACKBONE_PLUGIN_ID,
        vec![
            Box::new(EndpointPlugin),
            Box::new(MethodPlugin),
            Box::new(MethodParameterPlugin),
            Box::new(EntityPlugin),
            Box::new(FieldPlugin),
            Box::new(TypeSignaturePlugin),
        ],
    )
}

/// Records the node at `path` as the producer of its model's fragment.
fn associate(path: PathId, walk: &mut Walk<'_>) {
    let identity = walk.tree.node(path).identity();
    let node = walk.tree.node_id(path);
    walk.storage.associations.bind(identity, node);
}

/// Schema of the first child that carries one
fn first_child_schema(tree: &Tree, path: PathId) -> Option<Schema> {
    tree.child_nodes(path).find_map(|node| node.schema()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Plugin;

    #[test]
    fn test_backbone_members_keep_registration_order() {
        let backbone = backbone_plugin().unwrap();
        assert_eq!(backbone.id(), "backbone");
        assert_eq!(backbone.order(), 0);
        assert!(backbone.requires().is_empty());
        assert_eq!(
            backbone.member_ids(),
            vec!["endpoint", "method", "method-parameter", "entity", "field", "type-signature"]
        );
    }
}
