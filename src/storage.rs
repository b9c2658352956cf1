//! Traversal-wide state shared by every plugin.

use crate::config::ParserConfig;
use crate::model::{ClassInfo, ClassRegistry, ModelKey};
use crate::node::NodeId;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Maps a source model to the node holding the fragment produced for it.
///
/// The first binding wins: a model reached again through another path keeps
/// pointing at the node where its fragment was first built.
#[derive(Debug, Clone, Default)]
pub struct AssociationMap {
    entries: HashMap<ModelKey, NodeId>,
}

impl AssociationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the model was already bound.
    pub fn bind(&mut self, key: ModelKey, node: NodeId) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        debug!("Associating {:?} with node {}", key, node.index());
        self.entries.insert(key, node);
        true
    }

    pub fn get(&self, key: &ModelKey) -> Option<NodeId> {
        self.entries.get(key).copied()
    }

    /// Node built for an entity class
    pub fn entity(&self, qualified_name: &str) -> Option<NodeId> {
        self.get(&ModelKey::Entity(qualified_name.to_string()))
    }

    /// Node built for an endpoint class
    pub fn endpoint(&self, qualified_name: &str) -> Option<NodeId> {
        self.get(&ModelKey::Endpoint(qualified_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelKey, &NodeId)> {
        self.entries.iter()
    }
}

/// Created fresh for every parse and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct SharedStorage {
    pub config: ParserConfig,
    pub registry: ClassRegistry,
    pub associations: AssociationMap,
    /// Free-form state, one slot per plugin id
    pub plugin_data: BTreeMap<String, serde_json::Value>,
}

impl SharedStorage {
    pub fn new(config: ParserConfig, registry: ClassRegistry) -> Self {
        Self {
            config,
            registry,
            associations: AssociationMap::new(),
            plugin_data: BTreeMap::new(),
        }
    }

    pub fn resolve_class(&self, reference: &str) -> Option<Rc<ClassInfo>> {
        self.registry.resolve(reference)
    }

    pub fn plugin_data(&self, id: &str) -> Option<&serde_json::Value> {
        self.plugin_data.get(id)
    }

    /// Slot for a plugin, created as `Null` on first access
    pub fn plugin_data_mut(&mut self, id: &str) -> &mut serde_json::Value {
        self.plugin_data
            .entry(id.to_string())
            .or_insert(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{EntityNode, RootNode, Tree};
    use crate::openapi::OpenApi;

    #[test]
    fn test_first_binding_wins() {
        let mut tree = Tree::new(RootNode::of(Vec::new(), OpenApi::default()));
        let first = tree.add_node(EntityNode::of(ClassInfo::new("crate::A").build()).into());
        let second = tree.add_node(EntityNode::of(ClassInfo::new("crate::A").build()).into());

        let mut map = AssociationMap::new();
        assert!(map.bind(ModelKey::Entity("crate::A".to_string()), first));
        assert!(!map.bind(ModelKey::Entity("crate::A".to_string()), second));
        assert_eq!(map.entity("crate::A"), Some(first));
        assert_eq!(map.endpoint("crate::A"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_plugin_data_slot() {
        let mut storage = SharedStorage::default();
        assert!(storage.plugin_data("finalize").is_none());

        *storage.plugin_data_mut("finalize") = serde_json::json!(["foo"]);
        storage
            .plugin_data_mut("finalize")
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!("bar"));

        assert_eq!(
            storage.plugin_data("finalize"),
            Some(&serde_json::json!(["foo", "bar"]))
        );
    }

    #[test]
    fn test_resolve_class_uses_registry() {
        let registry: ClassRegistry = vec![ClassInfo::new("crate::model::User").build()]
            .into_iter()
            .collect();
        let storage = SharedStorage::new(ParserConfig::default(), registry);
        assert!(storage.resolve_class("User").is_some());
        assert!(storage.resolve_class("Other").is_none());
    }
}
