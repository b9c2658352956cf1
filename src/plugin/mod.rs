//! Plugin contract and the ordered pipeline that drives plugins at every node.
//!
//! A plugin takes part in the traversal through three callbacks:
//!
//! - [`Plugin::scan`] transforms the [`NodeDependencies`] of a node, in plugin order,
//!   before any child is visited. It only reads shared state.
//! - [`Plugin::enter`] runs before descending into the node's children.
//! - [`Plugin::exit`] runs after every child and every related node discovered
//!   beneath the node has been processed.
//!
//! Plugins are ordered once, when the pipeline is built, by a stable topological
//! sort over their `requires` edges with `(order, registration index)` as the
//! tie-breaker. Ordering conflicts are rejected before traversal starts.

pub mod composite;

pub use composite::CompositePlugin;

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::node::{AnyNode, NodeDependencies, PathId, Tree};
use crate::storage::SharedStorage;
use log::debug;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

pub type PluginId = &'static str;

/// Read-only view handed to [`Plugin::scan`].
pub struct ScanContext<'a> {
    pub tree: &'a Tree,
    pub storage: &'a SharedStorage,
    pub path: PathId,
}

impl<'a> ScanContext<'a> {
    /// The node being scanned
    pub fn node(&self) -> &'a AnyNode {
        self.tree.node(self.path)
    }
}

/// Mutable view handed to [`Plugin::enter`] and [`Plugin::exit`].
pub struct Walk<'a> {
    pub tree: &'a mut Tree,
    pub storage: &'a mut SharedStorage,
}

impl<'a> Walk<'a> {
    pub fn new(tree: &'a mut Tree, storage: &'a mut SharedStorage) -> Self {
        Self { tree, storage }
    }

    pub fn node(&self, path: PathId) -> &AnyNode {
        self.tree.node(path)
    }

    pub fn node_mut(&mut self, path: PathId) -> &mut AnyNode {
        self.tree.node_mut(path)
    }
}

/// A unit of traversal logic.
pub trait Plugin {
    /// Unique, stable name used in `requires` lists and configuration
    fn id(&self) -> PluginId;

    /// Lower runs first among plugins with no dependency between them
    fn order(&self) -> i32 {
        0
    }

    /// Plugins whose output this one reads; they must run first
    fn requires(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Receives this plugin's options before traversal; `Null` when none were given.
    fn configure(&mut self, _config: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn scan(&self, deps: NodeDependencies, _cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        Ok(deps)
    }

    fn enter(&mut self, _path: PathId, _walk: &mut Walk<'_>) -> Result<()> {
        Ok(())
    }

    fn exit(&mut self, _path: PathId, _walk: &mut Walk<'_>) -> Result<()> {
        Ok(())
    }
}

/// Plugins in validated execution order.
pub struct PluginPipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    /// Orders the plugins, failing on duplicate ids, missing requirements,
    /// order conflicts and cycles.
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Result<Self> {
        let (plugins, _) = order_plugins(plugins, None)?;
        debug!(
            "Plugin order: {}",
            plugins.iter().map(|p| p.id()).collect::<Vec<_>>().join(", ")
        );
        Ok(Self { plugins })
    }

    pub fn ids(&self) -> Vec<PluginId> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Hands every plugin its options from the parser configuration.
    pub fn configure(&mut self, config: &ParserConfig) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.configure(config.plugin_config(plugin.id()))?;
        }
        Ok(())
    }

    pub fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        self.plugins
            .iter()
            .try_fold(deps, |deps, plugin| plugin.scan(deps, cx))
    }

    pub fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.enter(path, walk)?;
        }
        Ok(())
    }

    pub fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.exit(path, walk)?;
        }
        Ok(())
    }
}

/// Sorts plugins so every plugin runs after the plugins it requires.
///
/// With `owner` set, requirements that no member satisfies are returned as
/// external requirements of the owner instead of failing.
pub(crate) fn order_plugins(
    plugins: Vec<Box<dyn Plugin>>,
    owner: Option<PluginId>,
) -> Result<(Vec<Box<dyn Plugin>>, Vec<PluginId>)> {
    let mut index_of: HashMap<PluginId, usize> = HashMap::new();
    for (index, plugin) in plugins.iter().enumerate() {
        if index_of.insert(plugin.id(), index).is_some() {
            return Err(Error::configuration(format!(
                "plugin `{}` is registered more than once",
                plugin.id()
            )));
        }
    }

    let mut external: Vec<PluginId> = Vec::new();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); plugins.len()];
    let mut pending: Vec<usize> = vec![0; plugins.len()];

    for (index, plugin) in plugins.iter().enumerate() {
        for required in plugin.requires() {
            let required_index = match index_of.get(required) {
                Some(&found) => found,
                None if owner.is_some() => {
                    if !external.contains(&required) {
                        external.push(required);
                    }
                    continue;
                }
                None => {
                    return Err(Error::configuration(format!(
                        "plugin `{}` requires `{}`, which is not registered",
                        plugin.id(),
                        required
                    )))
                }
            };
            if required_index == index {
                return Err(Error::configuration(format!(
                    "plugin `{}` requires itself",
                    plugin.id()
                )));
            }
            let dependency = &plugins[required_index];
            if plugin.order() < dependency.order() {
                return Err(Error::configuration(format!(
                    "plugin `{}` (order {}) requires `{}` (order {}) \
                     but is ordered to run before it",
                    plugin.id(),
                    plugin.order(),
                    dependency.id(),
                    dependency.order()
                )));
            }
            dependents[required_index].push(index);
            pending[index] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(i32, usize)>> = plugins
        .iter()
        .enumerate()
        .filter(|(index, _)| pending[*index] == 0)
        .map(|(index, plugin)| Reverse((plugin.order(), index)))
        .collect();
    let mut sorted: Vec<usize> = Vec::with_capacity(plugins.len());
    while let Some(Reverse((_, index))) = ready.pop() {
        sorted.push(index);
        for &dependent in &dependents[index] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse((plugins[dependent].order(), dependent)));
            }
        }
    }

    if sorted.len() < plugins.len() {
        let cyclic: Vec<PluginId> = plugins
            .iter()
            .enumerate()
            .filter(|(index, _)| pending[*index] > 0)
            .map(|(_, plugin)| plugin.id())
            .collect();
        return Err(Error::configuration(format!(
            "plugin requirements form a cycle between {}",
            cyclic
                .iter()
                .map(|id| format!("`{}`", id))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let mut slots: Vec<Option<Box<dyn Plugin>>> = plugins.into_iter().map(Some).collect();
    let ordered = sorted
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect();
    Ok((ordered, external))
}
