//! Traversal driver.
//!
//! [`Parser`] orders the plugins, builds the root node from the root classes and
//! walks the tree depth first:
//!
//! 1. every plugin's `scan` contributes to the node's dependencies,
//! 2. every plugin's `enter` runs,
//! 3. children are attached to the node's path and visited before siblings,
//! 4. every plugin's `exit` runs once the subtree is done.
//!
//! Related nodes are deduplicated by model identity and queued. The queue is
//! drained before the root exits, each related node getting its own path
//! directly beneath the root, so cycles between classes terminate.

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::model::{ClassInfo, ClassRegistry, ModelKey};
use crate::node::{NodeDependencies, NodeId, PathId, RootNode, Tree};
use crate::openapi::OpenApi;
use crate::plugin::{Plugin, PluginPipeline, ScanContext, Walk};
use crate::storage::{AssociationMap, SharedStorage};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::Rc;

/// Lifecycle of a [`Parser`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    PluginsOrdered,
    Traversing,
    Done,
}

/// Everything a finished traversal produced.
#[derive(Debug)]
pub struct ParseOutput {
    pub openapi: OpenApi,
    pub tree: Tree,
    pub associations: AssociationMap,
    pub plugin_data: BTreeMap<String, serde_json::Value>,
    /// `-> path` / `<- path` lines, when tracing was requested
    pub trace: Option<Vec<String>>,
}

pub struct Parser {
    config: ParserConfig,
    plugins: Vec<Box<dyn Plugin>>,
    registry: ClassRegistry,
    trace: bool,
    phase: Phase,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
            registry: ClassRegistry::new(),
            trace: false,
            phase: Phase::Created,
        }
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugins(mut self, plugins: Vec<Box<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Classes that type signatures may resolve to
    pub fn class_registry(mut self, registry: ClassRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Records an enter/exit line per visited path.
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the traversal over `root_classes`.
    ///
    /// Fails before visiting any node when the plugins cannot be ordered or
    /// configured, and aborts on the first error any plugin reports.
    pub fn execute(&mut self, root_classes: Vec<Rc<ClassInfo>>) -> Result<ParseOutput> {
        if self.phase != Phase::Created {
            return Err(Error::configuration(format!(
                "parser cannot execute in phase {:?}",
                self.phase
            )));
        }

        let mut pipeline = PluginPipeline::new(std::mem::take(&mut self.plugins))?;
        pipeline.configure(&self.config)?;
        self.phase = Phase::PluginsOrdered;
        debug!("Parser phase: {:?}", self.phase);

        let mut registry = std::mem::take(&mut self.registry);
        for class in &root_classes {
            registry.insert(class.clone());
        }

        info!(
            "Parsing {} root classes with plugins [{}]",
            root_classes.len(),
            pipeline.ids().join(", ")
        );
        let root = RootNode::of(root_classes, OpenApi::new(self.config.open_api_base.clone()));
        let storage = SharedStorage::new(self.config.clone(), registry);

        self.phase = Phase::Traversing;
        debug!("Parser phase: {:?}", self.phase);
        let walker = Walker::new(&mut pipeline, Tree::new(root), storage, self.trace);
        let (tree, storage, trace) = walker.run()?;

        self.phase = Phase::Done;
        debug!("Parser phase: {:?}", self.phase);
        info!(
            "Traversal visited {} paths, {} component schemas",
            tree.path_count(),
            tree.root_document().components.schemas.len()
        );

        Ok(ParseOutput {
            openapi: tree.root_document().clone(),
            associations: storage.associations,
            plugin_data: storage.plugin_data,
            tree,
            trace,
        })
    }
}

/// Parses `root_classes` with `plugins` and the default configuration.
pub fn parse(
    registry: ClassRegistry,
    root_classes: Vec<Rc<ClassInfo>>,
    plugins: Vec<Box<dyn Plugin>>,
) -> Result<OpenApi> {
    Parser::new(ParserConfig::default())
        .plugins(plugins)
        .class_registry(registry)
        .execute(root_classes)
        .map(|output| output.openapi)
}

enum Frame {
    Enter(PathId),
    Exit(PathId),
}

struct Walker<'p> {
    pipeline: &'p mut PluginPipeline,
    tree: Tree,
    storage: SharedStorage,
    visited: HashSet<ModelKey>,
    related: VecDeque<NodeId>,
    trace: Option<Vec<String>>,
}

impl<'p> Walker<'p> {
    fn new(
        pipeline: &'p mut PluginPipeline,
        tree: Tree,
        storage: SharedStorage,
        trace: bool,
    ) -> Self {
        Self {
            pipeline,
            tree,
            storage,
            visited: HashSet::new(),
            related: VecDeque::new(),
            trace: trace.then(Vec::new),
        }
    }

    fn run(mut self) -> Result<(Tree, SharedStorage, Option<Vec<String>>)> {
        let mut stack = vec![Frame::Enter(self.tree.root())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(path) => {
                    let children = self.enter(path)?;
                    stack.push(Frame::Exit(path));
                    stack.extend(children.into_iter().rev().map(Frame::Enter));
                }
                Frame::Exit(path) => {
                    if self.tree.is_root(path) {
                        if let Some(next) = self.related.pop_front() {
                            stack.push(Frame::Exit(path));
                            let related = self.tree.attach(path, next);
                            stack.push(Frame::Enter(related));
                            continue;
                        }
                    }
                    self.exit(path)?;
                }
            }
        }

        Ok((self.tree, self.storage, self.trace))
    }

    /// Scans and enters a node, returning its child paths in visiting order.
    fn enter(&mut self, path: PathId) -> Result<Vec<PathId>> {
        let deps = {
            let cx = ScanContext {
                tree: &self.tree,
                storage: &self.storage,
                path,
            };
            self.pipeline.scan(NodeDependencies::new(path), &cx)?
        };

        self.record("->", path);
        let mut walk = Walk::new(&mut self.tree, &mut self.storage);
        self.pipeline.enter(path, &mut walk)?;

        let (children, related) = deps.into_parts();
        for node in related {
            let identity = node.identity();
            if self.visited.insert(identity) {
                debug!("Queueing related {}", node.label());
                let id = self.tree.add_node(node);
                self.related.push_back(id);
            }
        }

        Ok(children
            .into_iter()
            .map(|child| {
                let id = self.tree.add_node(child);
                self.tree.attach(path, id)
            })
            .collect())
    }

    fn exit(&mut self, path: PathId) -> Result<()> {
        let mut walk = Walk::new(&mut self.tree, &mut self.storage);
        self.pipeline.exit(path, &mut walk)?;
        self.record("<-", path);
        Ok(())
    }

    fn record(&mut self, direction: &str, path: PathId) {
        let line = format!("{} {}", direction, self.tree.display(path));
        debug!("{}", line);
        if let Some(trace) = self.trace.as_mut() {
            trace.push(line);
        }
    }
}
