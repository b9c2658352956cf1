//! Arena of visited nodes and the paths that lead to them.
//!
//! Nodes live in one arena indexed by [`NodeId`]; a [`PathId`] names a position in
//! the traversal tree (a node plus the chain of ancestors above it). The same node
//! may be reachable through several paths. Paths are never removed, so ids stay
//! valid for the whole traversal.

use super::{AnyNode, RootNode};
use crate::openapi::OpenApi;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl PathId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct PathEntry {
    node: NodeId,
    /// The root entry is its own parent
    parent: PathId,
    children: Vec<PathId>,
    depth: usize,
    /// Memoized from the parent's hash and this node's label
    hash: u64,
}

/// Traversal tree rooted at a single [`RootNode`].
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<AnyNode>,
    paths: Vec<PathEntry>,
}

impl Tree {
    pub fn new(root: RootNode) -> Self {
        let root = AnyNode::Root(root);
        let hash = label_hash(0, &root.label());
        Self {
            nodes: vec![root],
            paths: vec![PathEntry {
                node: NodeId(0),
                parent: PathId(0),
                children: Vec::new(),
                depth: 0,
                hash,
            }],
        }
    }

    pub fn root(&self) -> PathId {
        PathId(0)
    }

    /// Stores a node without placing it in the tree yet.
    pub fn add_node(&mut self, node: AnyNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Places an existing node under `parent`, creating a new path.
    pub fn attach(&mut self, parent: PathId, node: NodeId) -> PathId {
        let parent_entry = &self.paths[parent.0];
        let depth = parent_entry.depth + 1;
        let hash = label_hash(parent_entry.hash, &self.nodes[node.0].label());
        let id = PathId(self.paths.len());
        self.paths.push(PathEntry {
            node,
            parent,
            children: Vec::new(),
            depth,
            hash,
        });
        self.paths[parent.0].children.push(id);
        id
    }

    pub fn node_id(&self, path: PathId) -> NodeId {
        self.paths[path.0].node
    }

    pub fn node(&self, path: PathId) -> &AnyNode {
        &self.nodes[self.paths[path.0].node.0]
    }

    pub fn node_mut(&mut self, path: PathId) -> &mut AnyNode {
        let id = self.paths[path.0].node;
        &mut self.nodes[id.0]
    }

    pub fn node_by_id(&self, id: NodeId) -> &AnyNode {
        &self.nodes[id.0]
    }

    pub fn node_by_id_mut(&mut self, id: NodeId) -> &mut AnyNode {
        &mut self.nodes[id.0]
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self, path: PathId) -> Option<PathId> {
        if self.is_root(path) {
            None
        } else {
            Some(self.paths[path.0].parent)
        }
    }

    pub fn parent_node(&self, path: PathId) -> Option<&AnyNode> {
        self.parent(path).map(|parent| self.node(parent))
    }

    pub fn is_root(&self, path: PathId) -> bool {
        path.0 == 0
    }

    pub fn depth(&self, path: PathId) -> usize {
        self.paths[path.0].depth
    }

    /// Child paths in attachment order
    pub fn children(&self, path: PathId) -> &[PathId] {
        &self.paths[path.0].children
    }

    pub fn child_nodes(&self, path: PathId) -> impl Iterator<Item = &AnyNode> + '_ {
        self.children(path).iter().map(move |child| self.node(*child))
    }

    /// Ancestor paths, nearest first, ending with the root.
    pub fn ancestors(&self, path: PathId) -> Vec<PathId> {
        let mut ancestors = Vec::with_capacity(self.depth(path));
        let mut current = path;
        while let Some(parent) = self.parent(current) {
            ancestors.push(parent);
            current = parent;
        }
        ancestors
    }

    /// Nearest ancestor whose node satisfies `predicate`.
    pub fn find_ancestor<F>(&self, path: PathId, predicate: F) -> Option<PathId>
    where
        F: Fn(&AnyNode) -> bool,
    {
        self.ancestors(path)
            .into_iter()
            .find(|ancestor| predicate(self.node(*ancestor)))
    }

    pub fn root_document(&self) -> &OpenApi {
        match &self.nodes[0] {
            AnyNode::Root(root) => root.target(),
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub fn root_document_mut(&mut self) -> &mut OpenApi {
        match &mut self.nodes[0] {
            AnyNode::Root(root) => root.target_mut(),
            _ => unreachable!("node 0 is always the root"),
        }
    }

    /// Two paths are equal when they walk through equal nodes up to the root.
    pub fn path_eq(&self, a: PathId, b: PathId) -> bool {
        if a == b {
            return true;
        }
        let (mut a, mut b) = (a, b);
        loop {
            let (left, right) = (&self.paths[a.0], &self.paths[b.0]);
            if left.hash != right.hash || left.depth != right.depth {
                return false;
            }
            if left.node != right.node && self.nodes[left.node.0] != self.nodes[right.node.0] {
                return false;
            }
            match (self.parent(a), self.parent(b)) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    /// Hash consistent with [`Tree::path_eq`]
    pub fn path_hash(&self, path: PathId) -> u64 {
        self.paths[path.0].hash
    }

    /// Slash separated labels from the root, e.g. `Root/Endpoint(E)/Field(foo)`.
    pub fn display(&self, path: PathId) -> String {
        let mut labels: Vec<String> = self
            .ancestors(path)
            .into_iter()
            .map(|ancestor| self.node(ancestor).label())
            .collect();
        labels.reverse();
        labels.push(self.node(path).label());
        labels.join("/")
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }
}

fn label_hash(parent: u64, label: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    parent.hash(&mut hasher);
    label.hash(&mut hasher);
    hasher.finish()
}
