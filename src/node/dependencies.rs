use super::{AnyNode, PathId};

/// What a node leads to, as accumulated by plugins during scan.
///
/// `children` are visited beneath the scanned node. `related` nodes are visited
/// once per traversal at the top level, however many times they are discovered.
/// Every builder consumes `self` and returns the updated value, so one plugin's
/// output is the next plugin's input.
#[derive(Debug, Clone)]
pub struct NodeDependencies {
    path: PathId,
    children: Vec<AnyNode>,
    related: Vec<AnyNode>,
}

impl NodeDependencies {
    pub fn new(path: PathId) -> Self {
        Self {
            path,
            children: Vec::new(),
            related: Vec::new(),
        }
    }

    /// Path of the node being scanned
    pub fn path(&self) -> PathId {
        self.path
    }

    pub fn children(&self) -> &[AnyNode] {
        &self.children
    }

    pub fn related(&self) -> &[AnyNode] {
        &self.related
    }

    pub fn append_child(mut self, node: impl Into<AnyNode>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn append_children<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<AnyNode>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn append_related(mut self, node: impl Into<AnyNode>) -> Self {
        self.related.push(node.into());
        self
    }

    pub fn retain_children<F>(mut self, keep: F) -> Self
    where
        F: FnMut(&AnyNode) -> bool,
    {
        self.children.retain(keep);
        self
    }

    pub fn retain_related<F>(mut self, keep: F) -> Self
    where
        F: FnMut(&AnyNode) -> bool,
    {
        self.related.retain(keep);
        self
    }

    /// Replaces every child with zero or more nodes, keeping relative order.
    pub fn flat_map_children<F, I>(mut self, f: F) -> Self
    where
        F: FnMut(AnyNode) -> I,
        I: IntoIterator<Item = AnyNode>,
    {
        self.children = std::mem::take(&mut self.children)
            .into_iter()
            .flat_map(f)
            .collect();
        self
    }

    pub fn into_parts(self) -> (Vec<AnyNode>, Vec<AnyNode>) {
        (self.children, self.related)
    }
}
