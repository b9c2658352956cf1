//! Nodes pair an immutable source model with the schema fragment being built for it.
//!
//! There is exactly one node type per syntactic role. Each is an alias of the
//! generic [`Node`] with its own factory, and [`AnyNode`] closes over all of
//! them so plugins dispatch with exhaustive `match`es.

pub mod dependencies;
pub mod path;

pub use dependencies::NodeDependencies;
pub use path::{NodeId, PathId, Tree};

use crate::model::{
    AnnotationInfo, ClassInfo, FieldInfo, MethodInfo, ModelKey, PackageInfo, ParameterInfo,
    SignatureModel,
};
use crate::openapi::{OpenApi, PathItem, Schema, Tag};
use std::borrow::Cow;
use std::rc::Rc;

/// A source model and its target schema fragment.
///
/// Equality covers both halves and ignores where the node sits in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<S, T> {
    source: S,
    target: T,
}

impl<S, T> Node<S, T> {
    fn new(source: S, target: T) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Replaces the target, returning the previous one.
    pub fn set_target(&mut self, target: T) -> T {
        std::mem::replace(&mut self.target, target)
    }
}

pub type RootNode = Node<Rc<Vec<Rc<ClassInfo>>>, OpenApi>;
pub type EndpointNode = Node<Rc<ClassInfo>, Tag>;
pub type EntityNode = Node<Rc<ClassInfo>, Schema>;
pub type MethodNode = Node<Rc<MethodInfo>, PathItem>;
pub type FieldNode = Node<Rc<FieldInfo>, String>;
pub type ParameterNode = Node<Rc<ParameterInfo>, String>;
pub type TypeSignatureNode = Node<Rc<SignatureModel>, Schema>;
pub type CompositeTypeSignatureNode = Node<Vec<Rc<SignatureModel>>, Schema>;

impl Node<Rc<Vec<Rc<ClassInfo>>>, OpenApi> {
    pub fn of(classes: Vec<Rc<ClassInfo>>, document: OpenApi) -> Self {
        Node::new(Rc::new(classes), document)
    }
}

impl Node<Rc<ClassInfo>, Tag> {
    /// Endpoint named after the class until a plugin says otherwise
    pub fn of(class: Rc<ClassInfo>) -> Self {
        let tag = Tag::new(class.simple_name.clone());
        Node::new(class, tag)
    }
}

impl Node<Rc<ClassInfo>, Schema> {
    pub fn of(class: Rc<ClassInfo>) -> Self {
        Node::new(class, Schema::object())
    }
}

impl Node<Rc<MethodInfo>, PathItem> {
    pub fn of(method: Rc<MethodInfo>) -> Self {
        Node::new(method, PathItem::default())
    }
}

impl Node<Rc<FieldInfo>, String> {
    pub fn of(field: Rc<FieldInfo>) -> Self {
        let name = field.serialized_name().to_string();
        Node::new(field, name)
    }
}

impl Node<Rc<ParameterInfo>, String> {
    pub fn of(parameter: Rc<ParameterInfo>) -> Self {
        let name = parameter.effective_name();
        Node::new(parameter, name)
    }
}

impl Node<Rc<SignatureModel>, Schema> {
    pub fn of(signature: Rc<SignatureModel>) -> Self {
        Node::new(signature, Schema::default())
    }

    /// Applies a type substitution to the source signature.
    ///
    /// When `f` hands back the same signature the node itself is returned
    /// borrowed, so callers can tell "nothing changed" by identity.
    pub fn process_type<F>(&self, f: F) -> Cow<'_, Self>
    where
        F: FnOnce(&Rc<SignatureModel>) -> Rc<SignatureModel>,
    {
        let processed = f(&self.source);
        if Rc::ptr_eq(&processed, &self.source) || processed == self.source {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(Self::of(processed))
        }
    }
}

impl Node<Vec<Rc<SignatureModel>>, Schema> {
    pub fn of(signatures: Vec<Rc<SignatureModel>>) -> Self {
        Node::new(signatures, Schema::any_of(Vec::new()))
    }

    /// Annotations of every constituent, deduplicated in first-seen order.
    pub fn annotations(&self) -> Vec<&AnnotationInfo> {
        let mut seen: Vec<&AnnotationInfo> = Vec::new();
        for annotation in self.source.iter().flat_map(|s| s.annotations.iter()) {
            if !seen.contains(&annotation) {
                seen.push(annotation);
            }
        }
        seen
    }
}

/// Every node kind the traversal knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyNode {
    Root(RootNode),
    Endpoint(EndpointNode),
    Entity(EntityNode),
    Method(MethodNode),
    Field(FieldNode),
    Parameter(ParameterNode),
    TypeSignature(TypeSignatureNode),
    CompositeTypeSignature(CompositeTypeSignatureNode),
}

impl AnyNode {
    /// Short description used in traversal traces, e.g. `Field(name)`.
    pub fn label(&self) -> String {
        match self {
            AnyNode::Root(_) => "Root".to_string(),
            AnyNode::Endpoint(node) => format!("Endpoint({})", node.source().simple_name),
            AnyNode::Entity(node) => format!("Entity({})", node.source().simple_name),
            AnyNode::Method(node) => format!("Method({})", node.source().name),
            AnyNode::Field(node) => format!("Field({})", node.source().name),
            AnyNode::Parameter(node) => {
                format!("Parameter({})", node.source().effective_name())
            }
            AnyNode::TypeSignature(node) => format!("TypeSignature({})", node.source()),
            AnyNode::CompositeTypeSignature(node) => {
                let parts: Vec<String> = node.source().iter().map(|s| s.to_string()).collect();
                format!("CompositeTypeSignature({})", parts.join(" | "))
            }
        }
    }

    /// Identity of the source model, used to deduplicate related nodes.
    pub fn identity(&self) -> ModelKey {
        match self {
            AnyNode::Root(_) => ModelKey::Root,
            AnyNode::Endpoint(node) => ModelKey::Endpoint(node.source().name.clone()),
            AnyNode::Entity(node) => ModelKey::Entity(node.source().name.clone()),
            AnyNode::Method(node) => ModelKey::Method {
                owner: node.source().owner.clone(),
                name: node.source().name.clone(),
            },
            AnyNode::Field(node) => ModelKey::Field {
                owner: node.source().owner.clone(),
                name: node.source().name.clone(),
            },
            AnyNode::Parameter(node) => ModelKey::Parameter {
                owner: node.source().owner.clone(),
                method: node.source().method.clone(),
                index: node.source().index,
            },
            AnyNode::TypeSignature(node) => ModelKey::signature(node.source()),
            AnyNode::CompositeTypeSignature(node) => ModelKey::Composite(
                node.source()
                    .iter()
                    .map(|s| Rc::as_ptr(s) as usize)
                    .collect(),
            ),
        }
    }

    /// Annotations declared directly on the source model.
    pub fn annotations(&self) -> Vec<&AnnotationInfo> {
        match self {
            AnyNode::Root(_) => Vec::new(),
            AnyNode::Endpoint(node) => node.source().annotations.iter().collect(),
            AnyNode::Entity(node) => node.source().annotations.iter().collect(),
            AnyNode::Method(node) => node.source().annotations.iter().collect(),
            AnyNode::Field(node) => node.source().annotations.iter().collect(),
            AnyNode::Parameter(node) => node.source().annotations.iter().collect(),
            AnyNode::TypeSignature(node) => node.source().annotations.iter().collect(),
            AnyNode::CompositeTypeSignature(node) => node.annotations(),
        }
    }

    /// The class model for class-bearing nodes
    pub fn class(&self) -> Option<&Rc<ClassInfo>> {
        match self {
            AnyNode::Endpoint(node) => Some(node.source()),
            AnyNode::Entity(node) => Some(node.source()),
            _ => None,
        }
    }

    pub fn package(&self) -> Option<&PackageInfo> {
        self.class().map(|class| class.package.as_ref())
    }

    /// The schema fragment, for nodes whose target is a schema
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            AnyNode::Entity(node) => Some(node.target()),
            AnyNode::TypeSignature(node) => Some(node.target()),
            AnyNode::CompositeTypeSignature(node) => Some(node.target()),
            AnyNode::Root(_)
            | AnyNode::Endpoint(_)
            | AnyNode::Method(_)
            | AnyNode::Field(_)
            | AnyNode::Parameter(_) => None,
        }
    }

    /// Replaces the schema target of a schema-bearing node.
    ///
    /// Returns `false` when the node kind has no schema target.
    pub fn set_schema(&mut self, schema: Schema) -> bool {
        match self {
            AnyNode::Entity(node) => {
                node.set_target(schema);
                true
            }
            AnyNode::TypeSignature(node) => {
                node.set_target(schema);
                true
            }
            AnyNode::CompositeTypeSignature(node) => {
                node.set_target(schema);
                true
            }
            AnyNode::Root(_)
            | AnyNode::Endpoint(_)
            | AnyNode::Method(_)
            | AnyNode::Field(_)
            | AnyNode::Parameter(_) => false,
        }
    }
}

impl From<RootNode> for AnyNode {
    fn from(node: RootNode) -> Self {
        AnyNode::Root(node)
    }
}

impl From<EndpointNode> for AnyNode {
    fn from(node: EndpointNode) -> Self {
        AnyNode::Endpoint(node)
    }
}

impl From<EntityNode> for AnyNode {
    fn from(node: EntityNode) -> Self {
        AnyNode::Entity(node)
    }
}

impl From<MethodNode> for AnyNode {
    fn from(node: MethodNode) -> Self {
        AnyNode::Method(node)
    }
}

impl From<FieldNode> for AnyNode {
    fn from(node: FieldNode) -> Self {
        AnyNode::Field(node)
    }
}

impl From<ParameterNode> for AnyNode {
    fn from(node: ParameterNode) -> Self {
        AnyNode::Parameter(node)
    }
}

impl From<TypeSignatureNode> for AnyNode {
    fn from(node: TypeSignatureNode) -> Self {
        AnyNode::TypeSignature(node)
    }
}

impl From<CompositeTypeSignatureNode> for AnyNode {
    fn from(node: CompositeTypeSignatureNode) -> Self {
        AnyNode::CompositeTypeSignature(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseType, SerdeAttributes, SignatureKind};

    #[test]
    fn test_factories_initialize_default_targets() {
        let class = ClassInfo::new("crate::model::User").build();

        let entity = EntityNode::of(class.clone());
        assert_eq!(entity.target().schema_type.as_deref(), Some("object"));

        let endpoint = EndpointNode::of(class);
        assert_eq!(endpoint.target().name, "User");

        let method = MethodNode::of(Rc::new(MethodInfo::new(
            "crate::E",
            "list",
            SignatureModel::unit(),
        )));
        assert!(method.target().post.is_none());
    }

    #[test]
    fn test_field_target_uses_serialized_name() {
        let field = FieldInfo::new("crate::User", "name", SignatureModel::string()).with_serde(
            SerdeAttributes {
                rename: Some("displayName".to_string()),
                ..SerdeAttributes::default()
            },
        );
        let node = FieldNode::of(Rc::new(field));
        assert_eq!(node.target(), "displayName");
        assert_eq!(AnyNode::from(node).label(), "Field(name)");
    }

    #[test]
    fn test_process_type_identity_when_unchanged() {
        let node = TypeSignatureNode::of(SignatureModel::class("User"));
        let processed = node.process_type(Rc::clone);
        match processed {
            Cow::Borrowed(same) => assert!(std::ptr::eq(same, &node)),
            Cow::Owned(_) => panic!("unchanged substitution must not copy the node"),
        }
    }

    #[test]
    fn test_process_type_structurally_equal_is_unchanged() {
        let node = TypeSignatureNode::of(SignatureModel::string());
        let processed = node.process_type(|_| SignatureModel::string());
        assert!(matches!(processed, Cow::Borrowed(_)));
    }

    #[test]
    fn test_process_type_creates_new_node_on_change() {
        let mut node = TypeSignatureNode::of(SignatureModel::self_type());
        node.set_target(Schema::object());

        let processed = node.process_type(|_| SignatureModel::class("crate::User"));
        let processed = processed.into_owned();
        assert_eq!(processed.source().class_name(), Some("crate::User"));
        assert_eq!(processed.target(), &Schema::default());
    }

    #[test]
    fn test_composite_annotations_are_deduplicated() {
        let nullable = AnnotationInfo::new("nullable");
        let nonnull = AnnotationInfo::new("nonnull");
        let node = CompositeTypeSignatureNode::of(vec![
            SignatureModel::annotated(SignatureKind::Base(BaseType::I32), vec![nullable.clone()]),
            SignatureModel::annotated(
                SignatureKind::Base(BaseType::String),
                vec![nonnull.clone(), nullable.clone()],
            ),
        ]);

        let names: Vec<&str> = node.annotations().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["nullable", "nonnull"]);
        assert_eq!(
            AnyNode::from(node).label(),
            "CompositeTypeSignature(i32 | String)"
        );
    }

    #[test]
    fn test_node_equality_ignores_position() {
        let class = ClassInfo::new("crate::model::User").build();
        let first = AnyNode::from(EntityNode::of(class.clone()));
        let second = AnyNode::from(EntityNode::of(class));
        assert_eq!(first, second);
        assert_eq!(first.identity(), ModelKey::Entity("crate::model::User".to_string()));
    }

    #[test]
    fn test_set_schema_only_on_schema_nodes() {
        let mut sig = AnyNode::from(TypeSignatureNode::of(SignatureModel::string()));
        assert!(sig.set_schema(Schema::of_type("string", None)));
        assert_eq!(sig.schema().unwrap().schema_type.as_deref(), Some("string"));

        let field = FieldInfo::new("crate::User", "name", SignatureModel::string());
        let mut field = AnyNode::from(FieldNode::of(Rc::new(field)));
        assert!(!field.set_schema(Schema::object()));
    }
}
