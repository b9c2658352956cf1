use super::associate;
use crate::error::{Error, Result};
use crate::model::{BaseType, ClassInfo, SignatureKind, SignatureModel};
use crate::node::{AnyNode, EntityNode, NodeDependencies, PathId, TypeSignatureNode};
use crate::openapi::Schema;
use crate::plugin::{Plugin, PluginId, ScanContext, Walk};
use crate::storage::SharedStorage;
use log::debug;
use std::borrow::Cow;
use std::rc::Rc;

/// Resolves type signatures into schemas.
///
/// Type arguments become child signatures; classes found in the registry
/// become related entities referenced through `$ref`.
pub struct TypeSignaturePlugin;

impl Plugin for TypeSignaturePlugin {
    fn id(&self) -> PluginId {
        "type-signature"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        let deps = match cx.node() {
            AnyNode::TypeSignature(node) => {
                let signature = node.source();
                if let SignatureKind::Unsupported(description) = &signature.kind {
                    return Err(Error::unsupported(
                        description.clone(),
                        "type has no schema representation",
                    ));
                }
                let deps = deps.append_children(
                    signature
                        .type_arguments()
                        .into_iter()
                        .map(|argument| TypeSignatureNode::of(argument.clone())),
                );
                match resolve_entity(signature, cx.storage) {
                    Some(class) => deps.append_related(EntityNode::of(class)),
                    None => deps,
                }
            }
            AnyNode::CompositeTypeSignature(node) => deps.append_children(
                node.source()
                    .iter()
                    .map(|signature| TypeSignatureNode::of(signature.clone())),
            ),
            _ => deps,
        };

        let Some(class) = enclosing_class(cx) else {
            return Ok(deps);
        };
        Ok(deps.flat_map_children(|child| match child {
            AnyNode::TypeSignature(node) => {
                let replaced = match node.process_type(|s| substitute_self(s, &class.name)) {
                    Cow::Owned(replaced) => Some(replaced),
                    Cow::Borrowed(_) => None,
                };
                Some(AnyNode::TypeSignature(replaced.unwrap_or(node)))
            }
            other => Some(other),
        }))
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let schema = match walk.node(path) {
            AnyNode::TypeSignature(node) => base_schema(node.source(), walk.storage),
            AnyNode::CompositeTypeSignature(_) => Schema::any_of(Vec::new()),
            _ => return Ok(()),
        };
        walk.node_mut(path).set_schema(schema);
        associate(path, walk);
        Ok(())
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let children: Vec<Schema> = walk
            .tree
            .child_nodes(path)
            .filter_map(|node| node.schema())
            .cloned()
            .collect();

        let schema = match walk.node(path) {
            AnyNode::TypeSignature(node) => fold_arguments(node.source(), node.target(), children),
            AnyNode::CompositeTypeSignature(_) => Schema::any_of(children),
            _ => return Ok(()),
        };
        walk.node_mut(path).set_schema(schema);
        Ok(())
    }
}

/// Class of the nearest endpoint or entity at or above the scanned node
fn enclosing_class<'a>(cx: &ScanContext<'a>) -> Option<&'a Rc<ClassInfo>> {
    if let Some(class) = cx.node().class() {
        return Some(class);
    }
    let tree = cx.tree;
    tree.find_ancestor(cx.path, |node| node.class().is_some())
        .and_then(|ancestor| tree.node(ancestor).class())
}

/// Replaces `Self` anywhere in the signature; unchanged signatures keep their `Rc`.
fn substitute_self(signature: &Rc<SignatureModel>, class: &str) -> Rc<SignatureModel> {
    match &signature.kind {
        SignatureKind::SelfType => SignatureModel::annotated(
            SignatureKind::Class {
                name: class.to_string(),
                type_arguments: Vec::new(),
            },
            signature.annotations.clone(),
        ),
        _ => SignatureModel::map_arguments(signature, |argument| substitute_self(argument, class)),
    }
}

/// What a class reference in a signature stands for
enum ClassReference {
    Entity(Rc<ClassInfo>),
    WellKnown(Schema),
    Unknown,
}

/// Exact class names first, then well-known types, then the registry's
/// simple-name fallback.
fn classify(name: &str, storage: &SharedStorage) -> ClassReference {
    if let Some(class) = storage.registry.get(name) {
        return ClassReference::Entity(class.clone());
    }
    if let Some(schema) = well_known_schema(name) {
        return ClassReference::WellKnown(schema);
    }
    match storage.resolve_class(name) {
        Some(class) => ClassReference::Entity(class),
        None => ClassReference::Unknown,
    }
}

fn resolve_entity(signature: &SignatureModel, storage: &SharedStorage) -> Option<Rc<ClassInfo>> {
    match classify(signature.class_name()?, storage) {
        ClassReference::Entity(class) => Some(class),
        ClassReference::WellKnown(_) | ClassReference::Unknown => None,
    }
}

/// Types from std and common crates that serialize as plain JSON values.
fn well_known_schema(name: &str) -> Option<Schema> {
    let simple = name.rsplit("::").next().unwrap_or(name);
    let schema = match simple {
        "Uuid" => Schema::of_type("string", Some("uuid")),
        "NaiveDate" => Schema::of_type("string", Some("date")),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "SystemTime" => {
            Schema::of_type("string", Some("date-time"))
        }
        "PathBuf" | "Path" | "Url" => Schema::of_type("string", None),
        "Value" => Schema::object(),
        _ => return None,
    };
    Some(schema)
}

fn base_type_schema(base: BaseType) -> Schema {
    match base {
        BaseType::String | BaseType::Char => Schema::of_type("string", None),
        BaseType::I8 | BaseType::I16 | BaseType::I32 => Schema::of_type("integer", Some("int32")),
        BaseType::U8 | BaseType::U16 | BaseType::U32 => Schema::of_type("integer", Some("int32")),
        BaseType::I64 | BaseType::I128 | BaseType::Isize => {
            Schema::of_type("integer", Some("int64"))
        }
        BaseType::U64 | BaseType::U128 | BaseType::Usize => {
            Schema::of_type("integer", Some("int64"))
        }
        BaseType::F32 => Schema::of_type("number", Some("float")),
        BaseType::F64 => Schema::of_type("number", Some("double")),
        BaseType::Bool => Schema::of_type("boolean", None),
        BaseType::Unit => Schema::default(),
    }
}

fn base_schema(signature: &SignatureModel, storage: &SharedStorage) -> Schema {
    match &signature.kind {
        SignatureKind::Base(base) => base_type_schema(*base),
        SignatureKind::Class { name, .. } => match classify(name, storage) {
            ClassReference::Entity(class) => Schema::reference(&class.name),
            ClassReference::WellKnown(schema) => schema,
            ClassReference::Unknown => {
                debug!("Type `{}` is not a known class, describing it as an object", name);
                Schema::object()
            }
        },
        SignatureKind::Array(_) => Schema::array(Schema::default()),
        SignatureKind::Map(_, _) => Schema::map(Schema::default()),
        SignatureKind::Optional(_) => Schema::default(),
        SignatureKind::SelfType
        | SignatureKind::TypeVariable(_)
        | SignatureKind::Unsupported(_) => Schema::object(),
    }
}

/// Combines the base schema with the schemas of the signature's type arguments.
fn fold_arguments(signature: &SignatureModel, base: &Schema, children: Vec<Schema>) -> Schema {
    let mut children = children.into_iter();
    match &signature.kind {
        SignatureKind::Optional(_) => children.next().unwrap_or_else(Schema::object),
        SignatureKind::Array(_) => Schema::array(children.next().unwrap_or_else(Schema::object)),
        SignatureKind::Map(_, _) => Schema::map(children.nth(1).unwrap_or_else(Schema::object)),
        _ => base.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::model::{ClassRegistry, FieldInfo};
    use crate::node::{EndpointNode, FieldNode, RootNode, Tree};
    use crate::openapi::OpenApi;

    fn storage() -> SharedStorage {
        let registry: ClassRegistry = vec![ClassInfo::new("crate::model::User").build()]
            .into_iter()
            .collect();
        SharedStorage::new(ParserConfig::default(), registry)
    }

    fn scan_labels(node: AnyNode, storage: &SharedStorage) -> Result<(Vec<String>, Vec<String>)> {
        let mut tree = Tree::new(RootNode::of(Vec::new(), OpenApi::default()));
        let id = tree.add_node(node);
        let path = tree.attach(tree.root(), id);
        let cx = ScanContext {
            tree: &tree,
            storage,
            path,
        };
        let (children, related) = TypeSignaturePlugin
            .scan(NodeDependencies::new(path), &cx)?
            .into_parts();
        Ok((
            children.iter().map(AnyNode::label).collect(),
            related.iter().map(AnyNode::label).collect(),
        ))
    }

    #[test]
    fn test_scan_emits_arguments_and_related_entity() {
        let signature = SignatureModel::map(
            SignatureModel::string(),
            SignatureModel::array(SignatureModel::class("User")),
        );
        let (children, related) =
            scan_labels(TypeSignatureNode::of(signature).into(), &storage()).unwrap();
        assert_eq!(children, vec!["TypeSignature(String)", "TypeSignature(Vec<User>)"]);
        assert!(related.is_empty());

        let (children, related) =
            scan_labels(TypeSignatureNode::of(SignatureModel::class("User")).into(), &storage())
                .unwrap();
        assert!(children.is_empty());
        assert_eq!(related, vec!["Entity(User)"]);
    }

    #[test]
    fn test_well_known_types_are_not_entities() {
        let registry: ClassRegistry =
            vec![ClassInfo::new("crate::Uuid").build()].into_iter().collect();
        let storage = SharedStorage::new(ParserConfig::default(), registry);
        let signature = SignatureModel::class("Uuid");
        let (_, related) = scan_labels(TypeSignatureNode::of(signature).into(), &storage).unwrap();
        assert!(related.is_empty());
        assert_eq!(
            base_schema(&SignatureModel::class("uuid::Uuid"), &storage).format.as_deref(),
            Some("uuid")
        );
    }

    #[test]
    fn test_declared_classes_shadow_well_known_names() {
        let registry: ClassRegistry = vec![
            ClassInfo::new("crate::ledger::Value").build(),
            ClassInfo::new("crate::routes::Path").build(),
        ]
        .into_iter()
        .collect();
        let storage = SharedStorage::new(ParserConfig::default(), registry);

        let signature = SignatureModel::class("crate::ledger::Value");
        let (_, related) =
            scan_labels(TypeSignatureNode::of(signature.clone()).into(), &storage).unwrap();
        assert_eq!(related, vec!["Entity(Value)"]);
        assert_eq!(
            base_schema(&signature, &storage).referenced_component(),
            Some("crate::ledger::Value")
        );

        let path = base_schema(&SignatureModel::class("crate::routes::Path"), &storage);
        assert_eq!(path.referenced_component(), Some("crate::routes::Path"));
        let external = base_schema(&SignatureModel::class("std::path::Path"), &storage);
        assert_eq!(external.schema_type.as_deref(), Some("string"));
    }

    #[test]
    fn test_unsupported_signature_is_fatal() {
        let signature =
            SignatureModel::of(SignatureKind::Unsupported("fn(i32) -> i32".to_string()));
        let err = scan_labels(TypeSignatureNode::of(signature).into(), &storage()).unwrap_err();
        assert!(err.to_string().contains("fn(i32) -> i32"));
    }

    #[test]
    fn test_self_is_replaced_by_enclosing_class() {
        let class = ClassInfo::new("crate::model::Tree")
            .with_field("children", SignatureModel::array(SignatureModel::self_type()))
            .build();
        let mut tree = Tree::new(RootNode::of(Vec::new(), OpenApi::default()));
        let entity = tree.add_node(EndpointNode::of(class.clone()).into());
        let entity = tree.attach(tree.root(), entity);
        let field = tree.add_node(FieldNode::of(class.fields[0].clone()).into());
        let field = tree.attach(entity, field);

        let storage = storage();
        let cx = ScanContext {
            tree: &tree,
            storage: &storage,
            path: field,
        };
        let deps = NodeDependencies::new(field)
            .append_child(TypeSignatureNode::of(class.fields[0].signature.clone()));
        let deps = TypeSignaturePlugin.scan(deps, &cx).unwrap();
        assert_eq!(
            deps.children()[0].label(),
            "TypeSignature(Vec<crate::model::Tree>)"
        );
    }

    #[test]
    fn test_substitution_without_self_keeps_node() {
        let signature = SignatureModel::array(SignatureModel::string());
        let node = TypeSignatureNode::of(signature.clone());
        let processed = node.process_type(|s| substitute_self(s, "crate::Other"));
        assert!(matches!(processed, Cow::Borrowed(_)));

        let field = FieldInfo::new("crate::Other", "names", signature.clone());
        assert!(Rc::ptr_eq(&substitute_self(&field.signature, "crate::Other"), &signature));
    }

    #[test]
    fn test_base_schemas() {
        let storage = storage();
        let int = base_schema(&SignatureModel::base(BaseType::U64), &storage);
        assert_eq!(int.format.as_deref(), Some("int64"));
        let user = base_schema(&SignatureModel::class("User"), &storage);
        assert_eq!(user.referenced_component(), Some("crate::model::User"));
        let unknown = base_schema(&SignatureModel::class("Foreign"), &storage);
        assert_eq!(unknown.schema_type.as_deref(), Some("object"));
    }

    #[test]
    fn test_fold_arguments() {
        let string = Schema::of_type("string", None);
        let map =
            SignatureModel::map(SignatureModel::string(), SignatureModel::base(BaseType::Bool));
        let folded = fold_arguments(
            &map,
            &Schema::map(Schema::default()),
            vec![string.clone(), Schema::of_type("boolean", None)],
        );
        assert_eq!(
            folded.additional_properties.unwrap().schema_type.as_deref(),
            Some("boolean")
        );

        let optional = SignatureModel::optional(SignatureModel::string());
        assert_eq!(fold_arguments(&optional, &Schema::default(), vec![string.clone()]), string);
    }
}
