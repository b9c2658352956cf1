use super::{associate, first_child_schema};
use crate::error::{Error, Result};
use crate::model::{ClassInfo, ClassKind};
use crate::node::{
    AnyNode, CompositeTypeSignatureNode, FieldNode, NodeDependencies, PathId, Tree,
    TypeSignatureNode,
};
use crate::openapi::{Properties, Schema};
use crate::plugin::{Plugin, PluginId, ScanContext, Walk};
use log::{debug, warn};

/// Builds component schemas for entity classes.
pub struct EntityPlugin;

impl Plugin for EntityPlugin {
    fn id(&self) -> PluginId {
        "entity"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        let AnyNode::Entity(entity) = cx.node() else {
            return Ok(deps);
        };
        let class = entity.source();
        match &class.kind {
            ClassKind::Struct => {
                let fields = class.fields.iter().filter(|field| {
                    if field.synthetic || field.serde.skip {
                        debug!("Skipping field {}::{}", class.name, field.name);
                        return false;
                    }
                    if field.serde.flatten {
                        warn!(
                            "Field {}::{} is flattened on the wire but described \
                             as a nested property",
                            class.name, field.name
                        );
                    }
                    true
                });
                Ok(deps.append_children(fields.map(|field| FieldNode::of(field.clone()))))
            }
            ClassKind::Newtype(inner) => {
                Ok(deps.append_child(TypeSignatureNode::of(inner.clone())))
            }
            ClassKind::UnitEnum { .. } => Ok(deps),
            ClassKind::UnionEnum { variants } => {
                Ok(deps.append_child(CompositeTypeSignatureNode::of(
                    variants.iter().map(|v| v.signature.clone()).collect(),
                )))
            }
            ClassKind::Unsupported { reason } => {
                Err(Error::unsupported(class.name.clone(), reason.clone()))
            }
        }
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        if matches!(walk.node(path), AnyNode::Entity(_)) {
            associate(path, walk);
        }
        Ok(())
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let AnyNode::Entity(entity) = walk.tree.node(path) else {
            return Ok(());
        };
        let class = entity.source().clone();
        let schema = entity_schema(walk.tree, path, &class)?;

        if let AnyNode::Entity(entity) = walk.tree.node_mut(path) {
            entity.set_target(schema.clone());
        }
        let schemas = &mut walk.tree.root_document_mut().components.schemas;
        if schemas.contains_key(&class.name) {
            return Err(Error::structural(format!(
                "component schema {} is already set",
                class.name
            )));
        }
        debug!("Adding component schema {}", class.name);
        schemas.insert(class.name.clone(), schema);
        Ok(())
    }
}

fn entity_schema(tree: &Tree, path: PathId, class: &ClassInfo) -> Result<Schema> {
    let schema = match &class.kind {
        ClassKind::Struct => {
            let mut properties = Properties::new();
            let mut required = Vec::new();
            for &child in tree.children(path) {
                let AnyNode::Field(field) = tree.node(child) else {
                    continue;
                };
                let schema = first_child_schema(tree, child).unwrap_or_default();
                if !field.source().signature.is_optional() && !schema.is_nullable() {
                    required.push(field.target().clone());
                }
                if properties.contains_key(field.target()) {
                    return Err(Error::structural(format!(
                        "{} has more than one field serialized as `{}`",
                        class.name,
                        field.target()
                    )));
                }
                properties.insert(field.target().clone(), schema);
            }
            let mut schema = Schema::object_with(properties);
            if !required.is_empty() {
                schema.required = Some(required);
            }
            schema
        }
        ClassKind::UnitEnum { variants } => Schema::string_enum(variants.clone()),
        ClassKind::Newtype(_) | ClassKind::UnionEnum { .. } => {
            first_child_schema(tree, path).unwrap_or_else(Schema::object)
        }
        ClassKind::Unsupported { .. } => Schema::object(),
    };
    Ok(schema)
}

/// Emits the type signature of each entity field.
pub struct FieldPlugin;

impl Plugin for FieldPlugin {
    fn id(&self) -> PluginId {
        "field"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        match cx.node() {
            AnyNode::Field(field) => {
                Ok(deps.append_child(TypeSignatureNode::of(field.source().signature.clone())))
            }
            _ => Ok(deps),
        }
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        if matches!(walk.node(path), AnyNode::Field(_)) {
            associate(path, walk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldInfo, SerdeAttributes, SignatureModel, VariantInfo};
    use crate::node::{EntityNode, RootNode};
    use crate::openapi::OpenApi;
    use crate::storage::SharedStorage;
    use std::rc::Rc;

    fn scan(class: ClassInfo) -> Result<Vec<String>> {
        let mut tree = Tree::new(RootNode::of(Vec::new(), OpenApi::default()));
        let node = tree.add_node(EntityNode::of(class.build()).into());
        let path = tree.attach(tree.root(), node);
        let storage = SharedStorage::default();
        let cx = ScanContext {
            tree: &tree,
            storage: &storage,
            path,
        };
        let deps = EntityPlugin.scan(NodeDependencies::new(path), &cx)?;
        Ok(deps.children().iter().map(AnyNode::label).collect())
    }

    #[test]
    fn test_struct_fields_in_declaration_order() {
        let class = ClassInfo::new("crate::User")
            .with_field("id", SignatureModel::string())
            .with_field_info(
                FieldInfo::new("crate::User", "marker", SignatureModel::class("PhantomData"))
                    .synthetic(),
            )
            .with_field_info(
                FieldInfo::new("crate::User", "cache", SignatureModel::string()).with_serde(
                    SerdeAttributes {
                        skip: true,
                        ..SerdeAttributes::default()
                    },
                ),
            )
            .with_field("name", SignatureModel::string());

        assert_eq!(scan(class).unwrap(), vec!["Field(id)", "Field(name)"]);
    }

    #[test]
    fn test_union_enum_emits_composite() {
        let class = ClassInfo::new("crate::Shape").with_kind(ClassKind::UnionEnum {
            variants: vec![
                VariantInfo {
                    name: "Circle".to_string(),
                    signature: SignatureModel::class("Circle"),
                },
                VariantInfo {
                    name: "Square".to_string(),
                    signature: SignatureModel::class("Square"),
                },
            ],
        });
        assert_eq!(
            scan(class).unwrap(),
            vec!["CompositeTypeSignature(Circle | Square)"]
        );
    }

    #[test]
    fn test_unsupported_shape_is_fatal() {
        let class = ClassInfo::new("crate::Mixed").with_kind(ClassKind::Unsupported {
            reason: "variant `Point` has named fields".to_string(),
        });
        let err = scan(class).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedShape { ref type_name, .. } if type_name == "crate::Mixed"
        ));
    }

    #[test]
    fn test_exit_writes_component_once() {
        let class = ClassInfo::new("crate::Status")
            .with_kind(ClassKind::UnitEnum {
                variants: vec!["Active".to_string(), "Disabled".to_string()],
            })
            .build();
        let mut tree = Tree::new(RootNode::of(Vec::new(), OpenApi::default()));
        let mut storage = SharedStorage::default();
        let node = tree.add_node(EntityNode::of(class.clone()).into());
        let first = tree.attach(tree.root(), node);
        let node = tree.add_node(EntityNode::of(class).into());
        let second = tree.attach(tree.root(), node);

        let mut walk = Walk::new(&mut tree, &mut storage);
        EntityPlugin.exit(first, &mut walk).unwrap();
        let err = EntityPlugin.exit(second, &mut walk).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));

        let schema = &tree.root_document().components.schemas["crate::Status"];
        assert_eq!(
            schema.enum_values,
            Some(vec!["Active".to_string(), "Disabled".to_string()])
        );
    }

    /// Entity with one field node per class field, each typed as a string.
    fn entity_tree(class: &Rc<ClassInfo>) -> (Tree, PathId) {
        let mut tree = Tree::new(RootNode::of(Vec::new(), OpenApi::default()));
        let node = tree.add_node(EntityNode::of(class.clone()).into());
        let entity = tree.attach(tree.root(), node);
        for field in &class.fields {
            let node = tree.add_node(FieldNode::of(field.clone()).into());
            let field_path = tree.attach(entity, node);
            let mut signature = TypeSignatureNode::of(field.signature.clone());
            signature.set_target(Schema::of_type("string", None));
            let node = tree.add_node(signature.into());
            tree.attach(field_path, node);
        }
        (tree, entity)
    }

    #[test]
    fn test_struct_schema_marks_required_fields() {
        let class = ClassInfo::new("crate::User")
            .with_field("id", SignatureModel::string())
            .with_field("nickname", SignatureModel::optional(SignatureModel::string()))
            .build();
        let (tree, entity) = entity_tree(&class);

        let schema = entity_schema(&tree, entity, &class).unwrap();
        assert_eq!(schema.properties.as_ref().unwrap().names(), vec!["id", "nickname"]);
        assert_eq!(schema.required, Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_fields_renamed_onto_one_name_are_rejected() {
        let renamed = SerdeAttributes {
            rename: Some("name".to_string()),
            ..SerdeAttributes::default()
        };
        let class = ClassInfo::new("crate::User")
            .with_field("name", SignatureModel::string())
            .with_field_info(
                FieldInfo::new("crate::User", "title", SignatureModel::string())
                    .with_serde(renamed),
            )
            .build();
        let (tree, entity) = entity_tree(&class);

        let err = entity_schema(&tree, entity, &class).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
        assert!(err.to_string().contains("crate::User"));
        assert!(err.to_string().contains("`name`"));
    }
}
