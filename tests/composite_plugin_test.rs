//! Traversal through a chain of single-purpose plugins: one adds members, one
//! replaces a method with hand-picked fields, one removes synthetic entities,
//! and the last writes the collected member names into the document.

use endpoint_openapi_parser::config::ParserConfig;
use endpoint_openapi_parser::error::Result;
use endpoint_openapi_parser::model::{
    AnnotationInfo, ClassInfo, ClassRegistry, FieldInfo, MethodInfo, SignatureModel,
};
use endpoint_openapi_parser::node::{
    AnyNode, EndpointNode, EntityNode, FieldNode, MethodNode, NodeDependencies, PathId,
};
use endpoint_openapi_parser::parser::Parser;
use endpoint_openapi_parser::plugin::composite::CompositePlugin;
use endpoint_openapi_parser::plugin::{Plugin, PluginId, ScanContext, Walk};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::rc::Rc;

const MEMBERS_EXTENSION: &str = "x-members";

/// Endpoints from the root; fields, extra fields, methods and a synthetic
/// entity from each endpoint; methods from related entities.
struct AddPlugin;

impl Plugin for AddPlugin {
    fn id(&self) -> PluginId {
        "add"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        match cx.node() {
            AnyNode::Root(root) => Ok(deps.append_children(
                root.source().iter().map(|c| EndpointNode::of(c.clone())),
            )),
            AnyNode::Endpoint(endpoint) => {
                let class = endpoint.source();
                let mut deps = deps
                    .append_children(class.fields.iter().map(|f| FieldNode::of(f.clone())))
                    .append_child(FieldNode::of(Rc::new(FieldInfo::new(
                        class.name.clone(),
                        "fieldFoo",
                        SignatureModel::string(),
                    ))))
                    .append_child(FieldNode::of(Rc::new(FieldInfo::new(
                        class.name.clone(),
                        "fieldBar",
                        SignatureModel::string(),
                    ))))
                    .append_children(class.methods.iter().map(|m| MethodNode::of(m.clone())));
                if let Some(baz) = cx.storage.resolve_class("Baz") {
                    deps = deps.append_child(EntityNode::of(baz));
                }
                if let Some(related) = cx.storage.resolve_class("Related") {
                    deps = deps.append_related(EntityNode::of(related));
                }
                Ok(deps)
            }
            AnyNode::Entity(entity) => Ok(deps.append_children(
                entity.source().methods.iter().map(|m| MethodNode::of(m.clone())),
            )),
            _ => Ok(deps),
        }
    }
}

/// Replaces the endpoint method `bar` with two fields.
struct ReplacePlugin;

impl Plugin for ReplacePlugin {
    fn id(&self) -> PluginId {
        "replace"
    }

    fn requires(&self) -> Vec<PluginId> {
        vec!["add"]
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        if !matches!(cx.node(), AnyNode::Endpoint(_)) {
            return Ok(deps);
        }
        Ok(deps.flat_map_children(|child| {
            let replaced = match &child {
                AnyNode::Method(method) if method.source().name == "bar" => {
                    Some(method.source().clone())
                }
                _ => None,
            };
            match replaced {
                Some(method) => ["barFirst", "barSecond"]
                    .into_iter()
                    .map(|name| {
                        let field =
                            FieldInfo::new(method.owner.clone(), name, method.result.clone());
                        AnyNode::from(FieldNode::of(Rc::new(field)))
                    })
                    .collect::<Vec<_>>(),
                None => vec![child],
            }
        }))
    }
}

/// Drops entities marked `#[synthetic]`.
struct RemovePlugin;

impl Plugin for RemovePlugin {
    fn id(&self) -> PluginId {
        "remove"
    }

    fn requires(&self) -> Vec<PluginId> {
        vec!["add"]
    }

    fn scan(&self, deps: NodeDependencies, _cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        Ok(deps.retain_children(|child| match child {
            AnyNode::Entity(entity) => !entity.source().has_annotation("synthetic"),
            _ => true,
        }))
    }
}

/// Collects field and method names, then stores them on the root document.
struct FinalizePlugin;

impl Plugin for FinalizePlugin {
    fn id(&self) -> PluginId {
        "finalize"
    }

    fn requires(&self) -> Vec<PluginId> {
        vec!["replace", "remove"]
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let name = match walk.node(path) {
            AnyNode::Field(field) => Some(field.source().name.clone()),
            AnyNode::Method(method) => Some(method.source().name.clone()),
            AnyNode::Root(_) => None,
            _ => return Ok(()),
        };
        let Some(name) = name else {
            let members = walk.storage.plugin_data_mut(self.id()).take();
            walk.tree
                .root_document_mut()
                .extensions
                .insert(MEMBERS_EXTENSION.to_string(), members);
            return Ok(());
        };

        let data = walk.storage.plugin_data_mut(self.id());
        if !data.is_array() {
            *data = Value::Array(Vec::new());
        }
        if let Value::Array(names) = data {
            names.push(Value::String(name));
        }
        Ok(())
    }
}

fn members_plugin() -> CompositePlugin {
    CompositePlugin::new(
        "members",
        vec![
            Box::new(FinalizePlugin),
            Box::new(RemovePlugin),
            Box::new(ReplacePlugin),
            Box::new(AddPlugin),
        ],
    )
    .unwrap()
}

fn classes() -> (ClassRegistry, Rc<ClassInfo>) {
    let endpoint = ClassInfo::new("crate::E")
        .with_annotation(AnnotationInfo::new("endpoint"))
        .with_field("foo", SignatureModel::string())
        .with_method(MethodInfo::new("crate::E", "bar", SignatureModel::string()))
        .build();
    let related = ClassInfo::new("crate::Related")
        .with_method(MethodInfo::new("crate::Related", "methodFoo", SignatureModel::unit()))
        .with_method(MethodInfo::new("crate::Related", "methodBar", SignatureModel::unit()))
        .build();
    let baz = ClassInfo::new("crate::Baz")
        .with_annotation(AnnotationInfo::new("synthetic"))
        .with_method(MethodInfo::new("crate::Baz", "hidden", SignatureModel::unit()))
        .build();
    let registry = vec![endpoint.clone(), related, baz].into_iter().collect();
    (registry, endpoint)
}

#[test]
fn test_members_are_ordered_by_requirements() {
    assert_eq!(
        members_plugin().member_ids(),
        vec!["add", "remove", "replace", "finalize"]
    );
}

#[test]
fn test_composite_chain_trace() {
    let (registry, endpoint) = classes();
    let output = Parser::new(ParserConfig::default())
        .plugin(members_plugin())
        .class_registry(registry)
        .with_trace()
        .execute(vec![endpoint])
        .unwrap();

    assert_eq!(
        output.trace.unwrap(),
        vec![
            "-> Root",
            "-> Root/Endpoint(E)",
            "-> Root/Endpoint(E)/Field(foo)",
            "<- Root/Endpoint(E)/Field(foo)",
            "-> Root/Endpoint(E)/Field(fieldFoo)",
            "<- Root/Endpoint(E)/Field(fieldFoo)",
            "-> Root/Endpoint(E)/Field(fieldBar)",
            "<- Root/Endpoint(E)/Field(fieldBar)",
            "-> Root/Endpoint(E)/Field(barFirst)",
            "<- Root/Endpoint(E)/Field(barFirst)",
            "-> Root/Endpoint(E)/Field(barSecond)",
            "<- Root/Endpoint(E)/Field(barSecond)",
            "<- Root/Endpoint(E)",
            "-> Root/Entity(Related)",
            "-> Root/Entity(Related)/Method(methodFoo)",
            "<- Root/Entity(Related)/Method(methodFoo)",
            "-> Root/Entity(Related)/Method(methodBar)",
            "<- Root/Entity(Related)/Method(methodBar)",
            "<- Root/Entity(Related)",
            "<- Root",
        ]
    );
}

#[test]
fn test_composite_chain_members() {
    let (registry, endpoint) = classes();
    let output = Parser::new(ParserConfig::default())
        .plugin(members_plugin())
        .class_registry(registry)
        .execute(vec![endpoint])
        .unwrap();

    assert_eq!(
        output.openapi.extensions[MEMBERS_EXTENSION],
        json!([
            "foo",
            "fieldFoo",
            "fieldBar",
            "barFirst",
            "barSecond",
            "methodFoo",
            "methodBar"
        ])
    );
    assert!(output.trace.is_none());
}

#[test]
fn test_removing_the_filter_keeps_synthetic_entity() {
    let (registry, endpoint) = classes();
    let plugin = CompositePlugin::new(
        "members",
        vec![Box::new(AddPlugin), Box::new(ReplacePlugin)],
    )
    .unwrap();
    let output = Parser::new(ParserConfig::default())
        .plugin(plugin)
        .class_registry(registry)
        .with_trace()
        .execute(vec![endpoint])
        .unwrap();

    let trace = output.trace.unwrap();
    assert!(trace.contains(&"-> Root/Endpoint(E)/Entity(Baz)/Method(hidden)".to_string()));
}
