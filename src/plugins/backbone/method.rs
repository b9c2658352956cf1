use super::{associate, first_child_schema};
use crate::error::{Error, Result};
use crate::node::{
    AnyNode, MethodNode, NodeDependencies, ParameterNode, PathId, Tree, TypeSignatureNode,
};
use crate::openapi::{Operation, Properties, RequestBody, Response, Schema};
use crate::plugin::{Plugin, PluginId, ScanContext, Walk};
use log::debug;

/// Turns endpoint methods into `POST /{endpoint}/{method}` operations.
pub struct MethodPlugin;

impl Plugin for MethodPlugin {
    fn id(&self) -> PluginId {
        "method"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        match cx.node() {
            AnyNode::Endpoint(endpoint) => Ok(deps.append_children(
                endpoint
                    .source()
                    .methods
                    .iter()
                    .map(|method| MethodNode::of(method.clone())),
            )),
            AnyNode::Method(method) => {
                let method = method.source();
                Ok(deps
                    .append_children(
                        method
                            .parameters
                            .iter()
                            .map(|parameter| ParameterNode::of(parameter.clone())),
                    )
                    .append_child(TypeSignatureNode::of(method.result.clone())))
            }
            _ => Ok(deps),
        }
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        if matches!(walk.node(path), AnyNode::Method(_)) {
            associate(path, walk);
        }
        Ok(())
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let AnyNode::Method(method) = walk.tree.node(path) else {
            return Ok(());
        };
        let method_name = method.source().name.clone();
        let endpoint_name = walk
            .tree
            .find_ancestor(path, |node| matches!(node, AnyNode::Endpoint(_)))
            .and_then(|endpoint| match walk.tree.node(endpoint) {
                AnyNode::Endpoint(endpoint) => Some(endpoint.target().name.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                Error::structural(format!("method `{}` is not beneath an endpoint", method_name))
            })?;

        let operation = build_operation(walk.tree, path, &endpoint_name, &method_name)?;
        let route = format!("/{}/{}", endpoint_name, method_name);
        debug!("Adding operation POST {}", route);

        if let AnyNode::Method(method) = walk.tree.node_mut(path) {
            method.target_mut().set_post(operation.clone())?;
        }
        walk.tree
            .root_document_mut()
            .paths
            .entry(route)
            .or_default()
            .set_post(operation)
    }
}

fn build_operation(tree: &Tree, path: PathId, endpoint: &str, method: &str) -> Result<Operation> {
    let mut parameters = Properties::new();
    let mut required = Vec::new();
    let mut result = None;

    for &child in tree.children(path) {
        match tree.node(child) {
            AnyNode::Parameter(parameter) => {
                let schema = first_child_schema(tree, child).unwrap_or_default();
                if !parameter.source().signature.is_optional() && !schema.is_nullable() {
                    required.push(parameter.target().clone());
                }
                if parameters.contains_key(parameter.target()) {
                    return Err(Error::structural(format!(
                        "{}::{} has more than one parameter named `{}`",
                        endpoint,
                        method,
                        parameter.target()
                    )));
                }
                parameters.insert(parameter.target().clone(), schema);
            }
            AnyNode::TypeSignature(signature) => {
                if !signature.source().is_unit() {
                    result = Some(signature.target().clone());
                }
            }
            _ => {}
        }
    }

    let request_body = (!parameters.is_empty()).then(|| {
        let mut body = Schema::object_with(parameters);
        if !required.is_empty() {
            body.required = Some(required);
        }
        RequestBody::json(body)
    });
    let response = result.map(Response::json).unwrap_or_else(Response::empty);

    Ok(Operation {
        operation_id: Some(format!("{}_{}_POST", endpoint, method)),
        tags: vec![endpoint.to_string()],
        request_body,
        responses: [("200".to_string(), response)].into_iter().collect(),
        ..Operation::default()
    })
}

/// Emits the type signature of each method parameter.
pub struct MethodParameterPlugin;

impl Plugin for MethodParameterPlugin {
    fn id(&self) -> PluginId {
        "method-parameter"
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        match cx.node() {
            AnyNode::Parameter(parameter) => {
                Ok(deps.append_child(TypeSignatureNode::of(parameter.source().signature.clone())))
            }
            _ => Ok(deps),
        }
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        if matches!(walk.node(path), AnyNode::Parameter(_)) {
            associate(path, walk);
        }
        Ok(())
    }
}
