//! Nullability inference for type signature schemas.
//!
//! Every signature schema is classified from the attributes that apply to it:
//! its own (use-site) attributes, those of the field, parameter or method it
//! belongs to, and the inner attributes of the module declaring the enclosing
//! type. Each attribute matching the table contributes a score; the highest
//! wins and ties go to the first match. Without any match a schema is
//! nullable. `Option<T>` is always nullable unless `disable-optional-types`
//! is set.

use crate::error::{Error, Result};
use crate::model::{AnnotationInfo, ModelKey, PackageInfo};
use crate::node::{AnyNode, PathId, Tree};
use crate::openapi::Schema;
use crate::plugin::{Plugin, PluginId, Walk};
use crate::plugins::backbone::BACKBONE_PLUGIN_ID;
use crate::storage::SharedStorage;
use log::debug;
use serde::{Deserialize, Serialize};

pub const NONNULL_PLUGIN_ID: PluginId = "nonnull";

/// One row of the annotation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnnotationMatcher {
    /// Attribute name; matched against the full path or its last segment
    pub name: String,
    pub makes_nullable: bool,
    pub score: i32,
}

impl AnnotationMatcher {
    pub fn new(name: &str, makes_nullable: bool, score: i32) -> Self {
        Self {
            name: name.to_string(),
            makes_nullable,
            score,
        }
    }

    fn matches(&self, annotation: &AnnotationInfo) -> bool {
        annotation.is(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NonnullPluginConfig {
    /// Entries merged over the defaults; an entry with a default's name replaces it
    pub annotations: Vec<AnnotationMatcher>,
    pub disable_optional_types: bool,
}

fn default_matchers() -> Vec<AnnotationMatcher> {
    vec![
        AnnotationMatcher::new("nonnull", false, 40),
        AnnotationMatcher::new("non_null", false, 40),
        AnnotationMatcher::new("nullable", true, 40),
        AnnotationMatcher::new("non_null_api", false, 10),
        AnnotationMatcher::new("null_marked", false, 10),
        AnnotationMatcher::new("null_unmarked", true, 10),
    ]
}

/// Outcome of matching annotations against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nullability {
    pub nullable: bool,
    pub score: i32,
}

impl Nullability {
    const DEFAULT: Nullability = Nullability {
        nullable: true,
        score: 0,
    };
}

pub struct NonnullPlugin {
    matchers: Vec<AnnotationMatcher>,
    disable_optional_types: bool,
}

impl Default for NonnullPlugin {
    fn default() -> Self {
        Self {
            matchers: default_matchers(),
            disable_optional_types: false,
        }
    }
}

impl NonnullPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NonnullPluginConfig) -> Self {
        let mut plugin = Self::default();
        plugin.apply(config);
        plugin
    }

    pub fn matchers(&self) -> &[AnnotationMatcher] {
        &self.matchers
    }

    fn apply(&mut self, config: NonnullPluginConfig) {
        for matcher in config.annotations {
            match self.matchers.iter_mut().find(|m| m.name == matcher.name) {
                Some(existing) => *existing = matcher,
                None => self.matchers.push(matcher),
            }
        }
        self.disable_optional_types = config.disable_optional_types;
    }

    /// Highest scoring match among `annotations`; the first one wins on ties.
    pub fn resolve<'a, I>(&self, annotations: I) -> Nullability
    where
        I: IntoIterator<Item = &'a AnnotationInfo>,
    {
        let mut result = Nullability::DEFAULT;
        let mut matched = false;
        for annotation in annotations {
            for matcher in self.matchers.iter().filter(|m| m.matches(annotation)) {
                if !matched || matcher.score > result.score {
                    result = Nullability {
                        nullable: matcher.makes_nullable,
                        score: matcher.score,
                    };
                    matched = true;
                }
            }
        }
        result
    }

    fn is_nullable(&self, tree: &Tree, storage: &SharedStorage, path: PathId) -> bool {
        let node = tree.node(path);
        let optional = match node {
            AnyNode::TypeSignature(signature) => signature.source().is_optional(),
            _ => false,
        };
        if optional && !self.disable_optional_types {
            return true;
        }

        let mut annotations: Vec<&AnnotationInfo> = node.annotations();
        let member = tree.parent_node(path).filter(|parent| {
            matches!(
                parent,
                AnyNode::Method(_) | AnyNode::Field(_) | AnyNode::Parameter(_)
            )
        });
        if let Some(member) = member {
            annotations.extend(member.annotations());
        }
        if let Some(package) = enclosing_package(tree, storage, path) {
            annotations.extend(package.annotations.iter());
        }

        let nullability = self.resolve(annotations);
        debug!(
            "{} resolved as {} (score {})",
            tree.display(path),
            if nullability.nullable { "nullable" } else { "non-null" },
            nullability.score
        );
        nullability.nullable
    }
}

/// Module of the class declaring the member this signature belongs to.
///
/// Looked up through the association map by owner name, falling back to the
/// nearest class-bearing ancestor.
fn enclosing_package<'a>(
    tree: &'a Tree,
    storage: &SharedStorage,
    path: PathId,
) -> Option<&'a PackageInfo> {
    let owner = tree
        .ancestors(path)
        .into_iter()
        .find_map(|ancestor| match tree.node(ancestor) {
            AnyNode::Method(method) => Some(method.source().owner.clone()),
            AnyNode::Field(field) => Some(field.source().owner.clone()),
            AnyNode::Parameter(parameter) => Some(parameter.source().owner.clone()),
            _ => None,
        });
    let associated = owner.and_then(|owner| {
        storage
            .associations
            .get(&ModelKey::Entity(owner.clone()))
            .or_else(|| storage.associations.get(&ModelKey::Endpoint(owner)))
    });
    if let Some(node) = associated {
        return tree.node_by_id(node).package();
    }
    tree.find_ancestor(path, |node| node.class().is_some())
        .and_then(|ancestor| tree.node(ancestor).package())
}

/// Marks a schema nullable or not. Nullable references are wrapped in `anyOf`
/// since siblings of `$ref` are ignored.
fn with_nullability(schema: &Schema, nullable: bool) -> Schema {
    let mut schema = unwrap_nullable_reference(schema);
    if nullable {
        if schema.is_reference() {
            let mut wrapper = Schema::any_of(vec![schema]);
            wrapper.nullable = Some(true);
            return wrapper;
        }
        schema.nullable = Some(true);
    } else {
        schema.nullable = None;
    }
    schema
}

fn unwrap_nullable_reference(schema: &Schema) -> Schema {
    if let Some([inner]) = schema.any_of.as_deref() {
        let mut bare = schema.clone();
        bare.any_of = None;
        bare.nullable = None;
        if inner.is_reference() && bare == Schema::default() {
            return inner.clone();
        }
    }
    schema.clone()
}

impl Plugin for NonnullPlugin {
    fn id(&self) -> PluginId {
        NONNULL_PLUGIN_ID
    }

    fn order(&self) -> i32 {
        100
    }

    fn requires(&self) -> Vec<PluginId> {
        vec![BACKBONE_PLUGIN_ID]
    }

    fn configure(&mut self, config: &serde_json::Value) -> Result<()> {
        if config.is_null() {
            return Ok(());
        }
        let config: NonnullPluginConfig = serde_json::from_value(config.clone()).map_err(|e| {
            Error::configuration(format!("invalid `{}` plugin options: {}", NONNULL_PLUGIN_ID, e))
        })?;
        self.apply(config);
        Ok(())
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        let schema = match walk.node(path) {
            AnyNode::TypeSignature(_) | AnyNode::CompositeTypeSignature(_) => {
                walk.node(path).schema().cloned()
            }
            _ => None,
        };
        let Some(schema) = schema else {
            return Ok(());
        };
        let nullable = self.is_nullable(walk.tree, walk.storage, path);
        let schema = with_nullability(&schema, nullable);
        walk.node_mut(path).set_schema(schema);
        Ok(())
    }
}
