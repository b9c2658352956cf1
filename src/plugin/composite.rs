use super::{order_plugins, Plugin, PluginId, ScanContext, Walk};
use crate::error::Result;
use crate::node::{NodeDependencies, PathId};
use log::debug;

/// Runs a group of plugins as one.
///
/// Members are ordered among themselves the same way a pipeline is. Scan output
/// of one member is the scan input of the next, so each member can add, replace
/// or filter what the previous ones declared. Requirements no member satisfies
/// become requirements of the composite.
pub struct CompositePlugin {
    id: PluginId,
    order: Option<i32>,
    members: Vec<Box<dyn Plugin>>,
    external: Vec<PluginId>,
}

impl CompositePlugin {
    pub fn new(id: PluginId, members: Vec<Box<dyn Plugin>>) -> Result<Self> {
        let (members, external) = order_plugins(members, Some(id))?;
        debug!(
            "Composite plugin `{}`: {}",
            id,
            members.iter().map(|m| m.id()).collect::<Vec<_>>().join(" -> ")
        );
        Ok(Self {
            id,
            order: None,
            members,
            external,
        })
    }

    /// Overrides the order, which otherwise is that of the earliest member.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn member_ids(&self) -> Vec<PluginId> {
        self.members.iter().map(|m| m.id()).collect()
    }
}

impl Plugin for CompositePlugin {
    fn id(&self) -> PluginId {
        self.id
    }

    fn order(&self) -> i32 {
        self.order
            .or_else(|| self.members.iter().map(|m| m.order()).min())
            .unwrap_or(0)
    }

    fn requires(&self) -> Vec<PluginId> {
        self.external.clone()
    }

    /// Each member receives the entry of the composite's options under its own id.
    fn configure(&mut self, config: &serde_json::Value) -> Result<()> {
        for member in self.members.iter_mut() {
            let options = config.get(member.id()).unwrap_or(&serde_json::Value::Null);
            member.configure(options)?;
        }
        Ok(())
    }

    fn scan(&self, deps: NodeDependencies, cx: &ScanContext<'_>) -> Result<NodeDependencies> {
        self.members
            .iter()
            .try_fold(deps, |deps, member| member.scan(deps, cx))
    }

    fn enter(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        for member in self.members.iter_mut() {
            member.enter(path, walk)?;
        }
        Ok(())
    }

    fn exit(&mut self, path: PathId, walk: &mut Walk<'_>) -> Result<()> {
        for member in self.members.iter_mut() {
            member.exit(path, walk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginPipeline;

    struct Member {
        id: PluginId,
        order: i32,
        requires: Vec<PluginId>,
        configured: Option<serde_json::Value>,
    }

    fn member(id: PluginId, order: i32, requires: &[PluginId]) -> Box<dyn Plugin> {
        Box::new(Member {
            id,
            order,
            requires: requires.to_vec(),
            configured: None,
        })
    }

    impl Plugin for Member {
        fn id(&self) -> PluginId {
            self.id
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn requires(&self) -> Vec<PluginId> {
            self.requires.clone()
        }

        fn configure(&mut self, config: &serde_json::Value) -> Result<()> {
            if config.is_null() {
                return Err(crate::error::Error::configuration(format!(
                    "`{}` needs options",
                    self.id
                )));
            }
            self.configured = Some(config.clone());
            Ok(())
        }
    }

    #[test]
    fn test_members_are_ordered() {
        let composite = CompositePlugin::new(
            "group",
            vec![
                member("finalize", 30, &[]),
                member("add", 10, &[]),
                member("remove", 20, &["add"]),
            ],
        )
        .unwrap();
        assert_eq!(composite.member_ids(), vec!["add", "remove", "finalize"]);
        assert_eq!(composite.order(), 10);
        assert_eq!(composite.with_order(-1).order(), -1);
    }

    #[test]
    fn test_external_requirements_are_exposed() {
        let composite =
            CompositePlugin::new("group", vec![member("inner", 5, &["backbone"])]).unwrap();
        assert_eq!(composite.requires(), vec!["backbone"]);

        let err = PluginPipeline::new(vec![Box::new(composite)]).err().unwrap();
        assert!(err.to_string().contains("`backbone`"));
    }

    #[test]
    fn test_configure_passes_member_options() {
        let mut composite =
            CompositePlugin::new("group", vec![member("a", 0, &[]), member("b", 0, &[])]).unwrap();
        composite
            .configure(&serde_json::json!({"a": {"x": 1}, "b": {"y": 2}}))
            .unwrap();

        let err = composite.configure(&serde_json::json!({"a": {}})).unwrap_err();
        assert!(err.to_string().contains("`b`"));
    }
}
