use super::ClassInfo;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Lookup table from class references to class models.
///
/// The loader qualifies references against the module they are written in,
/// so most lookups hit an exact qualified name. A reference it could not place
/// falls back to the last path segment, and only resolves when exactly one
/// class (or one class ending in the written path) carries that name.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<String, Rc<ClassInfo>>,
    by_simple_name: HashMap<String, Vec<String>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class, replacing any previous model with the same qualified name.
    pub fn insert(&mut self, class: Rc<ClassInfo>) {
        let qualified = class.name.clone();
        if self.classes.insert(qualified.clone(), class.clone()).is_none() {
            let names = self.by_simple_name.entry(class.simple_name.clone()).or_default();
            names.push(qualified);
            names.sort();
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Rc<ClassInfo>> {
        self.classes.get(qualified_name)
    }

    /// Resolves a class reference as written in a type signature.
    pub fn resolve(&self, reference: &str) -> Option<Rc<ClassInfo>> {
        if let Some(class) = self.classes.get(reference) {
            return Some(class.clone());
        }

        let prefixed = format!("crate::{}", reference);
        if let Some(class) = self.classes.get(&prefixed) {
            return Some(class.clone());
        }

        let simple = reference.rsplit("::").next().unwrap_or(reference);
        let candidates = self.by_simple_name.get(simple)?;
        match candidates.as_slice() {
            [] => None,
            [only] => self.classes.get(only).cloned(),
            _ => {
                // a partial path narrows the candidates down
                let suffix = format!("::{}", reference);
                let mut matched = candidates.iter().filter(|c| c.ends_with(&suffix));
                if let (Some(only), None) = (matched.next(), matched.next()) {
                    return self.classes.get(only).cloned();
                }
                warn!(
                    "Ambiguous class reference `{}` matches {}, not resolving it",
                    reference,
                    candidates.join(", ")
                );
                None
            }
        }
    }

    /// All classes ordered by qualified name
    pub fn classes(&self) -> impl Iterator<Item = &Rc<ClassInfo>> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<Rc<ClassInfo>> for ClassRegistry {
    fn from_iter<I: IntoIterator<Item = Rc<ClassInfo>>>(iter: I) -> Self {
        let mut registry = ClassRegistry::new();
        for class in iter {
            registry.insert(class);
        }
        debug!("Class registry holds {} classes", registry.len());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClassRegistry {
        vec![
            ClassInfo::new("crate::model::User").build(),
            ClassInfo::new("crate::api::Page").build(),
            ClassInfo::new("crate::legacy::Page").build(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_qualified_and_simple() {
        let registry = registry();
        assert_eq!(
            registry.resolve("crate::model::User").unwrap().name,
            "crate::model::User"
        );
        assert_eq!(registry.resolve("model::User").unwrap().name, "crate::model::User");
        assert_eq!(registry.resolve("User").unwrap().name, "crate::model::User");
        assert!(registry.resolve("Missing").is_none());
    }

    #[test]
    fn test_resolve_ambiguous_prefers_matching_suffix() {
        let registry = registry();
        assert_eq!(registry.resolve("legacy::Page").unwrap().name, "crate::legacy::Page");
        assert_eq!(registry.resolve("crate::api::Page").unwrap().name, "crate::api::Page");
    }

    #[test]
    fn test_ambiguous_simple_name_is_not_guessed() {
        let registry = registry();
        assert!(registry.resolve("Page").is_none());
        assert!(registry.resolve("other::Page").is_none());
    }

    #[test]
    fn test_classes_are_sorted() {
        let names: Vec<_> = registry().classes().map(|c| c.name.clone()).collect();
        assert_eq!(
            names,
            vec!["crate::api::Page", "crate::legacy::Page", "crate::model::User"]
        );
    }

    #[test]
    fn test_insert_replaces_without_duplicating() {
        let mut registry = registry();
        registry.insert(ClassInfo::new("crate::model::User").build());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.resolve("User").unwrap().name, "crate::model::User");
    }
}
