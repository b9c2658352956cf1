//! Builds class models from parsed Rust source.
//!
//! Loading happens in three passes over all files so that declarations may
//! live in any module:
//!
//! 1. module attributes (`#![non_null_api]` in a file, or attributes on the
//!    `mod` item declaring it), `use` imports, declared type names and
//!    exposed traits are collected,
//! 2. structs and enums become classes,
//! 3. methods from inherent impls and from impls of exposed traits are
//!    attached to the classes they implement.
//!
//! Class references are qualified against the module they are written in, so
//! `Item` inside `crate::b` names `crate::b::Item` even when another module
//! declares an `Item` too.

use super::{
    AnnotationArgument, AnnotationInfo, BaseType, ClassInfo, ClassKind, ClassRegistry, FieldInfo,
    MethodInfo, PackageInfo, SerdeAttributes, SignatureKind, SignatureModel, VariantInfo,
};
use crate::source::SourceFile;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use syn::punctuated::Punctuated;
use syn::{Expr, Lit, Token};

/// Converts parsed files into a [`ClassRegistry`].
pub struct ModelLoader {
    exposed_annotation: String,
}

/// A trait whose methods become endpoint methods when an endpoint implements it
struct ExposedTrait {
    module: String,
    generics: Vec<String>,
    methods: Vec<syn::TraitItemFn>,
}

/// What the first pass learns about the crate
#[derive(Default)]
struct SourceIndex {
    packages: BTreeMap<String, Vec<AnnotationInfo>>,
    traits: HashMap<String, ExposedTrait>,
    imports: HashMap<String, Imports>,
    declared: BTreeSet<String>,
}

/// `use` declarations of one module
#[derive(Debug, Clone, Default)]
struct Imports {
    /// Local name to the path it stands for
    names: HashMap<String, Vec<String>>,
    globs: Vec<Vec<String>>,
}

/// Names visible inside one module.
#[derive(Debug, Default)]
struct ModuleScope {
    module: String,
    imports: Imports,
    declared: Rc<BTreeSet<String>>,
}

impl ModuleScope {
    /// Qualified name for a class reference written in this module.
    ///
    /// Tries the module's own declarations, then its imports, then the crate
    /// root. References that match none of them are returned as written.
    fn qualify(&self, written: &[String]) -> String {
        let Some((first, rest)) = written.split_first() else {
            return String::new();
        };
        if matches!(first.as_str(), "crate" | "self" | "super") {
            return absolute_path(&self.module, written).join("::");
        }

        let local = format!("{}::{}", self.module, written.join("::"));
        if self.declared.contains(&local) {
            return local;
        }
        if let Some(imported) = self.imports.names.get(first) {
            let mut path = imported.clone();
            path.extend(rest.iter().cloned());
            return self.declared_as(&path).unwrap_or_else(|| path.join("::"));
        }
        for glob in &self.imports.globs {
            let mut path = glob.clone();
            path.extend(written.iter().cloned());
            let candidate = path.join("::");
            if self.declared.contains(&candidate) {
                return candidate;
            }
        }
        self.declared_as(written).unwrap_or_else(|| written.join("::"))
    }

    /// Declared class for a path that is absolute, relative to this module,
    /// or relative to the crate root
    fn declared_as(&self, path: &[String]) -> Option<String> {
        let written = path.join("::");
        [
            written.clone(),
            format!("{}::{}", self.module, written),
            format!("crate::{}", written),
        ]
        .into_iter()
        .find(|candidate| self.declared.contains(candidate))
    }
}

/// Type parameters in scope while converting a signature
#[derive(Default)]
struct TypeScope {
    variables: Vec<String>,
    bindings: HashMap<String, Rc<SignatureModel>>,
    module: Rc<ModuleScope>,
}

impl TypeScope {
    fn with_generics(generics: &syn::Generics, module: &Rc<ModuleScope>) -> Self {
        Self {
            variables: generic_names(generics),
            bindings: HashMap::new(),
            module: module.clone(),
        }
    }
}

type Scopes = HashMap<String, Rc<ModuleScope>>;

fn scope_of(scopes: &Scopes, module: &str) -> Rc<ModuleScope> {
    scopes.get(module).cloned().unwrap_or_else(|| {
        Rc::new(ModuleScope {
            module: module.to_string(),
            ..ModuleScope::default()
        })
    })
}

impl ModelLoader {
    pub fn new(exposed_annotation: impl Into<String>) -> Self {
        Self {
            exposed_annotation: exposed_annotation.into(),
        }
    }

    pub fn load(&self, files: &[SourceFile]) -> ClassRegistry {
        let mut index = SourceIndex::default();
        for file in files {
            index
                .packages
                .entry(file.module_path.clone())
                .or_default()
                .extend(annotations(&file.syntax_tree.attrs));
            self.collect_modules(&file.module_path, &file.syntax_tree.items, &mut index);
        }

        let SourceIndex {
            packages,
            traits,
            imports,
            declared,
        } = index;
        let packages: HashMap<String, Rc<PackageInfo>> = packages
            .into_iter()
            .map(|(name, annotations)| {
                let package = PackageInfo {
                    name: name.clone(),
                    annotations,
                };
                (name, Rc::new(package))
            })
            .collect();
        let declared = Rc::new(declared);
        let scopes: Scopes = imports
            .into_iter()
            .map(|(module, imports)| {
                let scope = ModuleScope {
                    module: module.clone(),
                    imports,
                    declared: declared.clone(),
                };
                (module, Rc::new(scope))
            })
            .collect();

        let mut classes: BTreeMap<String, ClassInfo> = BTreeMap::new();
        for file in files {
            collect_classes(
                &file.module_path,
                &file.syntax_tree.items,
                &packages,
                &scopes,
                &mut classes,
            );
        }

        for file in files {
            self.attach_methods(
                &file.module_path,
                &file.syntax_tree.items,
                &traits,
                &scopes,
                &mut classes,
            );
        }

        debug!("Loaded {} classes from {} files", classes.len(), files.len());
        classes.into_values().map(ClassInfo::build).collect()
    }

    fn collect_modules(&self, module: &str, items: &[syn::Item], index: &mut SourceIndex) {
        index.imports.entry(module.to_string()).or_default();
        for item in items {
            match item {
                syn::Item::Mod(item_mod) => {
                    let nested = format!("{}::{}", module, unraw(&item_mod.ident));
                    index
                        .packages
                        .entry(nested.clone())
                        .or_default()
                        .extend(annotations(&item_mod.attrs));
                    if let Some((_, items)) = &item_mod.content {
                        self.collect_modules(&nested, items, index);
                    }
                }
                syn::Item::Use(item_use) => {
                    let imports = index.imports.entry(module.to_string()).or_default();
                    collect_imports(module, &item_use.tree, Vec::new(), imports);
                }
                syn::Item::Struct(item_struct) => {
                    index
                        .declared
                        .insert(format!("{}::{}", module, unraw(&item_struct.ident)));
                }
                syn::Item::Enum(item_enum) => {
                    index
                        .declared
                        .insert(format!("{}::{}", module, unraw(&item_enum.ident)));
                }
                syn::Item::Trait(item_trait)
                    if has_annotation(&item_trait.attrs, &self.exposed_annotation) =>
                {
                    let name = unraw(&item_trait.ident);
                    debug!("Found exposed trait {}::{}", module, name);
                    let methods = item_trait
                        .items
                        .iter()
                        .filter_map(|item| match item {
                            syn::TraitItem::Fn(method) if has_receiver(&method.sig) => {
                                Some(method.clone())
                            }
                            _ => None,
                        })
                        .collect();
                    index.traits.insert(
                        name,
                        ExposedTrait {
                            module: module.to_string(),
                            generics: generic_names(&item_trait.generics),
                            methods,
                        },
                    );
                }
                _ => {}
            }
        }
    }

    fn attach_methods(
        &self,
        module: &str,
        items: &[syn::Item],
        traits: &HashMap<String, ExposedTrait>,
        scopes: &Scopes,
        classes: &mut BTreeMap<String, ClassInfo>,
    ) {
        let scope = scope_of(scopes, module);
        for item in items {
            match item {
                syn::Item::Mod(item_mod) => {
                    if let Some((_, items)) = &item_mod.content {
                        let nested = format!("{}::{}", module, unraw(&item_mod.ident));
                        self.attach_methods(&nested, items, traits, scopes, classes);
                    }
                }
                syn::Item::Impl(item_impl) => {
                    let Some(owner) = impl_target(&scope, &item_impl.self_ty, classes) else {
                        continue;
                    };
                    let methods = match &item_impl.trait_ {
                        None => inherent_methods(&owner, item_impl, &scope),
                        Some((_, trait_path, _)) => {
                            exposed_methods(&owner, trait_path, traits, &scope, scopes)
                        }
                    };
                    if let Some(class) = classes.get_mut(&owner) {
                        class.methods.extend(methods.into_iter().map(Rc::new));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Records the names a `use` tree brings into `module`.
fn collect_imports(module: &str, tree: &syn::UseTree, prefix: Vec<String>, imports: &mut Imports) {
    match tree {
        syn::UseTree::Path(path) => {
            let mut prefix = prefix;
            prefix.push(unraw(&path.ident));
            collect_imports(module, &path.tree, prefix, imports);
        }
        syn::UseTree::Name(name) => {
            let ident = unraw(&name.ident);
            import_name(module, prefix, &ident, &ident, imports);
        }
        syn::UseTree::Rename(rename) => {
            let alias = unraw(&rename.rename);
            if alias != "_" {
                import_name(module, prefix, &unraw(&rename.ident), &alias, imports);
            }
        }
        syn::UseTree::Glob(_) => imports.globs.push(absolute_path(module, &prefix)),
        syn::UseTree::Group(group) => {
            for tree in &group.items {
                collect_imports(module, tree, prefix.clone(), imports);
            }
        }
    }
}

fn import_name(module: &str, prefix: Vec<String>, ident: &str, alias: &str, imports: &mut Imports) {
    let mut path = prefix;
    // `use crate::model::{self}` imports the module itself
    let alias = if ident == "self" {
        match path.last() {
            Some(last) if alias == "self" => last.clone(),
            Some(_) => alias.to_string(),
            None => return,
        }
    } else {
        path.push(ident.to_string());
        alias.to_string()
    };
    imports.names.insert(alias, absolute_path(module, &path));
}

/// Rewrites a path starting with `crate`, `self` or `super` relative to `module`.
/// Other paths are returned unchanged.
fn absolute_path(module: &str, segments: &[String]) -> Vec<String> {
    let mut base: Vec<String> = module.split("::").map(str::to_string).collect();
    let rest = match segments.first().map(String::as_str) {
        Some("self") => &segments[1..],
        Some("super") => {
            let supers = segments.iter().take_while(|s| s.as_str() == "super").count();
            for _ in 0..supers {
                if base.len() > 1 {
                    base.pop();
                }
            }
            &segments[supers..]
        }
        _ => return segments.to_vec(),
    };
    base.extend(rest.iter().cloned());
    base
}

fn collect_classes(
    module: &str,
    items: &[syn::Item],
    packages: &HashMap<String, Rc<PackageInfo>>,
    scopes: &Scopes,
    classes: &mut BTreeMap<String, ClassInfo>,
) {
    let package = packages
        .get(module)
        .cloned()
        .unwrap_or_else(|| Rc::new(PackageInfo::new(module)));
    let scope = scope_of(scopes, module);

    for item in items {
        let class = match item {
            syn::Item::Struct(item_struct) => Some(struct_class(&scope, item_struct)),
            syn::Item::Enum(item_enum) => Some(enum_class(&scope, item_enum)),
            syn::Item::Mod(item_mod) => {
                if let Some((_, items)) = &item_mod.content {
                    let nested = format!("{}::{}", module, unraw(&item_mod.ident));
                    collect_classes(&nested, items, packages, scopes, classes);
                }
                None
            }
            _ => None,
        };
        if let Some(class) = class {
            let class = class.with_package(package.clone());
            debug!("Found class {} ({:?})", class.name, class.kind);
            classes.insert(class.name.clone(), class);
        }
    }
}

fn struct_class(module: &Rc<ModuleScope>, item: &syn::ItemStruct) -> ClassInfo {
    let name = format!("{}::{}", module.module, unraw(&item.ident));
    let scope = TypeScope::with_generics(&item.generics, module);
    let mut class = ClassInfo::new(name.clone());
    class.annotations = annotations(&item.attrs);

    match &item.fields {
        syn::Fields::Named(fields) => {
            for field in &fields.named {
                let Some(ident) = &field.ident else {
                    continue;
                };
                let field_name = unraw(ident);
                let context = format!("field `{}` of {}", field_name, name);
                let signature = convert_type(&field.ty, &scope, &context);
                let mut info = FieldInfo::new(name.clone(), field_name, signature)
                    .with_serde(serde_attributes(&field.attrs));
                info.annotations = annotations(&field.attrs);
                if is_phantom(&field.ty) {
                    info = info.synthetic();
                }
                class = class.with_field_info(info);
            }
        }
        syn::Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let context = format!("newtype {}", name);
            let inner = convert_type(&fields.unnamed[0].ty, &scope, &context);
            class = class.with_kind(ClassKind::Newtype(inner));
        }
        syn::Fields::Unnamed(fields) => {
            class = class.with_kind(ClassKind::Unsupported {
                reason: format!("tuple struct with {} fields", fields.unnamed.len()),
            });
        }
        syn::Fields::Unit => {}
    }
    class
}

fn enum_class(module: &Rc<ModuleScope>, item: &syn::ItemEnum) -> ClassInfo {
    let name = format!("{}::{}", module.module, unraw(&item.ident));
    let scope = TypeScope::with_generics(&item.generics, module);
    let mut class = ClassInfo::new(name.clone());
    class.annotations = annotations(&item.attrs);

    let all_unit = item.variants.iter().all(|v| matches!(v.fields, syn::Fields::Unit));
    let all_wrapping = item
        .variants
        .iter()
        .all(|v| matches!(&v.fields, syn::Fields::Unnamed(f) if f.unnamed.len() == 1));

    let kind = if all_unit {
        ClassKind::UnitEnum {
            variants: item
                .variants
                .iter()
                .filter(|v| !serde_attributes(&v.attrs).skip)
                .map(|v| {
                    serde_attributes(&v.attrs)
                        .rename
                        .unwrap_or_else(|| unraw(&v.ident))
                })
                .collect(),
        }
    } else if all_wrapping {
        let variants = item
            .variants
            .iter()
            .filter_map(|variant| {
                let syn::Fields::Unnamed(fields) = &variant.fields else {
                    return None;
                };
                let context = format!("variant `{}` of {}", variant.ident, name);
                let signature = convert_type(&fields.unnamed[0].ty, &scope, &context);
                let signature = SignatureModel::annotated(
                    signature.kind.clone(),
                    annotations(&variant.attrs),
                );
                Some(VariantInfo {
                    name: unraw(&variant.ident),
                    signature,
                })
            })
            .collect();
        ClassKind::UnionEnum { variants }
    } else {
        let offending = item
            .variants
            .iter()
            .find(|v| !matches!(v.fields, syn::Fields::Unit))
            .map(|v| v.ident.to_string())
            .unwrap_or_default();
        ClassKind::Unsupported {
            reason: format!(
                "enum mixes variant shapes; variant `{}` is neither a unit \
                 nor a single-value variant",
                offending
            ),
        }
    };
    class.with_kind(kind)
}

/// Finds the class an `impl` block belongs to.
fn impl_target(
    scope: &ModuleScope,
    self_ty: &syn::Type,
    classes: &BTreeMap<String, ClassInfo>,
) -> Option<String> {
    let syn::Type::Path(type_path) = self_ty else {
        return None;
    };
    let segments: Vec<String> = type_path
        .path
        .segments
        .iter()
        .map(|s| unraw(&s.ident))
        .collect();
    let qualified = scope.qualify(&segments);
    if classes.contains_key(&qualified) {
        return Some(qualified);
    }

    let simple = segments.last()?;
    let mut candidates = classes.values().filter(|c| &c.simple_name == simple);
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Some(only.name.clone()),
        (Some(_), Some(_)) => {
            warn!(
                "Cannot tell which `{}` the impl in {} belongs to, skipping it",
                simple, scope.module
            );
            None
        }
        _ => None,
    }
}

fn inherent_methods(
    owner: &str,
    item: &syn::ItemImpl,
    module: &Rc<ModuleScope>,
) -> Vec<MethodInfo> {
    let scope = TypeScope::with_generics(&item.generics, module);
    item.items
        .iter()
        .filter_map(|item| match item {
            syn::ImplItem::Fn(method)
                if matches!(method.vis, syn::Visibility::Public(_))
                    && has_receiver(&method.sig) =>
            {
                Some(method_info(owner, &method.sig, &method.attrs, &scope))
            }
            _ => None,
        })
        .collect()
}

/// Methods of an exposed trait as seen from one of its impls.
///
/// The impl's type arguments are read in the impl's module; the method
/// signatures in the module declaring the trait.
fn exposed_methods(
    owner: &str,
    trait_path: &syn::Path,
    traits: &HashMap<String, ExposedTrait>,
    module: &Rc<ModuleScope>,
    scopes: &Scopes,
) -> Vec<MethodInfo> {
    let Some(segment) = trait_path.segments.last() else {
        return Vec::new();
    };
    let Some(exposed) = traits.get(&unraw(&segment.ident)) else {
        return Vec::new();
    };

    // bind the trait's type parameters to the arguments of this impl
    let impl_scope = TypeScope {
        module: module.clone(),
        ..TypeScope::default()
    };
    let context = format!("impl {} for {}", segment.ident, owner);
    let bindings: HashMap<String, Rc<SignatureModel>> = exposed
        .generics
        .iter()
        .zip(type_arguments(&segment.arguments))
        .map(|(name, argument)| (name.clone(), convert_type(argument, &impl_scope, &context)))
        .collect();

    let trait_module = scope_of(scopes, &exposed.module);
    exposed
        .methods
        .iter()
        .map(|method| {
            let mut method_scope = TypeScope {
                variables: generic_names(&method.sig.generics),
                bindings: bindings.clone(),
                module: trait_module.clone(),
            };
            method_scope.variables.retain(|v| !bindings.contains_key(v));
            method_info(owner, &method.sig, &method.attrs, &method_scope)
        })
        .collect()
}

fn method_info(
    owner: &str,
    sig: &syn::Signature,
    attrs: &[syn::Attribute],
    scope: &TypeScope,
) -> MethodInfo {
    let name = unraw(&sig.ident);
    let context = format!("{}::{}", owner, name);
    let mut scope_variables = scope.variables.clone();
    scope_variables.extend(generic_names(&sig.generics));
    let scope = TypeScope {
        variables: scope_variables,
        bindings: scope.bindings.clone(),
        module: scope.module.clone(),
    };

    let result = match &sig.output {
        syn::ReturnType::Default => SignatureModel::unit(),
        syn::ReturnType::Type(_, ty) => convert_type(unwrap_result(ty), &scope, &context),
    };
    let mut method = MethodInfo::new(owner, name, result);
    method.annotations = annotations(attrs);

    for (index, input) in sig.inputs.iter().filter_map(typed_input).enumerate() {
        let parameter_name = match input.pat.as_ref() {
            syn::Pat::Ident(pat) => Some(unraw(&pat.ident)),
            _ => {
                warn!(
                    "Parameter {} of {} is bound by a pattern, naming it arg{}",
                    index, context, index
                );
                None
            }
        };
        let parameter_context = format!("parameter {} of {}", index, context);
        method = method.with_parameter_annotated(
            parameter_name.as_deref(),
            convert_type(&input.ty, &scope, &parameter_context),
            annotations(&input.attrs),
        );
    }
    method
}

fn typed_input(input: &syn::FnArg) -> Option<&syn::PatType> {
    match input {
        syn::FnArg::Typed(pat_type) => Some(pat_type),
        syn::FnArg::Receiver(_) => None,
    }
}

fn has_receiver(sig: &syn::Signature) -> bool {
    sig.receiver().is_some()
}

/// `Result<T, E>` describes its success value on the wire.
fn unwrap_result(ty: &syn::Type) -> &syn::Type {
    if let syn::Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Result" {
                if let Some(inner) = type_arguments(&segment.arguments).into_iter().next() {
                    return inner;
                }
            }
        }
    }
    ty
}

/// Converts a syn type into a signature model.
///
/// Syntax without a schema representation becomes [`SignatureKind::Unsupported`],
/// which only fails the parse once a plugin reaches it.
fn convert_type(ty: &syn::Type, scope: &TypeScope, context: &str) -> Rc<SignatureModel> {
    let unsupported = |what: &str| {
        SignatureModel::of(SignatureKind::Unsupported(format!("{} in {}", what, context)))
    };
    match ty {
        syn::Type::Reference(reference) => convert_type(&reference.elem, scope, context),
        syn::Type::Paren(paren) => convert_type(&paren.elem, scope, context),
        syn::Type::Group(group) => convert_type(&group.elem, scope, context),
        syn::Type::Slice(slice) => SignatureModel::array(convert_type(&slice.elem, scope, context)),
        syn::Type::Array(array) => SignatureModel::array(convert_type(&array.elem, scope, context)),
        syn::Type::Tuple(tuple) if tuple.elems.is_empty() => SignatureModel::unit(),
        syn::Type::Tuple(tuple) => {
            unsupported(&format!("tuple of {} elements", tuple.elems.len()))
        }
        syn::Type::Path(type_path) if type_path.qself.is_some() => {
            unsupported("qualified associated type")
        }
        syn::Type::Path(type_path) => convert_path(&type_path.path, scope, context),
        syn::Type::BareFn(_) => unsupported("function pointer"),
        syn::Type::TraitObject(_) => unsupported("trait object"),
        syn::Type::ImplTrait(_) => unsupported("impl Trait"),
        syn::Type::Never(_) => unsupported("never type"),
        syn::Type::Ptr(_) => unsupported("raw pointer"),
        _ => unsupported("type syntax"),
    }
}

fn convert_path(path: &syn::Path, scope: &TypeScope, context: &str) -> Rc<SignatureModel> {
    let Some(last) = path.segments.last() else {
        let description = format!("empty path in {}", context);
        return SignatureModel::of(SignatureKind::Unsupported(description));
    };
    let name = unraw(&last.ident);

    if path.segments.len() == 1 {
        if let Some(bound) = scope.bindings.get(&name) {
            return bound.clone();
        }
        if scope.variables.contains(&name) {
            return SignatureModel::type_variable(name);
        }
        if name == "Self" {
            return SignatureModel::self_type();
        }
    }

    let arguments: Vec<Rc<SignatureModel>> = type_arguments(&last.arguments)
        .into_iter()
        .map(|argument| convert_type(argument, scope, context))
        .collect();
    let first = arguments.first().cloned();
    let missing = || {
        SignatureModel::of(SignatureKind::Unsupported(format!(
            "`{}` without type arguments in {}",
            name, context
        )))
    };

    match name.as_str() {
        "Box" | "Rc" | "Arc" | "Cow" => first.unwrap_or_else(missing),
        "Option" => first.map(SignatureModel::optional).unwrap_or_else(missing),
        "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" => {
            first.map(SignatureModel::array).unwrap_or_else(missing)
        }
        "HashMap" | "BTreeMap" => match arguments.as_slice() {
            [key, value] => SignatureModel::map(key.clone(), value.clone()),
            _ => missing(),
        },
        "PhantomData" => SignatureModel::class("PhantomData"),
        _ => match BaseType::from_name(&name) {
            Some(base) if arguments.is_empty() => SignatureModel::base(base),
            _ => {
                let written: Vec<String> = path.segments.iter().map(|s| unraw(&s.ident)).collect();
                SignatureModel::generic(scope.module.qualify(&written), arguments)
            }
        },
    }
}

fn type_arguments(arguments: &syn::PathArguments) -> Vec<&syn::Type> {
    match arguments {
        syn::PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn generic_names(generics: &syn::Generics) -> Vec<String> {
    generics.type_params().map(|param| unraw(&param.ident)).collect()
}

fn is_phantom(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Path(type_path)
        if type_path.path.segments.last().is_some_and(|s| s.ident == "PhantomData"))
}

fn unraw(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    match name.strip_prefix("r#") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

fn has_annotation(attrs: &[syn::Attribute], name: &str) -> bool {
    annotations(attrs).iter().any(|a| a.is(name))
}

/// Attributes as annotations; doc comments are not annotations.
fn annotations(attrs: &[syn::Attribute]) -> Vec<AnnotationInfo> {
    attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("doc"))
        .map(annotation)
        .collect()
}

fn annotation(attr: &syn::Attribute) -> AnnotationInfo {
    let name = attr
        .path()
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::");
    let arguments = match &attr.meta {
        syn::Meta::Path(_) => Vec::new(),
        syn::Meta::NameValue(name_value) => expr_value(&name_value.value)
            .map(|value| vec![AnnotationArgument { name: None, value }])
            .unwrap_or_default(),
        syn::Meta::List(list) => {
            match list.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
                Ok(exprs) => exprs.iter().filter_map(expr_argument).collect(),
                Err(e) => {
                    debug!("Attribute `{}` has arguments that are not expressions: {}", name, e);
                    Vec::new()
                }
            }
        }
    };
    AnnotationInfo { name, arguments }
}

fn expr_argument(expr: &Expr) -> Option<AnnotationArgument> {
    match expr {
        Expr::Assign(assign) => {
            let Expr::Path(left) = assign.left.as_ref() else {
                return None;
            };
            Some(AnnotationArgument {
                name: Some(left.path.get_ident()?.to_string()),
                value: expr_value(&assign.right)?,
            })
        }
        other => expr_value(other).map(|value| AnnotationArgument { name: None, value }),
    }
}

fn expr_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            Lit::Int(i) => Some(i.base10_digits().to_string()),
            Lit::Bool(b) => Some(b.value.to_string()),
            _ => None,
        },
        Expr::Path(path) => Some(
            path.path
                .segments
                .iter()
                .map(|s| s.ident.to_string())
                .collect::<Vec<_>>()
                .join("::"),
        ),
        _ => None,
    }
}

/// Reads `rename`, `skip` and `flatten` out of `#[serde(...)]` attributes.
fn serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde = SerdeAttributes::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        for argument in annotation(attr).arguments {
            match (argument.name.as_deref(), argument.value.as_str()) {
                (Some("rename"), value) => serde.rename = Some(value.to_string()),
                (None, "skip") | (None, "skip_serializing") => serde.skip = true,
                (None, "flatten") => serde.flatten = true,
                _ => {}
            }
        }
    }
    serde
}
