//! Read-only models of the classes, members and type signatures being traversed.
//!
//! A "class" here is any named Rust type the parser can describe: a struct with
//! named fields, a newtype, a unit-only enum, or an enum whose variants each wrap a
//! single type. Models are immutable once built and shared through [`Rc`]; the
//! traversal engine never mutates them. They can be produced by the syn-based
//! [`loader`] or assembled by hand with the builder methods below.

pub mod loader;
pub mod registry;

pub use registry::ClassRegistry;

use std::fmt;
use std::rc::Rc;

/// Name of the module that owns items declared at the crate root.
pub const ROOT_PACKAGE: &str = "crate";

/// One argument of an attribute, e.g. `"users"` or `name = "users"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationArgument {
    pub name: Option<String>,
    pub value: String,
}

/// An attribute attached to a model element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationInfo {
    /// Attribute path as written, e.g. `nonnull` or `api::nullable`
    pub name: String,
    pub arguments: Vec<AnnotationArgument>,
}

impl AnnotationInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.arguments.push(AnnotationArgument {
            name: None,
            value: value.into(),
        });
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push(AnnotationArgument {
            name: Some(name.into()),
            value: value.into(),
        });
        self
    }

    /// Last path segment of the attribute name
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Matches either the full attribute path or its last segment.
    pub fn is(&self, name: &str) -> bool {
        self.name == name || self.simple_name() == name
    }

    /// The first positional argument, or the value of a `name`/`value` argument.
    pub fn value(&self) -> Option<&str> {
        self.arguments
            .iter()
            .find(|arg| arg.name.is_none())
            .or_else(|| {
                self.arguments
                    .iter()
                    .find(|arg| matches!(arg.name.as_deref(), Some("name") | Some("value")))
            })
            .map(|arg| arg.value.as_str())
    }
}

/// A module and the inner attributes declared on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageInfo {
    pub name: String,
    pub annotations: Vec<AnnotationInfo>,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: AnnotationInfo) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Scalar types with a fixed schema representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    String,
    Unit,
}

impl BaseType {
    /// Maps a Rust type name to a base type, if it is one.
    pub fn from_name(name: &str) -> Option<BaseType> {
        match name {
            "bool" => Some(BaseType::Bool),
            "char" => Some(BaseType::Char),
            "i8" => Some(BaseType::I8),
            "i16" => Some(BaseType::I16),
            "i32" => Some(BaseType::I32),
            "i64" => Some(BaseType::I64),
            "i128" => Some(BaseType::I128),
            "isize" => Some(BaseType::Isize),
            "u8" => Some(BaseType::U8),
            "u16" => Some(BaseType::U16),
            "u32" => Some(BaseType::U32),
            "u64" => Some(BaseType::U64),
            "u128" => Some(BaseType::U128),
            "usize" => Some(BaseType::Usize),
            "f32" => Some(BaseType::F32),
            "f64" => Some(BaseType::F64),
            "String" | "str" => Some(BaseType::String),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::Char => "char",
            BaseType::I8 => "i8",
            BaseType::I16 => "i16",
            BaseType::I32 => "i32",
            BaseType::I64 => "i64",
            BaseType::I128 => "i128",
            BaseType::Isize => "isize",
            BaseType::U8 => "u8",
            BaseType::U16 => "u16",
            BaseType::U32 => "u32",
            BaseType::U64 => "u64",
            BaseType::U128 => "u128",
            BaseType::Usize => "usize",
            BaseType::F32 => "f32",
            BaseType::F64 => "f64",
            BaseType::String => "String",
            BaseType::Unit => "()",
        }
    }
}

/// The shape of a type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Base(BaseType),
    /// A named type, resolved against the [`ClassRegistry`] during traversal
    Class {
        name: String,
        type_arguments: Vec<Rc<SignatureModel>>,
    },
    /// `Option<T>`
    Optional(Rc<SignatureModel>),
    /// `Vec<T>`, slices, arrays and sets
    Array(Rc<SignatureModel>),
    /// `HashMap<K, V>` and `BTreeMap<K, V>`
    Map(Rc<SignatureModel>, Rc<SignatureModel>),
    SelfType,
    TypeVariable(String),
    /// Syntax with no schema representation; fatal once a plugin reaches it
    Unsupported(String),
}

/// A type reference together with the attributes attached to its use site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureModel {
    pub kind: SignatureKind,
    pub annotations: Vec<AnnotationInfo>,
}

impl SignatureModel {
    pub fn of(kind: SignatureKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            annotations: Vec::new(),
        })
    }

    pub fn annotated(kind: SignatureKind, annotations: Vec<AnnotationInfo>) -> Rc<Self> {
        Rc::new(Self { kind, annotations })
    }

    pub fn base(base: BaseType) -> Rc<Self> {
        Self::of(SignatureKind::Base(base))
    }

    pub fn string() -> Rc<Self> {
        Self::base(BaseType::String)
    }

    pub fn unit() -> Rc<Self> {
        Self::base(BaseType::Unit)
    }

    pub fn class(name: impl Into<String>) -> Rc<Self> {
        Self::generic(name, Vec::new())
    }

    pub fn generic(name: impl Into<String>, type_arguments: Vec<Rc<SignatureModel>>) -> Rc<Self> {
        Self::of(SignatureKind::Class {
            name: name.into(),
            type_arguments,
        })
    }

    pub fn optional(inner: Rc<SignatureModel>) -> Rc<Self> {
        Self::of(SignatureKind::Optional(inner))
    }

    pub fn array(inner: Rc<SignatureModel>) -> Rc<Self> {
        Self::of(SignatureKind::Array(inner))
    }

    pub fn map(key: Rc<SignatureModel>, value: Rc<SignatureModel>) -> Rc<Self> {
        Self::of(SignatureKind::Map(key, value))
    }

    pub fn self_type() -> Rc<Self> {
        Self::of(SignatureKind::SelfType)
    }

    pub fn type_variable(name: impl Into<String>) -> Rc<Self> {
        Self::of(SignatureKind::TypeVariable(name.into()))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, SignatureKind::Optional(_))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind, SignatureKind::Base(BaseType::Unit))
    }

    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            SignatureKind::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Nested signatures, in declaration order.
    pub fn type_arguments(&self) -> Vec<&Rc<SignatureModel>> {
        match &self.kind {
            SignatureKind::Class { type_arguments, .. } => type_arguments.iter().collect(),
            SignatureKind::Optional(inner) | SignatureKind::Array(inner) => vec![inner],
            SignatureKind::Map(key, value) => vec![key, value],
            SignatureKind::Base(_)
            | SignatureKind::SelfType
            | SignatureKind::TypeVariable(_)
            | SignatureKind::Unsupported(_) => Vec::new(),
        }
    }

    /// Rebuilds the signature with `f` applied to every nested argument.
    ///
    /// Returns the original `Rc` when `f` left every argument untouched.
    pub fn map_arguments<F>(this: &Rc<Self>, mut f: F) -> Rc<Self>
    where
        F: FnMut(&Rc<SignatureModel>) -> Rc<SignatureModel>,
    {
        let mut changed = false;
        let mut apply = |arg: &Rc<SignatureModel>| {
            let mapped = f(arg);
            changed |= !Rc::ptr_eq(&mapped, arg);
            mapped
        };
        let kind = match &this.kind {
            SignatureKind::Class {
                name,
                type_arguments,
            } => SignatureKind::Class {
                name: name.clone(),
                type_arguments: type_arguments.iter().map(&mut apply).collect(),
            },
            SignatureKind::Optional(inner) => SignatureKind::Optional(apply(inner)),
            SignatureKind::Array(inner) => SignatureKind::Array(apply(inner)),
            SignatureKind::Map(key, value) => {
                let key = apply(key);
                SignatureKind::Map(key, apply(value))
            }
            _ => return Rc::clone(this),
        };
        if changed {
            Rc::new(Self {
                kind,
                annotations: this.annotations.clone(),
            })
        } else {
            Rc::clone(this)
        }
    }
}

impl fmt::Display for SignatureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SignatureKind::Base(base) => write!(f, "{}", base.name()),
            SignatureKind::Class {
                name,
                type_arguments,
            } => {
                write!(f, "{}", name)?;
                if !type_arguments.is_empty() {
                    let args: Vec<String> = type_arguments.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            SignatureKind::Optional(inner) => write!(f, "Option<{}>", inner),
            SignatureKind::Array(inner) => write!(f, "Vec<{}>", inner),
            SignatureKind::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            SignatureKind::SelfType => write!(f, "Self"),
            SignatureKind::TypeVariable(name) => write!(f, "{}", name),
            SignatureKind::Unsupported(description) => write!(f, "{}", description),
        }
    }
}

/// Serde attributes that change how a field appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SerdeAttributes {
    pub rename: Option<String>,
    pub skip: bool,
    pub flatten: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    pub name: String,
    /// Qualified name of the declaring class
    pub owner: String,
    pub signature: Rc<SignatureModel>,
    pub annotations: Vec<AnnotationInfo>,
    /// Marker or bookkeeping members that never reach the wire (`PhantomData`)
    pub synthetic: bool,
    pub serde: SerdeAttributes,
}

impl FieldInfo {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: Rc<SignatureModel>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            signature,
            annotations: Vec::new(),
            synthetic: false,
            serde: SerdeAttributes::default(),
        }
    }

    pub fn with_annotation(mut self, annotation: AnnotationInfo) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn with_serde(mut self, serde: SerdeAttributes) -> Self {
        self.serde = serde;
        self
    }

    /// Name of the property on the wire
    pub fn serialized_name(&self) -> &str {
        self.serde.rename.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterInfo {
    /// `None` when the parameter is bound by a pattern rather than an identifier
    pub name: Option<String>,
    pub index: usize,
    pub owner: String,
    pub method: String,
    pub signature: Rc<SignatureModel>,
    pub annotations: Vec<AnnotationInfo>,
}

impl ParameterInfo {
    pub fn effective_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("arg{}", self.index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    pub name: String,
    pub owner: String,
    pub parameters: Vec<Rc<ParameterInfo>>,
    pub result: Rc<SignatureModel>,
    pub annotations: Vec<AnnotationInfo>,
}

impl MethodInfo {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        result: Rc<SignatureModel>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            parameters: Vec::new(),
            result,
            annotations: Vec::new(),
        }
    }

    pub fn with_parameter(self, name: &str, signature: Rc<SignatureModel>) -> Self {
        self.with_parameter_annotated(Some(name), signature, Vec::new())
    }

    pub fn with_parameter_annotated(
        mut self,
        name: Option<&str>,
        signature: Rc<SignatureModel>,
        annotations: Vec<AnnotationInfo>,
    ) -> Self {
        let parameter = ParameterInfo {
            name: name.map(str::to_string),
            index: self.parameters.len(),
            owner: self.owner.clone(),
            method: self.name.clone(),
            signature,
            annotations,
        };
        self.parameters.push(Rc::new(parameter));
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationInfo) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// A variant of a union-like enum: `Circle(Circle)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantInfo {
    pub name: String,
    pub signature: Rc<SignatureModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Struct,
    /// Tuple struct with exactly one field
    Newtype(Rc<SignatureModel>),
    UnitEnum { variants: Vec<String> },
    UnionEnum { variants: Vec<VariantInfo> },
    /// Declared type the pipeline cannot describe; fatal once reached
    Unsupported { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassInfo {
    /// Qualified name, e.g. `crate::api::UserEndpoint`
    pub name: String,
    pub simple_name: String,
    pub package: Rc<PackageInfo>,
    pub annotations: Vec<AnnotationInfo>,
    pub kind: ClassKind,
    pub fields: Vec<Rc<FieldInfo>>,
    /// Public instance methods, in declaration order
    pub methods: Vec<Rc<MethodInfo>>,
}

impl ClassInfo {
    /// Creates a struct model; the package is derived from the qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (package, simple_name) = match name.rsplit_once("::") {
            Some((package, simple)) => (package.to_string(), simple.to_string()),
            None => (ROOT_PACKAGE.to_string(), name.clone()),
        };
        Self {
            name,
            simple_name,
            package: Rc::new(PackageInfo::new(package)),
            annotations: Vec::new(),
            kind: ClassKind::Struct,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_package(mut self, package: Rc<PackageInfo>) -> Self {
        self.package = package;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationInfo) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds a field owned by this class.
    pub fn with_field(self, name: &str, signature: Rc<SignatureModel>) -> Self {
        let field = FieldInfo::new(self.name.clone(), name, signature);
        self.with_field_info(field)
    }

    pub fn with_field_info(mut self, field: FieldInfo) -> Self {
        self.fields.push(Rc::new(field));
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(Rc::new(method));
        self
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.is(name))
    }

    pub fn annotation(&self, name: &str) -> Option<&AnnotationInfo> {
        self.annotations.iter().find(|a| a.is(name))
    }

    pub fn build(self) -> Rc<ClassInfo> {
        Rc::new(self)
    }
}

/// Stable identity of a source model, independent of where it is visited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKey {
    Root,
    Endpoint(String),
    Entity(String),
    Method { owner: String, name: String },
    Field { owner: String, name: String },
    Parameter { owner: String, method: String, index: usize },
    /// Address of a shared signature model.
    ///
    /// Signatures have no name to key them by, so the `Rc` allocation is the
    /// identity. An address stays unique for as long as the allocation lives:
    /// keys must not outlive the models they were taken from. During a parse
    /// the tree arena owns every node, and with it every signature a key can
    /// point to, until the parse ends.
    Signature(usize),
    /// Addresses of the member signatures, in order
    Composite(Vec<usize>),
}

impl ModelKey {
    /// Key for `signature`; only valid while `signature` is alive.
    pub fn signature(signature: &Rc<SignatureModel>) -> Self {
        ModelKey::Signature(Rc::as_ptr(signature) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_keys_follow_the_shared_model() {
        let signature = SignatureModel::string();
        let shared = signature.clone();
        let equal_but_separate = SignatureModel::string();

        assert_eq!(ModelKey::signature(&signature), ModelKey::signature(&shared));
        assert_ne!(
            ModelKey::signature(&signature),
            ModelKey::signature(&equal_but_separate)
        );
    }

    #[test]
    fn test_annotation_matching() {
        let annotation = AnnotationInfo::new("api::nonnull");
        assert_eq!(annotation.simple_name(), "nonnull");
        assert!(annotation.is("nonnull"));
        assert!(annotation.is("api::nonnull"));
        assert!(!annotation.is("nullable"));
    }

    #[test]
    fn test_annotation_value() {
        let positional = AnnotationInfo::new("endpoint").with_value("users");
        assert_eq!(positional.value(), Some("users"));

        let named = AnnotationInfo::new("endpoint").with_named("name", "people");
        assert_eq!(named.value(), Some("people"));

        assert_eq!(AnnotationInfo::new("endpoint").value(), None);
    }

    #[test]
    fn test_class_package_from_name() {
        let class = ClassInfo::new("crate::api::UserEndpoint");
        assert_eq!(class.simple_name, "UserEndpoint");
        assert_eq!(class.package.name, "crate::api");

        let top = ClassInfo::new("Standalone");
        assert_eq!(top.package.name, ROOT_PACKAGE);
    }

    #[test]
    fn test_signature_display() {
        let sig = SignatureModel::optional(SignatureModel::array(SignatureModel::class("User")));
        assert_eq!(sig.to_string(), "Option<Vec<User>>");

        let map =
            SignatureModel::map(SignatureModel::string(), SignatureModel::base(BaseType::I64));
        assert_eq!(map.to_string(), "Map<String, i64>");
    }

    #[test]
    fn test_map_arguments_keeps_identity_when_unchanged() {
        let sig = SignatureModel::array(SignatureModel::string());
        let same = SignatureModel::map_arguments(&sig, Rc::clone);
        assert!(Rc::ptr_eq(&sig, &same));

        let changed = SignatureModel::map_arguments(&sig, |_| SignatureModel::base(BaseType::Bool));
        assert!(!Rc::ptr_eq(&sig, &changed));
        assert_eq!(changed.to_string(), "Vec<bool>");
    }

    #[test]
    fn test_method_parameters_are_indexed() {
        let method = MethodInfo::new("crate::E", "save", SignatureModel::unit())
            .with_parameter("user", SignatureModel::class("User"))
            .with_parameter_annotated(None, SignatureModel::string(), Vec::new());

        assert_eq!(method.parameters[0].effective_name(), "user");
        assert_eq!(method.parameters[1].index, 1);
        assert_eq!(method.parameters[1].effective_name(), "arg1");
        assert_eq!(method.parameters[1].method, "save");
    }

    #[test]
    fn test_field_serialized_name() {
        let field = FieldInfo::new("crate::User", "name", SignatureModel::string()).with_serde(
            SerdeAttributes {
                rename: Some("userName".to_string()),
                ..SerdeAttributes::default()
            },
        );
        assert_eq!(field.serialized_name(), "userName");
    }
}
