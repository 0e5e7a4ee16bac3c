//! Host capability tables.
//!
//! A host type is described once, up front, by a [`TypeDef`]: its kind,
//! base type and interfaces, and every member the expression language may
//! touch (properties, methods, constructors, indexers, an enumerator). Each
//! member carries the native closure that implements it, so the type checker
//! binds against the table and the evaluator calls through it. No runtime
//! reflection is involved.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::overload::Candidate;
use crate::ty::{next_type_id, Ty};
use crate::value::Value;

/// Failure raised by a native member implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("object reference not set to an instance of an object")]
    NullReference,
    #[error("expected a value of type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },
    #[error("index was outside the bounds of the array")]
    IndexOutOfRange,
    #[error("input string '{0}' was not in a correct format")]
    Format(String),
    #[error("value was either too large or too small for '{0}'")]
    Overflow(String),
    #[error("sequence contains no elements")]
    EmptySequence,
    #[error("{0}")]
    Other(String),
}

pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, HostError> + Send + Sync>;
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync>;
pub type ConstructorFn = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync>;
pub type EnumeratorFn = Arc<dyn Fn(&Value) -> Result<Vec<Value>, HostError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    /// A class with static members only (`Math`, `Convert`).
    Static,
}

/// A property or field. Static members receive `Value::Null` as receiver.
#[derive(Clone)]
pub struct Property {
    pub name: String,
    pub ty: Ty,
    pub is_static: bool,
    pub get: Getter,
}

#[derive(Clone)]
pub struct Method {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub is_static: bool,
    pub call: NativeFn,
}

#[derive(Clone)]
pub struct Constructor {
    pub params: Vec<Ty>,
    pub call: ConstructorFn,
}

#[derive(Clone)]
pub struct Indexer {
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub call: NativeFn,
}

impl Candidate for Method {
    fn param_types(&self) -> &[Ty] {
        &self.params
    }
}

impl Candidate for Constructor {
    fn param_types(&self) -> &[Ty] {
        &self.params
    }
}

impl Candidate for Indexer {
    fn param_types(&self) -> &[Ty] {
        &self.params
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}) -> {}", self.name, self.params, self.ret)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new({:?})", self.params)
    }
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "this[{:?}] -> {}", self.params, self.ret)
    }
}

/// The capability table of one type.
pub struct TypeDef {
    id: u32,
    name: String,
    kind: TypeKind,
    base: Option<Ty>,
    interfaces: Vec<Ty>,
    enumerator: Option<EnumeratorFn>,
    properties: Vec<Property>,
    methods: Vec<Method>,
    constructors: Vec<Constructor>,
    indexers: Vec<Indexer>,
}

impl TypeDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn base(&self) -> Option<&Ty> {
        self.base.as_ref()
    }

    pub fn interfaces(&self) -> &[Ty] {
        &self.interfaces
    }

    pub fn enumerator(&self) -> Option<&EnumeratorFn> {
        self.enumerator.as_ref()
    }

    /// Declared property or field with the given name, ignoring case.
    pub fn property(&self, name: &str, is_static: bool) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.is_static == is_static && p.name.eq_ignore_ascii_case(name))
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Declared methods with the given name, ignoring case.
    pub fn methods<'a>(&'a self, name: &'a str, is_static: bool) -> impl Iterator<Item = &'a Method> {
        self.methods
            .iter()
            .filter(move |m| m.is_static == is_static && m.name.eq_ignore_ascii_case(name))
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn indexers(&self) -> &[Indexer] {
        &self.indexers
    }
}

/// Builder for a [`TypeDef`].
///
/// ```ignore
/// let point = HostType::structure("Point")
///     .property("X", Ty::Int32, |this| Ok(Value::Int32(this.downcast_ref::<Point>()?.x)))
///     .build();
/// ```
pub struct TypeBuilder {
    def: TypeDef,
}

impl TypeBuilder {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        TypeBuilder {
            def: TypeDef {
                id: next_type_id(),
                name: name.into(),
                kind,
                base: None,
                interfaces: Vec::new(),
                enumerator: None,
                properties: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
                indexers: Vec::new(),
            },
        }
    }

    /// Builder for the table of a type that already has a `Ty` (the
    /// builtins).
    pub(crate) fn for_builtin(ty: &Ty, kind: TypeKind) -> Self {
        TypeBuilder::new(ty.to_string(), kind)
    }

    pub fn base(mut self, ty: Ty) -> Self {
        self.def.base = Some(ty);
        self
    }

    pub fn implements(mut self, ty: Ty) -> Self {
        self.def.interfaces.push(ty);
        self
    }

    /// Declare `IEnumerable<elem>` and the closure that lists the elements.
    pub fn enumerable(
        mut self,
        elem: Ty,
        items: impl Fn(&Value) -> Result<Vec<Value>, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.def.interfaces.push(Ty::enumerable(elem));
        self.def.enumerator = Some(Arc::new(items));
        self
    }

    pub fn property(
        self,
        name: impl Into<String>,
        ty: Ty,
        get: impl Fn(&Value) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.add_property(name.into(), ty, false, Arc::new(get))
    }

    pub fn static_property(
        self,
        name: impl Into<String>,
        ty: Ty,
        get: impl Fn() -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.add_property(name.into(), ty, true, Arc::new(move |_: &Value| get()))
    }

    fn add_property(mut self, name: String, ty: Ty, is_static: bool, get: Getter) -> Self {
        self.def.properties.push(Property {
            name,
            ty,
            is_static,
            get,
        });
        self
    }

    pub fn method(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = Ty>,
        ret: Ty,
        call: impl Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.add_method(name.into(), params.into_iter().collect(), ret, false, Arc::new(call))
    }

    pub fn static_method(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = Ty>,
        ret: Ty,
        call: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        let call: NativeFn = Arc::new(move |_: &Value, args: &[Value]| call(args));
        self.add_method(name.into(), params.into_iter().collect(), ret, true, call)
    }

    fn add_method(
        mut self,
        name: String,
        params: Vec<Ty>,
        ret: Ty,
        is_static: bool,
        call: NativeFn,
    ) -> Self {
        self.def.methods.push(Method {
            name,
            params,
            ret,
            is_static,
            call,
        });
        self
    }

    pub fn constructor(
        mut self,
        params: impl IntoIterator<Item = Ty>,
        call: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.def.constructors.push(Constructor {
            params: params.into_iter().collect(),
            call: Arc::new(call),
        });
        self
    }

    pub fn indexer(
        mut self,
        params: impl IntoIterator<Item = Ty>,
        ret: Ty,
        call: impl Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.def.indexers.push(Indexer {
            params: params.into_iter().collect(),
            ret,
            call: Arc::new(call),
        });
        self
    }

    pub(crate) fn finish(self) -> Arc<TypeDef> {
        Arc::new(self.def)
    }

    pub fn build(self) -> HostType {
        HostType(self.finish())
    }
}

/// A caller-registered host type.
#[derive(Clone)]
pub struct HostType(Arc<TypeDef>);

impl HostType {
    pub fn class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Class)
    }

    pub fn structure(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Struct)
    }

    pub fn interface(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Interface)
    }

    pub fn static_class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Static)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn def(&self) -> &Arc<TypeDef> {
        &self.0
    }

    pub fn ty(&self) -> Ty {
        Ty::Host(self.clone())
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for HostType {}

impl Hash for HostType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host({})", self.0.name)
    }
}
