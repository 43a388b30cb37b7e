//! Host class model
//!
//! Host classes are described at runtime: a [`HostClass`] carries its
//! supertypes, fields, constructors and methods, and every method carries a
//! [`MethodBody`] closure that implements it. Classes are immutable once
//! built; only static field values change afterwards.
//!
//! ## Building a class
//!
//! ```ignore
//! let point = HostClass::builder("Point")
//!     .field(HostField::new("x", HostType::int()))
//!     .constructor(HostMethod::constructor().param(HostType::int()).body(|inv| {
//!         inv.this_object()?.set_field("x", inv.arg(0).clone());
//!         Ok(HostValue::Null)
//!     }))
//!     .method(HostMethod::new("getX").returns(HostType::int()).body(|inv| {
//!         Ok(inv.this_object()?.get_field("x").unwrap_or(HostValue::Int(0)))
//!     }))
//!     .build();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::adapter::AdapterInfo;
use crate::context::HostContext;
use crate::exception::HostException;

use super::builtins;
use super::types::HostType;
use super::value::{HostObject, HostValue};

/// Unique class identifier
pub type ClassId = u64;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Member and class visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    /// Declaring class only
    Private,
    /// Same package
    Package,
    /// Subclasses and same package
    Protected,
    /// Everyone
    Public,
}

/// What sort of type a class is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Concrete class
    Class,
    /// Class with abstract methods; not instantiable
    AbstractClass,
    /// Interface
    Interface,
}

/// Implementation of a host method or constructor
pub type MethodBody =
    Arc<dyn Fn(&Invocation<'_>) -> Result<HostValue, HostException> + Send + Sync>;

/// Everything a method body sees when it runs
pub struct Invocation<'a> {
    /// Context the call arrived through
    pub ctx: &'a Arc<HostContext>,
    /// Receiver; `Null` for static methods
    pub receiver: &'a HostValue,
    /// Converted arguments. A variadic tail arrives as one array.
    pub args: &'a [HostValue],
    /// The method being run
    pub method: &'a HostMethod,
}

impl<'a> Invocation<'a> {
    /// Argument at `index`, `Null` when absent
    pub fn arg(&self, index: usize) -> &HostValue {
        self.args.get(index).unwrap_or(&HostValue::Null)
    }

    /// The receiver as a host object
    pub fn this_object(&self) -> Result<&HostObject, HostException> {
        match self.receiver {
            HostValue::Object(object) => Ok(object),
            other => Err(HostException::illegal_state(&format!(
                "{} called on non-object receiver {}",
                self.method.name(),
                other.display_string()
            ))),
        }
    }
}

// ============================================================================
// Methods
// ============================================================================

/// A method or constructor
#[derive(Clone)]
pub struct HostMethod {
    name: String,
    params: Vec<HostType>,
    return_type: Option<HostType>,
    varargs: bool,
    visibility: Visibility,
    is_static: bool,
    is_abstract: bool,
    is_final: bool,
    exported: bool,
    is_constructor: bool,
    declaring_class: String,
    declaring_id: ClassId,
    body: Option<MethodBody>,
}

impl HostMethod {
    /// A public instance method named `name` returning nothing
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            return_type: None,
            varargs: false,
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            is_final: false,
            exported: false,
            is_constructor: false,
            declaring_class: String::new(),
            declaring_id: 0,
            body: None,
        }
    }

    /// A public constructor
    pub fn constructor() -> Self {
        let mut method = Self::new("<init>");
        method.is_constructor = true;
        method
    }

    /// Append a parameter
    pub fn param(mut self, ty: HostType) -> Self {
        self.params.push(ty);
        self
    }

    /// Append a variadic tail of `element` values
    pub fn varargs(mut self, element: HostType) -> Self {
        self.params.push(HostType::array_of(element));
        self.varargs = true;
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: HostType) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Declared without a body; subclasses or adapters supply one
    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark as final; adapters do not override it
    pub fn as_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark as explicitly exported to foreign code
    pub fn as_exported(mut self) -> Self {
        self.exported = true;
        self
    }

    /// Set the implementation
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<HostValue, HostException> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Copy of this method's shape (name, parameters, return type) with no
    /// body and public visibility
    pub(crate) fn same_shape(&self) -> Self {
        let mut method = Self::new(&self.name);
        method.params = self.params.clone();
        method.varargs = self.varargs;
        method.return_type = self.return_type.clone();
        method.is_constructor = self.is_constructor;
        method.exported = self.exported;
        method
    }

    pub(crate) fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Method name; `<init>` for constructors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types, the varargs array last
    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    /// Declared return type; `None` for void
    pub fn return_type(&self) -> Option<&HostType> {
        self.return_type.as_ref()
    }

    /// True when the last parameter is variadic
    pub fn is_varargs(&self) -> bool {
        self.varargs
    }

    /// Declared visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// True for static methods
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// True when declared abstract or without a body
    pub fn is_abstract(&self) -> bool {
        self.is_abstract || (self.body.is_none() && !self.is_constructor)
    }

    /// True when subclasses may not override
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// True when marked as exported
    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// True for constructors
    pub fn is_constructor(&self) -> bool {
        self.is_constructor
    }

    /// Name of the class that declares this method
    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    /// Identity of the declaring class
    pub fn declaring_id(&self) -> ClassId {
        self.declaring_id
    }

    /// Method body, if any
    pub fn body_fn(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    /// Number of fixed parameters, excluding a variadic tail
    pub fn fixed_arity(&self) -> usize {
        if self.varargs {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }

    /// Whether a call with `argc` arguments can match this method
    pub fn accepts_arity(&self, argc: usize) -> bool {
        if self.varargs {
            argc >= self.params.len() - 1
        } else {
            argc == self.params.len()
        }
    }

    /// Same name and parameter types
    pub fn same_signature(&self, other: &HostMethod) -> bool {
        self.name == other.name && self.params == other.params
    }

    /// Readable signature, `sum(int, int...)`
    pub fn signature(&self) -> String {
        let last = self.params.len().saturating_sub(1);
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| match (self.varargs && i == last, ty.component()) {
                (true, Some(element)) => format!("{}...", element.name()),
                _ => ty.name(),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_class, self.signature())
    }
}

// ============================================================================
// Fields
// ============================================================================

/// A declared field
#[derive(Debug, Clone)]
pub struct HostField {
    name: String,
    ty: HostType,
    visibility: Visibility,
    is_static: bool,
    is_final: bool,
    exported: bool,
}

impl HostField {
    /// A public, mutable instance field
    pub fn new(name: &str, ty: HostType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            visibility: Visibility::Public,
            is_static: false,
            is_final: false,
            exported: false,
        }
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark as exported
    pub fn as_exported(mut self) -> Self {
        self.exported = true;
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    /// Declared visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// True for static fields
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// True for final fields
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// True when marked as exported
    pub fn is_exported(&self) -> bool {
        self.exported
    }
}

// ============================================================================
// Classes
// ============================================================================

/// A host class, abstract class or interface
pub struct HostClass {
    id: ClassId,
    name: String,
    kind: ClassKind,
    is_final: bool,
    visibility: Visibility,
    functional: bool,
    superclass: Option<Arc<HostClass>>,
    interfaces: Vec<Arc<HostClass>>,
    methods: Vec<Arc<HostMethod>>,
    constructors: Vec<Arc<HostMethod>>,
    fields: Vec<HostField>,
    statics: RwLock<FxHashMap<String, HostValue>>,
    adapter: Option<AdapterInfo>,
}

impl HostClass {
    /// Start describing a concrete class
    pub fn builder(name: &str) -> HostClassBuilder {
        HostClassBuilder::new(name)
    }

    /// Identity of this class
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class, abstract class or interface
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// True for interfaces
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Interfaces and abstract classes cannot be instantiated
    pub fn is_abstract(&self) -> bool {
        self.kind != ClassKind::Class
    }

    /// True when the class cannot be extended
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Declared visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Explicitly marked as a functional interface
    pub fn is_functional_marked(&self) -> bool {
        self.functional
    }

    /// Direct superclass; `None` for `Object` and interfaces
    pub fn superclass(&self) -> Option<&Arc<HostClass>> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[Arc<HostClass>] {
        &self.interfaces
    }

    /// Methods declared directly on this class
    pub fn declared_methods(&self) -> &[Arc<HostMethod>] {
        &self.methods
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[Arc<HostMethod>] {
        &self.constructors
    }

    /// Fields declared directly on this class
    pub fn declared_fields(&self) -> &[HostField] {
        &self.fields
    }

    /// Adapter metadata when this class was generated by the adapter factory
    pub fn adapter_info(&self) -> Option<&AdapterInfo> {
        self.adapter.as_ref()
    }

    /// Number of superclass links above this class
    pub fn depth(&self) -> usize {
        self.superclass.as_ref().map_or(0, |s| s.depth() + 1)
    }

    /// Reflexive, transitive subtype check. Every class is a subtype of `Object`.
    pub fn is_subtype_of(&self, other: &HostClass) -> bool {
        if self.id == other.id || other.id == builtins::object().id {
            return true;
        }
        if let Some(superclass) = &self.superclass {
            if superclass.is_subtype_of(other) {
                return true;
            }
        }
        self.interfaces.iter().any(|i| i.is_subtype_of(other))
    }

    /// Instance methods visible on this class, most derived first. A method
    /// overridden by a more derived declaration with the same signature is
    /// left out. Each entry carries the superclass depth of its declarer.
    pub fn instance_methods(&self) -> Vec<(Arc<HostMethod>, usize)> {
        let mut out: Vec<(Arc<HostMethod>, usize)> = Vec::new();
        self.collect_methods(false, &mut out);
        out
    }

    /// Static methods of this class and its superclasses, most derived first
    pub fn static_methods(&self) -> Vec<(Arc<HostMethod>, usize)> {
        let mut out: Vec<(Arc<HostMethod>, usize)> = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            let depth = class.depth();
            for method in class.methods.iter().filter(|m| m.is_static()) {
                if !out.iter().any(|(m, _)| m.same_signature(method)) {
                    out.push((method.clone(), depth));
                }
            }
            current = class.superclass.as_deref();
        }
        out
    }

    fn collect_methods(&self, interface_only: bool, out: &mut Vec<(Arc<HostMethod>, usize)>) {
        let depth = if interface_only { 0 } else { self.depth() };
        for method in self.methods.iter().filter(|m| !m.is_static()) {
            let overridden = out
                .iter()
                .position(|(m, _)| m.same_signature(method));
            match overridden {
                None => out.push((method.clone(), depth)),
                // a concrete default replaces an abstract declaration seen earlier
                Some(i) if out[i].0.is_abstract() && !method.is_abstract() => {
                    out[i] = (method.clone(), depth)
                }
                Some(_) => {}
            }
        }
        if let Some(superclass) = &self.superclass {
            superclass.collect_methods(false, out);
        }
        for interface in &self.interfaces {
            interface.collect_methods(true, out);
        }
    }

    /// Methods a concrete subclass would still have to implement
    pub fn abstract_methods(&self) -> Vec<Arc<HostMethod>> {
        self.instance_methods()
            .into_iter()
            .filter(|(m, _)| m.is_abstract())
            .map(|(m, _)| m)
            .collect()
    }

    /// The single abstract method of a functional interface
    pub fn functional_method(&self) -> Option<Arc<HostMethod>> {
        if !self.is_interface() {
            return None;
        }
        let mut abstract_methods = self.abstract_methods();
        if abstract_methods.len() == 1 {
            abstract_methods.pop()
        } else {
            None
        }
    }

    /// Instance fields of this class and its superclasses, most derived first
    pub fn instance_fields(&self) -> Vec<HostField> {
        let mut out: Vec<HostField> = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            for field in class.fields.iter().filter(|f| !f.is_static()) {
                if !out.iter().any(|f| f.name() == field.name()) {
                    out.push(field.clone());
                }
            }
            current = class.superclass.as_deref();
        }
        out
    }

    /// Static field `name` declared on this class or a superclass, with its owner
    pub fn find_static_field(&self, name: &str) -> Option<(&HostField, &HostClass)> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(field) = class.fields.iter().find(|f| f.is_static() && f.name() == name) {
                return Some((field, class));
            }
            current = class.superclass.as_deref();
        }
        None
    }

    /// Current value of a static field declared on this class
    pub fn static_value(&self, name: &str) -> Option<HostValue> {
        self.statics.read().get(name).cloned()
    }

    /// Store a static field declared on this class
    pub fn set_static_value(&self, name: &str, value: HostValue) {
        self.statics.write().insert(name.to_string(), value);
    }
}

impl PartialEq for HostClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HostClass {}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HostClass`]
pub struct HostClassBuilder {
    name: String,
    kind: ClassKind,
    is_final: bool,
    visibility: Visibility,
    functional: bool,
    root: bool,
    superclass: Option<Arc<HostClass>>,
    interfaces: Vec<Arc<HostClass>>,
    methods: Vec<HostMethod>,
    constructors: Vec<HostMethod>,
    fields: Vec<HostField>,
    statics: FxHashMap<String, HostValue>,
    adapter: Option<AdapterInfo>,
}

impl HostClassBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ClassKind::Class,
            is_final: false,
            visibility: Visibility::Public,
            functional: false,
            root: false,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            statics: FxHashMap::default(),
            adapter: None,
        }
    }

    /// Declare an interface
    pub fn interface(mut self) -> Self {
        self.kind = ClassKind::Interface;
        self
    }

    /// Declare an abstract class
    pub fn abstract_class(mut self) -> Self {
        self.kind = ClassKind::AbstractClass;
        self
    }

    /// Declare a final class
    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark an interface as functional, allowing function proxies for it
    /// under any policy
    pub fn functional(mut self) -> Self {
        self.functional = true;
        self
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Extend `superclass`
    pub fn extends(mut self, superclass: &Arc<HostClass>) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    /// Implement `interface`
    pub fn implements(mut self, interface: &Arc<HostClass>) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Add a method
    pub fn method(mut self, method: HostMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: HostMethod) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a field
    pub fn field(mut self, field: HostField) -> Self {
        self.fields.push(field);
        self
    }

    /// Initial value of a static field
    pub fn static_value(mut self, name: &str, value: HostValue) -> Self {
        self.statics.insert(name.to_string(), value);
        self
    }

    pub(crate) fn root(mut self) -> Self {
        self.root = true;
        self
    }

    pub(crate) fn adapter(mut self, info: AdapterInfo) -> Self {
        self.adapter = Some(info);
        self
    }

    /// Finish the class. Concrete classes without constructors get a public
    /// no-argument one; classes without a superclass extend `Object`.
    pub fn build(self) -> Arc<HostClass> {
        let id = NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed);
        let superclass = match self.superclass {
            Some(superclass) => Some(superclass),
            None if self.root || self.kind == ClassKind::Interface => None,
            None => Some(builtins::object().clone()),
        };

        let mut constructors = self.constructors;
        if constructors.is_empty() && self.kind != ClassKind::Interface {
            constructors.push(HostMethod::constructor());
        }

        let name = self.name;
        let declare = |mut method: HostMethod| {
            method.declaring_class = name.clone();
            method.declaring_id = id;
            Arc::new(method)
        };
        let methods = self.methods.into_iter().map(declare).collect();
        let constructors = constructors.into_iter().map(declare).collect();

        let mut statics = self.statics;
        for field in self.fields.iter().filter(|f| f.is_static()) {
            statics
                .entry(field.name().to_string())
                .or_insert_with(|| field.ty().default_value());
        }

        Arc::new(HostClass {
            id,
            name,
            kind: self.kind,
            is_final: self.is_final,
            visibility: self.visibility,
            functional: self.functional,
            superclass,
            interfaces: self.interfaces,
            methods,
            constructors,
            fields: self.fields,
            statics: RwLock::new(statics),
            adapter: self.adapter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> Arc<HostClass> {
        HostClass::builder("Shape")
            .interface()
            .method(HostMethod::new("area").returns(HostType::double()).as_abstract())
            .method(
                HostMethod::new("describe")
                    .returns(HostType::String)
                    .body(|_| Ok(HostValue::from("shape"))),
            )
            .build()
    }

    #[test]
    fn test_builder_assigns_declaring_class() {
        let class = HostClass::builder("Counter")
            .method(HostMethod::new("inc").body(|_| Ok(HostValue::Null)))
            .build();
        let method = &class.declared_methods()[0];
        assert_eq!(method.declaring_class(), "Counter");
        assert_eq!(method.declaring_id(), class.id());
        assert_eq!(class.constructors().len(), 1);
        assert_eq!(class.depth(), 1);
    }

    #[test]
    fn test_subtyping() {
        let shape = shape();
        let base = HostClass::builder("Base").abstract_class().implements(&shape).build();
        let square = HostClass::builder("Square").extends(&base).build();
        assert!(square.is_subtype_of(&base));
        assert!(square.is_subtype_of(&shape));
        assert!(square.is_subtype_of(builtins::object()));
        assert!(!base.is_subtype_of(&square));
        assert_eq!(square.depth(), 2);
    }

    #[test]
    fn test_functional_method() {
        let shape = shape();
        let method = shape.functional_method().unwrap();
        assert_eq!(method.name(), "area");

        let two = HostClass::builder("Two")
            .interface()
            .method(HostMethod::new("a").as_abstract())
            .method(HostMethod::new("b").as_abstract())
            .build();
        assert!(two.functional_method().is_none());
    }

    #[test]
    fn test_overridden_methods_hidden() {
        let base = HostClass::builder("Base")
            .method(HostMethod::new("name").body(|_| Ok(HostValue::from("base"))))
            .build();
        let derived = HostClass::builder("Derived")
            .extends(&base)
            .method(HostMethod::new("name").body(|_| Ok(HostValue::from("derived"))))
            .build();
        let methods = derived.instance_methods();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].0.declaring_class(), "Derived");
        assert_eq!(methods[0].1, 2);
    }

    #[test]
    fn test_signature_rendering() {
        let m = HostMethod::new("sum")
            .param(HostType::int())
            .varargs(HostType::int());
        assert_eq!(m.signature(), "sum(int, int...)");
        assert_eq!(m.fixed_arity(), 1);
        assert!(m.accepts_arity(1));
        assert!(m.accepts_arity(4));
        assert!(!m.accepts_arity(0));
    }

    #[test]
    fn test_static_fields_default() {
        let class = HostClass::builder("Config")
            .field(HostField::new("LIMIT", HostType::int()).as_static())
            .build();
        assert!(matches!(class.static_value("LIMIT"), Some(HostValue::Int(0))));
        class.set_static_value("LIMIT", HostValue::Int(5));
        assert!(matches!(class.static_value("LIMIT"), Some(HostValue::Int(5))));
    }
}
