//! Host adapter generator
//!
//! An adapter is a generated concrete class that extends at most one host
//! class and implements any number of interfaces, with every overridable
//! instance method turned into a slot. A slot looks up the foreign delegate
//! on each call: if the delegate has an invocable member of that name the
//! call goes to the foreign side, otherwise to the supertype's body, and
//! with neither it throws `UnsupportedOperationException`. Redefining the
//! delegate's members between two calls changes dispatch without
//! regenerating the class.
//!
//! The delegate is either fixed when the class is generated (a class
//! override, shared by every instance) or passed to each constructor as a
//! trailing argument. Adapters may extend adapters; each level keeps its
//! own delegate and `super` calls chain through the levels.
//!
//! Generated classes are cached by supertype set and class override, so a
//! descriptor is generated at most once per cache.

mod super_ref;

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use polyhost_sdk::Value;
use thiserror::Error;

use crate::cache::AdapterKey;
use crate::context::HostContext;
use crate::error::BridgeResult;
use crate::exception::{to_host_exception, HostException};
use crate::host::{builtins, HostClass, HostMethod, HostObject, HostType, HostValue, Invocation, MethodBody, Visibility};
use crate::policy::AccessPolicy;

pub use super_ref::AdapterSuperRef;

/// Adapter generation failures, reported when the adapter is requested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Empty supertype list
    #[error("an adapter needs at least one supertype")]
    NoSupertypes,

    /// More than one class to extend
    #[error("an adapter cannot extend both {first} and {second}")]
    MultipleClasses {
        /// Class listed first
        first: String,
        /// Class listed second
        second: String,
    },

    /// Same supertype listed twice
    #[error("supertype {0} is listed more than once")]
    DuplicateSupertype(String),

    /// Access policy forbids implementing the supertype
    #[error("implementing {0} is not allowed by the access policy")]
    NotAllowed(String),

    /// Supertype is final
    #[error("cannot extend final class {0}")]
    FinalClass(String),

    /// No constructor the adapter could call
    #[error("{0} has no accessible constructor")]
    NoAccessibleConstructor(String),
}

/// What to generate: the supertypes, and optionally a delegate shared by
/// every instance
#[derive(Clone)]
pub struct HostAdapterDescriptor {
    supertypes: Vec<Arc<HostClass>>,
    class_override: Option<Value>,
}

impl HostAdapterDescriptor {
    /// Descriptor with per-instance delegates
    pub fn new(supertypes: Vec<Arc<HostClass>>) -> Self {
        Self {
            supertypes,
            class_override: None,
        }
    }

    /// Fix the delegate at class level; constructors then take no delegate
    pub fn with_class_override(mut self, delegate: Value) -> Self {
        self.class_override = Some(delegate);
        self
    }

    /// Supertypes in declaration order
    pub fn supertypes(&self) -> &[Arc<HostClass>] {
        &self.supertypes
    }

    /// Delegate shared by every instance, if fixed
    pub fn class_override(&self) -> Option<&Value> {
        self.class_override.as_ref()
    }

    fn key(&self) -> AdapterKey {
        AdapterKey {
            supertypes: self.supertypes.iter().map(|s| s.id()).collect(),
            class_override: self.class_override.as_ref().map(Value::identity),
        }
    }
}

/// Metadata carried by a generated adapter class
#[derive(Clone)]
pub struct AdapterInfo {
    /// Number of adapter classes above this one in the superclass chain
    pub level: usize,
    /// Delegate fixed for the class, if any
    pub class_override: Option<Value>,
    /// Supertypes the adapter was generated for
    pub supertypes: Vec<Arc<HostClass>>,
}

/// Per-instance delegates, one slot per adapter level
struct AdapterState {
    delegates: RwLock<Vec<Option<Value>>>,
}

/// Generate, or fetch from the context's cache, the adapter for `descriptor`
pub fn generate(
    ctx: &Arc<HostContext>,
    descriptor: &HostAdapterDescriptor,
) -> Result<Arc<HostClass>, AdapterError> {
    let base = validate(ctx.policy(), descriptor.supertypes())?;
    ctx.cache()
        .adapter_class(descriptor.key(), || Ok(build(descriptor, &base)))
}

/// Check that `class` can back a per-instance adapter created by coercion:
/// extensible, allowed by policy and constructible without arguments
pub fn check_extensible(ctx: &Arc<HostContext>, class: &Arc<HostClass>) -> Result<(), AdapterError> {
    let base = validate(ctx.policy(), std::slice::from_ref(class))?;
    let has_default = base
        .constructors()
        .iter()
        .any(|c| c.params().is_empty() && c.visibility() != Visibility::Private);
    if has_default {
        Ok(())
    } else {
        Err(AdapterError::NoAccessibleConstructor(class.name().to_string()))
    }
}

/// Instance of the adapter for `class` delegating to `delegate`
pub fn instantiate_with_delegate(
    ctx: &Arc<HostContext>,
    class: &Arc<HostClass>,
    delegate: &Value,
) -> BridgeResult<HostValue> {
    check_extensible(ctx, class)?;
    let adapter = generate(ctx, &HostAdapterDescriptor::new(vec![class.clone()]))?;
    let constructor = adapter
        .constructors()
        .iter()
        .find(|c| matches!(c.params(), [HostType::Value]))
        .cloned()
        .ok_or_else(|| AdapterError::NoAccessibleConstructor(class.name().to_string()))?;
    Ok(ctx.construct(&adapter, &constructor, vec![HostValue::Foreign(delegate.clone())])?)
}

/// Fresh, not yet constructed, instance of an adapter class
pub(crate) fn allocate(class: &Arc<HostClass>, info: &AdapterInfo) -> HostObject {
    let state = AdapterState {
        delegates: RwLock::new(vec![None; info.level + 1]),
    };
    HostObject::with_payload(class, Arc::new(state))
}

/// The foreign delegate of an adapter instance at its most derived level
pub fn this_of(receiver: &HostValue) -> Option<Value> {
    let HostValue::Object(object) = receiver else {
        return None;
    };
    let info = object.class().adapter_info()?;
    delegate_at(object, info.level, info.class_override.as_ref())
}

/// Foreign handle whose members call the supertype implementations of an
/// adapter instance, bypassing its delegate
pub fn super_of(ctx: &Arc<HostContext>, receiver: &HostValue) -> BridgeResult<Value> {
    Ok(Value::new(AdapterSuperRef::new(ctx, receiver)?))
}

/// Call the supertype implementation of `name` on an adapter instance
pub fn invoke_super(
    ctx: &Arc<HostContext>,
    receiver: &HostValue,
    name: &str,
    args: &[HostValue],
) -> Result<HostValue, HostException> {
    let superclass = adapter_superclass(receiver)?;
    let method = superclass
        .instance_methods()
        .into_iter()
        .map(|(method, _)| method)
        .find(|m| m.name() == name && m.accepts_arity(args.len()))
        .ok_or_else(|| {
            HostException::unsupported_operation(&format!(
                "{} has no method {}",
                superclass.name(),
                name
            ))
        })?;
    ctx.invoke_method(&method, receiver, args)
}

fn adapter_superclass(receiver: &HostValue) -> Result<Arc<HostClass>, HostException> {
    let HostValue::Object(object) = receiver else {
        return Err(HostException::illegal_argument("not an adapter instance"));
    };
    let class = object.class();
    if class.adapter_info().is_none() {
        return Err(HostException::illegal_argument(&format!(
            "{} is not an adapter class",
            class.name()
        )));
    }
    class
        .superclass()
        .cloned()
        .ok_or_else(|| HostException::illegal_state("adapter without superclass"))
}

fn delegate_at(object: &HostObject, level: usize, class_override: Option<&Value>) -> Option<Value> {
    if let Some(delegate) = class_override {
        return Some(delegate.clone());
    }
    let state = object.payload::<AdapterState>()?;
    let delegates = state.delegates.read();
    delegates.get(level).cloned().flatten()
}

// ============================================================================
// Validation
// ============================================================================

fn allowed(policy: &AccessPolicy, class: &HostClass) -> bool {
    match class.adapter_info() {
        Some(info) => info.supertypes.iter().all(|s| allowed(policy, s)),
        None if class.is_interface() => policy.allows_interface_implementation(class),
        None => policy.allows_class_implementation(class),
    }
}

/// Check the supertypes and return the class to extend
fn validate(policy: &AccessPolicy, supertypes: &[Arc<HostClass>]) -> Result<Arc<HostClass>, AdapterError> {
    if supertypes.is_empty() {
        return Err(AdapterError::NoSupertypes);
    }
    let mut seen = BTreeSet::new();
    let mut base: Option<&Arc<HostClass>> = None;
    for supertype in supertypes {
        if !seen.insert(supertype.id()) {
            return Err(AdapterError::DuplicateSupertype(supertype.name().to_string()));
        }
        if !allowed(policy, supertype) {
            return Err(AdapterError::NotAllowed(supertype.name().to_string()));
        }
        if supertype.is_interface() {
            continue;
        }
        if supertype.is_final() {
            return Err(AdapterError::FinalClass(supertype.name().to_string()));
        }
        if let Some(first) = base {
            return Err(AdapterError::MultipleClasses {
                first: first.name().to_string(),
                second: supertype.name().to_string(),
            });
        }
        base = Some(supertype);
    }
    let base = base.cloned().unwrap_or_else(|| builtins::object().clone());
    let accessible = base.constructors().iter().any(|c| c.visibility() != Visibility::Private);
    if !accessible {
        return Err(AdapterError::NoAccessibleConstructor(base.name().to_string()));
    }
    Ok(base)
}

// ============================================================================
// Generation
// ============================================================================

fn build(descriptor: &HostAdapterDescriptor, base: &Arc<HostClass>) -> Arc<HostClass> {
    let level = base.adapter_info().map_or(0, |info| info.level + 1);
    let class_override = descriptor.class_override().cloned();
    let interfaces: Vec<&Arc<HostClass>> = descriptor
        .supertypes()
        .iter()
        .filter(|s| s.is_interface())
        .collect();
    let name = match descriptor.supertypes().iter().find(|s| !s.is_interface()) {
        Some(class) => format!("{}$$Adapter", class.name()),
        None => format!("{}$$Adapter", descriptor.supertypes()[0].name()),
    };

    let mut overridable: Vec<Arc<HostMethod>> = Vec::new();
    let inherited = base
        .instance_methods()
        .into_iter()
        .chain(interfaces.iter().flat_map(|i| i.instance_methods()));
    for (method, _) in inherited {
        if method.is_final() || method.visibility() == Visibility::Private {
            continue;
        }
        match overridable.iter().position(|m| m.same_signature(&method)) {
            None => overridable.push(method),
            Some(i) if overridable[i].is_abstract() && !method.is_abstract() => {
                overridable[i] = method
            }
            Some(_) => {}
        }
    }

    let mut builder = HostClass::builder(&name).extends(base);
    for interface in &interfaces {
        builder = builder.implements(interface);
    }
    let slot_count = overridable.len();
    for method in overridable {
        let body = slot(level, class_override.clone(), method.clone());
        builder = builder.method(method.same_shape().with_body(body));
    }
    for constructor in base.constructors() {
        if constructor.visibility() == Visibility::Private {
            continue;
        }
        if class_override.is_none() && constructor.is_varargs() {
            continue;
        }
        builder = builder.constructor(adapter_constructor(level, class_override.is_none(), constructor));
    }
    let class = builder
        .adapter(AdapterInfo {
            level,
            class_override,
            supertypes: descriptor.supertypes().to_vec(),
        })
        .build();
    tracing::debug!(
        adapter = class.name(),
        level,
        slots = slot_count,
        "adapter class generated"
    );
    class
}

fn adapter_constructor(level: usize, takes_delegate: bool, base: &Arc<HostMethod>) -> HostMethod {
    let mut constructor = base.same_shape();
    if takes_delegate {
        constructor = constructor.param(HostType::Value);
    }
    let base = base.clone();
    let body: MethodBody = Arc::new(move |inv: &Invocation<'_>| {
        let args = if takes_delegate {
            let (delegate, rest) = inv
                .args
                .split_last()
                .ok_or_else(|| HostException::illegal_argument("missing adapter delegate"))?;
            let state = inv
                .this_object()?
                .payload::<AdapterState>()
                .ok_or_else(|| HostException::illegal_state("adapter instance without delegate state"))?;
            let delegate = match delegate {
                HostValue::Foreign(value) => Some(value.clone()),
                HostValue::Null => None,
                other => Some(inv.ctx.to_guest(other.clone())),
            };
            if let Some(slot) = state.delegates.write().get_mut(level) {
                *slot = delegate;
            }
            rest
        } else {
            inv.args
        };
        inv.ctx.invoke_method(&base, inv.receiver, args)
    });
    constructor.with_body(body)
}

fn slot(level: usize, class_override: Option<Value>, inherited: Arc<HostMethod>) -> MethodBody {
    Arc::new(move |inv: &Invocation<'_>| {
        let name = inherited.name();
        let delegate = match inv.receiver {
            HostValue::Object(object) => delegate_at(object, level, class_override.as_ref()),
            _ => None,
        };
        if let Some(delegate) = delegate.filter(|d| d.is_member_invocable(name)) {
            let args: Vec<Value> = inv.args.iter().map(|a| inv.ctx.to_guest(a.clone())).collect();
            let result = delegate
                .invoke_member(name, &args)
                .map_err(to_host_exception)?;
            return match inherited.return_type() {
                Some(ty) => Ok(inv.ctx.as_host(&result, ty)?),
                None => Ok(HostValue::Null),
            };
        }
        if inherited.body_fn().is_some() {
            return inv.ctx.invoke_method(&inherited, inv.receiver, inv.args);
        }
        Err(HostException::unsupported_operation(&format!(
            "{} is not implemented by the adapter delegate",
            inherited.signature()
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhost_sdk::{GuestFunction, GuestObject};

    fn base() -> Arc<HostClass> {
        HostClass::builder("Base")
            .abstract_class()
            .method(HostMethod::new("name").returns(HostType::String).as_abstract())
            .method(
                HostMethod::new("greet")
                    .returns(HostType::String)
                    .body(|_| Ok(HostValue::from("host greet"))),
            )
            .build()
    }

    fn ctx() -> Arc<HostContext> {
        HostContext::with_policy(AccessPolicy::all())
    }

    #[test]
    fn test_validation_errors() {
        let policy = AccessPolicy::all();
        assert_eq!(validate(&policy, &[]).unwrap_err(), AdapterError::NoSupertypes);
        let b = base();
        assert_eq!(
            validate(&policy, &[b.clone(), b.clone()]).unwrap_err(),
            AdapterError::DuplicateSupertype("Base".to_string())
        );
        let other = HostClass::builder("Other").abstract_class().build();
        assert!(matches!(
            validate(&policy, &[b.clone(), other]),
            Err(AdapterError::MultipleClasses { .. })
        ));
        let sealed = HostClass::builder("Sealed").final_class().build();
        assert_eq!(
            validate(&policy, &[sealed]).unwrap_err(),
            AdapterError::FinalClass("Sealed".to_string())
        );
        assert_eq!(
            validate(&AccessPolicy::explicit(), &[b]).unwrap_err(),
            AdapterError::NotAllowed("Base".to_string())
        );
    }

    #[test]
    fn test_slots_delegate_then_fall_back() {
        let ctx = ctx();
        let adapter = generate(&ctx, &HostAdapterDescriptor::new(vec![base()])).unwrap();
        assert_eq!(adapter.name(), "Base$$Adapter");
        let delegate = GuestObject::new()
            .with("name", GuestFunction::new("name", |_| Ok(Value::from("guest"))))
            .into_value();
        let instance = ctx
            .instantiate(&adapter, &[delegate.clone()])
            .unwrap();
        assert_eq!(ctx.call_method(&instance, "name", &[]).unwrap().as_str(), Some("guest"));
        assert_eq!(ctx.call_method(&instance, "greet", &[]).unwrap().as_str(), Some("host greet"));
        assert!(this_of(&instance).unwrap().ptr_eq(&delegate));
    }

    #[test]
    fn test_generation_is_cached() {
        let ctx = ctx();
        let b = base();
        let first = generate(&ctx, &HostAdapterDescriptor::new(vec![b.clone()])).unwrap();
        let second = generate(&ctx, &HostAdapterDescriptor::new(vec![b])).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.cache().adapters_generated(), 1);
    }
}
