//! Host context
//!
//! A [`HostContext`] pairs an [`AccessPolicy`] with a shared
//! [`InteropCache`] and is the entry point for everything that crosses the
//! boundary: converting foreign values to host types, wrapping host values
//! for foreign code, resolving and running host methods, calling foreign
//! functions from host code and generating adapters.

use std::sync::Arc;

use polyhost_sdk::{InteropError, Value};

use crate::adapter::{self, HostAdapterDescriptor};
use crate::cache::{ClassMembers, InteropCache, MemberFilter};
use crate::coerce::{self, CoercionOutcome};
use crate::error::{BridgeError, BridgeResult};
use crate::exception::{enter_frame, to_host_exception, HostException};
use crate::host::{HostClass, HostMethod, HostObject, HostType, HostValue, Invocation};
use crate::marshal;
use crate::policy::AccessPolicy;
use crate::resolve::{self, OverloadCandidate};

/// Policy and cache for one embedding
pub struct HostContext {
    policy: AccessPolicy,
    cache: Arc<InteropCache>,
}

impl HostContext {
    /// Context sharing an existing cache
    pub fn new(policy: AccessPolicy, cache: Arc<InteropCache>) -> Arc<Self> {
        Arc::new(Self { policy, cache })
    }

    /// Context with a private cache
    pub fn with_policy(policy: AccessPolicy) -> Arc<Self> {
        Self::new(policy, InteropCache::new())
    }

    /// Access policy this context enforces
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Cache shared with other contexts built on it
    pub fn cache(&self) -> &Arc<InteropCache> {
        &self.cache
    }

    /// Members of `class` visible under this context's policy
    pub fn members(&self, class: &Arc<HostClass>) -> Arc<ClassMembers> {
        self.cache
            .members(class, MemberFilter::from_policy(&self.policy))
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Convert a foreign value to `target`, reporting the cost or the reason
    /// it cannot be converted
    pub fn coerce(self: &Arc<Self>, value: &Value, target: &HostType) -> CoercionOutcome {
        coerce::coerce(self, value, target)
    }

    /// Convert a foreign value to `target` or fail with `UnsupportedType`
    pub fn as_host(self: &Arc<Self>, value: &Value, target: &HostType) -> BridgeResult<HostValue> {
        self.coerce(value, target).into_result(target)
    }

    /// Wrap a host value for foreign code. Views and proxies unwrap to the
    /// foreign value they stand for; foreign pass-through values are
    /// returned as is.
    pub fn to_guest(self: &Arc<Self>, value: HostValue) -> Value {
        marshal::to_guest(self, value)
    }

    /// Foreign handle for a class: statics, constructors
    pub fn class_value(self: &Arc<Self>, class: &Arc<HostClass>) -> Value {
        marshal::class_value(self, class)
    }

    // ========================================================================
    // Host invocation
    // ========================================================================

    /// Invoke an instance method of a host value with foreign arguments
    pub fn invoke_member(
        self: &Arc<Self>,
        receiver: &HostValue,
        name: &str,
        args: &[Value],
    ) -> BridgeResult<HostValue> {
        let class = receiver
            .runtime_class()
            .ok_or_else(|| BridgeError::Interop(InteropError::unknown(name)))?;
        let members = self.members(&class);
        let candidates = members
            .instance_methods
            .get(name)
            .ok_or_else(|| BridgeError::Interop(InteropError::unknown(name)))?;
        self.dispatch(name, candidates, receiver, args)
    }

    /// Invoke a static method with foreign arguments
    pub fn invoke_static(
        self: &Arc<Self>,
        class: &Arc<HostClass>,
        name: &str,
        args: &[Value],
    ) -> BridgeResult<HostValue> {
        let members = self.members(class);
        let candidates = members
            .static_methods
            .get(name)
            .ok_or_else(|| BridgeError::Interop(InteropError::unknown(name)))?;
        self.dispatch(name, candidates, &HostValue::Null, args)
    }

    /// Construct an instance of `class` with foreign arguments
    pub fn instantiate(
        self: &Arc<Self>,
        class: &Arc<HostClass>,
        args: &[Value],
    ) -> BridgeResult<HostValue> {
        if class.is_abstract() {
            return Err(BridgeError::unsupported(&format!(
                "cannot instantiate abstract type {}",
                class.name()
            )));
        }
        let members = self.members(class);
        if members.constructors.is_empty() {
            return Err(BridgeError::unsupported(&format!(
                "{} has no accessible constructor",
                class.name()
            )));
        }
        let selection = resolve::select(self, class.name(), &members.constructors, args)?;
        Ok(self.construct(class, &selection.method, selection.arguments)?)
    }

    fn dispatch(
        self: &Arc<Self>,
        name: &str,
        candidates: &[OverloadCandidate],
        receiver: &HostValue,
        args: &[Value],
    ) -> BridgeResult<HostValue> {
        let selection = resolve::select(self, name, candidates, args)?;
        Ok(self.invoke_method(&selection.method, receiver, &selection.arguments)?)
    }

    /// Run a resolved method body
    pub fn invoke_method(
        self: &Arc<Self>,
        method: &HostMethod,
        receiver: &HostValue,
        args: &[HostValue],
    ) -> Result<HostValue, HostException> {
        let _frame = enter_frame(format!("{}.{}", method.declaring_class(), method.name()));
        match method.body_fn() {
            Some(body) => body(&Invocation {
                ctx: self,
                receiver,
                args,
                method,
            }),
            None if method.is_constructor() => Ok(HostValue::Null),
            None => Err(HostException::unsupported_operation(&format!(
                "abstract method {} has no implementation",
                method.signature()
            ))),
        }
    }

    /// Allocate an instance and run `constructor` on it
    pub(crate) fn construct(
        self: &Arc<Self>,
        class: &Arc<HostClass>,
        constructor: &HostMethod,
        args: Vec<HostValue>,
    ) -> Result<HostValue, HostException> {
        let object = match class.adapter_info() {
            Some(info) => adapter::allocate(class, info),
            None => HostObject::new(class),
        };
        let receiver = HostValue::Object(object);
        self.invoke_method(constructor, &receiver, &args)?;
        Ok(receiver)
    }

    /// Host-to-host call through the boundary machinery: arguments are
    /// wrapped, resolved and converted exactly as for a foreign caller
    pub fn call_method(
        self: &Arc<Self>,
        receiver: &HostValue,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostException> {
        let args: Vec<Value> = args.iter().map(|a| self.to_guest(a.clone())).collect();
        Ok(self.invoke_member(receiver, name, &args)?)
    }

    // ========================================================================
    // Foreign invocation
    // ========================================================================

    /// Execute a foreign function from host code
    pub fn call_foreign(
        self: &Arc<Self>,
        callee: &Value,
        args: &[HostValue],
    ) -> Result<HostValue, HostException> {
        let _frame = enter_frame(format!("<guest> {}", callee.display_string()));
        let args: Vec<Value> = args.iter().map(|a| self.to_guest(a.clone())).collect();
        let result = callee.execute(&args).map_err(to_host_exception)?;
        Ok(self.as_host(&result, &HostType::Object)?)
    }

    /// Invoke a member of a foreign object from host code
    pub fn invoke_foreign(
        self: &Arc<Self>,
        receiver: &Value,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostException> {
        let _frame = enter_frame(format!("<guest> {}.{}", receiver.display_string(), name));
        let args: Vec<Value> = args.iter().map(|a| self.to_guest(a.clone())).collect();
        let result = receiver
            .invoke_member(name, &args)
            .map_err(to_host_exception)?;
        Ok(self.as_host(&result, &HostType::Object)?)
    }

    // ========================================================================
    // Adapters
    // ========================================================================

    /// Generate, or fetch from the cache, the adapter class for `descriptor`
    pub fn create_adapter(
        self: &Arc<Self>,
        descriptor: &HostAdapterDescriptor,
    ) -> BridgeResult<Arc<HostClass>> {
        Ok(adapter::generate(self, descriptor)?)
    }
}
