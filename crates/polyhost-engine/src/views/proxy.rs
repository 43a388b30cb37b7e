use std::fmt;
use std::sync::Arc;

use polyhost_sdk::Value;

use crate::context::HostContext;
use crate::exception::{enter_frame, to_host_exception, HostException};
use crate::host::{HostClass, HostMethod, HostValue};

/// How a proxy maps interface methods onto its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// The target is executed for the single abstract method
    Function,
    /// Interface methods are invoked as members of the target
    Members,
}

struct ProxyInner {
    ctx: Arc<HostContext>,
    interface: Arc<HostClass>,
    target: Value,
    mode: ProxyMode,
}

/// A foreign function or object implementing a host interface.
///
/// A method the target does not provide falls back to the interface's
/// default body, with the proxy as receiver. With neither, the call fails
/// with `UnsupportedOperationException`.
#[derive(Clone)]
pub struct InterfaceProxy(Arc<ProxyInner>);

impl InterfaceProxy {
    /// Proxy forwarding the functional method to `target` itself
    pub fn function(ctx: &Arc<HostContext>, interface: &Arc<HostClass>, target: &Value) -> Self {
        Self::new(ctx, interface, target, ProxyMode::Function)
    }

    /// Proxy forwarding each abstract method to the same-named member of `target`
    pub fn members(ctx: &Arc<HostContext>, interface: &Arc<HostClass>, target: &Value) -> Self {
        Self::new(ctx, interface, target, ProxyMode::Members)
    }

    fn new(ctx: &Arc<HostContext>, interface: &Arc<HostClass>, target: &Value, mode: ProxyMode) -> Self {
        tracing::trace!(interface = interface.name(), ?mode, "interface proxy created");
        InterfaceProxy(Arc::new(ProxyInner {
            ctx: ctx.clone(),
            interface: interface.clone(),
            target: target.clone(),
            mode,
        }))
    }

    /// Implemented interface
    pub fn interface(&self) -> &Arc<HostClass> {
        &self.0.interface
    }

    /// Foreign value behind the proxy
    pub fn target(&self) -> &Value {
        &self.0.target
    }

    /// How calls are forwarded
    pub fn mode(&self) -> ProxyMode {
        self.0.mode
    }

    /// Call interface method `name` with host arguments
    pub fn call(&self, name: &str, args: &[HostValue]) -> Result<HostValue, HostException> {
        let inner = &self.0;
        let method = inner
            .interface
            .instance_methods()
            .into_iter()
            .map(|(method, _)| method)
            .find(|m| m.name() == name && m.accepts_arity(args.len()))
            .ok_or_else(|| {
                HostException::unsupported_operation(&format!(
                    "{} has no method {} taking {} argument(s)",
                    inner.interface.name(),
                    name,
                    args.len()
                ))
            })?;

        let forwards = match inner.mode {
            ProxyMode::Function => method.is_abstract(),
            ProxyMode::Members => inner.target.is_member_invocable(name),
        };
        if forwards {
            let _frame = enter_frame(format!("<guest> {}.{}", inner.interface.name(), name));
            let guest_args: Vec<Value> = args.iter().map(|a| inner.ctx.to_guest(a.clone())).collect();
            let result = match inner.mode {
                ProxyMode::Function => inner.target.execute(&guest_args),
                ProxyMode::Members => inner.target.invoke_member(name, &guest_args),
            }
            .map_err(to_host_exception)?;
            return self.convert_result(&method, &result);
        }
        if method.body_fn().is_some() {
            return inner
                .ctx
                .invoke_method(&method, &HostValue::Proxy(self.clone()), args);
        }
        Err(HostException::unsupported_operation(&format!(
            "{} does not implement {}",
            inner.target.display_string(),
            method.signature()
        )))
    }

    /// Call the functional method
    pub fn apply(&self, args: &[HostValue]) -> Result<HostValue, HostException> {
        let method = self.0.interface.functional_method().ok_or_else(|| {
            HostException::unsupported_operation(&format!(
                "{} is not a functional interface",
                self.0.interface.name()
            ))
        })?;
        self.call(method.name(), args)
    }

    fn convert_result(&self, method: &HostMethod, result: &Value) -> Result<HostValue, HostException> {
        match method.return_type() {
            Some(ty) => Ok(self.0.ctx.as_host(result, ty)?),
            None => Ok(HostValue::Null),
        }
    }
}

impl fmt::Debug for InterfaceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceProxy")
            .field("interface", &self.0.interface.name())
            .field("mode", &self.0.mode)
            .finish()
    }
}
