use std::sync::Arc;

use polyhost_sdk::{Interop, InteropError, InteropResult, Value};

use crate::context::HostContext;
use crate::host::{HostClass, HostValue};

/// A host class seen from foreign code: static fields and methods as
/// members, constructors through `instantiate`
pub struct HostClassRef {
    ctx: Arc<HostContext>,
    class: Arc<HostClass>,
}

impl HostClassRef {
    pub(super) fn new(ctx: &Arc<HostContext>, class: &Arc<HostClass>) -> Self {
        Self {
            ctx: ctx.clone(),
            class: class.clone(),
        }
    }

    /// Wrapped class
    pub fn class(&self) -> &Arc<HostClass> {
        &self.class
    }
}

impl Interop for HostClassRef {
    fn display_string(&self) -> String {
        format!("class {}", self.class.name())
    }

    fn meta_name(&self) -> Option<String> {
        Some("Class".to_string())
    }

    fn has_members(&self) -> bool {
        true
    }

    fn get_members(&self, _include_internal: bool) -> InteropResult<Vec<String>> {
        Ok(self.ctx.members(&self.class).member_names(true))
    }

    fn is_member_readable(&self, name: &str) -> bool {
        let members = self.ctx.members(&self.class);
        members.static_fields.contains_key(name) || members.static_methods.contains_key(name)
    }

    fn is_member_modifiable(&self, name: &str) -> bool {
        self.ctx
            .members(&self.class)
            .static_fields
            .get(name)
            .is_some_and(|(field, _)| !field.is_final())
    }

    fn is_member_invocable(&self, name: &str) -> bool {
        self.ctx
            .members(&self.class)
            .static_methods
            .contains_key(name)
    }

    fn read_member(&self, name: &str) -> InteropResult<Value> {
        let members = self.ctx.members(&self.class);
        if let Some((field, owner)) = members.static_fields.get(name) {
            let value = owner
                .static_value(name)
                .unwrap_or_else(|| field.ty().default_value());
            return Ok(self.ctx.to_guest(value));
        }
        if members.static_methods.contains_key(name) {
            return Ok(BoundMethod::associated(&self.ctx, &self.class, name));
        }
        Err(InteropError::unknown(name))
    }

    fn write_member(&self, name: &str, value: Value) -> InteropResult<()> {
        let members = self.ctx.members(&self.class);
        let (field, owner) = members
            .static_fields
            .get(name)
            .ok_or_else(|| InteropError::unknown(name))?;
        if field.is_final() {
            return Err(InteropError::unsupported(&format!("field {} is final", name)));
        }
        let converted = self
            .ctx
            .as_host(&value, field.ty())
            .map_err(|e| e.into_interop(&self.ctx))?;
        owner.set_static_value(name, converted);
        Ok(())
    }

    fn invoke_member(&self, name: &str, args: &[Value]) -> InteropResult<Value> {
        let result = self
            .ctx
            .invoke_static(&self.class, name, args)
            .map_err(|e| e.into_interop(&self.ctx))?;
        Ok(self.ctx.to_guest(result))
    }

    fn is_instantiable(&self) -> bool {
        !self.class.is_abstract()
    }

    fn instantiate(&self, args: &[Value]) -> InteropResult<Value> {
        let instance = self
            .ctx
            .instantiate(&self.class, args)
            .map_err(|e| e.into_interop(&self.ctx))?;
        Ok(self.ctx.to_guest(instance))
    }
}

enum Receiver {
    Instance(HostValue),
    Static(Arc<HostClass>),
}

/// A method read as a member value. Executing it resolves the overload
/// against the call's arguments.
pub struct BoundMethod {
    ctx: Arc<HostContext>,
    receiver: Receiver,
    name: String,
}

impl BoundMethod {
    pub(super) fn instance(ctx: &Arc<HostContext>, receiver: HostValue, name: &str) -> Value {
        Value::new(BoundMethod {
            ctx: ctx.clone(),
            receiver: Receiver::Instance(receiver),
            name: name.to_string(),
        })
    }

    pub(super) fn associated(ctx: &Arc<HostContext>, class: &Arc<HostClass>, name: &str) -> Value {
        Value::new(BoundMethod {
            ctx: ctx.clone(),
            receiver: Receiver::Static(class.clone()),
            name: name.to_string(),
        })
    }
}

impl Interop for BoundMethod {
    fn display_string(&self) -> String {
        match &self.receiver {
            Receiver::Instance(value) => format!("{}.{}", value.type_name(), self.name),
            Receiver::Static(class) => format!("{}.{}", class.name(), self.name),
        }
    }

    fn meta_name(&self) -> Option<String> {
        Some("Method".to_string())
    }

    fn is_executable(&self) -> bool {
        true
    }

    fn execute(&self, args: &[Value]) -> InteropResult<Value> {
        let result = match &self.receiver {
            Receiver::Instance(value) => self.ctx.invoke_member(value, &self.name, args),
            Receiver::Static(class) => self.ctx.invoke_static(class, &self.name, args),
        }
        .map_err(|e| e.into_interop(&self.ctx))?;
        Ok(self.ctx.to_guest(result))
    }
}
