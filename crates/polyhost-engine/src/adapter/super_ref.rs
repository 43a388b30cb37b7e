use std::sync::Arc;

use polyhost_sdk::{Interop, InteropError, InteropResult, Value};

use crate::context::HostContext;
use crate::error::BridgeResult;
use crate::host::{HostClass, HostValue};
use crate::resolve;

use super::adapter_superclass;

/// `super` of an adapter instance as seen from foreign code. Members are
/// the superclass methods; calling one runs the superclass body on the
/// adapter instance.
pub struct AdapterSuperRef {
    ctx: Arc<HostContext>,
    receiver: HostValue,
    superclass: Arc<HostClass>,
}

impl AdapterSuperRef {
    pub(super) fn new(ctx: &Arc<HostContext>, receiver: &HostValue) -> BridgeResult<Self> {
        let superclass = adapter_superclass(receiver)?;
        Ok(Self {
            ctx: ctx.clone(),
            receiver: receiver.clone(),
            superclass,
        })
    }
}

impl Interop for AdapterSuperRef {
    fn display_string(&self) -> String {
        format!("super({})", self.superclass.name())
    }

    fn has_members(&self) -> bool {
        true
    }

    fn get_members(&self, _include_internal: bool) -> InteropResult<Vec<String>> {
        let members = self.ctx.members(&self.superclass);
        let mut names: Vec<String> = members.instance_methods.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn is_member_readable(&self, name: &str) -> bool {
        self.is_member_invocable(name)
    }

    fn is_member_invocable(&self, name: &str) -> bool {
        self.ctx
            .members(&self.superclass)
            .instance_methods
            .contains_key(name)
    }

    fn invoke_member(&self, name: &str, args: &[Value]) -> InteropResult<Value> {
        let members = self.ctx.members(&self.superclass);
        let candidates = members
            .instance_methods
            .get(name)
            .ok_or_else(|| InteropError::unknown(name))?;
        let result = resolve::select(&self.ctx, name, candidates, args)
            .and_then(|selection| {
                Ok(self
                    .ctx
                    .invoke_method(&selection.method, &self.receiver, &selection.arguments)?)
            })
            .map_err(|e| e.into_interop(&self.ctx))?;
        Ok(self.ctx.to_guest(result))
    }
}
