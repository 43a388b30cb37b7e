use std::sync::Arc;

use polyhost_sdk::{InteropError, Value};

use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostList, HostType, HostValue};

/// `List<E>` over a foreign value with array elements
pub struct ForeignList {
    ctx: Arc<HostContext>,
    value: Value,
    element: HostType,
}

impl ForeignList {
    /// List view converting elements to `element`
    pub fn new(ctx: &Arc<HostContext>, value: &Value, element: &HostType) -> Self {
        Self {
            ctx: ctx.clone(),
            value: value.clone(),
            element: element.clone(),
        }
    }

    fn check_index(&self, index: usize) -> BridgeResult<i64> {
        if index >= self.size()? {
            return Err(BridgeError::Interop(InteropError::InvalidArrayIndex(index as i64)));
        }
        Ok(index as i64)
    }
}

impl HostList for ForeignList {
    fn size(&self) -> BridgeResult<usize> {
        Ok(self.value.get_array_size()?.max(0) as usize)
    }

    fn get(&self, index: usize) -> BridgeResult<HostValue> {
        let index = self.check_index(index)?;
        let item = self.value.read_array_element(index)?;
        self.ctx.as_host(&item, &self.element)
    }

    fn set(&self, index: usize, value: HostValue) -> BridgeResult<HostValue> {
        let slot = self.check_index(index)?;
        if !self.value.is_array_element_modifiable(slot) {
            return Err(BridgeError::unsupported("set"));
        }
        let previous = self.get(index)?;
        self.value.write_array_element(slot, self.ctx.to_guest(value))?;
        Ok(previous)
    }

    fn add(&self, value: HostValue) -> BridgeResult<()> {
        let end = self.size()? as i64;
        if !self.value.is_array_element_insertable(end) {
            return Err(BridgeError::unsupported("add"));
        }
        self.value.write_array_element(end, self.ctx.to_guest(value))?;
        Ok(())
    }

    fn remove_at(&self, index: usize) -> BridgeResult<HostValue> {
        let slot = self.check_index(index)?;
        if !self.value.is_array_element_removable(slot) {
            return Err(BridgeError::unsupported("remove"));
        }
        let previous = self.get(index)?;
        self.value.remove_array_element(slot)?;
        Ok(previous)
    }

    fn foreign_source(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}
