use std::sync::Arc;

use polyhost_sdk::Value;

use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostMapEntry, HostType, HostValue};

/// `Map.Entry<K, V>` over a two-element foreign array
pub struct ForeignEntry {
    ctx: Arc<HostContext>,
    value: Value,
    key: HostType,
    val: HostType,
}

impl ForeignEntry {
    /// Entry view over a two-element foreign array
    pub fn new(ctx: &Arc<HostContext>, value: &Value, key: &HostType, val: &HostType) -> Self {
        Self {
            ctx: ctx.clone(),
            value: value.clone(),
            key: key.clone(),
            val: val.clone(),
        }
    }
}

impl HostMapEntry for ForeignEntry {
    fn key(&self) -> BridgeResult<HostValue> {
        let raw = self.value.read_array_element(0)?;
        self.ctx.as_host(&raw, &self.key)
    }

    fn value(&self) -> BridgeResult<HostValue> {
        let raw = self.value.read_array_element(1)?;
        self.ctx.as_host(&raw, &self.val)
    }

    fn set_value(&self, value: HostValue) -> BridgeResult<HostValue> {
        if !self.value.is_array_element_modifiable(1) {
            return Err(BridgeError::unsupported("setValue"));
        }
        let previous = self.value()?;
        self.value.write_array_element(1, self.ctx.to_guest(value))?;
        Ok(previous)
    }

    fn foreign_source(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}
