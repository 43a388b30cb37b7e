use std::sync::Arc;

use polyhost_sdk::{InteropError, Value};

use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostIterable, HostIterator, HostType, HostValue};

/// `Iterator<E>` over a foreign iterator
pub struct ForeignIterator {
    ctx: Arc<HostContext>,
    value: Value,
    element: HostType,
}

impl ForeignIterator {
    /// Iterator view converting elements to `element`
    pub fn new(ctx: &Arc<HostContext>, value: &Value, element: &HostType) -> Self {
        Self {
            ctx: ctx.clone(),
            value: value.clone(),
            element: element.clone(),
        }
    }
}

impl HostIterator for ForeignIterator {
    fn has_next(&self) -> BridgeResult<bool> {
        Ok(self.value.has_iterator_next_element()?)
    }

    fn next(&self) -> BridgeResult<HostValue> {
        let item = match self.value.get_iterator_next_element() {
            Ok(item) => item,
            Err(InteropError::StopIteration) => return Err(BridgeError::NoSuchElement),
            Err(e) => return Err(e.into()),
        };
        self.ctx.as_host(&item, &self.element)
    }

    fn foreign_source(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}

/// `Iterable<E>` over a foreign value that hands out iterators
pub struct ForeignIterable {
    ctx: Arc<HostContext>,
    value: Value,
    element: HostType,
}

impl ForeignIterable {
    /// Iterable view converting elements to `element`
    pub fn new(ctx: &Arc<HostContext>, value: &Value, element: &HostType) -> Self {
        Self {
            ctx: ctx.clone(),
            value: value.clone(),
            element: element.clone(),
        }
    }
}

impl HostIterable for ForeignIterable {
    fn iterator(&self) -> BridgeResult<Arc<dyn HostIterator>> {
        let iterator = self.value.get_iterator()?;
        Ok(Arc::new(ForeignIterator::new(&self.ctx, &iterator, &self.element)))
    }

    fn foreign_source(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}
