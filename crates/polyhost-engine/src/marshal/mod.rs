//! Host values as foreign values
//!
//! [`to_guest`] is the single exit point for host values. It unwraps
//! anything that already stands for a foreign value (views, proxies,
//! pass-through values and `PolyglotException` wrappers) and wraps
//! everything else in a [`HostRef`], which answers the capability protocol
//! for the host value under the context's access policy.

mod class_ref;
mod host_ref;

use std::sync::Arc;

use polyhost_sdk::Value;

use crate::context::HostContext;
use crate::host::{HostClass, HostValue};

pub use class_ref::{BoundMethod, HostClassRef};
pub use host_ref::{HostIteratorRef, HostRef};

/// Host value behind a wrapper produced by [`to_guest`]
pub fn unwrap_host(value: &Value) -> Option<HostValue> {
    value.downcast_ref::<HostRef>().map(|r| r.value().clone())
}

/// Foreign handle for a host value
pub fn to_guest(ctx: &Arc<HostContext>, value: HostValue) -> Value {
    let source = match &value {
        HostValue::Null => return Value::null(),
        HostValue::Foreign(foreign) => return foreign.clone(),
        HostValue::Proxy(proxy) => return proxy.target().clone(),
        HostValue::List(list) => list.foreign_source(),
        HostValue::Set(set) => set.foreign_source(),
        HostValue::Map(map) => map.foreign_source(),
        HostValue::MapEntry(entry) => entry.foreign_source(),
        HostValue::Iterator(iterator) => iterator.foreign_source(),
        HostValue::Iterable(iterable) => iterable.foreign_source(),
        HostValue::Exception(exception) => exception.foreign_origin().cloned(),
        _ => None,
    };
    source.unwrap_or_else(|| Value::new(HostRef::new(ctx, value)))
}

/// Foreign handle for a class: static members and constructors
pub fn class_value(ctx: &Arc<HostContext>, class: &Arc<HostClass>) -> Value {
    Value::new(HostClassRef::new(ctx, class))
}
