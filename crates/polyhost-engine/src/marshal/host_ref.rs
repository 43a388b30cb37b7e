use std::sync::Arc;

use polyhost_sdk::{GuestArray, GuestIterator, Interop, InteropError, InteropResult, Number, NumberKind, Value};

use crate::cache::ClassMembers;
use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::exception::ExceptionCause;
use crate::host::collections::{CollectionIterator, ListIterator};
use crate::host::{HostIterator, HostList, HostType, HostValue, VecList};

use super::class_ref::BoundMethod;

/// A host value seen from foreign code
pub struct HostRef {
    ctx: Arc<HostContext>,
    value: HostValue,
}

impl HostRef {
    pub(super) fn new(ctx: &Arc<HostContext>, value: HostValue) -> Self {
        Self {
            ctx: ctx.clone(),
            value,
        }
    }

    /// Wrapped host value
    pub fn value(&self) -> &HostValue {
        &self.value
    }

    fn bridge<T>(&self, result: BridgeResult<T>) -> InteropResult<T> {
        result.map_err(|e| e.into_interop(&self.ctx))
    }

    fn guest(&self, value: HostValue) -> Value {
        self.ctx.to_guest(value)
    }

    fn number(&self) -> InteropResult<Number> {
        self.value
            .to_number()
            .ok_or_else(|| InteropError::unsupported("not a number"))
    }

    fn members(&self) -> Option<Arc<ClassMembers>> {
        match &self.value {
            HostValue::Object(_) | HostValue::Exception(_) => {
                let class = self.value.runtime_class()?;
                Some(self.ctx.members(&class))
            }
            _ => None,
        }
    }

    fn list(&self) -> Option<&Arc<dyn HostList>> {
        match &self.value {
            HostValue::List(list) if self.ctx.policy().allow_list_access => Some(list),
            _ => None,
        }
    }

    fn index(&self, index: i64) -> InteropResult<usize> {
        usize::try_from(index).map_err(|_| InteropError::InvalidArrayIndex(index))
    }

    fn size(&self) -> InteropResult<usize> {
        match &self.value {
            HostValue::Array(array) => Ok(array.len()),
            HostValue::List(list) => self.bridge(list.size()),
            _ => Err(InteropError::unsupported("getArraySize")),
        }
    }

    fn host_key(&self, key: &Value) -> InteropResult<HostValue> {
        self.bridge(self.ctx.as_host(key, &HostType::Object))
    }

    fn map_has(&self, key: &Value) -> bool {
        let HostValue::Map(map) = &self.value else {
            return false;
        };
        self.host_key(key)
            .ok()
            .is_some_and(|k| map.contains_key(&k).unwrap_or(false))
    }

    fn fresh_iterator(&self) -> BridgeResult<Arc<dyn HostIterator>> {
        match &self.value {
            HostValue::Iterable(iterable) => iterable.iterator(),
            HostValue::List(list) => Ok(Arc::new(ListIterator::new(list.clone()))),
            HostValue::Array(array) => {
                let snapshot: Arc<dyn HostList> = VecList::new(array.to_vec());
                Ok(Arc::new(ListIterator::new(snapshot)))
            }
            HostValue::Set(set) => Ok(Arc::new(CollectionIterator::new(set.clone())?)),
            _ => Err(BridgeError::unsupported("getIterator")),
        }
    }
}

impl Interop for HostRef {
    fn display_string(&self) -> String {
        self.value.display_string()
    }

    fn meta_name(&self) -> Option<String> {
        Some(self.value.type_name())
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    fn is_boolean(&self) -> bool {
        matches!(self.value, HostValue::Boolean(_))
    }

    fn as_boolean(&self) -> InteropResult<bool> {
        self.value
            .as_bool()
            .ok_or_else(|| InteropError::unsupported("asBoolean"))
    }

    fn is_string(&self) -> bool {
        matches!(self.value, HostValue::String(_) | HostValue::Char(_))
    }

    fn as_string(&self) -> InteropResult<String> {
        match &self.value {
            HostValue::String(s) => Ok(s.to_string()),
            HostValue::Char(c) => Ok(String::from_utf16_lossy(&[*c])),
            _ => Err(InteropError::unsupported("asString")),
        }
    }

    fn is_number(&self) -> bool {
        self.value.to_number().is_some()
    }

    fn number_kind(&self) -> Option<NumberKind> {
        self.value.to_number().map(|n| n.kind())
    }

    fn fits_in_byte(&self) -> bool {
        self.number().is_ok_and(|n| n.fits_in_byte())
    }

    fn fits_in_short(&self) -> bool {
        self.number().is_ok_and(|n| n.fits_in_short())
    }

    fn fits_in_int(&self) -> bool {
        self.number().is_ok_and(|n| n.fits_in_int())
    }

    fn fits_in_long(&self) -> bool {
        self.number().is_ok_and(|n| n.fits_in_long())
    }

    fn fits_in_float(&self) -> bool {
        self.number().is_ok_and(|n| n.fits_in_float())
    }

    fn fits_in_double(&self) -> bool {
        self.number().is_ok_and(|n| n.fits_in_double())
    }

    fn as_byte(&self) -> InteropResult<i8> {
        self.number()?
            .to_i8()
            .ok_or_else(|| InteropError::unsupported("asByte"))
    }

    fn as_short(&self) -> InteropResult<i16> {
        self.number()?
            .to_i16()
            .ok_or_else(|| InteropError::unsupported("asShort"))
    }

    fn as_int(&self) -> InteropResult<i32> {
        self.number()?
            .to_i32()
            .ok_or_else(|| InteropError::unsupported("asInt"))
    }

    fn as_long(&self) -> InteropResult<i64> {
        self.number()?
            .to_i64()
            .ok_or_else(|| InteropError::unsupported("asLong"))
    }

    fn as_float(&self) -> InteropResult<f32> {
        self.number()?
            .to_f32()
            .ok_or_else(|| InteropError::unsupported("asFloat"))
    }

    fn as_double(&self) -> InteropResult<f64> {
        self.number()?
            .to_f64()
            .ok_or_else(|| InteropError::unsupported("asDouble"))
    }

    // ========================================================================
    // Arrays and lists
    // ========================================================================

    fn has_array_elements(&self) -> bool {
        match &self.value {
            HostValue::Array(_) => self.ctx.policy().allow_array_access,
            HostValue::List(_) => self.ctx.policy().allow_list_access,
            _ => false,
        }
    }

    fn get_array_size(&self) -> InteropResult<i64> {
        Ok(self.size()? as i64)
    }

    fn is_array_element_readable(&self, index: i64) -> bool {
        self.index(index)
            .ok()
            .zip(self.size().ok())
            .is_some_and(|(i, size)| i < size)
    }

    fn is_array_element_modifiable(&self, index: i64) -> bool {
        self.is_array_element_readable(index)
    }

    fn is_array_element_insertable(&self, index: i64) -> bool {
        self.list().is_some() && self.size().ok() == Some(index as usize) && index >= 0
    }

    fn is_array_element_removable(&self, index: i64) -> bool {
        self.list().is_some() && self.is_array_element_readable(index)
    }

    fn read_array_element(&self, index: i64) -> InteropResult<Value> {
        let slot = self.index(index)?;
        let item = match &self.value {
            HostValue::Array(array) => array
                .get(slot)
                .ok_or(InteropError::InvalidArrayIndex(index))?,
            HostValue::List(list) => self.bridge(list.get(slot))?,
            _ => return Err(InteropError::unsupported("readArrayElement")),
        };
        Ok(self.guest(item))
    }

    fn write_array_element(&self, index: i64, value: Value) -> InteropResult<()> {
        let slot = self.index(index)?;
        match &self.value {
            HostValue::Array(array) => {
                let converted = self.bridge(self.ctx.as_host(&value, &array.element_type()))?;
                if array.set(slot, converted) {
                    Ok(())
                } else {
                    Err(InteropError::InvalidArrayIndex(index))
                }
            }
            HostValue::List(list) => {
                let converted = self.bridge(self.ctx.as_host(&value, &HostType::Object))?;
                let size = self.bridge(list.size())?;
                if slot == size {
                    self.bridge(list.add(converted))
                } else {
                    self.bridge(list.set(slot, converted)).map(|_| ())
                }
            }
            _ => Err(InteropError::unsupported("writeArrayElement")),
        }
    }

    fn remove_array_element(&self, index: i64) -> InteropResult<()> {
        let slot = self.index(index)?;
        let list = self
            .list()
            .ok_or_else(|| InteropError::unsupported("removeArrayElement"))?;
        self.bridge(list.remove_at(slot)).map(|_| ())
    }

    // ========================================================================
    // Maps
    // ========================================================================

    fn has_hash_entries(&self) -> bool {
        matches!(self.value, HostValue::Map(_)) && self.ctx.policy().allow_map_access
    }

    fn get_hash_size(&self) -> InteropResult<i64> {
        let HostValue::Map(map) = &self.value else {
            return Err(InteropError::unsupported("getHashSize"));
        };
        Ok(self.bridge(map.size())? as i64)
    }

    fn is_hash_entry_existing(&self, key: &Value) -> bool {
        self.map_has(key)
    }

    fn is_hash_entry_readable(&self, key: &Value) -> bool {
        self.map_has(key)
    }

    fn is_hash_entry_modifiable(&self, key: &Value) -> bool {
        self.map_has(key)
    }

    fn is_hash_entry_insertable(&self, key: &Value) -> bool {
        matches!(self.value, HostValue::Map(_)) && !self.map_has(key)
    }

    fn is_hash_entry_removable(&self, key: &Value) -> bool {
        self.map_has(key)
    }

    fn read_hash_value(&self, key: &Value) -> InteropResult<Value> {
        let HostValue::Map(map) = &self.value else {
            return Err(InteropError::unsupported("readHashValue"));
        };
        let host_key = self.host_key(key)?;
        match self.bridge(map.get(&host_key))? {
            Some(value) => Ok(self.guest(value)),
            None => Err(InteropError::unknown(key.display_string())),
        }
    }

    fn write_hash_entry(&self, key: Value, value: Value) -> InteropResult<()> {
        let HostValue::Map(map) = &self.value else {
            return Err(InteropError::unsupported("writeHashEntry"));
        };
        let host_key = self.host_key(&key)?;
        let host_value = self.bridge(self.ctx.as_host(&value, &HostType::Object))?;
        self.bridge(map.put(host_key, host_value)).map(|_| ())
    }

    fn remove_hash_entry(&self, key: &Value) -> InteropResult<()> {
        let HostValue::Map(map) = &self.value else {
            return Err(InteropError::unsupported("removeHashEntry"));
        };
        let host_key = self.host_key(key)?;
        self.bridge(map.remove(&host_key)).map(|_| ())
    }

    fn get_hash_entries_iterator(&self) -> InteropResult<Value> {
        let HostValue::Map(map) = &self.value else {
            return Err(InteropError::unsupported("getHashEntriesIterator"));
        };
        let mut pairs = Vec::new();
        for key in self.bridge(map.keys())? {
            let value = self.bridge(map.get(&key))?.unwrap_or(HostValue::Null);
            pairs.push(GuestArray::read_only(vec![self.guest(key), self.guest(value)]));
        }
        Ok(GuestIterator::new(pairs).into_value())
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn has_members(&self) -> bool {
        self.members().is_some()
    }

    fn get_members(&self, _include_internal: bool) -> InteropResult<Vec<String>> {
        let members = self
            .members()
            .ok_or_else(|| InteropError::unsupported("getMembers"))?;
        Ok(members.member_names(false))
    }

    fn is_member_readable(&self, name: &str) -> bool {
        self.members().is_some_and(|m| {
            m.instance_fields.contains_key(name) || m.instance_methods.contains_key(name)
        })
    }

    fn is_member_modifiable(&self, name: &str) -> bool {
        matches!(self.value, HostValue::Object(_))
            && self
                .members()
                .is_some_and(|m| m.instance_fields.get(name).is_some_and(|f| !f.is_final()))
    }

    fn is_member_invocable(&self, name: &str) -> bool {
        self.members()
            .is_some_and(|m| m.instance_methods.contains_key(name))
    }

    fn read_member(&self, name: &str) -> InteropResult<Value> {
        let members = self
            .members()
            .ok_or_else(|| InteropError::unsupported("readMember"))?;
        if let Some(field) = members.instance_fields.get(name) {
            let value = match &self.value {
                HostValue::Object(object) => object
                    .get_field(name)
                    .unwrap_or_else(|| field.ty().default_value()),
                _ => field.ty().default_value(),
            };
            return Ok(self.guest(value));
        }
        if members.instance_methods.contains_key(name) {
            return Ok(BoundMethod::instance(&self.ctx, self.value.clone(), name));
        }
        Err(InteropError::unknown(name))
    }

    fn write_member(&self, name: &str, value: Value) -> InteropResult<()> {
        let HostValue::Object(object) = &self.value else {
            return Err(InteropError::unsupported("writeMember"));
        };
        let members = self.ctx.members(object.class());
        let field = members
            .instance_fields
            .get(name)
            .ok_or_else(|| InteropError::unknown(name))?;
        if field.is_final() {
            return Err(InteropError::unsupported(&format!("field {} is final", name)));
        }
        let converted = self.bridge(self.ctx.as_host(&value, field.ty()))?;
        object.set_field(name, converted);
        Ok(())
    }

    fn invoke_member(&self, name: &str, args: &[Value]) -> InteropResult<Value> {
        let result = self.bridge(self.ctx.invoke_member(&self.value, name, args))?;
        Ok(self.guest(result))
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    fn has_iterator(&self) -> bool {
        let policy = self.ctx.policy();
        match &self.value {
            HostValue::Iterable(_) | HostValue::Set(_) => policy.allow_iterable_access,
            HostValue::List(_) => policy.allow_iterable_access || policy.allow_list_access,
            HostValue::Array(_) => policy.allow_iterable_access || policy.allow_array_access,
            _ => false,
        }
    }

    fn get_iterator(&self) -> InteropResult<Value> {
        let iterator = self.bridge(self.fresh_iterator())?;
        Ok(Value::new(HostIteratorRef::new(&self.ctx, iterator)))
    }

    fn is_iterator(&self) -> bool {
        matches!(self.value, HostValue::Iterator(_)) && self.ctx.policy().allow_iterator_access
    }

    fn has_iterator_next_element(&self) -> InteropResult<bool> {
        let HostValue::Iterator(iterator) = &self.value else {
            return Err(InteropError::unsupported("hasIteratorNextElement"));
        };
        self.bridge(iterator.has_next())
    }

    fn get_iterator_next_element(&self) -> InteropResult<Value> {
        let HostValue::Iterator(iterator) = &self.value else {
            return Err(InteropError::unsupported("getIteratorNextElement"));
        };
        next_element(&self.ctx, iterator.as_ref())
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn is_exception(&self) -> bool {
        matches!(self.value, HostValue::Exception(_))
    }

    fn has_exception_message(&self) -> bool {
        matches!(&self.value, HostValue::Exception(e) if e.message().is_some())
    }

    fn get_exception_message(&self) -> InteropResult<String> {
        match &self.value {
            HostValue::Exception(e) => e
                .message()
                .map(str::to_string)
                .ok_or_else(|| InteropError::unsupported("getExceptionMessage")),
            _ => Err(InteropError::unsupported("getExceptionMessage")),
        }
    }

    fn has_exception_cause(&self) -> bool {
        matches!(&self.value, HostValue::Exception(e) if e.cause().is_some())
    }

    fn get_exception_cause(&self) -> InteropResult<Value> {
        let cause = match &self.value {
            HostValue::Exception(e) => e.cause(),
            _ => None,
        };
        match cause {
            Some(ExceptionCause::Host(host)) => Ok(self.guest(HostValue::Exception(host.clone()))),
            Some(ExceptionCause::Foreign(foreign)) => Ok(foreign.clone()),
            None => Err(InteropError::unsupported("getExceptionCause")),
        }
    }

    fn has_exception_stack_trace(&self) -> bool {
        self.is_exception()
    }

    fn get_exception_stack_trace(&self) -> InteropResult<Vec<String>> {
        match &self.value {
            HostValue::Exception(e) => Ok(e.stack_trace()),
            _ => Err(InteropError::unsupported("getExceptionStackTrace")),
        }
    }
}

fn next_element(ctx: &Arc<HostContext>, iterator: &dyn HostIterator) -> InteropResult<Value> {
    match iterator.next() {
        Ok(value) => Ok(ctx.to_guest(value)),
        Err(BridgeError::NoSuchElement) => Err(InteropError::StopIteration),
        Err(e) => Err(e.into_interop(ctx)),
    }
}

/// Iterator handed out by `get_iterator` on host collections. Unlike a
/// wrapped `Iterator` value it is not gated by iterator access.
pub struct HostIteratorRef {
    ctx: Arc<HostContext>,
    iterator: Arc<dyn HostIterator>,
}

impl HostIteratorRef {
    fn new(ctx: &Arc<HostContext>, iterator: Arc<dyn HostIterator>) -> Self {
        Self {
            ctx: ctx.clone(),
            iterator,
        }
    }
}

impl Interop for HostIteratorRef {
    fn display_string(&self) -> String {
        "[host Iterator]".to_string()
    }

    fn meta_name(&self) -> Option<String> {
        Some("Iterator".to_string())
    }

    fn is_iterator(&self) -> bool {
        true
    }

    fn has_iterator_next_element(&self) -> InteropResult<bool> {
        self.iterator
            .has_next()
            .map_err(|e| e.into_interop(&self.ctx))
    }

    fn get_iterator_next_element(&self) -> InteropResult<Value> {
        next_element(&self.ctx, self.iterator.as_ref())
    }
}
