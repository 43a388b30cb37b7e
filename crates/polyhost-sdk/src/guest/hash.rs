//! Guest hashes with arbitrary keys

use parking_lot::RwLock;

use super::array::GuestArray;
use super::iterator::GuestIterator;
use super::same_key;
use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;
use crate::value::Value;

/// An insertion-ordered guest hash
pub struct GuestHash {
    entries: RwLock<Vec<(Value, Value)>>,
    removable: bool,
}

impl GuestHash {
    /// Empty hash that allows removal
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            removable: true,
        }
    }

    /// Builder-style insert
    pub fn with(self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.entries.write().push((key.into(), value.into()));
        self
    }

    /// Disallow entry removal
    pub fn without_removal(mut self) -> Self {
        self.removable = false;
        self
    }

    /// Wrap as a foreign value
    pub fn into_value(self) -> Value {
        Value::new(self)
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.read().iter().position(|(k, _)| same_key(k, key))
    }
}

impl Default for GuestHash {
    fn default() -> Self {
        Self::new()
    }
}

impl Interop for GuestHash {
    fn display_string(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| format!("{}: {}", k.display_string(), v.display_string()))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }

    fn meta_name(&self) -> Option<String> {
        Some("Map".to_string())
    }

    fn has_hash_entries(&self) -> bool {
        true
    }

    fn get_hash_size(&self) -> InteropResult<i64> {
        Ok(self.entries.read().len() as i64)
    }

    fn is_hash_entry_readable(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    fn is_hash_entry_modifiable(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    fn is_hash_entry_insertable(&self, key: &Value) -> bool {
        self.position(key).is_none()
    }

    fn is_hash_entry_removable(&self, key: &Value) -> bool {
        self.removable && self.position(key).is_some()
    }

    fn read_hash_value(&self, key: &Value) -> InteropResult<Value> {
        self.entries
            .read()
            .iter()
            .find(|(k, _)| same_key(k, key))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| InteropError::unknown(key.display_string()))
    }

    fn write_hash_entry(&self, key: Value, value: Value) -> InteropResult<()> {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(k, _)| same_key(k, &key)) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
        Ok(())
    }

    fn remove_hash_entry(&self, key: &Value) -> InteropResult<()> {
        let mut entries = self.entries.write();
        let Some(index) = entries.iter().position(|(k, _)| same_key(k, key)) else {
            return Err(InteropError::unknown(key.display_string()));
        };
        if !self.removable {
            return Err(InteropError::unsupported("removeHashEntry"));
        }
        entries.remove(index);
        Ok(())
    }

    fn get_hash_entries_iterator(&self) -> InteropResult<Value> {
        let pairs = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| GuestArray::read_only(vec![k.clone(), v.clone()]))
            .collect();
        Ok(Value::new(GuestIterator::new(pairs)))
    }
}
