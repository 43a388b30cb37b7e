use std::sync::Arc;

use polyhost_sdk::{InteropError, Value};

use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostMap, HostType, HostValue};

enum Backing {
    /// Hash entries, keys converted to the key type
    Hash { key: HostType },
    /// Non-internal members, keyed by name
    Members,
}

/// `Map<K, V>` over a foreign hash, or over the members of a foreign object
pub struct ForeignMap {
    ctx: Arc<HostContext>,
    value: Value,
    backing: Backing,
    val: HostType,
}

impl ForeignMap {
    /// Map over the hash entries of `value`
    pub fn hash(ctx: &Arc<HostContext>, value: &Value, key: &HostType, val: &HostType) -> Self {
        Self {
            ctx: ctx.clone(),
            value: value.clone(),
            backing: Backing::Hash { key: key.clone() },
            val: val.clone(),
        }
    }

    /// Map over the readable members of `value`, keyed by name
    pub fn members(ctx: &Arc<HostContext>, value: &Value, val: &HostType) -> Self {
        Self {
            ctx: ctx.clone(),
            value: value.clone(),
            backing: Backing::Members,
            val: val.clone(),
        }
    }

    fn guest_key(&self, key: &HostValue) -> Value {
        self.ctx.to_guest(key.clone())
    }

    fn unknown_key(key: &HostValue) -> BridgeError {
        BridgeError::Interop(InteropError::unknown(key.display_string()))
    }

    /// Declared, readable member names
    fn readable_members(&self) -> BridgeResult<Vec<String>> {
        Ok(self
            .value
            .get_members(false)?
            .into_iter()
            .filter(|name| self.value.is_member_readable(name))
            .collect())
    }

    /// Walk the foreign entries iterator, converting keys, until `visit`
    /// asks to stop
    fn walk_hash_keys(
        &self,
        key: &HostType,
        mut visit: impl FnMut(HostValue) -> bool,
    ) -> BridgeResult<()> {
        let entries = self.value.get_hash_entries_iterator()?;
        while entries.has_iterator_next_element()? {
            let pair = entries.get_iterator_next_element()?;
            let raw = pair.read_array_element(0)?;
            if !visit(self.ctx.as_host(&raw, key)?) {
                break;
            }
        }
        Ok(())
    }
}

fn member_name(key: &HostValue) -> Option<String> {
    match key {
        HostValue::String(s) => Some(s.to_string()),
        HostValue::Char(c) => Some(String::from_utf16_lossy(&[*c])),
        _ => None,
    }
}

impl HostMap for ForeignMap {
    fn size(&self) -> BridgeResult<usize> {
        match &self.backing {
            Backing::Hash { .. } => Ok(self.value.get_hash_size()?.max(0) as usize),
            Backing::Members => Ok(self.readable_members()?.len()),
        }
    }

    fn get(&self, key: &HostValue) -> BridgeResult<Option<HostValue>> {
        let item = match &self.backing {
            Backing::Hash { .. } => {
                let key = self.guest_key(key);
                if !self.value.is_hash_entry_readable(&key) {
                    return Ok(None);
                }
                self.value.read_hash_value(&key)?
            }
            Backing::Members => {
                let Some(name) = member_name(key) else {
                    return Ok(None);
                };
                if !self.value.is_member_readable(&name) {
                    return Ok(None);
                }
                self.value.read_member(&name)?
            }
        };
        Ok(Some(self.ctx.as_host(&item, &self.val)?))
    }

    fn contains_key(&self, key: &HostValue) -> BridgeResult<bool> {
        Ok(match &self.backing {
            Backing::Hash { .. } => self.value.is_hash_entry_existing(&self.guest_key(key)),
            Backing::Members => member_name(key).is_some_and(|n| self.value.is_member_existing(&n)),
        })
    }

    fn put(&self, key: HostValue, value: HostValue) -> BridgeResult<Option<HostValue>> {
        let previous = self.get(&key)?;
        match &self.backing {
            Backing::Hash { .. } => {
                let guest_key = self.guest_key(&key);
                let allowed = if self.value.is_hash_entry_existing(&guest_key) {
                    self.value.is_hash_entry_modifiable(&guest_key)
                } else {
                    self.value.is_hash_entry_insertable(&guest_key)
                };
                if !allowed {
                    return Err(BridgeError::unsupported("put"));
                }
                self.value
                    .write_hash_entry(guest_key, self.ctx.to_guest(value))?;
            }
            Backing::Members => {
                let name = member_name(&key)
                    .ok_or_else(|| BridgeError::unsupported("put: member keys must be strings"))?;
                let allowed = if self.value.is_member_existing(&name) {
                    self.value.is_member_modifiable(&name)
                } else {
                    self.value.is_member_insertable(&name)
                };
                if !allowed {
                    return Err(BridgeError::unsupported("put"));
                }
                self.value.write_member(&name, self.ctx.to_guest(value))?;
            }
        }
        Ok(previous)
    }

    fn remove(&self, key: &HostValue) -> BridgeResult<HostValue> {
        match &self.backing {
            Backing::Hash { .. } => {
                let guest_key = self.guest_key(key);
                if !self.value.is_hash_entry_existing(&guest_key) {
                    return Err(Self::unknown_key(key));
                }
                if !self.value.is_hash_entry_removable(&guest_key) {
                    return Err(BridgeError::unsupported("remove"));
                }
                let previous = self.get(key)?.unwrap_or(HostValue::Null);
                self.value.remove_hash_entry(&guest_key)?;
                Ok(previous)
            }
            Backing::Members => {
                let name = member_name(key)
                    .filter(|n| self.value.is_member_existing(n))
                    .ok_or_else(|| Self::unknown_key(key))?;
                if !self.value.is_member_removable(&name) {
                    return Err(BridgeError::unsupported("remove"));
                }
                let previous = self.get(key)?.unwrap_or(HostValue::Null);
                self.value.remove_member(&name)?;
                Ok(previous)
            }
        }
    }

    fn keys(&self) -> BridgeResult<Vec<HostValue>> {
        match &self.backing {
            Backing::Hash { key } => {
                let mut out = Vec::new();
                self.walk_hash_keys(key, |k| {
                    out.push(k);
                    true
                })?;
                Ok(out)
            }
            Backing::Members => Ok(self
                .readable_members()?
                .into_iter()
                .map(HostValue::from)
                .collect()),
        }
    }

    fn key_at(&self, index: usize) -> BridgeResult<Option<HostValue>> {
        match &self.backing {
            Backing::Hash { key } => {
                let mut seen = 0;
                let mut found = None;
                self.walk_hash_keys(key, |k| {
                    if seen == index {
                        found = Some(k);
                        return false;
                    }
                    seen += 1;
                    true
                })?;
                Ok(found)
            }
            Backing::Members => Ok(self
                .readable_members()?
                .into_iter()
                .nth(index)
                .map(HostValue::from)),
        }
    }

    fn foreign_source(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::collections::{entry_set, key_set, CollectionIterator};
    use crate::host::{HostIterator, HostMapEntry};
    use crate::policy::AccessPolicy;
    use polyhost_sdk::{GuestHash, GuestObject, Interop, InteropResult};

    fn ctx() -> Arc<HostContext> {
        HostContext::with_policy(AccessPolicy::all())
    }

    #[test]
    fn test_hash_view_reads_and_writes_through() {
        let ctx = ctx();
        let hash = GuestHash::new().with("a", 1).into_value();
        let map = ForeignMap::hash(&ctx, &hash, &HostType::String, &HostType::int());
        assert_eq!(map.size().unwrap(), 1);
        assert_eq!(map.get(&HostValue::from("a")).unwrap().unwrap().as_int(), Some(1));
        assert!(map.get(&HostValue::from("b")).unwrap().is_none());

        assert!(map.put(HostValue::from("b"), HostValue::Int(2)).unwrap().is_none());
        assert_eq!(hash.get_hash_size().unwrap(), 2);
        let keys: Vec<String> = map
            .keys()
            .unwrap()
            .iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_absent_key() {
        let ctx = ctx();
        let hash = GuestHash::new().into_value();
        let map = ForeignMap::hash(&ctx, &hash, &HostType::String, &HostType::Object);
        assert!(matches!(
            map.remove(&HostValue::from("missing")),
            Err(BridgeError::Interop(InteropError::UnknownIdentifier(_)))
        ));
    }

    #[test]
    fn test_remove_not_allowed() {
        let ctx = ctx();
        let hash = GuestHash::new().with("k", 1).without_removal().into_value();
        let map = ForeignMap::hash(&ctx, &hash, &HostType::String, &HostType::Object);
        assert!(matches!(
            map.remove(&HostValue::from("k")),
            Err(BridgeError::Interop(InteropError::UnsupportedMessage(_)))
        ));
        assert_eq!(hash.get_hash_size().unwrap(), 1);
    }

    #[test]
    fn test_members_view() {
        let ctx = ctx();
        let object = GuestObject::new()
            .with("x", 1)
            .with_internal("hidden", 2)
            .into_value();
        let map: Arc<dyn HostMap> = Arc::new(ForeignMap::members(&ctx, &object, &HostType::Object));
        assert_eq!(map.size().unwrap(), 1);
        map.put(HostValue::from("y"), HostValue::Int(5)).unwrap();
        assert!(object.is_member_existing("y"));
        assert_eq!(map.remove(&HostValue::from("x")).unwrap().as_int(), Some(1));
        assert!(!map.contains_key(&HostValue::Int(1)).unwrap());
        assert_eq!(key_set(&map).size().unwrap(), 1);
        assert_eq!(entry_set(&map).elements().unwrap().len(), 1);
    }

    #[test]
    fn test_key_iteration_follows_backing_hash() {
        let ctx = ctx();
        let hash = GuestHash::new().with("a", 1).into_value();
        let map: Arc<dyn HostMap> =
            Arc::new(ForeignMap::hash(&ctx, &hash, &HostType::String, &HostType::int()));
        let iter = CollectionIterator::new(key_set(&map)).unwrap();
        assert_eq!(iter.next().unwrap().as_str(), Some("a"));
        assert!(!iter.has_next().unwrap());

        hash.write_hash_entry(Value::from("b"), Value::from(2)).unwrap();
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.next().unwrap().as_str(), Some("b"));
        assert!(!iter.has_next().unwrap());
    }

    #[test]
    fn test_entry_iteration_removes_from_backing_hash() {
        let ctx = ctx();
        let hash = GuestHash::new().with("a", 1).with("b", 2).into_value();
        let map: Arc<dyn HostMap> =
            Arc::new(ForeignMap::hash(&ctx, &hash, &HostType::String, &HostType::int()));
        let iter = CollectionIterator::new(entry_set(&map)).unwrap();
        iter.next().unwrap();
        iter.remove().unwrap();
        assert_eq!(hash.get_hash_size().unwrap(), 1);
        let HostValue::MapEntry(entry) = iter.next().unwrap() else {
            panic!("expected an entry");
        };
        assert_eq!(entry.key().unwrap().as_str(), Some("b"));
    }

    /// Object that lists a member it refuses to read
    struct Sealed;

    impl Interop for Sealed {
        fn display_string(&self) -> String {
            "Sealed".to_string()
        }

        fn has_members(&self) -> bool {
            true
        }

        fn get_members(&self, _include_internal: bool) -> InteropResult<Vec<String>> {
            Ok(vec!["open".to_string(), "sealed".to_string()])
        }

        fn is_member_existing(&self, name: &str) -> bool {
            matches!(name, "open" | "sealed")
        }

        fn is_member_readable(&self, name: &str) -> bool {
            name == "open"
        }

        fn read_member(&self, name: &str) -> InteropResult<Value> {
            match name {
                "open" => Ok(Value::from(1)),
                _ => Err(InteropError::unknown(name)),
            }
        }
    }

    #[test]
    fn test_members_view_skips_unreadable_members() {
        let ctx = ctx();
        let object = Value::new(Sealed);
        let map: Arc<dyn HostMap> = Arc::new(ForeignMap::members(&ctx, &object, &HostType::Object));
        assert_eq!(map.size().unwrap(), 1);
        let keys: Vec<String> = map
            .keys()
            .unwrap()
            .iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        assert_eq!(keys, vec!["open"]);
        let iter = CollectionIterator::new(key_set(&map)).unwrap();
        assert_eq!(iter.next().unwrap().as_str(), Some("open"));
        assert!(!iter.has_next().unwrap());
    }
}
