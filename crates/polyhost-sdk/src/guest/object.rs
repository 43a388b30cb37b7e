//! Guest objects with named members

use parking_lot::RwLock;

use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;
use crate::value::Value;

struct Member {
    name: String,
    value: Value,
    internal: bool,
}

/// A member holder. Members whose value is executable are invocable.
pub struct GuestObject {
    members: RwLock<Vec<Member>>,
    meta: Option<String>,
    writable: bool,
    removable: bool,
}

impl GuestObject {
    /// Empty, writable object whose members can be removed
    pub fn new() -> Self {
        Self {
            members: RwLock::new(Vec::new()),
            meta: None,
            writable: true,
            removable: true,
        }
    }

    /// Builder-style member definition
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.members.write().push(Member {
            name: name.to_string(),
            value: value.into(),
            internal: false,
        });
        self
    }

    /// Builder-style internal member, hidden from default enumeration
    pub fn with_internal(self, name: &str, value: impl Into<Value>) -> Self {
        self.members.write().push(Member {
            name: name.to_string(),
            value: value.into(),
            internal: true,
        });
        self
    }

    /// Declared type name reported by `meta_name`
    pub fn named(mut self, meta: &str) -> Self {
        self.meta = Some(meta.to_string());
        self
    }

    /// Reject writes and removals
    pub fn frozen(mut self) -> Self {
        self.writable = false;
        self.removable = false;
        self
    }

    /// Reject removals only
    pub fn without_removal(mut self) -> Self {
        self.removable = false;
        self
    }

    /// Wrap as a foreign value
    pub fn into_value(self) -> Value {
        Value::new(self)
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.members
            .read()
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.clone())
    }
}

impl Default for GuestObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Interop for GuestObject {
    fn display_string(&self) -> String {
        let parts: Vec<String> = self
            .members
            .read()
            .iter()
            .filter(|m| !m.internal)
            .map(|m| format!("{}: {}", m.name, m.value.display_string()))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }

    fn meta_name(&self) -> Option<String> {
        self.meta.clone()
    }

    fn has_members(&self) -> bool {
        true
    }

    fn get_members(&self, include_internal: bool) -> InteropResult<Vec<String>> {
        Ok(self
            .members
            .read()
            .iter()
            .filter(|m| include_internal || !m.internal)
            .map(|m| m.name.clone())
            .collect())
    }

    fn is_member_readable(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn is_member_modifiable(&self, name: &str) -> bool {
        self.writable && self.lookup(name).is_some()
    }

    fn is_member_insertable(&self, name: &str) -> bool {
        self.writable && self.lookup(name).is_none()
    }

    fn is_member_removable(&self, name: &str) -> bool {
        self.removable && self.lookup(name).is_some()
    }

    fn is_member_invocable(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|v| v.is_executable())
    }

    fn is_member_internal(&self, name: &str) -> bool {
        self.members
            .read()
            .iter()
            .any(|m| m.name == name && m.internal)
    }

    fn read_member(&self, name: &str) -> InteropResult<Value> {
        self.lookup(name).ok_or_else(|| InteropError::unknown(name))
    }

    fn write_member(&self, name: &str, value: Value) -> InteropResult<()> {
        if !self.writable {
            return Err(InteropError::unsupported("writeMember"));
        }
        let mut members = self.members.write();
        match members.iter_mut().find(|m| m.name == name) {
            Some(member) => member.value = value,
            None => members.push(Member {
                name: name.to_string(),
                value,
                internal: false,
            }),
        }
        Ok(())
    }

    fn remove_member(&self, name: &str) -> InteropResult<()> {
        let mut members = self.members.write();
        let Some(index) = members.iter().position(|m| m.name == name) else {
            return Err(InteropError::unknown(name));
        };
        if !self.removable {
            return Err(InteropError::unsupported("removeMember"));
        }
        members.remove(index);
        Ok(())
    }

    fn invoke_member(&self, name: &str, args: &[Value]) -> InteropResult<Value> {
        let member = self.lookup(name).ok_or_else(|| InteropError::unknown(name))?;
        member.execute(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::GuestFunction;

    #[test]
    fn test_members_and_invocation() {
        let obj = GuestObject::new()
            .with("x", 1)
            .with(
                "double",
                GuestFunction::new("double", |args| {
                    Ok(Value::from(args[0].as_int()? * 2))
                }),
            )
            .into_value();
        assert!(obj.is_member_readable("x"));
        assert!(!obj.is_member_invocable("x"));
        assert!(obj.is_member_invocable("double"));
        let r = obj.invoke_member("double", &[Value::from(21)]).unwrap();
        assert_eq!(r.as_int().unwrap(), 42);
        assert!(matches!(
            obj.invoke_member("missing", &[]),
            Err(InteropError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn test_internal_members_hidden() {
        let obj = GuestObject::new()
            .with("a", 1)
            .with_internal("__proto", 2)
            .into_value();
        assert_eq!(obj.get_members(false).unwrap(), vec!["a".to_string()]);
        assert_eq!(obj.get_members(true).unwrap().len(), 2);
        assert!(obj.is_member_internal("__proto"));
    }

    #[test]
    fn test_frozen_object() {
        let obj = GuestObject::new().with("a", 1).frozen().into_value();
        assert!(!obj.is_member_modifiable("a"));
        assert!(obj.write_member("a", Value::from(2)).is_err());
        assert!(matches!(
            obj.remove_member("a"),
            Err(InteropError::UnsupportedMessage(_))
        ));
    }
}
