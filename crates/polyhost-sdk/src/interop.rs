//! The capability protocol every foreign value answers.
//!
//! Implementors override only the capabilities they actually have. Each
//! predicate defaults to `false` and each accessor defaults to
//! [`InteropError::UnsupportedMessage`], so a value never claims a capability
//! by accident. Callers go through [`Value`], which checks the guarding
//! predicate before any accessor reaches the implementation.
//!
//! | Group      | Predicate             | Accessors                                              |
//! |------------|-----------------------|--------------------------------------------------------|
//! | scalar     | `is_null`             |                                                        |
//! |            | `is_boolean`          | `as_boolean`                                           |
//! |            | `is_string`           | `as_string`                                            |
//! |            | `is_number`           | `fits_in_*`, `as_*`, `number_kind`                     |
//! | array      | `has_array_elements`  | `get_array_size`, `read/write/remove_array_element`    |
//! | hash       | `has_hash_entries`    | `get_hash_size`, `read_hash_value`, `write_hash_entry`, `remove_hash_entry`, `get_hash_entries_iterator` |
//! | members    | `has_members`         | `get_members`, `read/write/remove_member`, `invoke_member` |
//! | executable | `is_executable`       | `execute`                                              |
//! |            | `is_instantiable`     | `instantiate`                                          |
//! | iteration  | `has_iterator`        | `get_iterator`                                         |
//! |            | `is_iterator`         | `has_iterator_next_element`, `get_iterator_next_element` |
//! | exception  | `is_exception`        | `get_exception_message/cause/stack_trace`, `throw_exception` |

use std::any::Any;

use crate::error::{InteropError, InteropResult};
use crate::value::{NumberKind, Value};

/// Capability protocol for one foreign value.
pub trait Interop: Any + Send + Sync {
    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Human-readable form used in diagnostics
    fn display_string(&self) -> String;

    /// Declared type name, if the value has one
    fn meta_name(&self) -> Option<String> {
        None
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    /// True for the null value
    fn is_null(&self) -> bool {
        false
    }

    /// True for booleans
    fn is_boolean(&self) -> bool {
        false
    }

    /// Boolean payload
    fn as_boolean(&self) -> InteropResult<bool> {
        Err(InteropError::unsupported("asBoolean"))
    }

    /// True for string-like values
    fn is_string(&self) -> bool {
        false
    }

    /// String payload
    fn as_string(&self) -> InteropResult<String> {
        Err(InteropError::unsupported("asString"))
    }

    /// True for numbers
    fn is_number(&self) -> bool {
        false
    }

    /// Natural width of the number
    fn number_kind(&self) -> Option<NumberKind> {
        None
    }

    /// Value is exactly representable as `i8`
    fn fits_in_byte(&self) -> bool {
        false
    }

    /// Value is exactly representable as `i16`
    fn fits_in_short(&self) -> bool {
        false
    }

    /// Value is exactly representable as `i32`
    fn fits_in_int(&self) -> bool {
        false
    }

    /// Value is exactly representable as `i64`
    fn fits_in_long(&self) -> bool {
        false
    }

    /// Value is exactly representable as `f32`
    fn fits_in_float(&self) -> bool {
        false
    }

    /// Value is exactly representable as `f64`
    fn fits_in_double(&self) -> bool {
        false
    }

    /// Number as `i8`; fails unless it fits
    fn as_byte(&self) -> InteropResult<i8> {
        Err(InteropError::unsupported("asByte"))
    }

    /// Number as `i16`; fails unless it fits
    fn as_short(&self) -> InteropResult<i16> {
        Err(InteropError::unsupported("asShort"))
    }

    /// Number as `i32`; fails unless it fits
    fn as_int(&self) -> InteropResult<i32> {
        Err(InteropError::unsupported("asInt"))
    }

    /// Number as `i64`; fails unless it fits
    fn as_long(&self) -> InteropResult<i64> {
        Err(InteropError::unsupported("asLong"))
    }

    /// Number as `f32`; fails unless it fits
    fn as_float(&self) -> InteropResult<f32> {
        Err(InteropError::unsupported("asFloat"))
    }

    /// Number as `f64`; fails unless it fits
    fn as_double(&self) -> InteropResult<f64> {
        Err(InteropError::unsupported("asDouble"))
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    /// True for array-like values
    fn has_array_elements(&self) -> bool {
        false
    }

    /// Number of elements
    fn get_array_size(&self) -> InteropResult<i64> {
        Err(InteropError::unsupported("getArraySize"))
    }

    /// Element at `index` can be read
    fn is_array_element_readable(&self, _index: i64) -> bool {
        false
    }

    /// Element at `index` exists and can be overwritten
    fn is_array_element_modifiable(&self, _index: i64) -> bool {
        false
    }

    /// A new element can be written at `index`
    fn is_array_element_insertable(&self, _index: i64) -> bool {
        false
    }

    /// Element at `index` can be structurally removed
    fn is_array_element_removable(&self, _index: i64) -> bool {
        false
    }

    /// Reads one element
    fn read_array_element(&self, _index: i64) -> InteropResult<Value> {
        Err(InteropError::unsupported("readArrayElement"))
    }

    /// Overwrites or inserts one element
    fn write_array_element(&self, _index: i64, _value: Value) -> InteropResult<()> {
        Err(InteropError::unsupported("writeArrayElement"))
    }

    /// Removes one element, shifting the rest
    fn remove_array_element(&self, _index: i64) -> InteropResult<()> {
        Err(InteropError::unsupported("removeArrayElement"))
    }

    // ========================================================================
    // Hashes
    // ========================================================================

    /// True for hash-like values with arbitrary keys
    fn has_hash_entries(&self) -> bool {
        false
    }

    /// Number of entries
    fn get_hash_size(&self) -> InteropResult<i64> {
        Err(InteropError::unsupported("getHashSize"))
    }

    /// An entry for `key` exists
    fn is_hash_entry_existing(&self, key: &Value) -> bool {
        self.is_hash_entry_readable(key)
            || self.is_hash_entry_modifiable(key)
            || self.is_hash_entry_removable(key)
    }

    /// True when the entry for `key` can be read
    fn is_hash_entry_readable(&self, _key: &Value) -> bool {
        false
    }

    /// True when the entry for `key` exists and can be replaced
    fn is_hash_entry_modifiable(&self, _key: &Value) -> bool {
        false
    }

    /// True when `key` is unmapped and can be added
    fn is_hash_entry_insertable(&self, _key: &Value) -> bool {
        false
    }

    /// True when the entry for `key` can be removed
    fn is_hash_entry_removable(&self, _key: &Value) -> bool {
        false
    }

    /// Reads the value stored under `key`
    fn read_hash_value(&self, _key: &Value) -> InteropResult<Value> {
        Err(InteropError::unsupported("readHashValue"))
    }

    /// Inserts or replaces an entry
    fn write_hash_entry(&self, _key: Value, _value: Value) -> InteropResult<()> {
        Err(InteropError::unsupported("writeHashEntry"))
    }

    /// Removes the entry stored under `key`
    fn remove_hash_entry(&self, _key: &Value) -> InteropResult<()> {
        Err(InteropError::unsupported("removeHashEntry"))
    }

    /// Iterator over `[key, value]` pairs
    fn get_hash_entries_iterator(&self) -> InteropResult<Value> {
        Err(InteropError::unsupported("getHashEntriesIterator"))
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// True for values with named members
    fn has_members(&self) -> bool {
        false
    }

    /// Member names, optionally including internal ones
    fn get_members(&self, _include_internal: bool) -> InteropResult<Vec<String>> {
        Err(InteropError::unsupported("getMembers"))
    }

    /// True when member `name` can be read
    fn is_member_readable(&self, _name: &str) -> bool {
        false
    }

    /// True when member `name` exists and can be written
    fn is_member_modifiable(&self, _name: &str) -> bool {
        false
    }

    /// True when member `name` is absent and can be added
    fn is_member_insertable(&self, _name: &str) -> bool {
        false
    }

    /// True when member `name` can be removed
    fn is_member_removable(&self, _name: &str) -> bool {
        false
    }

    /// True when member `name` can be called
    fn is_member_invocable(&self, _name: &str) -> bool {
        false
    }

    /// True when member `name` is internal
    fn is_member_internal(&self, _name: &str) -> bool {
        false
    }

    /// A member called `name` exists
    fn is_member_existing(&self, name: &str) -> bool {
        self.is_member_readable(name)
            || self.is_member_modifiable(name)
            || self.is_member_removable(name)
            || self.is_member_invocable(name)
    }

    /// Value of member `name`
    fn read_member(&self, _name: &str) -> InteropResult<Value> {
        Err(InteropError::unsupported("readMember"))
    }

    /// Set member `name`
    fn write_member(&self, _name: &str, _value: Value) -> InteropResult<()> {
        Err(InteropError::unsupported("writeMember"))
    }

    /// Remove member `name`
    fn remove_member(&self, _name: &str) -> InteropResult<()> {
        Err(InteropError::unsupported("removeMember"))
    }

    /// Call member `name` with `args`
    fn invoke_member(&self, _name: &str, _args: &[Value]) -> InteropResult<Value> {
        Err(InteropError::unsupported("invokeMember"))
    }

    // ========================================================================
    // Executables
    // ========================================================================

    /// True for callable values
    fn is_executable(&self) -> bool {
        false
    }

    /// Call the value with `args`
    fn execute(&self, _args: &[Value]) -> InteropResult<Value> {
        Err(InteropError::unsupported("execute"))
    }

    /// True for values that construct new instances
    fn is_instantiable(&self) -> bool {
        false
    }

    /// Construct a new value from `args`
    fn instantiate(&self, _args: &[Value]) -> InteropResult<Value> {
        Err(InteropError::unsupported("instantiate"))
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// True for values that can produce an iterator
    fn has_iterator(&self) -> bool {
        false
    }

    /// Fresh iterator over the value
    fn get_iterator(&self) -> InteropResult<Value> {
        Err(InteropError::unsupported("getIterator"))
    }

    /// True for iterators
    fn is_iterator(&self) -> bool {
        false
    }

    /// True while the iterator has elements left
    fn has_iterator_next_element(&self) -> InteropResult<bool> {
        Err(InteropError::unsupported("hasIteratorNextElement"))
    }

    /// Next element, or [`InteropError::StopIteration`] once exhausted
    fn get_iterator_next_element(&self) -> InteropResult<Value> {
        Err(InteropError::unsupported("getIteratorNextElement"))
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// True for exception values
    fn is_exception(&self) -> bool {
        false
    }

    /// True when the exception carries a message
    fn has_exception_message(&self) -> bool {
        false
    }

    /// Exception message
    fn get_exception_message(&self) -> InteropResult<String> {
        Err(InteropError::unsupported("getExceptionMessage"))
    }

    /// True when the exception has a cause
    fn has_exception_cause(&self) -> bool {
        false
    }

    /// Cause of the exception
    fn get_exception_cause(&self) -> InteropResult<Value> {
        Err(InteropError::unsupported("getExceptionCause"))
    }

    /// True when the exception records frames
    fn has_exception_stack_trace(&self) -> bool {
        false
    }

    /// Frames, innermost first
    fn get_exception_stack_trace(&self) -> InteropResult<Vec<String>> {
        Err(InteropError::unsupported("getExceptionStackTrace"))
    }
}
