//! Foreign value handle and number representation

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;

// ============================================================================
// Value handle
// ============================================================================

/// Opaque handle to one foreign value.
///
/// Cloning shares the underlying value; identity is pointer identity. Every
/// accessor checks its guarding predicate first and fails with
/// [`InteropError::UnsupportedMessage`] when the predicate is false, so
/// implementors of [`Interop`] can rely on the precondition.
#[derive(Clone)]
pub struct Value(Arc<dyn Interop>);

impl Value {
    /// Wrap a capability implementation
    pub fn new<T: Interop>(inner: T) -> Self {
        Value(Arc::new(inner))
    }

    /// Wrap an already shared implementation
    pub fn from_arc(inner: Arc<dyn Interop>) -> Self {
        Value(inner)
    }

    /// Same underlying value
    pub fn ptr_eq(&self, other: &Value) -> bool {
        self.identity() == other.identity()
    }

    /// Stable identity token, valid while any handle is alive
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Access the concrete implementation
    pub fn downcast_ref<T: Interop>(&self) -> Option<&T> {
        let any: &dyn Any = &*self.0;
        any.downcast_ref::<T>()
    }

    /// Borrow the capability implementation
    pub fn interop(&self) -> &dyn Interop {
        &*self.0
    }

    /// Human-readable text of the value
    pub fn display_string(&self) -> String {
        self.0.display_string()
    }

    /// Foreign type name, if the value has one
    pub fn meta_name(&self) -> Option<String> {
        self.0.meta_name()
    }

    // ------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------

    /// True for the foreign null
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// True for booleans
    pub fn is_boolean(&self) -> bool {
        self.0.is_boolean()
    }

    /// Boolean payload
    pub fn as_boolean(&self) -> InteropResult<bool> {
        guard(self.0.is_boolean(), "asBoolean")?;
        self.0.as_boolean()
    }

    /// True for strings
    pub fn is_string(&self) -> bool {
        self.0.is_string()
    }

    /// String payload
    pub fn as_string(&self) -> InteropResult<String> {
        guard(self.0.is_string(), "asString")?;
        self.0.as_string()
    }

    /// True for numbers of any width
    pub fn is_number(&self) -> bool {
        self.0.is_number()
    }

    /// Natural width of a number. Values that report no width are classified
    /// by the narrowest integral or floating kind they fit.
    pub fn number_kind(&self) -> Option<NumberKind> {
        if !self.0.is_number() {
            return None;
        }
        self.0.number_kind().or_else(|| {
            if self.0.fits_in_long() {
                Some(NumberKind::Long)
            } else {
                Some(NumberKind::Double)
            }
        })
    }

    /// True when the number converts to `i8` without loss
    pub fn fits_in_byte(&self) -> bool {
        self.0.is_number() && self.0.fits_in_byte()
    }

    /// True when the number converts to `i16` without loss
    pub fn fits_in_short(&self) -> bool {
        self.0.is_number() && self.0.fits_in_short()
    }

    /// True when the number converts to `i32` without loss
    pub fn fits_in_int(&self) -> bool {
        self.0.is_number() && self.0.fits_in_int()
    }

    /// True when the number converts to `i64` without loss
    pub fn fits_in_long(&self) -> bool {
        self.0.is_number() && self.0.fits_in_long()
    }

    /// True when the number converts to `f32` without loss
    pub fn fits_in_float(&self) -> bool {
        self.0.is_number() && self.0.fits_in_float()
    }

    /// True when the number converts to `f64` without loss
    pub fn fits_in_double(&self) -> bool {
        self.0.is_number() && self.0.fits_in_double()
    }

    /// Number as `i8`; fails unless it fits
    pub fn as_byte(&self) -> InteropResult<i8> {
        guard(self.fits_in_byte(), "asByte")?;
        self.0.as_byte()
    }

    /// Number as `i16`; fails unless it fits
    pub fn as_short(&self) -> InteropResult<i16> {
        guard(self.fits_in_short(), "asShort")?;
        self.0.as_short()
    }

    /// Number as `i32`; fails unless it fits
    pub fn as_int(&self) -> InteropResult<i32> {
        guard(self.fits_in_int(), "asInt")?;
        self.0.as_int()
    }

    /// Number as `i64`; fails unless it fits
    pub fn as_long(&self) -> InteropResult<i64> {
        guard(self.fits_in_long(), "asLong")?;
        self.0.as_long()
    }

    /// Number as `f32`; fails unless it fits
    pub fn as_float(&self) -> InteropResult<f32> {
        guard(self.fits_in_float(), "asFloat")?;
        self.0.as_float()
    }

    /// Number as `f64`; fails unless it fits
    pub fn as_double(&self) -> InteropResult<f64> {
        guard(self.fits_in_double(), "asDouble")?;
        self.0.as_double()
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// True for array-like values
    pub fn has_array_elements(&self) -> bool {
        self.0.has_array_elements()
    }

    /// Number of array elements
    pub fn get_array_size(&self) -> InteropResult<i64> {
        guard(self.0.has_array_elements(), "getArraySize")?;
        self.0.get_array_size()
    }

    /// True when element `index` can be read
    pub fn is_array_element_readable(&self, index: i64) -> bool {
        self.0.has_array_elements() && self.0.is_array_element_readable(index)
    }

    /// True when element `index` exists and can be replaced
    pub fn is_array_element_modifiable(&self, index: i64) -> bool {
        self.0.has_array_elements() && self.0.is_array_element_modifiable(index)
    }

    /// True when element `index` can be appended
    pub fn is_array_element_insertable(&self, index: i64) -> bool {
        self.0.has_array_elements() && self.0.is_array_element_insertable(index)
    }

    /// True when element `index` can be removed
    pub fn is_array_element_removable(&self, index: i64) -> bool {
        self.0.has_array_elements() && self.0.is_array_element_removable(index)
    }

    /// Element at `index`
    pub fn read_array_element(&self, index: i64) -> InteropResult<Value> {
        guard(self.0.has_array_elements(), "readArrayElement")?;
        self.0.read_array_element(index)
    }

    /// Replace or append element `index`
    pub fn write_array_element(&self, index: i64, value: Value) -> InteropResult<()> {
        guard(self.0.has_array_elements(), "writeArrayElement")?;
        self.0.write_array_element(index, value)
    }

    /// Remove element `index`, shifting later elements down
    pub fn remove_array_element(&self, index: i64) -> InteropResult<()> {
        guard(self.0.has_array_elements(), "removeArrayElement")?;
        self.0.remove_array_element(index)
    }

    // ------------------------------------------------------------------
    // Hashes
    // ------------------------------------------------------------------

    /// True for hash-like values
    pub fn has_hash_entries(&self) -> bool {
        self.0.has_hash_entries()
    }

    /// Number of hash entries
    pub fn get_hash_size(&self) -> InteropResult<i64> {
        guard(self.0.has_hash_entries(), "getHashSize")?;
        self.0.get_hash_size()
    }

    /// True when `key` is mapped
    pub fn is_hash_entry_existing(&self, key: &Value) -> bool {
        self.0.has_hash_entries() && self.0.is_hash_entry_existing(key)
    }

    /// True when the entry for `key` can be read
    pub fn is_hash_entry_readable(&self, key: &Value) -> bool {
        self.0.has_hash_entries() && self.0.is_hash_entry_readable(key)
    }

    /// True when the entry for `key` exists and can be replaced
    pub fn is_hash_entry_modifiable(&self, key: &Value) -> bool {
        self.0.has_hash_entries() && self.0.is_hash_entry_modifiable(key)
    }

    /// True when `key` is unmapped and can be added
    pub fn is_hash_entry_insertable(&self, key: &Value) -> bool {
        self.0.has_hash_entries() && self.0.is_hash_entry_insertable(key)
    }

    /// True when the entry for `key` can be removed
    pub fn is_hash_entry_removable(&self, key: &Value) -> bool {
        self.0.has_hash_entries() && self.0.is_hash_entry_removable(key)
    }

    /// Value mapped to `key`
    pub fn read_hash_value(&self, key: &Value) -> InteropResult<Value> {
        guard(self.0.has_hash_entries(), "readHashValue")?;
        self.0.read_hash_value(key)
    }

    /// Insert or replace the entry for `key`
    pub fn write_hash_entry(&self, key: Value, value: Value) -> InteropResult<()> {
        guard(self.0.has_hash_entries(), "writeHashEntry")?;
        self.0.write_hash_entry(key, value)
    }

    /// Remove the entry for `key`
    pub fn remove_hash_entry(&self, key: &Value) -> InteropResult<()> {
        guard(self.0.has_hash_entries(), "removeHashEntry")?;
        self.0.remove_hash_entry(key)
    }

    /// Iterator over `[key, value]` pairs
    pub fn get_hash_entries_iterator(&self) -> InteropResult<Value> {
        guard(self.0.has_hash_entries(), "getHashEntriesIterator")?;
        self.0.get_hash_entries_iterator()
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    /// True for values with named members
    pub fn has_members(&self) -> bool {
        self.0.has_members()
    }

    /// Member names, internal ones only when asked
    pub fn get_members(&self, include_internal: bool) -> InteropResult<Vec<String>> {
        guard(self.0.has_members(), "getMembers")?;
        self.0.get_members(include_internal)
    }

    /// True when member `name` can be read
    pub fn is_member_readable(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_readable(name)
    }

    /// True when member `name` exists and can be written
    pub fn is_member_modifiable(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_modifiable(name)
    }

    /// True when member `name` is absent and can be added
    pub fn is_member_insertable(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_insertable(name)
    }

    /// True when member `name` can be removed
    pub fn is_member_removable(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_removable(name)
    }

    /// True when member `name` can be called
    pub fn is_member_invocable(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_invocable(name)
    }

    /// True when member `name` is internal
    pub fn is_member_internal(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_internal(name)
    }

    /// True when member `name` exists
    pub fn is_member_existing(&self, name: &str) -> bool {
        self.0.has_members() && self.0.is_member_existing(name)
    }

    /// Value of member `name`
    pub fn read_member(&self, name: &str) -> InteropResult<Value> {
        guard(self.0.has_members(), "readMember")?;
        self.0.read_member(name)
    }

    /// Set member `name`
    pub fn write_member(&self, name: &str, value: Value) -> InteropResult<()> {
        guard(self.0.has_members(), "writeMember")?;
        self.0.write_member(name, value)
    }

    /// Remove member `name`
    pub fn remove_member(&self, name: &str) -> InteropResult<()> {
        guard(self.0.has_members(), "removeMember")?;
        self.0.remove_member(name)
    }

    /// Call member `name` with `args`
    pub fn invoke_member(&self, name: &str, args: &[Value]) -> InteropResult<Value> {
        guard(self.0.has_members(), "invokeMember")?;
        self.0.invoke_member(name, args)
    }

    // ------------------------------------------------------------------
    // Executables
    // ------------------------------------------------------------------

    /// True for callable values
    pub fn is_executable(&self) -> bool {
        self.0.is_executable()
    }

    /// Call the value with `args`
    pub fn execute(&self, args: &[Value]) -> InteropResult<Value> {
        guard(self.0.is_executable(), "execute")?;
        self.0.execute(args)
    }

    /// True for constructors
    pub fn is_instantiable(&self) -> bool {
        self.0.is_instantiable()
    }

    /// Construct a new value from `args`
    pub fn instantiate(&self, args: &[Value]) -> InteropResult<Value> {
        guard(self.0.is_instantiable(), "instantiate")?;
        self.0.instantiate(args)
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// True when the value can produce an iterator
    pub fn has_iterator(&self) -> bool {
        self.0.has_iterator()
    }

    /// Fresh iterator over the value
    pub fn get_iterator(&self) -> InteropResult<Value> {
        guard(self.0.has_iterator(), "getIterator")?;
        self.0.get_iterator()
    }

    /// True for iterators
    pub fn is_iterator(&self) -> bool {
        self.0.is_iterator()
    }

    /// True while the iterator has elements left
    pub fn has_iterator_next_element(&self) -> InteropResult<bool> {
        guard(self.0.is_iterator(), "hasIteratorNextElement")?;
        self.0.has_iterator_next_element()
    }

    /// Next element; `StopIteration` when exhausted
    pub fn get_iterator_next_element(&self) -> InteropResult<Value> {
        guard(self.0.is_iterator(), "getIteratorNextElement")?;
        self.0.get_iterator_next_element()
    }

    // ------------------------------------------------------------------
    // Exceptions
    // ------------------------------------------------------------------

    /// True for exception values
    pub fn is_exception(&self) -> bool {
        self.0.is_exception()
    }

    /// True when the exception carries a message
    pub fn has_exception_message(&self) -> bool {
        self.0.is_exception() && self.0.has_exception_message()
    }

    /// Exception message
    pub fn get_exception_message(&self) -> InteropResult<String> {
        guard(self.has_exception_message(), "getExceptionMessage")?;
        self.0.get_exception_message()
    }

    /// True when the exception has a cause
    pub fn has_exception_cause(&self) -> bool {
        self.0.is_exception() && self.0.has_exception_cause()
    }

    /// Cause of the exception
    pub fn get_exception_cause(&self) -> InteropResult<Value> {
        guard(self.has_exception_cause(), "getExceptionCause")?;
        self.0.get_exception_cause()
    }

    /// True when the exception records frames
    pub fn has_exception_stack_trace(&self) -> bool {
        self.0.is_exception() && self.0.has_exception_stack_trace()
    }

    /// Recorded frames, innermost first
    pub fn get_exception_stack_trace(&self) -> InteropResult<Vec<String>> {
        guard(self.has_exception_stack_trace(), "getExceptionStackTrace")?;
        self.0.get_exception_stack_trace()
    }

    /// The error that throws this value. Values that are not exceptions yield
    /// [`InteropError::UnsupportedMessage`] instead.
    pub fn throw_exception(&self) -> InteropError {
        if self.0.is_exception() {
            InteropError::Exception(self.clone())
        } else {
            InteropError::unsupported("throwException")
        }
    }
}

fn guard(capable: bool, message: &str) -> InteropResult<()> {
    if capable {
        Ok(())
    } else {
        Err(InteropError::unsupported(message))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.display_string()).finish()
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Natural width of a foreign number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumberKind {
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl NumberKind {
    /// True for the integral kinds
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            NumberKind::Byte | NumberKind::Short | NumberKind::Int | NumberKind::Long
        )
    }
}

/// A number with its width. Shared by the guest value kit and by host
/// primitives exposed to the foreign side, so both answer the `fits_in_*`
/// questions identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// 8-bit integer
    Byte(i8),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
}

/// 2^63 as a double, the first value above the `i64` range
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

impl Number {
    /// Width of this number
    pub fn kind(&self) -> NumberKind {
        match self {
            Number::Byte(_) => NumberKind::Byte,
            Number::Short(_) => NumberKind::Short,
            Number::Int(_) => NumberKind::Int,
            Number::Long(_) => NumberKind::Long,
            Number::Float(_) => NumberKind::Float,
            Number::Double(_) => NumberKind::Double,
        }
    }

    /// Exact integral value, if there is one. Negative zero has none.
    fn integral(&self) -> Option<i64> {
        match *self {
            Number::Byte(v) => Some(i64::from(v)),
            Number::Short(v) => Some(i64::from(v)),
            Number::Int(v) => Some(i64::from(v)),
            Number::Long(v) => Some(v),
            Number::Float(v) => exact_integral(f64::from(v)),
            Number::Double(v) => exact_integral(v),
        }
    }

    /// True when the number converts to `i8` without loss
    pub fn fits_in_byte(&self) -> bool {
        self.integral().is_some_and(|v| i8::try_from(v).is_ok())
    }

    /// True when the number converts to `i16` without loss
    pub fn fits_in_short(&self) -> bool {
        self.integral().is_some_and(|v| i16::try_from(v).is_ok())
    }

    /// True when the number converts to `i32` without loss
    pub fn fits_in_int(&self) -> bool {
        self.integral().is_some_and(|v| i32::try_from(v).is_ok())
    }

    /// True when the number converts to `i64` without loss
    pub fn fits_in_long(&self) -> bool {
        self.integral().is_some()
    }

    /// True when the number converts to `f32` without loss
    pub fn fits_in_float(&self) -> bool {
        match *self {
            Number::Byte(_) | Number::Short(_) | Number::Float(_) => true,
            Number::Int(v) => integral_fits_float(i64::from(v)),
            Number::Long(v) => integral_fits_float(v),
            Number::Double(v) => v.is_nan() || f64::from(v as f32) == v,
        }
    }

    /// True when the number converts to `f64` without loss
    pub fn fits_in_double(&self) -> bool {
        match *self {
            Number::Long(v) => v != i64::MAX && (v as f64) as i64 == v,
            _ => true,
        }
    }

    /// Exact `i8` value, if representable
    pub fn to_i8(&self) -> Option<i8> {
        self.integral().and_then(|v| i8::try_from(v).ok())
    }

    /// Exact `i16` value, if representable
    pub fn to_i16(&self) -> Option<i16> {
        self.integral().and_then(|v| i16::try_from(v).ok())
    }

    /// Exact `i32` value, if representable
    pub fn to_i32(&self) -> Option<i32> {
        self.integral().and_then(|v| i32::try_from(v).ok())
    }

    /// Exact `i64` value, if representable
    pub fn to_i64(&self) -> Option<i64> {
        self.integral()
    }

    /// Exact `f32` value, if representable
    pub fn to_f32(&self) -> Option<f32> {
        if !self.fits_in_float() {
            return None;
        }
        Some(match *self {
            Number::Byte(v) => f32::from(v),
            Number::Short(v) => f32::from(v),
            Number::Int(v) => v as f32,
            Number::Long(v) => v as f32,
            Number::Float(v) => v,
            Number::Double(v) => v as f32,
        })
    }

    /// Exact `f64` value, if representable
    pub fn to_f64(&self) -> Option<f64> {
        if !self.fits_in_double() {
            return None;
        }
        Some(match *self {
            Number::Byte(v) => f64::from(v),
            Number::Short(v) => f64::from(v),
            Number::Int(v) => f64::from(v),
            Number::Long(v) => v as f64,
            Number::Float(v) => f64::from(v),
            Number::Double(v) => v,
        })
    }
}

fn exact_integral(v: f64) -> Option<i64> {
    if v.fract() != 0.0 || !(-TWO_POW_63..TWO_POW_63).contains(&v) {
        return None;
    }
    if v == 0.0 && v.is_sign_negative() {
        return None;
    }
    Some(v as i64)
}

fn integral_fits_float(v: i64) -> bool {
    v != i64::MAX && (v as f32) as i64 == v
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Byte(v) => write!(f, "{}", v),
            Number::Short(v) => write!(f, "{}", v),
            Number::Int(v) => write!(f, "{}", v),
            Number::Long(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
            Number::Double(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_fits() {
        assert!(Number::Long(2_147_483_647).fits_in_int());
        assert!(!Number::Long(2_147_483_648).fits_in_int());
        assert!(Number::Long(-128).fits_in_byte());
        assert!(!Number::Long(-129).fits_in_byte());
        assert!(Number::Int(32767).fits_in_short());
        assert!(!Number::Int(32768).fits_in_short());
    }

    #[test]
    fn test_float_fits() {
        assert!(Number::Double(42.0).fits_in_int());
        assert!(!Number::Double(42.5).fits_in_int());
        assert!(!Number::Double(-0.0).fits_in_int());
        assert!(!Number::Double(f64::NAN).fits_in_long());
        assert!(!Number::Double(TWO_POW_63).fits_in_long());
        assert!(Number::Double(0.5).fits_in_float());
        assert!(!Number::Double(0.1).fits_in_float());
        assert!(Number::Double(f64::NAN).fits_in_float());
        assert!(Number::Double(f64::INFINITY).fits_in_float());
    }

    #[test]
    fn test_integral_to_floating() {
        assert!(Number::Int(16_777_216).fits_in_float());
        assert!(!Number::Int(16_777_217).fits_in_float());
        assert!(!Number::Int(i32::MAX).fits_in_float());
        assert!(Number::Long(1 << 53).fits_in_double());
        assert!(!Number::Long((1 << 53) + 1).fits_in_double());
        assert!(!Number::Long(i64::MAX).fits_in_double());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Number::Long(42).to_i32(), Some(42));
        assert_eq!(Number::Long(i64::MAX).to_i32(), None);
        assert_eq!(Number::Double(3.0).to_i8(), Some(3));
        assert_eq!(Number::Float(1.5).to_f64(), Some(1.5));
        assert_eq!(Number::Double(0.1).to_f32(), None);
    }
}
