//! Reference foreign values.
//!
//! These stand in for the values a guest runtime hands across the boundary.
//! Each type implements only the capabilities it really has, with the
//! mutation flags a guest language would expose:
//!
//! | Type              | Capabilities                                   |
//! |-------------------|------------------------------------------------|
//! | [`GuestNull`]     | null                                           |
//! | [`GuestBoolean`]  | boolean                                        |
//! | [`GuestNumber`]   | number with a natural width                    |
//! | [`GuestString`]   | string                                         |
//! | [`GuestArray`]    | array elements (read-only, fixed or resizable), iterator |
//! | [`GuestHash`]     | hash entries with arbitrary keys               |
//! | [`GuestObject`]   | members, invocable when the member is executable |
//! | [`GuestFunction`] | executable, optionally instantiable            |
//! | [`GuestIterator`] | iterator                                       |
//! | [`GuestIterable`] | iterator factory                               |
//! | [`GuestException`]| exception with message, cause and stack trace  |

mod array;
mod exception;
mod function;
mod hash;
mod iterator;
mod object;
mod scalar;

pub use array::{ArrayMode, GuestArray};
pub use exception::GuestException;
pub use function::GuestFunction;
pub use hash::GuestHash;
pub use iterator::{GuestIterable, GuestIterator};
pub use object::GuestObject;
pub use scalar::{GuestBoolean, GuestNull, GuestNumber, GuestString};

use crate::value::{Number, Value};

impl Value {
    /// The guest null value
    pub fn null() -> Value {
        Value::new(GuestNull)
    }

    /// A guest string
    pub fn string(s: impl Into<String>) -> Value {
        Value::new(GuestString::new(s))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::new(GuestBoolean(v))
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::new(GuestNumber(Number::Byte(v)))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::new(GuestNumber(Number::Short(v)))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::new(GuestNumber(Number::Int(v)))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::new(GuestNumber(Number::Long(v)))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::new(GuestNumber(Number::Float(v)))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::new(GuestNumber(Number::Double(v)))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}

/// Key equality used by guest hashes: scalars compare by value, everything
/// else by identity.
pub fn same_key(a: &Value, b: &Value) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if a.is_null() || b.is_null() {
        return a.is_null() && b.is_null();
    }
    if a.is_string() && b.is_string() {
        return matches!((a.as_string(), b.as_string()), (Ok(x), Ok(y)) if x == y);
    }
    if a.is_boolean() && b.is_boolean() {
        return matches!((a.as_boolean(), b.as_boolean()), (Ok(x), Ok(y)) if x == y);
    }
    if a.is_number() && b.is_number() {
        if a.fits_in_long() && b.fits_in_long() {
            return matches!((a.as_long(), b.as_long()), (Ok(x), Ok(y)) if x == y);
        }
        if a.fits_in_double() && b.fits_in_double() {
            return matches!((a.as_double(), b.as_double()), (Ok(x), Ok(y)) if x == y);
        }
    }
    false
}
