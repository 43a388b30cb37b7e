//! Polyhost SDK - the capability protocol shared by both sides of the boundary
//!
//! A foreign value is anything that implements [`Interop`]. The engine never
//! inspects concrete types; it asks capability predicates (`is_null`,
//! `has_array_elements`, `has_members`, ...) and calls the matching
//! accessors through the [`Value`] handle, which rejects an accessor whose
//! predicate is false with [`InteropError::UnsupportedMessage`].
//!
//! # Example
//!
//! ```ignore
//! use polyhost_sdk::{GuestArray, GuestObject, Value};
//!
//! let point = GuestObject::new().with("x", 1).with("y", 2).into_value();
//! assert!(point.has_members());
//! assert_eq!(point.read_member("x")?.as_int()?, 1);
//!
//! let list = GuestArray::resizable(vec![Value::from(1), Value::from(2)]);
//! assert_eq!(list.get_array_size()?, 2);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod guest;
pub mod interop;
pub mod native;
pub mod value;

pub use error::{ExpectedArity, InteropError, InteropResult};
pub use guest::{
    ArrayMode, GuestArray, GuestBoolean, GuestException, GuestFunction, GuestHash,
    GuestIterable, GuestIterator, GuestNull, GuestNumber, GuestObject, GuestString,
};
pub use interop::Interop;
pub use native::{HeapBridge, NativeBridge, NativeError, NativeHandle};
pub use value::{Number, NumberKind, Value};
