//! Built-in host classes
//!
//! The root `Object` class and the throwable hierarchy the exception bridge
//! maps interop failures onto:
//!
//! ```text
//! Object
//! └── Throwable                     getMessage(), getCause()
//!     └── Exception
//!         └── RuntimeException
//!             ├── IllegalStateException
//!             ├── IllegalArgumentException
//!             ├── UnsupportedOperationException
//!             ├── IndexOutOfBoundsException
//!             ├── NoSuchElementException
//!             ├── ClassCastException
//!             └── PolyglotException     (wraps a foreign exception)
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::exception::{ExceptionCause, HostException};

use super::class::{HostClass, HostMethod, Invocation};
use super::types::HostType;
use super::value::HostValue;

static OBJECT: Lazy<Arc<HostClass>> = Lazy::new(|| HostClass::builder("Object").root().build());

static THROWABLE: Lazy<Arc<HostClass>> = Lazy::new(|| {
    HostClass::builder("Throwable")
        .method(
            HostMethod::new("getMessage")
                .returns(HostType::String)
                .body(|inv| {
                    let exception = receiver_exception(inv)?;
                    Ok(exception
                        .message()
                        .map(HostValue::from)
                        .unwrap_or(HostValue::Null))
                }),
        )
        .method(
            HostMethod::new("getCause")
                .returns(HostType::Object)
                .body(|inv| {
                    let exception = receiver_exception(inv)?;
                    Ok(match exception.cause() {
                        Some(ExceptionCause::Host(cause)) => HostValue::Exception(cause.clone()),
                        Some(ExceptionCause::Foreign(value)) => HostValue::Foreign(value.clone()),
                        None => HostValue::Null,
                    })
                }),
        )
        .build()
});

static EXCEPTION: Lazy<Arc<HostClass>> = Lazy::new(|| subclass("Exception", &THROWABLE));
static RUNTIME_EXCEPTION: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("RuntimeException", &EXCEPTION));
static ILLEGAL_STATE: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("IllegalStateException", &RUNTIME_EXCEPTION));
static ILLEGAL_ARGUMENT: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("IllegalArgumentException", &RUNTIME_EXCEPTION));
static UNSUPPORTED_OPERATION: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("UnsupportedOperationException", &RUNTIME_EXCEPTION));
static INDEX_OUT_OF_BOUNDS: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("IndexOutOfBoundsException", &RUNTIME_EXCEPTION));
static NO_SUCH_ELEMENT: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("NoSuchElementException", &RUNTIME_EXCEPTION));
static CLASS_CAST: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("ClassCastException", &RUNTIME_EXCEPTION));
static POLYGLOT_EXCEPTION: Lazy<Arc<HostClass>> =
    Lazy::new(|| subclass("PolyglotException", &RUNTIME_EXCEPTION));

fn subclass(name: &str, parent: &Arc<HostClass>) -> Arc<HostClass> {
    HostClass::builder(name).extends(parent).build()
}

fn receiver_exception<'a>(inv: &'a Invocation<'_>) -> Result<&'a HostException, HostException> {
    match inv.receiver {
        HostValue::Exception(exception) => Ok(exception),
        other => Err(HostException::illegal_state(&format!(
            "not a throwable: {}",
            other.display_string()
        ))),
    }
}

/// `Object`, root of every class
pub fn object() -> &'static Arc<HostClass> {
    &OBJECT
}

/// `Throwable`
pub fn throwable() -> &'static Arc<HostClass> {
    &THROWABLE
}

/// `Exception`
pub fn exception() -> &'static Arc<HostClass> {
    &EXCEPTION
}

/// `RuntimeException`
pub fn runtime_exception() -> &'static Arc<HostClass> {
    &RUNTIME_EXCEPTION
}

/// `IllegalStateException`
pub fn illegal_state() -> &'static Arc<HostClass> {
    &ILLEGAL_STATE
}

/// `IllegalArgumentException`
pub fn illegal_argument() -> &'static Arc<HostClass> {
    &ILLEGAL_ARGUMENT
}

/// `UnsupportedOperationException`
pub fn unsupported_operation() -> &'static Arc<HostClass> {
    &UNSUPPORTED_OPERATION
}

/// `IndexOutOfBoundsException`
pub fn index_out_of_bounds() -> &'static Arc<HostClass> {
    &INDEX_OUT_OF_BOUNDS
}

/// `NoSuchElementException`
pub fn no_such_element() -> &'static Arc<HostClass> {
    &NO_SUCH_ELEMENT
}

/// `ClassCastException`
pub fn class_cast() -> &'static Arc<HostClass> {
    &CLASS_CAST
}

/// Host-side wrapper class for exceptions raised by foreign code
pub fn polyglot_exception() -> &'static Arc<HostClass> {
    &POLYGLOT_EXCEPTION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(polyglot_exception().is_subtype_of(runtime_exception()));
        assert!(illegal_state().is_subtype_of(throwable()));
        assert!(!throwable().is_subtype_of(exception()));
        assert_eq!(object().depth(), 0);
        assert!(object().superclass().is_none());
        assert_eq!(runtime_exception().depth(), 3);
    }

    #[test]
    fn test_throwable_members() {
        let names: Vec<&str> = throwable()
            .declared_methods()
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["getMessage", "getCause"]);
    }
}
