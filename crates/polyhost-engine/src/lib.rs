//! Polyhost Engine
//!
//! Bidirectional interop between foreign values (anything implementing
//! [`polyhost_sdk::Interop`]) and a reflective host object model:
//! - **Coercion**: foreign value to host type, with a cost per conversion (`coerce` module)
//! - **Overload resolution**: pick one host method for a foreign argument list (`resolve` module)
//! - **Collection views**: live host collections over foreign arrays, hashes and iterators (`views` module)
//! - **Host adapters**: generated subclasses that delegate to a foreign object (`adapter` module)
//! - **Exception bridge**: identity-preserving exception crossing in both directions (`exception` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use polyhost_engine::{AccessPolicy, HostClass, HostContext, HostMethod, HostType, HostValue};
//! use polyhost_sdk::Value;
//!
//! let math = HostClass::builder("Math")
//!     .method(
//!         HostMethod::new("abs")
//!             .as_static()
//!             .param(HostType::int())
//!             .returns(HostType::int())
//!             .body(|inv| Ok(HostValue::Int(inv.arg(0).as_int().unwrap_or(0).abs()))),
//!     )
//!     .build();
//!
//! let ctx = HostContext::with_policy(AccessPolicy::all());
//! let class = ctx.class_value(&math);
//! let result = class.invoke_member("abs", &[Value::from(-3)])?;
//! assert_eq!(result.as_int()?, 3);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Host adapter generator
pub mod adapter;

/// Shared member-table and adapter cache
pub mod cache;

/// Foreign value to host type conversion
pub mod coerce;

/// Entry point pairing a policy with a cache
pub mod context;

/// Engine error types
pub mod error;

/// Exception bridge
pub mod exception;

/// Reflective host object model
pub mod host;

/// Host values as foreign values
pub mod marshal;

/// Access policy
pub mod policy;

/// Overload resolver
pub mod resolve;

/// Live views over foreign values
pub mod views;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{AdapterError, HostAdapterDescriptor};
pub use cache::InteropCache;
pub use coerce::{CoercionOutcome, Cost, Level, Rejection, RejectionKind};
pub use context::HostContext;
pub use error::{BridgeError, BridgeResult};
pub use exception::{HostException, ThrowableHooks};
pub use host::{
    builtins, HostArray, HostClass, HostField, HostMethod, HostObject, HostType, HostValue,
    PrimitiveKind, Visibility,
};
pub use policy::{AccessPolicy, PolicyError};
pub use resolve::{OverloadCandidate, Selection};
pub use views::InterfaceProxy;
