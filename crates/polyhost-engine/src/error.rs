//! Engine error types

use std::sync::Arc;

use polyhost_sdk::InteropError;
use thiserror::Error;

use crate::adapter::AdapterError;
use crate::context::HostContext;
use crate::exception::{to_guest_error, HostException};

/// Result type for boundary operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures of boundary operations
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// A capability failure, reported to foreign callers unchanged
    #[error(transparent)]
    Interop(#[from] InteropError),

    /// A host exception raised by a method body
    #[error("{0}")]
    Host(HostException),

    /// Operation called in the wrong state, such as iterator removal before `next`
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Iterator exhausted
    #[error("No such element")]
    NoSuchElement,

    /// Adapter generation refused
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl BridgeError {
    /// Shorthand for an unsupported-message failure
    pub fn unsupported(message: &str) -> Self {
        BridgeError::Interop(InteropError::unsupported(message))
    }

    /// The error a foreign caller sees. Host-level failures travel as thrown
    /// host exceptions.
    pub fn into_interop(self, ctx: &Arc<HostContext>) -> InteropError {
        match self {
            BridgeError::Interop(error) => error,
            BridgeError::Host(exception) => to_guest_error(ctx, exception),
            other => to_guest_error(ctx, HostException::from(other)),
        }
    }
}

impl From<HostException> for BridgeError {
    fn from(exception: HostException) -> Self {
        BridgeError::Host(exception)
    }
}
