//! Error taxonomy surfaced to the foreign side of the boundary

use std::fmt;

use crate::value::Value;

/// Result type for capability protocol calls
pub type InteropResult<T> = Result<T, InteropError>;

/// Failures raised by capability accessors and by host members invoked
/// through the protocol.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InteropError {
    /// An accessor was called while its guarding predicate is false
    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),

    /// A member or hash key is absent
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// A coercion was rejected
    #[error("{reason}")]
    UnsupportedType {
        /// Display name of the requested host type
        target: String,
        /// Full diagnostic naming the value and the target
        reason: String,
    },

    /// Argument count does not match any candidate
    #[error("Arity error - expected: {expected} actual: {actual}")]
    Arity {
        /// Accepted argument counts
        expected: ExpectedArity,
        /// Supplied argument count
        actual: usize,
    },

    /// Array index outside the readable range
    #[error("Invalid array index {0}")]
    InvalidArrayIndex(i64),

    /// More than one overload remained after every tie-break
    #[error(
        "Multiple applicable overloads found for method name {name} (candidates: [{}], arguments: {arguments})",
        .candidates.join(", ")
    )]
    AmbiguousOverload {
        /// Member name
        name: String,
        /// Signatures of the tied candidates
        candidates: Vec<String>,
        /// Display form of the argument list
        arguments: String,
    },

    /// Iterator exhausted
    #[error("Stop iteration")]
    StopIteration,

    /// A thrown exception value
    #[error("{}", .0.display_string())]
    Exception(Value),
}

impl InteropError {
    /// Shorthand for [`InteropError::UnsupportedMessage`]
    pub fn unsupported(message: &str) -> Self {
        InteropError::UnsupportedMessage(message.to_string())
    }

    /// Shorthand for [`InteropError::UnknownIdentifier`]
    pub fn unknown(identifier: impl Into<String>) -> Self {
        InteropError::UnknownIdentifier(identifier.into())
    }

    /// Arity failure for a fixed argument count
    pub fn arity(expected: usize, actual: usize) -> Self {
        InteropError::Arity {
            expected: ExpectedArity {
                min: expected,
                max: Some(expected),
            },
            actual,
        }
    }

    /// Returns the thrown value if this is an exception
    pub fn exception(&self) -> Option<&Value> {
        match self {
            InteropError::Exception(value) => Some(value),
            _ => None,
        }
    }
}

/// Accepted argument counts for an arity failure. `max` is `None` when a
/// variable-arity candidate makes the range unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedArity {
    /// Smallest accepted count
    pub min: usize,
    /// Largest accepted count, if bounded
    pub max: Option<usize>,
}

impl fmt::Display for ExpectedArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{}-{}", self.min, max),
            None => write!(f, "{}+", self.min),
        }
    }
}
