//! Guest exceptions

use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;
use crate::value::Value;

/// An exception raised by guest code
pub struct GuestException {
    kind: String,
    message: Option<String>,
    cause: Option<Value>,
    stack: Vec<String>,
}

impl GuestException {
    /// Exception of type `kind` with a message
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            message: Some(message.to_string()),
            cause: None,
            stack: vec![format!("<guest> {}", kind)],
        }
    }

    /// Attach a cause
    pub fn caused_by(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Replace the recorded frames, innermost first
    pub fn with_stack(mut self, frames: Vec<String>) -> Self {
        self.stack = frames;
        self
    }

    /// Wrap as a foreign value
    pub fn into_value(self) -> Value {
        Value::new(self)
    }

    /// Wrap and return the error that throws it
    pub fn throw(self) -> InteropError {
        self.into_value().throw_exception()
    }
}

impl Interop for GuestException {
    fn display_string(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.kind, message),
            None => self.kind.clone(),
        }
    }

    fn meta_name(&self) -> Option<String> {
        Some(self.kind.clone())
    }

    fn is_exception(&self) -> bool {
        true
    }

    fn has_exception_message(&self) -> bool {
        self.message.is_some()
    }

    fn get_exception_message(&self) -> InteropResult<String> {
        self.message
            .clone()
            .ok_or_else(|| InteropError::unsupported("getExceptionMessage"))
    }

    fn has_exception_cause(&self) -> bool {
        self.cause.is_some()
    }

    fn get_exception_cause(&self) -> InteropResult<Value> {
        self.cause
            .clone()
            .ok_or_else(|| InteropError::unsupported("getExceptionCause"))
    }

    fn has_exception_stack_trace(&self) -> bool {
        true
    }

    fn get_exception_stack_trace(&self) -> InteropResult<Vec<String>> {
        Ok(self.stack.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throw_keeps_identity() {
        let exc = GuestException::new("TypeError", "boom").into_value();
        let err = exc.throw_exception();
        let thrown = err.exception().unwrap();
        assert!(thrown.ptr_eq(&exc));
        assert_eq!(err.to_string(), "TypeError: boom");
    }

    #[test]
    fn test_cause_chain() {
        let inner = GuestException::new("Error", "inner").into_value();
        let outer = GuestException::new("Error", "outer")
            .caused_by(inner.clone())
            .into_value();
        assert!(outer.get_exception_cause().unwrap().ptr_eq(&inner));
        assert!(!inner.has_exception_cause());
    }

    #[test]
    fn test_non_exception_cannot_throw() {
        let err = Value::from(1).throw_exception();
        assert!(matches!(err, InteropError::UnsupportedMessage(_)));
    }
}
