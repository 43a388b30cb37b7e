//! Exception bridge
//!
//! Host exceptions and foreign exceptions cross the boundary in both
//! directions without losing identity:
//!
//! | Crossing       | Value                          | Result                                   |
//! |----------------|--------------------------------|------------------------------------------|
//! | host -> guest  | host exception                 | foreign exception wrapping it            |
//! | host -> guest  | `PolyglotException` wrapper    | the original foreign exception           |
//! | guest -> host  | wrapper of a host exception    | the original host exception              |
//! | guest -> host  | any other foreign exception    | new `PolyglotException`, cause = foreign |
//! | guest -> host  | other interop failure          | matching built-in runtime exception      |
//!
//! Host exceptions record the boundary call stack when they are created.
//! Classes may attach [`ThrowableHooks`] to supply or receive stack traces;
//! a hook that fails is ignored and the recorded trace is used.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use polyhost_sdk::{InteropError, Value};

use crate::context::HostContext;
use crate::error::BridgeError;
use crate::host::builtins;
use crate::host::{HostClass, HostValue};
use crate::marshal::HostRef;

static NEXT_EXCEPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Cause of a host exception
#[derive(Clone)]
pub enum ExceptionCause {
    /// Host exception cause
    Host(HostException),
    /// Foreign exception value used as the cause
    Foreign(Value),
}

/// Stack-trace accessors a throwable class may override. Either call may
/// fail; the bridge then falls back to the trace it recorded itself.
pub trait ThrowableHooks: Send + Sync {
    /// Trace reported by the throwable, `None` to use the recorded one
    fn stack_trace(&self) -> Result<Option<Vec<String>>, HostException>;

    /// Receive a merged trace
    fn set_stack_trace(&self, frames: &[String]) -> Result<(), HostException>;
}

struct ThrowableInner {
    id: u64,
    class: Arc<HostClass>,
    message: Option<String>,
    cause: Option<ExceptionCause>,
    frames: RwLock<Vec<String>>,
    hooks: Option<Arc<dyn ThrowableHooks>>,
}

/// A host exception. Clones share identity.
#[derive(Clone)]
pub struct HostException(Arc<ThrowableInner>);

impl HostException {
    /// Exception of `class` with a message
    pub fn new(class: &Arc<HostClass>, message: &str) -> Self {
        Self::builder(class).message(message).build()
    }

    /// Builder for an exception of `class`
    pub fn builder(class: &Arc<HostClass>) -> HostExceptionBuilder {
        HostExceptionBuilder {
            class: class.clone(),
            message: None,
            cause: None,
            hooks: None,
        }
    }

    /// `IllegalStateException` with `message`
    pub fn illegal_state(message: &str) -> Self {
        Self::new(builtins::illegal_state(), message)
    }

    /// `IllegalArgumentException` with `message`
    pub fn illegal_argument(message: &str) -> Self {
        Self::new(builtins::illegal_argument(), message)
    }

    /// `UnsupportedOperationException` with `message`
    pub fn unsupported_operation(message: &str) -> Self {
        Self::new(builtins::unsupported_operation(), message)
    }

    /// Identity of this exception, shared by clones
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Runtime class
    pub fn class(&self) -> &Arc<HostClass> {
        &self.0.class
    }

    /// Detail message, if any
    pub fn message(&self) -> Option<&str> {
        self.0.message.as_deref()
    }

    /// Direct cause, host or foreign
    pub fn cause(&self) -> Option<&ExceptionCause> {
        self.0.cause.as_ref()
    }

    /// Direct host cause, if the cause is a host exception
    pub fn host_cause(&self) -> Option<&HostException> {
        match &self.0.cause {
            Some(ExceptionCause::Host(cause)) => Some(cause),
            _ => None,
        }
    }

    /// Number of links below this exception, counting a foreign cause once
    pub fn cause_depth(&self) -> usize {
        match &self.0.cause {
            Some(ExceptionCause::Host(cause)) => 1 + cause.cause_depth(),
            Some(ExceptionCause::Foreign(_)) => 1,
            None => 0,
        }
    }

    /// True when the class is `class` or a subclass of it
    pub fn is_instance_of(&self, class: &HostClass) -> bool {
        self.0.class.is_subtype_of(class)
    }

    /// Foreign exception wrapped by a `PolyglotException`
    pub fn foreign_origin(&self) -> Option<&Value> {
        if self.0.class.id() != builtins::polyglot_exception().id() {
            return None;
        }
        match &self.0.cause {
            Some(ExceptionCause::Foreign(value)) => Some(value),
            _ => None,
        }
    }

    /// Same exception, not merely an equal one
    pub fn ptr_eq(&self, other: &HostException) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stack trace, innermost frame first. Uses the throwable's own trace
    /// when its hooks supply one.
    pub fn stack_trace(&self) -> Vec<String> {
        if let Some(hooks) = &self.0.hooks {
            match hooks.stack_trace() {
                Ok(Some(frames)) if !frames.is_empty() => return frames,
                Ok(_) => {}
                Err(error) => {
                    tracing::debug!(
                        exception = %self,
                        hook_error = %error,
                        "throwable stack trace accessor failed, using recorded trace"
                    );
                }
            }
        }
        self.0.frames.read().clone()
    }

    /// Append a frame for a boundary crossing and offer the merged trace to
    /// the throwable's hooks
    pub(crate) fn record_crossing(&self, frame: &str) {
        let merged = {
            let mut frames = self.0.frames.write();
            frames.push(frame.to_string());
            frames.clone()
        };
        if let Some(hooks) = &self.0.hooks {
            if let Err(error) = hooks.set_stack_trace(&merged) {
                tracing::debug!(
                    exception = %self,
                    hook_error = %error,
                    "throwable stack trace mutator failed, keeping recorded trace"
                );
            }
        }
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.message {
            Some(message) => write!(f, "{}: {}", self.0.class.name(), message),
            None => f.write_str(self.0.class.name()),
        }
    }
}

impl fmt::Debug for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostException({})", self)
    }
}

/// Builder for [`HostException`]
pub struct HostExceptionBuilder {
    class: Arc<HostClass>,
    message: Option<String>,
    cause: Option<ExceptionCause>,
    hooks: Option<Arc<dyn ThrowableHooks>>,
}

impl HostExceptionBuilder {
    /// Detail message
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Host cause
    pub fn cause(mut self, cause: HostException) -> Self {
        self.cause = Some(ExceptionCause::Host(cause));
        self
    }

    /// Foreign exception value as the cause
    pub fn foreign_cause(mut self, cause: Value) -> Self {
        self.cause = Some(ExceptionCause::Foreign(cause));
        self
    }

    /// Stack-trace hooks consulted and updated on each crossing
    pub fn hooks(mut self, hooks: Arc<dyn ThrowableHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Create the exception, recording the current boundary call stack
    pub fn build(self) -> HostException {
        HostException(Arc::new(ThrowableInner {
            id: NEXT_EXCEPTION_ID.fetch_add(1, Ordering::Relaxed),
            class: self.class,
            message: self.message,
            cause: self.cause,
            frames: RwLock::new(current_frames()),
            hooks: self.hooks,
        }))
    }
}

// ============================================================================
// Boundary call stack
// ============================================================================

thread_local! {
    static BOUNDARY_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame when dropped
pub(crate) struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        BOUNDARY_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Push a frame for a call crossing the boundary
pub(crate) fn enter_frame(frame: String) -> FrameGuard {
    BOUNDARY_STACK.with(|stack| stack.borrow_mut().push(frame));
    FrameGuard
}

/// Active boundary frames, innermost first
pub fn current_frames() -> Vec<String> {
    BOUNDARY_STACK.with(|stack| {
        let stack = stack.borrow();
        if stack.is_empty() {
            vec!["<host>".to_string()]
        } else {
            stack.iter().rev().cloned().collect()
        }
    })
}

// ============================================================================
// Crossings
// ============================================================================

/// Throw a host exception into foreign code. A `PolyglotException` is
/// unwrapped back to the foreign exception it carries.
pub fn to_guest_error(ctx: &Arc<HostContext>, exception: HostException) -> InteropError {
    if let Some(original) = exception.foreign_origin() {
        return InteropError::Exception(original.clone());
    }
    exception.record_crossing("<boundary: host -> guest>");
    InteropError::Exception(ctx.to_guest(HostValue::Exception(exception)))
}

/// Surface a foreign failure in host code
pub fn to_host_exception(error: InteropError) -> HostException {
    match error {
        InteropError::Exception(value) => from_foreign_exception(value),
        InteropError::UnsupportedMessage(message) => {
            HostException::unsupported_operation(&message)
        }
        InteropError::UnknownIdentifier(name) => {
            HostException::new(builtins::no_such_element(), &format!("Unknown identifier: {}", name))
        }
        InteropError::InvalidArrayIndex(index) => HostException::new(
            builtins::index_out_of_bounds(),
            &format!("Index {} out of bounds", index),
        ),
        InteropError::StopIteration => {
            HostException::new(builtins::no_such_element(), "iteration has no more elements")
        }
        error @ InteropError::UnsupportedType { .. } => {
            HostException::new(builtins::class_cast(), &error.to_string())
        }
        error @ (InteropError::Arity { .. } | InteropError::AmbiguousOverload { .. }) => {
            HostException::illegal_argument(&error.to_string())
        }
    }
}

/// A thrown foreign value as a host exception. A wrapper around a host
/// exception yields that exact exception.
pub fn from_foreign_exception(value: Value) -> HostException {
    if let Some(HostValue::Exception(original)) = value.downcast_ref::<HostRef>().map(HostRef::value) {
        return original.clone();
    }
    let message = if value.has_exception_message() {
        value.get_exception_message().ok()
    } else {
        None
    };
    let message = message.unwrap_or_else(|| value.display_string());
    HostException::builder(builtins::polyglot_exception())
        .message(&message)
        .foreign_cause(value)
        .build()
}

impl From<InteropError> for HostException {
    fn from(error: InteropError) -> Self {
        to_host_exception(error)
    }
}

impl From<BridgeError> for HostException {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Host(exception) => exception,
            BridgeError::Interop(error) => to_host_exception(error),
            BridgeError::IllegalState(message) => HostException::illegal_state(&message),
            BridgeError::NoSuchElement => {
                HostException::new(builtins::no_such_element(), "iteration has no more elements")
            }
            error @ BridgeError::Adapter(_) => HostException::illegal_argument(&error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhost_sdk::GuestException;

    struct BrokenHooks;

    impl ThrowableHooks for BrokenHooks {
        fn stack_trace(&self) -> Result<Option<Vec<String>>, HostException> {
            Err(HostException::illegal_state("getStackTrace is broken"))
        }

        fn set_stack_trace(&self, _frames: &[String]) -> Result<(), HostException> {
            Err(HostException::illegal_state("setStackTrace is broken"))
        }
    }

    #[test]
    fn test_frames_follow_guards() {
        assert_eq!(current_frames(), vec!["<host>".to_string()]);
        let _outer = enter_frame("Outer.run".to_string());
        {
            let _inner = enter_frame("Inner.call".to_string());
            let exception = HostException::illegal_state("boom");
            assert_eq!(exception.stack_trace(), vec!["Inner.call", "Outer.run"]);
        }
        assert_eq!(current_frames(), vec!["Outer.run".to_string()]);
    }

    #[test]
    fn test_broken_hooks_fall_back_to_recorded_trace() {
        let exception = HostException::builder(builtins::runtime_exception())
            .message("hostile")
            .hooks(Arc::new(BrokenHooks))
            .build();
        exception.record_crossing("<crossing>");
        assert_eq!(exception.stack_trace(), vec!["<host>", "<crossing>"]);
    }

    #[test]
    fn test_foreign_exception_becomes_polyglot() {
        let foreign = GuestException::new("TypeError", "bad").into_value();
        let exception = to_host_exception(foreign.throw_exception());
        assert!(exception.is_instance_of(builtins::polyglot_exception()));
        assert_eq!(exception.message(), Some("bad"));
        assert!(exception.foreign_origin().unwrap().ptr_eq(&foreign));
        assert_eq!(exception.cause_depth(), 1);
    }

    #[test]
    fn test_interop_failures_map_to_runtime_exceptions() {
        let e = to_host_exception(InteropError::InvalidArrayIndex(5));
        assert!(e.is_instance_of(builtins::index_out_of_bounds()));
        let e = to_host_exception(InteropError::unsupported("remove"));
        assert!(e.is_instance_of(builtins::unsupported_operation()));
        let e = HostException::from(BridgeError::NoSuchElement);
        assert!(e.is_instance_of(builtins::no_such_element()));
    }

    #[test]
    fn test_display() {
        let e = HostException::illegal_argument("negative size");
        assert_eq!(e.to_string(), "IllegalArgumentException: negative size");
        let bare = HostException::builder(builtins::exception()).build();
        assert_eq!(bare.to_string(), "Exception");
        assert!(bare.message().is_none());
    }
}
