//! Exceptions crossing the boundary in both directions

use std::sync::Arc;

use parking_lot::Mutex;
use polyhost_engine::exception::{to_guest_error, to_host_exception};
use polyhost_engine::{
    builtins, AccessPolicy, HostClass, HostContext, HostException, HostMethod, HostType,
    HostValue, ThrowableHooks,
};
use polyhost_sdk::{GuestException, GuestFunction, InteropError, Value};

fn ctx() -> Arc<HostContext> {
    HostContext::with_policy(AccessPolicy::all())
}

/// Class whose `fail` method throws the given exception
fn thrower(exception: HostException) -> Arc<HostClass> {
    HostClass::builder("Thrower")
        .method(HostMethod::new("fail").body(move |_| Err(exception.clone())))
        .build()
}

/// Foreign function that calls `fail` on its first argument
fn relay() -> Value {
    GuestFunction::new("relay", |args| args[0].invoke_member("fail", &[]))
}

fn cause_chain_length(value: &Value) -> usize {
    let mut length = 0;
    let mut current = value.clone();
    while current.has_exception_cause() {
        current = current.get_exception_cause().unwrap();
        length += 1;
    }
    length
}

// ============================================================================
// Identity
// ============================================================================

mod identity {
    use super::*;

    #[test]
    fn test_host_exception_survives_foreign_frames() {
        let ctx = ctx();
        let original = HostException::illegal_state("closed");
        let class = thrower(original.clone());
        let instance = ctx.instantiate(&class, &[]).unwrap();

        let err = ctx.call_foreign(&relay(), &[instance]).unwrap_err();
        assert!(err.ptr_eq(&original));
        assert!(err.is_instance_of(builtins::illegal_state()));
    }

    #[test]
    fn test_foreign_exception_survives_host_frames() {
        let ctx = ctx();
        let thrown = GuestException::new("RangeError", "too far").into_value();
        let raise = {
            let thrown = thrown.clone();
            GuestFunction::new("raise", move |_| Err(thrown.throw_exception()))
        };
        let class = HostClass::builder("Caller")
            .method(
                HostMethod::new("callBack")
                    .param(HostType::Value)
                    .body(|inv| match inv.arg(0) {
                        HostValue::Foreign(callback) => inv.ctx.call_foreign(callback, &[]),
                        _ => Ok(HostValue::Null),
                    }),
            )
            .build();
        let instance = ctx.instantiate(&class, &[]).unwrap();
        let guest_instance = ctx.to_guest(instance);

        let err = guest_instance.invoke_member("callBack", &[raise]).unwrap_err();
        let surfaced = err.exception().unwrap();
        assert!(surfaced.ptr_eq(&thrown));
    }

    #[test]
    fn test_foreign_exception_wrapped_once() {
        let thrown = GuestException::new("TypeError", "bad").into_value();
        let exception = to_host_exception(thrown.throw_exception());
        assert!(exception.is_instance_of(builtins::polyglot_exception()));
        assert!(exception.foreign_origin().unwrap().ptr_eq(&thrown));

        let ctx = ctx();
        let back = to_guest_error(&ctx, exception);
        assert!(back.exception().unwrap().ptr_eq(&thrown));
    }
}

// ============================================================================
// Causes and stack traces
// ============================================================================

mod details {
    use super::*;

    #[test]
    fn test_cause_chain_is_preserved() {
        let ctx = ctx();
        let root = HostException::illegal_argument("root");
        let middle = HostException::builder(builtins::runtime_exception())
            .message("middle")
            .cause(root)
            .build();
        let top = HostException::builder(builtins::exception())
            .message("top")
            .cause(middle)
            .build();
        assert_eq!(top.cause_depth(), 2);

        let err = to_guest_error(&ctx, top);
        let value = err.exception().unwrap();
        assert_eq!(cause_chain_length(value), 2);
        assert_eq!(value.get_exception_message().unwrap(), "top");
        let cause = value.get_exception_cause().unwrap();
        assert_eq!(cause.get_exception_message().unwrap(), "middle");
    }

    /// Host object whose `fail` relays through foreign code to `inner.fail`
    /// and wraps whatever comes back
    fn wrapping_layer(ctx: &Arc<HostContext>, inner: HostValue) -> HostValue {
        let class = HostClass::builder("Layer")
            .method(HostMethod::new("fail").body(move |inv| {
                inv.ctx.call_foreign(&relay(), &[inner.clone()]).map_err(|caught| {
                    HostException::builder(builtins::runtime_exception())
                        .message("wrapped")
                        .cause(caught)
                        .build()
                })
            }))
            .build();
        ctx.instantiate(&class, &[]).unwrap()
    }

    #[test]
    fn test_cause_chain_matches_crossings() {
        let ctx = ctx();
        let root = HostException::illegal_state("root");
        let mut top = ctx.instantiate(&thrower(root.clone()), &[]).unwrap();
        const LAYERS: usize = 4;
        for _ in 0..LAYERS {
            top = wrapping_layer(&ctx, top);
        }

        let err = ctx.call_method(&top, "fail", &[]).unwrap_err();
        assert_eq!(err.cause_depth(), LAYERS);
        assert!(!err.stack_trace().is_empty());

        let mut innermost = err.clone();
        while let Some(cause) = innermost.host_cause() {
            innermost = cause.clone();
        }
        assert!(innermost.ptr_eq(&root));

        let guest = to_guest_error(&ctx, err);
        assert_eq!(cause_chain_length(guest.exception().unwrap()), LAYERS);
    }

    #[test]
    fn test_foreign_cause_is_the_original_value() {
        let ctx = ctx();
        let inner = GuestException::new("Error", "inner").into_value();
        let outer = HostException::builder(builtins::runtime_exception())
            .message("outer")
            .foreign_cause(inner.clone())
            .build();
        let err = to_guest_error(&ctx, outer);
        let cause = err.exception().unwrap().get_exception_cause().unwrap();
        assert!(cause.ptr_eq(&inner));
    }

    #[test]
    fn test_stack_trace_is_never_empty() {
        let ctx = ctx();
        let err = to_guest_error(&ctx, HostException::illegal_state("plain"));
        let frames = err.exception().unwrap().get_exception_stack_trace().unwrap();
        assert!(!frames.is_empty());
        assert!(frames.iter().any(|f| f.contains("host -> guest")));
    }

    #[test]
    fn test_stack_trace_records_host_method() {
        let ctx = ctx();
        let class = HostClass::builder("Service")
            .method(
                HostMethod::new("run")
                    .body(|_| Err(HostException::illegal_state("failed inside"))),
            )
            .build();
        let instance = ctx.instantiate(&class, &[]).unwrap();
        let err = ctx.call_method(&instance, "run", &[]).unwrap_err();
        assert!(err.stack_trace().iter().any(|f| f == "Service.run"));
    }
}

// ============================================================================
// Throwable hooks
// ============================================================================

mod hooks {
    use super::*;

    struct HostileHooks;

    impl ThrowableHooks for HostileHooks {
        fn stack_trace(&self) -> Result<Option<Vec<String>>, HostException> {
            Err(HostException::illegal_state("getStackTrace refused"))
        }

        fn set_stack_trace(&self, _frames: &[String]) -> Result<(), HostException> {
            Err(HostException::illegal_state("setStackTrace refused"))
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        received: Mutex<Vec<String>>,
    }

    impl ThrowableHooks for RecordingHooks {
        fn stack_trace(&self) -> Result<Option<Vec<String>>, HostException> {
            Ok(Some(vec!["custom frame".to_string()]))
        }

        fn set_stack_trace(&self, frames: &[String]) -> Result<(), HostException> {
            *self.received.lock() = frames.to_vec();
            Ok(())
        }
    }

    #[test]
    fn test_hostile_hooks_do_not_break_crossing() {
        let ctx = ctx();
        let exception = HostException::builder(builtins::runtime_exception())
            .message("hostile")
            .hooks(Arc::new(HostileHooks))
            .build();
        let err = to_guest_error(&ctx, exception.clone());
        assert!(matches!(err, InteropError::Exception(_)));

        let frames = err.exception().unwrap().get_exception_stack_trace().unwrap();
        assert!(!frames.is_empty());
        assert_eq!(frames, exception.stack_trace());

        let back = to_host_exception(err);
        assert!(back.ptr_eq(&exception));
    }

    #[test]
    fn test_hooks_supply_and_receive_traces() {
        let ctx = ctx();
        let hooks = Arc::new(RecordingHooks::default());
        let exception = HostException::builder(builtins::runtime_exception())
            .hooks(hooks.clone())
            .build();
        let err = to_guest_error(&ctx, exception);
        let frames = err.exception().unwrap().get_exception_stack_trace().unwrap();
        assert_eq!(frames, vec!["custom frame".to_string()]);
        assert!(hooks
            .received
            .lock()
            .iter()
            .any(|f| f.contains("host -> guest")));
    }
}
