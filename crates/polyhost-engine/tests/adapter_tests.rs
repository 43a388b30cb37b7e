//! Host adapter generation and delegation

use std::sync::{Arc, Barrier};
use std::thread;

use polyhost_engine::adapter::{invoke_super, super_of, this_of};
use polyhost_engine::{
    builtins, AccessPolicy, AdapterError, BridgeError, HostAdapterDescriptor, HostClass,
    HostContext, HostMethod, HostType, HostValue, InteropCache, RejectionKind,
};
use polyhost_sdk::{GuestFunction, GuestObject, Value};

fn ctx() -> Arc<HostContext> {
    HostContext::with_policy(AccessPolicy::all())
}

fn returning(text: &'static str) -> Value {
    GuestFunction::new(text, move |_| Ok(Value::from(text)))
}

/// Abstract class with one abstract and one concrete method
fn widget() -> Arc<HostClass> {
    HostClass::builder("Widget")
        .abstract_class()
        .method(HostMethod::new("name").returns(HostType::String).as_abstract())
        .method(
            HostMethod::new("describe")
                .returns(HostType::String)
                .body(|_| Ok(HostValue::from("host widget"))),
        )
        .method(
            HostMethod::new("id")
                .returns(HostType::int())
                .as_final()
                .body(|_| Ok(HostValue::Int(1))),
        )
        .build()
}

fn greeter() -> Arc<HostClass> {
    HostClass::builder("Greeter")
        .interface()
        .method(
            HostMethod::new("greet")
                .param(HostType::String)
                .returns(HostType::String)
                .as_abstract(),
        )
        .method(HostMethod::new("wave").returns(HostType::String).as_abstract())
        .build()
}

fn call(ctx: &Arc<HostContext>, instance: &HostValue, name: &str) -> String {
    ctx.call_method(instance, name, &[])
        .unwrap()
        .as_str()
        .map(str::to_string)
        .unwrap_or_default()
}

// ============================================================================
// Delegation
// ============================================================================

mod delegation {
    use super::*;

    #[test]
    fn test_delegate_then_inherited_body() {
        let ctx = ctx();
        let adapter = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![widget()]))
            .unwrap();
        let delegate = GuestObject::new().with("name", returning("guest")).into_value();
        let instance = ctx.instantiate(&adapter, &[delegate.clone()]).unwrap();

        assert_eq!(call(&ctx, &instance, "name"), "guest");
        assert_eq!(call(&ctx, &instance, "describe"), "host widget");
        assert!(this_of(&instance).unwrap().ptr_eq(&delegate));
    }

    #[test]
    fn test_final_methods_are_not_slots() {
        let ctx = ctx();
        let adapter = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![widget()]))
            .unwrap();
        let delegate = GuestObject::new()
            .with("id", GuestFunction::new("id", |_| Ok(Value::from(99))))
            .into_value();
        let instance = ctx.instantiate(&adapter, &[delegate]).unwrap();
        let id = ctx.call_method(&instance, "id", &[]).unwrap();
        assert_eq!(id.as_int(), Some(1));
    }

    #[test]
    fn test_missing_member_without_body_is_unsupported() {
        let ctx = ctx();
        let adapter = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![greeter()]))
            .unwrap();
        assert_eq!(adapter.name(), "Greeter$$Adapter");
        let delegate = GuestObject::new()
            .with(
                "greet",
                GuestFunction::new("greet", |args| {
                    Ok(Value::from(format!("hello {}", args[0].as_string()?)))
                }),
            )
            .into_value();
        let instance = ctx.instantiate(&adapter, &[delegate]).unwrap();

        let greeting = ctx
            .call_method(&instance, "greet", &[HostValue::from("ada")])
            .unwrap();
        assert_eq!(greeting.as_str(), Some("hello ada"));

        let err = ctx.call_method(&instance, "wave", &[]).unwrap_err();
        assert!(err.is_instance_of(builtins::unsupported_operation()));
    }

    #[test]
    fn test_dispatch_follows_member_changes() {
        let ctx = ctx();
        let adapter = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![greeter()]))
            .unwrap();
        let delegate = GuestObject::new().with("wave", returning("hi")).into_value();
        let instance = ctx.instantiate(&adapter, &[delegate.clone()]).unwrap();

        assert_eq!(call(&ctx, &instance, "wave"), "hi");
        delegate.write_member("wave", returning("bye")).unwrap();
        assert_eq!(call(&ctx, &instance, "wave"), "bye");
        assert_eq!(ctx.cache().adapters_generated(), 1);
    }

    #[test]
    fn test_delegate_result_is_converted_to_return_type() {
        let ctx = ctx();
        let adapter = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![widget()]))
            .unwrap();
        let delegate = GuestObject::new()
            .with("name", GuestFunction::new("name", |_| Ok(GuestObject::new().into_value())))
            .into_value();
        let instance = ctx.instantiate(&adapter, &[delegate]).unwrap();
        let err = ctx.call_method(&instance, "name", &[]).unwrap_err();
        assert!(err.is_instance_of(builtins::class_cast()));
    }
}

// ============================================================================
// Super calls and stacking
// ============================================================================

mod layering {
    use super::*;

    #[test]
    fn test_super_bypasses_delegate() {
        let ctx = ctx();
        let adapter = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![widget()]))
            .unwrap();
        let delegate = GuestObject::new()
            .with("name", returning("guest"))
            .with("describe", returning("guest widget"))
            .into_value();
        let instance = ctx.instantiate(&adapter, &[delegate]).unwrap();

        assert_eq!(call(&ctx, &instance, "describe"), "guest widget");

        let result = invoke_super(&ctx, &instance, "describe", &[]).unwrap();
        assert_eq!(result.as_str(), Some("host widget"));

        let sup = super_of(&ctx, &instance).unwrap();
        assert!(sup.is_member_invocable("describe"));
        let text = sup.invoke_member("describe", &[]).unwrap();
        assert_eq!(text.as_string().unwrap(), "host widget");
    }

    #[test]
    fn test_super_of_plain_object_fails() {
        let ctx = ctx();
        let plain = HostClass::builder("Plain").build();
        let instance = ctx.instantiate(&plain, &[]).unwrap();
        assert!(matches!(super_of(&ctx, &instance), Err(BridgeError::Host(_))));
    }

    #[test]
    fn test_stacked_adapters_keep_one_delegate_per_level() {
        let ctx = ctx();
        let inner = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![widget()]))
            .unwrap();
        let outer = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![inner.clone()]))
            .unwrap();
        assert!(outer.superclass().is_some_and(|s| Arc::ptr_eq(s, &inner)));

        let lower = GuestObject::new()
            .with("name", returning("lower name"))
            .with("describe", returning("lower describe"))
            .into_value();
        let upper = GuestObject::new().with("name", returning("upper name")).into_value();
        let instance = ctx
            .instantiate(&outer, &[lower.clone(), upper.clone()])
            .unwrap();

        assert_eq!(call(&ctx, &instance, "name"), "upper name");
        assert_eq!(call(&ctx, &instance, "describe"), "lower describe");
        assert!(this_of(&instance).unwrap().ptr_eq(&upper));

        let from_inner = invoke_super(&ctx, &instance, "name", &[]).unwrap();
        assert_eq!(from_inner.as_str(), Some("lower name"));
    }

    #[test]
    fn test_class_override_shared_by_instances() {
        let ctx = ctx();
        let delegate = GuestObject::new().with("name", returning("override")).into_value();
        let descriptor =
            HostAdapterDescriptor::new(vec![widget()]).with_class_override(delegate.clone());
        let adapter = ctx.create_adapter(&descriptor).unwrap();

        let a = ctx.instantiate(&adapter, &[]).unwrap();
        let b = ctx.instantiate(&adapter, &[]).unwrap();
        assert_eq!(call(&ctx, &a, "name"), "override");
        assert_eq!(call(&ctx, &b, "name"), "override");
        assert!(this_of(&b).unwrap().ptr_eq(&delegate));
    }

    #[test]
    fn test_override_identity_selects_class() {
        let ctx = ctx();
        let base = widget();
        let first = GuestObject::new().into_value();
        let second = GuestObject::new().into_value();
        let a = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![base.clone()]).with_class_override(first.clone()))
            .unwrap();
        let b = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![base.clone()]).with_class_override(second))
            .unwrap();
        let again = ctx
            .create_adapter(&HostAdapterDescriptor::new(vec![base]).with_class_override(first))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(ctx.cache().adapters_generated(), 2);
    }
}

// ============================================================================
// Caching across threads
// ============================================================================

mod caching {
    use super::*;

    #[test]
    fn test_concurrent_generation_happens_once() {
        let cache = InteropCache::new();
        let base = widget();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let base = base.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let ctx = HostContext::new(AccessPolicy::all(), cache);
                    barrier.wait();
                    ctx.create_adapter(&HostAdapterDescriptor::new(vec![base]))
                        .unwrap()
                })
            })
            .collect();
        let classes: Vec<Arc<HostClass>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for class in &classes[1..] {
            assert!(Arc::ptr_eq(class, &classes[0]));
        }
        assert_eq!(cache.adapters_generated(), 1);
    }

    #[test]
    fn test_caches_are_independent() {
        let base = widget();
        let a = ctx()
            .create_adapter(&HostAdapterDescriptor::new(vec![base.clone()]))
            .unwrap();
        let b = ctx()
            .create_adapter(&HostAdapterDescriptor::new(vec![base]))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}

// ============================================================================
// Refusals
// ============================================================================

mod refusals {
    use super::*;

    fn adapter_error(ctx: &Arc<HostContext>, supertypes: Vec<Arc<HostClass>>) -> AdapterError {
        match ctx.create_adapter(&HostAdapterDescriptor::new(supertypes)) {
            Err(BridgeError::Adapter(error)) => error,
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(class) => panic!("unexpectedly generated {}", class.name()),
        }
    }

    #[test]
    fn test_policy_must_allow_supertypes() {
        let ctx = HostContext::with_policy(AccessPolicy::explicit());
        assert_eq!(
            adapter_error(&ctx, vec![widget()]),
            AdapterError::NotAllowed("Widget".to_string())
        );

        let named = HostContext::with_policy(AccessPolicy::explicit().with_implementation("Widget"));
        assert!(named
            .create_adapter(&HostAdapterDescriptor::new(vec![widget()]))
            .is_ok());
    }

    #[test]
    fn test_final_class() {
        let ctx = ctx();
        let sealed = HostClass::builder("Sealed").final_class().build();
        assert_eq!(
            adapter_error(&ctx, vec![sealed]),
            AdapterError::FinalClass("Sealed".to_string())
        );
    }

    #[test]
    fn test_two_classes() {
        let ctx = ctx();
        let other = HostClass::builder("Other").abstract_class().build();
        assert!(matches!(
            adapter_error(&ctx, vec![widget(), other]),
            AdapterError::MultipleClasses { .. }
        ));
    }

    #[test]
    fn test_empty_supertypes() {
        assert_eq!(adapter_error(&ctx(), Vec::new()), AdapterError::NoSupertypes);
    }

    #[test]
    fn test_coercion_needs_no_arg_constructor() {
        let ctx = ctx();
        let sized = HostClass::builder("Sized")
            .abstract_class()
            .constructor(HostMethod::constructor().param(HostType::int()))
            .method(HostMethod::new("size").returns(HostType::int()).as_abstract())
            .build();
        let object = GuestObject::new()
            .with("size", GuestFunction::new("size", |_| Ok(Value::from(3))))
            .into_value();
        match ctx.coerce(&object, &HostType::class(&sized)) {
            polyhost_engine::CoercionOutcome::Rejected(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::PolicyDenied);
            }
            _ => panic!("expected rejection"),
        }
    }
}
