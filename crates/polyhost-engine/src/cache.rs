//! Shared interop cache
//!
//! One cache may back many contexts. It memoizes two things:
//!
//! - member tables: the methods, constructors and fields of a class visible
//!   under a member filter, keyed by `(class, filter)`
//! - generated adapter classes, keyed by supertype set and class override
//!
//! Both are built at most once per key even under concurrent first use;
//! racing threads wait on the same cell instead of building twice.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::adapter::AdapterError;
use crate::host::{ClassId, HostClass, HostField};
use crate::policy::AccessPolicy;
use crate::resolve::OverloadCandidate;

/// The member visibility rules a table was built under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberFilter {
    /// Hide non-public members
    pub public_only: bool,
    /// Hide members not marked as exported
    pub explicit_only: bool,
}

impl MemberFilter {
    /// Filter matching the member rules of `policy`
    pub fn from_policy(policy: &AccessPolicy) -> Self {
        Self {
            public_only: policy.public_only,
            explicit_only: policy.explicit_members_only,
        }
    }

    fn policy(&self) -> AccessPolicy {
        AccessPolicy::explicit()
            .with_public_only(self.public_only)
            .with_explicit_members_only(self.explicit_only)
    }
}

/// Members of one class visible under one filter
#[derive(Default)]
pub struct ClassMembers {
    /// Overridable and inherited instance methods by name
    pub instance_methods: FxHashMap<String, Vec<OverloadCandidate>>,
    /// Static methods by name, inherited ones included
    pub static_methods: FxHashMap<String, Vec<OverloadCandidate>>,
    /// Constructors of this class only
    pub constructors: Vec<OverloadCandidate>,
    /// Instance fields by name
    pub instance_fields: FxHashMap<String, HostField>,
    /// Static fields with the class that stores them
    pub static_fields: FxHashMap<String, (HostField, Arc<HostClass>)>,
}

impl ClassMembers {
    fn build(class: &Arc<HostClass>, filter: MemberFilter) -> Self {
        let policy = filter.policy();
        let mut members = ClassMembers::default();

        for (method, depth) in class.instance_methods() {
            if policy.allows_member(method.visibility(), method.is_exported()) {
                members
                    .instance_methods
                    .entry(method.name().to_string())
                    .or_default()
                    .push(OverloadCandidate { method, depth });
            }
        }
        for (method, depth) in class.static_methods() {
            if policy.allows_member(method.visibility(), method.is_exported()) {
                members
                    .static_methods
                    .entry(method.name().to_string())
                    .or_default()
                    .push(OverloadCandidate { method, depth });
            }
        }
        let depth = class.depth();
        members.constructors = class
            .constructors()
            .iter()
            .filter(|c| policy.allows_member(c.visibility(), c.is_exported()))
            .map(|c| OverloadCandidate {
                method: c.clone(),
                depth,
            })
            .collect();

        for field in class.instance_fields() {
            if policy.allows_member(field.visibility(), field.is_exported()) {
                members
                    .instance_fields
                    .insert(field.name().to_string(), field);
            }
        }
        let mut current = Some(class.clone());
        while let Some(owner) = current {
            for field in owner.declared_fields().iter().filter(|f| f.is_static()) {
                if policy.allows_member(field.visibility(), field.is_exported())
                    && !members.static_fields.contains_key(field.name())
                {
                    members
                        .static_fields
                        .insert(field.name().to_string(), (field.clone(), owner.clone()));
                }
            }
            current = owner.superclass().cloned();
        }
        members
    }

    /// Sorted member names: fields first, then methods
    pub fn member_names(&self, statics: bool) -> Vec<String> {
        let (mut fields, mut methods): (Vec<String>, Vec<String>) = if statics {
            (
                self.static_fields.keys().cloned().collect(),
                self.static_methods.keys().cloned().collect(),
            )
        } else {
            (
                self.instance_fields.keys().cloned().collect(),
                self.instance_methods.keys().cloned().collect(),
            )
        };
        fields.sort();
        methods.sort();
        methods.retain(|m| !fields.contains(m));
        fields.extend(methods);
        fields
    }
}

/// Identity of a generated adapter class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct AdapterKey {
    pub supertypes: Vec<ClassId>,
    /// Identity of the class-level delegate, if any
    pub class_override: Option<usize>,
}

type Cell<T> = Arc<OnceCell<T>>;

/// Cache shared by every context created against it
#[derive(Default)]
pub struct InteropCache {
    members: DashMap<(ClassId, MemberFilter), Cell<Arc<ClassMembers>>>,
    adapters: DashMap<AdapterKey, Cell<Arc<HostClass>>>,
    member_tables_built: AtomicUsize,
    adapters_generated: AtomicUsize,
}

impl InteropCache {
    /// Empty cache, shareable between contexts
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Member table for `class` under `filter`
    pub fn members(&self, class: &Arc<HostClass>, filter: MemberFilter) -> Arc<ClassMembers> {
        // clone the cell out so the shard lock is not held while building
        let cell = self
            .members
            .entry((class.id(), filter))
            .or_default()
            .clone();
        cell.get_or_init(|| {
            self.member_tables_built.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(class = class.name(), ?filter, "building member table");
            Arc::new(ClassMembers::build(class, filter))
        })
        .clone()
    }

    /// Adapter class for `key`, generated by `generate` on first use
    pub(crate) fn adapter_class<F>(
        &self,
        key: AdapterKey,
        generate: F,
    ) -> Result<Arc<HostClass>, AdapterError>
    where
        F: FnOnce() -> Result<Arc<HostClass>, AdapterError>,
    {
        let cell = self.adapters.entry(key).or_default().clone();
        cell.get_or_try_init(|| {
            let class = generate()?;
            self.adapters_generated.fetch_add(1, Ordering::Relaxed);
            Ok(class)
        })
        .cloned()
    }

    /// Number of member tables built so far
    pub fn member_tables_built(&self) -> usize {
        self.member_tables_built.load(Ordering::Relaxed)
    }

    /// Number of adapter classes generated so far
    pub fn adapters_generated(&self) -> usize {
        self.adapters_generated.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostMethod, HostType, HostValue, Visibility};

    fn sample() -> Arc<HostClass> {
        HostClass::builder("Sample")
            .field(HostField::new("visible", HostType::int()).as_exported())
            .field(HostField::new("hidden", HostType::int()))
            .field(HostField::new("COUNT", HostType::int()).as_static().as_exported())
            .method(HostMethod::new("run").as_exported().body(|_| Ok(HostValue::Null)))
            .method(
                HostMethod::new("secret")
                    .with_visibility(Visibility::Protected)
                    .as_exported()
                    .body(|_| Ok(HostValue::Null)),
            )
            .method(
                HostMethod::new("make")
                    .as_static()
                    .as_exported()
                    .body(|_| Ok(HostValue::Null)),
            )
            .build()
    }

    #[test]
    fn test_member_filters() {
        let cache = InteropCache::new();
        let class = sample();
        let explicit = cache.members(
            &class,
            MemberFilter {
                public_only: true,
                explicit_only: true,
            },
        );
        assert_eq!(explicit.member_names(false), vec!["visible", "run"]);
        assert_eq!(explicit.member_names(true), vec!["COUNT", "make"]);
        assert!(explicit.constructors.is_empty());

        let open = cache.members(
            &class,
            MemberFilter {
                public_only: false,
                explicit_only: false,
            },
        );
        assert_eq!(open.member_names(false), vec!["hidden", "visible", "run", "secret"]);
        assert_eq!(open.constructors.len(), 1);
    }

    #[test]
    fn test_member_table_built_once() {
        let cache = InteropCache::new();
        let class = sample();
        let filter = MemberFilter {
            public_only: true,
            explicit_only: false,
        };
        let a = cache.members(&class, filter);
        let b = cache.members(&class, filter);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.member_tables_built(), 1);
    }

    #[test]
    fn test_failed_adapter_generation_is_retried() {
        let cache = InteropCache::new();
        let key = AdapterKey {
            supertypes: vec![1],
            class_override: None,
        };
        let failed = cache.adapter_class(key.clone(), || {
            Err(AdapterError::NotAllowed("Runnable".to_string()))
        });
        assert!(failed.is_err());
        let class = cache
            .adapter_class(key, || Ok(HostClass::builder("Generated").build()))
            .unwrap();
        assert_eq!(class.name(), "Generated");
        assert_eq!(cache.adapters_generated(), 1);
    }
}
