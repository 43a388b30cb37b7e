//! Access policies loaded from TOML files

use std::fs;
use std::path::Path;

use polyhost_engine::host::{HostList, VecList};
use polyhost_engine::{
    AccessPolicy, HostAdapterDescriptor, HostClass, HostContext, HostMethod, HostType, HostValue,
    PolicyError,
};
use polyhost_sdk::Value;
use tempfile::TempDir;

const POLICY: &str = r#"
# Embedding policy for plugin scripts
[host_access]
public_only = true
explicit_members_only = false
allow_list_access = true
allow_implementations = ["Listener"]
allow_string_coercion = false
"#;

fn write_policy(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("polyhost.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_policy(&dir, POLICY);
    let policy = AccessPolicy::from_file(&path).unwrap();
    assert!(policy.public_only);
    assert!(!policy.explicit_members_only);
    assert!(policy.allow_list_access);
    assert!(!policy.allow_map_access);
    assert!(!policy.allow_string_coercion);
    assert!(policy.allow_implementations.contains("Listener"));
}

#[test]
fn test_missing_file() {
    let result = AccessPolicy::from_file(Path::new("/nonexistent/polyhost.toml"));
    assert!(matches!(result, Err(PolicyError::IoError(_))));
}

#[test]
fn test_loaded_policy_governs_context() {
    let dir = TempDir::new().unwrap();
    let ctx = HostContext::with_policy(AccessPolicy::from_file(&write_policy(&dir, POLICY)).unwrap());

    assert!(!ctx.coerce(&Value::from("1"), &HostType::int()).is_converted());

    let list: std::sync::Arc<dyn HostList> = VecList::new(vec![HostValue::Int(1)]);
    assert!(ctx.to_guest(HostValue::List(list)).has_array_elements());

    let listener = HostClass::builder("Listener")
        .interface()
        .method(HostMethod::new("notify").as_abstract())
        .build();
    let other = HostClass::builder("Other")
        .interface()
        .method(HostMethod::new("notify").as_abstract())
        .build();
    assert!(ctx.create_adapter(&HostAdapterDescriptor::new(vec![listener])).is_ok());
    assert!(ctx.create_adapter(&HostAdapterDescriptor::new(vec![other])).is_err());
}

#[test]
fn test_policy_serializes_back_to_toml() {
    let policy = AccessPolicy::explicit()
        .with_map_access(true)
        .with_implementation("Comparator");
    let text = toml::to_string(&policy).unwrap();
    let document = format!("[host_access]\n{}", text);
    assert_eq!(AccessPolicy::from_toml(&document).unwrap(), policy);
}
