//! Guest functions

use std::sync::Arc;

use crate::error::InteropResult;
use crate::interop::Interop;
use crate::value::Value;

/// Body of a guest function
pub type GuestCallable = dyn Fn(&[Value]) -> InteropResult<Value> + Send + Sync;

/// An executable guest value
pub struct GuestFunction {
    name: String,
    body: Arc<GuestCallable>,
    instantiable: bool,
}

impl GuestFunction {
    /// An executable value named `name`
    pub fn new<F>(name: &str, body: F) -> Value
    where
        F: Fn(&[Value]) -> InteropResult<Value> + Send + Sync + 'static,
    {
        Value::new(GuestFunction {
            name: name.to_string(),
            body: Arc::new(body),
            instantiable: false,
        })
    }

    /// A value that is both executable and instantiable through `body`
    pub fn constructor<F>(name: &str, body: F) -> Value
    where
        F: Fn(&[Value]) -> InteropResult<Value> + Send + Sync + 'static,
    {
        Value::new(GuestFunction {
            name: name.to_string(),
            body: Arc::new(body),
            instantiable: true,
        })
    }
}

impl Interop for GuestFunction {
    fn display_string(&self) -> String {
        format!("function {}()", self.name)
    }

    fn meta_name(&self) -> Option<String> {
        Some("Function".to_string())
    }

    fn is_executable(&self) -> bool {
        true
    }

    fn execute(&self, args: &[Value]) -> InteropResult<Value> {
        (self.body)(args)
    }

    fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    fn instantiate(&self, args: &[Value]) -> InteropResult<Value> {
        (self.body)(args)
    }
}
