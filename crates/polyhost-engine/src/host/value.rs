//! Host values
//!
//! [`HostValue`] is what host methods receive and return. Primitives are
//! stored unboxed; strings, arrays and objects are reference counted so that
//! passing them across the boundary and back keeps their identity.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use polyhost_sdk::{Number, Value};
use rustc_hash::FxHashMap;

use crate::coerce::string::{format_double, format_float};
use crate::exception::HostException;
use crate::views::InterfaceProxy;

use super::class::HostClass;
use super::collections::{
    HostCollection, HostIterable, HostIterator, HostList, HostMap, HostMapEntry,
};
use super::types::{HostType, PrimitiveKind};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A value on the host side of the boundary
#[derive(Clone)]
pub enum HostValue {
    /// `null`
    Null,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// UTF-16 code unit
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Host string
    String(Arc<str>),
    /// Host array
    Array(HostArray),
    /// Instance of a host class
    Object(HostObject),
    /// List, host-owned or a foreign view
    List(Arc<dyn HostList>),
    /// Set or map value collection
    Set(Arc<dyn HostCollection>),
    /// Map, host-owned or a foreign view
    Map(Arc<dyn HostMap>),
    /// Single map entry
    MapEntry(Arc<dyn HostMapEntry>),
    /// Iterator
    Iterator(Arc<dyn HostIterator>),
    /// Iterable
    Iterable(Arc<dyn HostIterable>),
    /// Foreign object standing in for a host interface
    Proxy(InterfaceProxy),
    /// Thrown or caught host exception
    Exception(HostException),
    /// Foreign value passed through untouched
    Foreign(Value),
}

impl HostValue {
    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Kind of a primitive value
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            HostValue::Boolean(_) => Some(PrimitiveKind::Boolean),
            HostValue::Byte(_) => Some(PrimitiveKind::Byte),
            HostValue::Short(_) => Some(PrimitiveKind::Short),
            HostValue::Char(_) => Some(PrimitiveKind::Char),
            HostValue::Int(_) => Some(PrimitiveKind::Int),
            HostValue::Long(_) => Some(PrimitiveKind::Long),
            HostValue::Float(_) => Some(PrimitiveKind::Float),
            HostValue::Double(_) => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Numeric primitives as a [`Number`]. `char` and `boolean` are not numbers.
    pub fn to_number(&self) -> Option<Number> {
        match self {
            HostValue::Byte(v) => Some(Number::Byte(*v)),
            HostValue::Short(v) => Some(Number::Short(*v)),
            HostValue::Int(v) => Some(Number::Int(*v)),
            HostValue::Long(v) => Some(Number::Long(*v)),
            HostValue::Float(v) => Some(Number::Float(*v)),
            HostValue::Double(v) => Some(Number::Double(*v)),
            _ => None,
        }
    }

    /// Class of an object, exception or interface proxy
    pub fn runtime_class(&self) -> Option<Arc<HostClass>> {
        match self {
            HostValue::Object(object) => Some(object.class().clone()),
            HostValue::Exception(exception) => Some(exception.class().clone()),
            HostValue::Proxy(proxy) => Some(proxy.interface().clone()),
            _ => None,
        }
    }

    /// Name of the runtime type, as reported to foreign code
    pub fn type_name(&self) -> String {
        match self {
            HostValue::Null => "null".to_string(),
            HostValue::String(_) => "String".to_string(),
            HostValue::Array(array) => format!("{}[]", array.element_type().name()),
            HostValue::List(_) => "List".to_string(),
            HostValue::Set(_) => "Set".to_string(),
            HostValue::Map(_) => "Map".to_string(),
            HostValue::MapEntry(_) => "Map.Entry".to_string(),
            HostValue::Iterator(_) => "Iterator".to_string(),
            HostValue::Iterable(_) => "Iterable".to_string(),
            HostValue::Foreign(value) => value.meta_name().unwrap_or_else(|| "Value".to_string()),
            other => match (other.primitive_kind(), other.runtime_class()) {
                (Some(kind), _) => kind.boxed_name().to_string(),
                (None, Some(class)) => class.name().to_string(),
                (None, None) => "Object".to_string(),
            },
        }
    }

    /// Text shown in diagnostics
    pub fn display_string(&self) -> String {
        match self {
            HostValue::Null => "null".to_string(),
            HostValue::Boolean(v) => v.to_string(),
            HostValue::Byte(v) => v.to_string(),
            HostValue::Short(v) => v.to_string(),
            HostValue::Char(v) => String::from_utf16_lossy(&[*v]),
            HostValue::Int(v) => v.to_string(),
            HostValue::Long(v) => v.to_string(),
            HostValue::Float(v) => format_float(*v),
            HostValue::Double(v) => format_double(*v),
            HostValue::String(s) => s.to_string(),
            HostValue::Array(array) => {
                let parts: Vec<String> = array.to_vec().iter().map(|v| v.display_string()).collect();
                format!("[{}]", parts.join(", "))
            }
            HostValue::Object(object) => {
                format!("{}@{:x}", object.class().name(), object.id())
            }
            HostValue::Exception(exception) => exception.to_string(),
            HostValue::Proxy(proxy) => proxy.target().display_string(),
            HostValue::Foreign(value) => value.display_string(),
            other => other.type_name(),
        }
    }

    /// Equality as host collections use it: primitives and strings by value,
    /// foreign values by identity, everything else by reference.
    pub fn host_equals(&self, other: &HostValue) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Boolean(a), HostValue::Boolean(b)) => a == b,
            (HostValue::Byte(a), HostValue::Byte(b)) => a == b,
            (HostValue::Short(a), HostValue::Short(b)) => a == b,
            (HostValue::Char(a), HostValue::Char(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Long(a), HostValue::Long(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a.to_bits() == b.to_bits(),
            (HostValue::Double(a), HostValue::Double(b)) => a.to_bits() == b.to_bits(),
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => a.ptr_eq(b),
            (HostValue::Object(a), HostValue::Object(b)) => a.ptr_eq(b),
            (HostValue::Exception(a), HostValue::Exception(b)) => a.ptr_eq(b),
            (HostValue::Proxy(a), HostValue::Proxy(b)) => a.target().ptr_eq(b.target()),
            (HostValue::Foreign(a), HostValue::Foreign(b)) => a.ptr_eq(b),
            (HostValue::List(a), HostValue::List(b)) => same_arc(a, b),
            (HostValue::Set(a), HostValue::Set(b)) => same_arc(a, b),
            (HostValue::Map(a), HostValue::Map(b)) => same_arc(a, b),
            (HostValue::MapEntry(a), HostValue::MapEntry(b)) => same_arc(a, b),
            (HostValue::Iterator(a), HostValue::Iterator(b)) => same_arc(a, b),
            (HostValue::Iterable(a), HostValue::Iterable(b)) => same_arc(a, b),
            _ => false,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// `int` payload
    pub fn as_int(&self) -> Option<i32> {
        match self {
            HostValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// `long` payload
    pub fn as_long(&self) -> Option<i64> {
        match self {
            HostValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// `float` payload
    pub fn as_float(&self) -> Option<f32> {
        match self {
            HostValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// `double` payload
    pub fn as_double(&self) -> Option<f64> {
        match self {
            HostValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array payload
    pub fn as_array(&self) -> Option<&HostArray> {
        match self {
            HostValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// List payload
    pub fn as_list(&self) -> Option<&Arc<dyn HostList>> {
        match self {
            HostValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map payload
    pub fn as_map(&self) -> Option<&Arc<dyn HostMap>> {
        match self {
            HostValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Exception payload
    pub fn as_exception(&self) -> Option<&HostException> {
        match self {
            HostValue::Exception(e) => Some(e),
            _ => None,
        }
    }

    /// Foreign payload
    pub fn as_foreign(&self) -> Option<&Value> {
        match self {
            HostValue::Foreign(v) => Some(v),
            _ => None,
        }
    }
}

fn same_arc<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}({})", other.type_name(), other.display_string()),
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Boolean(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Long(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Double(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(Arc::from(v))
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::String(Arc::from(v))
    }
}

impl From<HostObject> for HostValue {
    fn from(v: HostObject) -> Self {
        HostValue::Object(v)
    }
}

impl From<HostException> for HostValue {
    fn from(v: HostException) -> Self {
        HostValue::Exception(v)
    }
}

// ============================================================================
// Arrays
// ============================================================================

struct ArrayInner {
    element: HostType,
    elements: RwLock<Vec<HostValue>>,
}

/// Fixed-length host array with a declared element type
#[derive(Clone)]
pub struct HostArray(Arc<ArrayInner>);

impl HostArray {
    /// Array of `element` holding `elements`
    pub fn new(element: HostType, elements: Vec<HostValue>) -> Self {
        HostArray(Arc::new(ArrayInner {
            element,
            elements: RwLock::new(elements),
        }))
    }

    /// Declared element type
    pub fn element_type(&self) -> HostType {
        self.0.element.clone()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.elements.read().len()
    }

    /// True when there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, `None` when out of range
    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.0.elements.read().get(index).cloned()
    }

    /// Store at `index`; false when out of bounds
    pub fn set(&self, index: usize, value: HostValue) -> bool {
        match self.0.elements.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy of the elements
    pub fn to_vec(&self) -> Vec<HostValue> {
        self.0.elements.read().clone()
    }

    /// Same array storage
    pub fn ptr_eq(&self, other: &HostArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// Objects
// ============================================================================

struct ObjectInner {
    id: u64,
    class: Arc<HostClass>,
    fields: RwLock<FxHashMap<String, HostValue>>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

/// Instance of a host class
#[derive(Clone)]
pub struct HostObject(Arc<ObjectInner>);

impl HostObject {
    /// Allocate an instance with every instance field at its zero value
    pub fn new(class: &Arc<HostClass>) -> Self {
        Self::allocate(class, None)
    }

    /// Allocate an instance carrying native state for its method bodies
    pub fn with_payload(class: &Arc<HostClass>, payload: Arc<dyn Any + Send + Sync>) -> Self {
        Self::allocate(class, Some(payload))
    }

    fn allocate(class: &Arc<HostClass>, payload: Option<Arc<dyn Any + Send + Sync>>) -> Self {
        let fields = class
            .instance_fields()
            .into_iter()
            .map(|f| (f.name().to_string(), f.ty().default_value()))
            .collect();
        HostObject(Arc::new(ObjectInner {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            class: class.clone(),
            fields: RwLock::new(fields),
            payload,
        }))
    }

    /// Identity of this instance
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Runtime class
    pub fn class(&self) -> &Arc<HostClass> {
        &self.0.class
    }

    /// Current value of field `name`
    pub fn get_field(&self, name: &str) -> Option<HostValue> {
        self.0.fields.read().get(name).cloned()
    }

    /// Store field `name`
    pub fn set_field(&self, name: &str, value: HostValue) {
        self.0.fields.write().insert(name.to_string(), value);
    }

    /// Native state attached at allocation
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.0.payload.as_deref()?.downcast_ref::<T>()
    }

    /// Same instance
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::class::HostField;

    #[test]
    fn test_object_fields_start_at_defaults() {
        let class = HostClass::builder("Point")
            .field(HostField::new("x", HostType::int()))
            .field(HostField::new("label", HostType::String))
            .build();
        let point = HostObject::new(&class);
        assert!(matches!(point.get_field("x"), Some(HostValue::Int(0))));
        assert!(matches!(point.get_field("label"), Some(HostValue::Null)));
        point.set_field("x", HostValue::Int(3));
        assert_eq!(point.get_field("x").and_then(|v| v.as_int()), Some(3));
    }

    #[test]
    fn test_payload() {
        let class = HostClass::builder("Native").build();
        let object = HostObject::with_payload(&class, Arc::new(41_u32));
        assert_eq!(object.payload::<u32>(), Some(&41));
        assert!(object.payload::<String>().is_none());
    }

    #[test]
    fn test_host_equals() {
        assert!(HostValue::from("a").host_equals(&HostValue::from("a")));
        assert!(!HostValue::Int(1).host_equals(&HostValue::Long(1)));
        let class = HostClass::builder("Thing").build();
        let a = HostObject::new(&class);
        let b = HostObject::new(&class);
        assert!(HostValue::Object(a.clone()).host_equals(&HostValue::Object(a)));
        assert!(!HostValue::Object(b.clone()).host_equals(&HostValue::from(b.class().name())));
    }

    #[test]
    fn test_array_access() {
        let array = HostArray::new(HostType::int(), vec![HostValue::Int(1), HostValue::Int(2)]);
        assert_eq!(array.len(), 2);
        assert!(array.set(1, HostValue::Int(5)));
        assert!(!array.set(2, HostValue::Int(5)));
        assert_eq!(array.get(1).and_then(|v| v.as_int()), Some(5));
        assert_eq!(HostValue::Array(array).display_string(), "[1, 5]");
    }

    #[test]
    fn test_display_of_floating_values() {
        assert_eq!(HostValue::Double(1.0).display_string(), "1.0");
        assert_eq!(HostValue::Char(b'x' as u16).display_string(), "x");
        assert_eq!(HostValue::Int(7).type_name(), "Integer");
    }
}
