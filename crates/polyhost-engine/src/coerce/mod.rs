//! Coercion engine
//!
//! Converts a foreign [`Value`] to a [`HostType`]. Every conversion has a
//! [`Cost`]: the strictness [`Level`] it needs and a rank within that
//! level. The resolver probes costs for every candidate; only the winner's
//! arguments are materialized.
//!
//! | Conversion                                  | Level         | Rank          |
//! |---------------------------------------------|---------------|---------------|
//! | host value already of the target type       | Strict        | 0             |
//! | same primitive kind, null to reference      | Strict        | 1             |
//! | lossless primitive widening                 | Strict        | 2 + distance  |
//! | one-character string to `char`              | Strict        | 9             |
//! | value-checked primitive narrowing           | Strict        | 10 + distance |
//! | scalar to `Object`                          | Strict        | 17            |
//! | list/map/set/entry/iterator view            | Loose         | 20            |
//! | array copy                                  | Loose         | 21            |
//! | composite to `Object`, exception wrap       | Loose         | 22            |
//! | string <-> number/boolean                   | Coerce        | 30            |
//! | executable as functional interface          | FunctionProxy | 40            |
//! | object as interface                         | ObjectProxy   | 50            |
//! | object as abstract class (adapter)          | ObjectProxy   | 55            |

pub mod numeric;
pub mod string;

use std::fmt;
use std::sync::Arc;

use polyhost_sdk::{InteropError, Value};

use crate::adapter;
use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::exception::from_foreign_exception;
use crate::host::collections::key_set;
use crate::host::{builtins, HostArray, HostClass, HostMap, HostType, HostValue, PrimitiveKind};
use crate::marshal;
use crate::views::{ForeignEntry, ForeignIterable, ForeignIterator, ForeignList, ForeignMap, InterfaceProxy};

/// How much a conversion is allowed to reinterpret its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Identity, widening, value-checked narrowing and scalars to `Object`
    Strict,
    /// Collection views, array copies and composites to `Object`
    Loose,
    /// Conversions through text
    Coerce,
    /// Executable to a functional interface
    FunctionProxy,
    /// Member holder to an interface or abstract class
    ObjectProxy,
}

impl Level {
    /// Levels from strictest to loosest
    pub const ALL: [Level; 5] = [
        Level::Strict,
        Level::Loose,
        Level::Coerce,
        Level::FunctionProxy,
        Level::ObjectProxy,
    ];
}

/// Cost of one conversion; ordered by level, then rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost {
    /// Loosest level the conversion needed
    pub level: Level,
    /// Preference within the level
    pub rank: u32,
}

impl Cost {
    /// Cost at `level` with `rank`
    pub const fn new(level: Level, rank: u32) -> Self {
        Self { level, rank }
    }
}

/// Conversion ranks; lower is preferred
pub mod rank {
    /// Value already has the target type
    pub const IDENTITY: u32 = 0;
    /// Foreign number of exactly the target width
    pub const EXACT: u32 = 1;
    /// Lossless widening; the widening distance is added
    pub const WIDENING: u32 = 2;
    /// One-character string to `char`
    pub const CHAR_FROM_STRING: u32 = 9;
    /// Narrowing that fits; the distance is added
    pub const NARROWING: u32 = 10;
    /// Scalar to `Object`
    pub const OBJECT: u32 = 17;
    /// Live collection view
    pub const VIEW: u32 = 20;
    /// Foreign array copied into a host array
    pub const ARRAY_COPY: u32 = 21;
    /// Composite foreign value to `Object`
    pub const OBJECT_VIEW: u32 = 22;
    /// Parsed or formatted through text
    pub const STRING_COERCION: u32 = 30;
    /// Executable wrapped as a functional interface
    pub const FUNCTION_PROXY: u32 = 40;
    /// Member holder wrapped as an interface
    pub const INTERFACE_PROXY: u32 = 50;
    /// Member holder backing an abstract-class adapter
    pub const CLASS_ADAPTER: u32 = 55;
}

/// Why a conversion was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Null where a primitive is required
    NullToPrimitive,
    /// Value does not fit the target
    Lossy,
    /// String is not a literal of the target type
    InvalidLiteral,
    /// Access policy forbids the conversion
    PolicyDenied,
    /// No conversion exists
    Unsupported,
}

/// A refused conversion with its diagnostic
#[derive(Debug, Clone)]
pub struct Rejection {
    /// Category of the refusal
    pub kind: RejectionKind,
    /// Diagnostic shown to the caller
    pub message: String,
}

impl Rejection {
    fn new(kind: RejectionKind, value: &Value, target: &HostType, detail: &str) -> Self {
        let meta = value.meta_name().unwrap_or_else(|| "Value".to_string());
        Self {
            kind,
            message: format!(
                "Cannot convert '{}'(type: {}) to host type '{}': {}",
                value.display_string(),
                meta,
                target.name(),
                detail
            ),
        }
    }

    /// The interop error reported for this rejection
    pub fn into_error(self, target: &HostType) -> InteropError {
        InteropError::UnsupportedType {
            target: target.name(),
            reason: self.message,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of [`coerce`]
#[derive(Debug)]
pub enum CoercionOutcome {
    /// Converted value with its cost
    Converted {
        /// Host value, ready to pass to a host method
        value: HostValue,
        /// What the conversion cost
        cost: Cost,
    },
    /// Refused conversion
    Rejected(Rejection),
}

impl CoercionOutcome {
    /// True for `Converted`
    pub fn is_converted(&self) -> bool {
        matches!(self, CoercionOutcome::Converted { .. })
    }

    /// Cost of a successful conversion
    pub fn cost(&self) -> Option<Cost> {
        match self {
            CoercionOutcome::Converted { cost, .. } => Some(*cost),
            CoercionOutcome::Rejected(_) => None,
        }
    }

    /// The converted value, or `UnsupportedType`
    pub fn into_result(self, target: &HostType) -> BridgeResult<HostValue> {
        match self {
            CoercionOutcome::Converted { value, .. } => Ok(value),
            CoercionOutcome::Rejected(rejection) => {
                Err(BridgeError::Interop(rejection.into_error(target)))
            }
        }
    }
}

/// Conversion work deferred until the conversion is chosen
enum Plan {
    Ready(HostValue),
    ArrayCopy { element: HostType },
    ClassAdapter { class: Arc<HostClass> },
}

/// Cost of converting `value` to `target` without materializing anything
/// that has side effects
pub fn probe(ctx: &Arc<HostContext>, value: &Value, target: &HostType) -> Result<Cost, Rejection> {
    classify(ctx, value, target).map(|(cost, _)| cost)
}

/// Convert `value` to `target`
pub fn coerce(ctx: &Arc<HostContext>, value: &Value, target: &HostType) -> CoercionOutcome {
    let converted = classify(ctx, value, target)
        .and_then(|(cost, plan)| Ok((cost, materialize(ctx, plan, value, target)?)));
    match converted {
        Ok((cost, value)) => CoercionOutcome::Converted { value, cost },
        Err(rejection) => {
            tracing::trace!(target_type = %target, reason = %rejection, "coercion rejected");
            CoercionOutcome::Rejected(rejection)
        }
    }
}

fn ready(level: Level, rank: u32, value: HostValue) -> Result<(Cost, Plan), Rejection> {
    Ok((Cost::new(level, rank), Plan::Ready(value)))
}

fn reject(
    kind: RejectionKind,
    value: &Value,
    target: &HostType,
    detail: &str,
) -> Result<(Cost, Plan), Rejection> {
    Err(Rejection::new(kind, value, target, detail))
}

const UNSUPPORTED: &str = "Unsupported target type.";
const LOSSY: &str = "Invalid or lossy primitive coercion.";

fn classify(
    ctx: &Arc<HostContext>,
    value: &Value,
    target: &HostType,
) -> Result<(Cost, Plan), Rejection> {
    if let Some(host) = marshal::unwrap_host(value) {
        if target.accepts(&host) {
            return ready(Level::Strict, rank::IDENTITY, host);
        }
        if let HostType::Primitive(kind) = target {
            if host.primitive_kind() == Some(*kind) {
                return ready(Level::Strict, rank::EXACT, host);
            }
        }
    }

    if value.is_null() {
        return match target {
            HostType::Primitive(_) => reject(
                RejectionKind::NullToPrimitive,
                value,
                target,
                "Invalid null value for primitive target.",
            ),
            _ => ready(Level::Strict, rank::EXACT, HostValue::Null),
        };
    }

    match target {
        HostType::Value => ready(Level::Strict, rank::EXACT, HostValue::Foreign(value.clone())),
        HostType::Primitive(kind) | HostType::Boxed(kind) => primitive(ctx, value, *kind, target),
        HostType::String => string_target(ctx, value, target),
        HostType::Object => object_target(ctx, value),
        HostType::Array(element) => array_target(ctx, value, element, target),
        HostType::List(element) => {
            if !value.has_array_elements() {
                return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
            }
            let list = ForeignList::new(ctx, value, element);
            ready(Level::Loose, rank::VIEW, HostValue::List(Arc::new(list)))
        }
        HostType::Set(element) => {
            if !value.has_hash_entries() {
                return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
            }
            let map: Arc<dyn HostMap> =
                Arc::new(ForeignMap::hash(ctx, value, element, &HostType::Object));
            ready(Level::Loose, rank::VIEW, HostValue::Set(key_set(&map)))
        }
        HostType::Map(key, val) => {
            if value.has_hash_entries() {
                let map = ForeignMap::hash(ctx, value, key, val);
                return ready(Level::Loose, rank::VIEW, HostValue::Map(Arc::new(map)));
            }
            let string_keys = matches!(**key, HostType::String | HostType::Object);
            if value.has_members() && !value.has_array_elements() && string_keys {
                let map = ForeignMap::members(ctx, value, val);
                return ready(Level::Loose, rank::VIEW, HostValue::Map(Arc::new(map)));
            }
            reject(RejectionKind::Unsupported, value, target, UNSUPPORTED)
        }
        HostType::MapEntry(key, val) => {
            let is_pair = value.has_array_elements() && value.get_array_size().ok() == Some(2);
            if !is_pair {
                return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
            }
            let entry = ForeignEntry::new(ctx, value, key, val);
            ready(Level::Loose, rank::VIEW, HostValue::MapEntry(Arc::new(entry)))
        }
        HostType::Iterator(element) => {
            if !value.is_iterator() {
                return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
            }
            let iterator = ForeignIterator::new(ctx, value, element);
            ready(Level::Loose, rank::VIEW, HostValue::Iterator(Arc::new(iterator)))
        }
        HostType::Iterable(element) => {
            if !value.has_iterator() {
                return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
            }
            let iterable = ForeignIterable::new(ctx, value, element);
            ready(Level::Loose, rank::VIEW, HostValue::Iterable(Arc::new(iterable)))
        }
        HostType::Class(class) => class_target(ctx, value, class, target),
    }
}

fn primitive(
    ctx: &Arc<HostContext>,
    value: &Value,
    kind: PrimitiveKind,
    target: &HostType,
) -> Result<(Cost, Plan), Rejection> {
    match kind {
        PrimitiveKind::Boolean if value.is_boolean() => match value.as_boolean() {
            Ok(b) => ready(Level::Strict, rank::EXACT, HostValue::Boolean(b)),
            Err(e) => reject(RejectionKind::Unsupported, value, target, &e.to_string()),
        },
        PrimitiveKind::Char => {
            if !value.is_string() {
                return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
            }
            let text = value.as_string().unwrap_or_default();
            match string::parse_primitive(&text, PrimitiveKind::Char) {
                Some(c) => ready(Level::Strict, rank::CHAR_FROM_STRING, c),
                None => reject(RejectionKind::Lossy, value, target, LOSSY),
            }
        }
        _ if kind.is_numeric() && value.is_number() => {
            let converted = numeric::number_cost(value, kind)
                .and_then(|cost| Some((cost, numeric::read_as(value, kind)?)));
            match converted {
                Some((cost, v)) => Ok((cost, Plan::Ready(v))),
                None => reject(RejectionKind::Lossy, value, target, LOSSY),
            }
        }
        _ if value.is_string() && ctx.policy().allow_string_coercion => {
            let text = value.as_string().unwrap_or_default();
            match string::parse_primitive(&text, kind) {
                Some(v) => ready(Level::Coerce, rank::STRING_COERCION, v),
                None => reject(RejectionKind::InvalidLiteral, value, target, LOSSY),
            }
        }
        _ => reject(RejectionKind::Unsupported, value, target, UNSUPPORTED),
    }
}

fn string_target(
    ctx: &Arc<HostContext>,
    value: &Value,
    target: &HostType,
) -> Result<(Cost, Plan), Rejection> {
    if value.is_string() {
        return match value.as_string() {
            Ok(s) => ready(Level::Strict, rank::EXACT, HostValue::from(s)),
            Err(e) => reject(RejectionKind::Unsupported, value, target, &e.to_string()),
        };
    }
    if (value.is_number() || value.is_boolean()) && ctx.policy().allow_string_coercion {
        if let Some(text) = string::format_scalar(value) {
            return ready(Level::Coerce, rank::STRING_COERCION, HostValue::from(text));
        }
    }
    reject(RejectionKind::Unsupported, value, target, UNSUPPORTED)
}

fn object_target(ctx: &Arc<HostContext>, value: &Value) -> Result<(Cost, Plan), Rejection> {
    if value.is_boolean() {
        if let Ok(b) = value.as_boolean() {
            return ready(Level::Strict, rank::OBJECT, HostValue::Boolean(b));
        }
    }
    if value.is_string() {
        if let Ok(s) = value.as_string() {
            return ready(Level::Strict, rank::OBJECT, HostValue::from(s));
        }
    }
    if let Some(number) = numeric::natural(value) {
        return ready(Level::Strict, rank::OBJECT, number);
    }
    let object = HostType::Object;
    let composite = if value.is_exception() {
        HostValue::Exception(from_foreign_exception(value.clone()))
    } else if value.has_array_elements() {
        HostValue::List(Arc::new(ForeignList::new(ctx, value, &object)))
    } else if value.has_hash_entries() {
        HostValue::Map(Arc::new(ForeignMap::hash(ctx, value, &object, &object)))
    } else if value.is_iterator() {
        HostValue::Iterator(Arc::new(ForeignIterator::new(ctx, value, &object)))
    } else if value.has_members() && !value.is_executable() && !value.is_instantiable() {
        HostValue::Map(Arc::new(ForeignMap::members(ctx, value, &object)))
    } else {
        HostValue::Foreign(value.clone())
    };
    ready(Level::Loose, rank::OBJECT_VIEW, composite)
}

fn array_target(
    ctx: &Arc<HostContext>,
    value: &Value,
    element: &HostType,
    target: &HostType,
) -> Result<(Cost, Plan), Rejection> {
    if !value.has_array_elements() {
        return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
    }
    let size = value
        .get_array_size()
        .map_err(|e| Rejection::new(RejectionKind::Unsupported, value, target, &e.to_string()))?;
    let mut level = Level::Loose;
    for index in 0..size {
        let item = value
            .read_array_element(index)
            .map_err(|e| Rejection::new(RejectionKind::Unsupported, value, target, &e.to_string()))?;
        level = level.max(probe(ctx, &item, element)?.level);
    }
    Ok((
        Cost::new(level, rank::ARRAY_COPY),
        Plan::ArrayCopy {
            element: element.clone(),
        },
    ))
}

fn class_target(
    ctx: &Arc<HostContext>,
    value: &Value,
    class: &Arc<HostClass>,
    target: &HostType,
) -> Result<(Cost, Plan), Rejection> {
    if class.id() == builtins::object().id() {
        return object_target(ctx, value);
    }
    if class.is_subtype_of(builtins::throwable()) {
        if value.is_exception() {
            let exception = from_foreign_exception(value.clone());
            if exception.is_instance_of(class) {
                return ready(Level::Loose, rank::OBJECT_VIEW, HostValue::Exception(exception));
            }
        }
        return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
    }
    if marshal::unwrap_host(value).is_some() {
        return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
    }

    let policy = ctx.policy();
    if class.is_interface() {
        if class.functional_method().is_some() && value.is_executable() {
            if !policy.allows_function_proxy(class) {
                return reject(RejectionKind::PolicyDenied, value, target, "Function proxy not allowed by the access policy.");
            }
            let proxy = InterfaceProxy::function(ctx, class, value);
            return ready(Level::FunctionProxy, rank::FUNCTION_PROXY, HostValue::Proxy(proxy));
        }
        if value.has_members() {
            if !policy.allows_interface_implementation(class) {
                return reject(RejectionKind::PolicyDenied, value, target, "Interface implementation not allowed by the access policy.");
            }
            let proxy = InterfaceProxy::members(ctx, class, value);
            return ready(Level::ObjectProxy, rank::INTERFACE_PROXY, HostValue::Proxy(proxy));
        }
        return reject(RejectionKind::Unsupported, value, target, UNSUPPORTED);
    }

    if class.is_abstract() && value.has_members() {
        return match adapter::check_extensible(ctx, class) {
            Ok(()) => Ok((
                Cost::new(Level::ObjectProxy, rank::CLASS_ADAPTER),
                Plan::ClassAdapter {
                    class: class.clone(),
                },
            )),
            Err(e) => reject(RejectionKind::PolicyDenied, value, target, &e.to_string()),
        };
    }
    reject(RejectionKind::Unsupported, value, target, UNSUPPORTED)
}

fn materialize(
    ctx: &Arc<HostContext>,
    plan: Plan,
    value: &Value,
    target: &HostType,
) -> Result<HostValue, Rejection> {
    match plan {
        Plan::Ready(v) => Ok(v),
        Plan::ArrayCopy { element } => {
            let failed = |e: InteropError| {
                Rejection::new(RejectionKind::Unsupported, value, target, &e.to_string())
            };
            let size = value.get_array_size().map_err(failed)?;
            let mut items = Vec::with_capacity(size.max(0) as usize);
            for index in 0..size {
                let item = value.read_array_element(index).map_err(failed)?;
                match coerce(ctx, &item, &element) {
                    CoercionOutcome::Converted { value, .. } => items.push(value),
                    CoercionOutcome::Rejected(rejection) => return Err(rejection),
                }
            }
            Ok(HostValue::Array(HostArray::new(element, items)))
        }
        Plan::ClassAdapter { class } => adapter::instantiate_with_delegate(ctx, &class, value)
            .map_err(|e| Rejection::new(RejectionKind::Unsupported, value, target, &e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AccessPolicy;
    use polyhost_sdk::{GuestArray, GuestHash, GuestObject};

    fn ctx() -> Arc<HostContext> {
        HostContext::with_policy(AccessPolicy::all())
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(Cost::new(Level::Strict, 50) < Cost::new(Level::Loose, 0));
        assert!(Cost::new(Level::Loose, 1) < Cost::new(Level::Loose, 2));
    }

    #[test]
    fn test_null_handling() {
        let ctx = ctx();
        let rejected = coerce(&ctx, &Value::null(), &HostType::int());
        assert!(matches!(
            rejected,
            CoercionOutcome::Rejected(Rejection { kind: RejectionKind::NullToPrimitive, .. })
        ));
        let converted = coerce(&ctx, &Value::null(), &HostType::String);
        assert!(matches!(converted, CoercionOutcome::Converted { value: HostValue::Null, .. }));
    }

    #[test]
    fn test_rejection_message() {
        let ctx = ctx();
        let outcome = coerce(&ctx, &Value::from(2_147_483_648_i64), &HostType::int());
        let CoercionOutcome::Rejected(rejection) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.kind, RejectionKind::Lossy);
        assert_eq!(
            rejection.message,
            "Cannot convert '2147483648'(type: long) to host type 'int': Invalid or lossy primitive coercion."
        );
    }

    #[test]
    fn test_string_coercion_requires_policy() {
        let strict = HostContext::with_policy(AccessPolicy::explicit());
        assert!(!coerce(&strict, &Value::from("42"), &HostType::int()).is_converted());
        let open = ctx();
        let outcome = coerce(&open, &Value::from("42"), &HostType::int());
        assert_eq!(outcome.cost(), Some(Cost::new(Level::Coerce, rank::STRING_COERCION)));
        let outcome = coerce(&open, &Value::from(1.5), &HostType::String);
        assert!(matches!(
            outcome,
            CoercionOutcome::Converted { value: HostValue::String(ref s), .. } if &**s == "1.5"
        ));
    }

    #[test]
    fn test_char_from_single_character_string() {
        let ctx = ctx();
        let target = HostType::Primitive(PrimitiveKind::Char);
        assert!(matches!(
            coerce(&ctx, &Value::from("a"), &target),
            CoercionOutcome::Converted { value: HostValue::Char(97), .. }
        ));
        assert!(!coerce(&ctx, &Value::from("ab"), &target).is_converted());
    }

    #[test]
    fn test_object_target_uses_natural_boxes_and_views() {
        let ctx = ctx();
        assert!(matches!(
            coerce(&ctx, &Value::from(3_i16), &HostType::Object),
            CoercionOutcome::Converted { value: HostValue::Short(3), .. }
        ));
        let array = GuestArray::resizable(vec![Value::from(1)]);
        assert!(matches!(
            coerce(&ctx, &array, &HostType::Object),
            CoercionOutcome::Converted { value: HostValue::List(_), .. }
        ));
        let hash = GuestHash::new().with("k", 1).into_value();
        assert!(matches!(
            coerce(&ctx, &hash, &HostType::Object),
            CoercionOutcome::Converted { value: HostValue::Map(_), .. }
        ));
    }

    #[test]
    fn test_array_copy_checks_elements() {
        let ctx = ctx();
        let ints = GuestArray::fixed(vec![Value::from(1), Value::from(2)]);
        let outcome = coerce(&ctx, &ints, &HostType::array_of(HostType::int()));
        let CoercionOutcome::Converted { value: HostValue::Array(array), cost } = outcome else {
            panic!("expected array copy");
        };
        assert_eq!(cost, Cost::new(Level::Loose, rank::ARRAY_COPY));
        assert_eq!(array.len(), 2);

        let mixed = GuestArray::fixed(vec![Value::from(1), Value::from("x")]);
        assert!(probe(&ctx, &mixed, &HostType::array_of(HostType::int())).is_err());
    }

    #[test]
    fn test_member_object_as_map() {
        let ctx = ctx();
        let object = GuestObject::new().with("a", 1).into_value();
        let target = HostType::map_of(HostType::String, HostType::int());
        let outcome = coerce(&ctx, &object, &target);
        let CoercionOutcome::Converted { value: HostValue::Map(map), .. } = outcome else {
            panic!("expected map view");
        };
        assert_eq!(
            map.get(&HostValue::from("a")).unwrap().and_then(|v| v.as_int()),
            Some(1)
        );
        let numeric_keys = HostType::map_of(HostType::int(), HostType::int());
        assert!(!coerce(&ctx, &object, &numeric_keys).is_converted());
    }

    #[test]
    fn test_value_target_passes_through() {
        let ctx = ctx();
        let object = GuestObject::new().into_value();
        let CoercionOutcome::Converted { value: HostValue::Foreign(v), .. } =
            coerce(&ctx, &object, &HostType::Value)
        else {
            panic!("expected pass-through");
        };
        assert!(v.ptr_eq(&object));
    }
}
