//! Host type descriptors
//!
//! A [`HostType`] is the static type a host parameter, field, return value or
//! collection element is declared with. Coercion targets are always host
//! types; the resolver compares them to order overloads by specificity.

use std::fmt;
use std::sync::Arc;

use polyhost_sdk::NumberKind;

use super::class::HostClass;
use super::value::HostValue;

/// Primitive host kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `char`
    Char,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl PrimitiveKind {
    /// Source-level name of the primitive (`int`)
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Name of the boxed reference form (`Integer`)
    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::Char => "Character",
            PrimitiveKind::Int => "Integer",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Double => "Double",
        }
    }

    /// True for the six numeric kinds
    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Boolean | PrimitiveKind::Char)
    }

    /// Position on the widening chain `byte < short|char < int < long < float < double`
    fn chain_position(self) -> Option<u32> {
        match self {
            PrimitiveKind::Boolean => None,
            PrimitiveKind::Byte => Some(0),
            PrimitiveKind::Short | PrimitiveKind::Char => Some(1),
            PrimitiveKind::Int => Some(2),
            PrimitiveKind::Long => Some(3),
            PrimitiveKind::Float => Some(4),
            PrimitiveKind::Double => Some(5),
        }
    }

    /// Steps between two kinds on the widening chain. `char -> int` is one step.
    pub fn distance(self, to: PrimitiveKind) -> u32 {
        match (self.chain_position(), to.chain_position()) {
            (Some(a), Some(b)) => a.abs_diff(b),
            _ => 0,
        }
    }

    /// Widening primitive conversion: `self` converts implicitly to `to`
    pub fn widens_to(self, to: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            Boolean | Double => false,
        }
    }

    /// Widening that can never lose information. `int -> float` and
    /// `long -> float|double` widen but may round, so they are excluded.
    pub fn widens_losslessly_to(self, to: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        match (self, to) {
            (Int, Float) | (Long, Float) | (Long, Double) => false,
            _ => self.widens_to(to),
        }
    }

    /// Primitive kind matching a foreign number width
    pub fn from_number_kind(kind: NumberKind) -> PrimitiveKind {
        match kind {
            NumberKind::Byte => PrimitiveKind::Byte,
            NumberKind::Short => PrimitiveKind::Short,
            NumberKind::Int => PrimitiveKind::Int,
            NumberKind::Long => PrimitiveKind::Long,
            NumberKind::Float => PrimitiveKind::Float,
            NumberKind::Double => PrimitiveKind::Double,
        }
    }
}

/// Declared type of a host parameter, field, return value or element
#[derive(Clone, PartialEq)]
pub enum HostType {
    /// Unboxed primitive; never null
    Primitive(PrimitiveKind),
    /// Boxed primitive; nullable
    Boxed(PrimitiveKind),
    /// `String`
    String,
    /// The universal reference type
    Object,
    /// Pass-through foreign handle
    Value,
    /// `E[]`
    Array(Box<HostType>),
    /// `List<E>`
    List(Box<HostType>),
    /// `Set<E>`
    Set(Box<HostType>),
    /// `Map<K, V>`
    Map(Box<HostType>, Box<HostType>),
    /// `Map.Entry<K, V>`
    MapEntry(Box<HostType>, Box<HostType>),
    /// `Iterator<E>`
    Iterator(Box<HostType>),
    /// `Iterable<E>`
    Iterable(Box<HostType>),
    /// A host class or interface
    Class(Arc<HostClass>),
}

impl HostType {
    /// `int`
    pub fn int() -> HostType {
        HostType::Primitive(PrimitiveKind::Int)
    }

    /// `long`
    pub fn long() -> HostType {
        HostType::Primitive(PrimitiveKind::Long)
    }

    /// `double`
    pub fn double() -> HostType {
        HostType::Primitive(PrimitiveKind::Double)
    }

    /// `boolean`
    pub fn boolean() -> HostType {
        HostType::Primitive(PrimitiveKind::Boolean)
    }

    /// `E[]`
    pub fn array_of(element: HostType) -> HostType {
        HostType::Array(Box::new(element))
    }

    /// `List<E>`
    pub fn list_of(element: HostType) -> HostType {
        HostType::List(Box::new(element))
    }

    /// `Set<E>`
    pub fn set_of(element: HostType) -> HostType {
        HostType::Set(Box::new(element))
    }

    /// `Map<K, V>`
    pub fn map_of(key: HostType, value: HostType) -> HostType {
        HostType::Map(Box::new(key), Box::new(value))
    }

    /// `Map.Entry<K, V>`
    pub fn entry_of(key: HostType, value: HostType) -> HostType {
        HostType::MapEntry(Box::new(key), Box::new(value))
    }

    /// `Iterator<E>`
    pub fn iterator_of(element: HostType) -> HostType {
        HostType::Iterator(Box::new(element))
    }

    /// `Iterable<E>`
    pub fn iterable_of(element: HostType) -> HostType {
        HostType::Iterable(Box::new(element))
    }

    /// Instances of `class`
    pub fn class(class: &Arc<HostClass>) -> HostType {
        HostType::Class(class.clone())
    }

    /// Printable type name (`int[]`, `List<Integer>`)
    pub fn name(&self) -> String {
        match self {
            HostType::Primitive(k) => k.name().to_string(),
            HostType::Boxed(k) => k.boxed_name().to_string(),
            HostType::String => "String".to_string(),
            HostType::Object => "Object".to_string(),
            HostType::Value => "Value".to_string(),
            HostType::Array(e) => format!("{}[]", e.name()),
            HostType::List(e) => format!("List<{}>", e.name()),
            HostType::Set(e) => format!("Set<{}>", e.name()),
            HostType::Map(k, v) => format!("Map<{}, {}>", k.name(), v.name()),
            HostType::MapEntry(k, v) => format!("Map.Entry<{}, {}>", k.name(), v.name()),
            HostType::Iterator(e) => format!("Iterator<{}>", e.name()),
            HostType::Iterable(e) => format!("Iterable<{}>", e.name()),
            HostType::Class(c) => c.name().to_string(),
        }
    }

    /// True for the eight primitive types
    pub fn is_primitive(&self) -> bool {
        matches!(self, HostType::Primitive(_))
    }

    /// Primitive kind of a primitive or boxed type
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            HostType::Primitive(k) | HostType::Boxed(k) => Some(*k),
            _ => None,
        }
    }

    /// Element type of an array type
    pub fn component(&self) -> Option<&HostType> {
        match self {
            HostType::Array(e) => Some(e),
            _ => None,
        }
    }

    /// Zero value used for uninitialized fields
    pub fn default_value(&self) -> HostValue {
        match self {
            HostType::Primitive(k) => match k {
                PrimitiveKind::Boolean => HostValue::Boolean(false),
                PrimitiveKind::Byte => HostValue::Byte(0),
                PrimitiveKind::Short => HostValue::Short(0),
                PrimitiveKind::Char => HostValue::Char(0),
                PrimitiveKind::Int => HostValue::Int(0),
                PrimitiveKind::Long => HostValue::Long(0),
                PrimitiveKind::Float => HostValue::Float(0.0),
                PrimitiveKind::Double => HostValue::Double(0.0),
            },
            _ => HostValue::Null,
        }
    }

    /// Static assignability: a value declared as `from` may be passed where
    /// `self` is expected. Primitives are assignable to their boxed form and
    /// along the widening chain; `char` is assignable to `String`.
    pub fn is_assignable_from(&self, from: &HostType) -> bool {
        if self == from {
            return true;
        }
        match (self, from) {
            (HostType::Object, _) => true,
            (HostType::Primitive(to), HostType::Primitive(f) | HostType::Boxed(f)) => {
                f.widens_to(*to)
            }
            (HostType::Boxed(to), HostType::Primitive(f)) => to == f || f.widens_to(*to),
            (HostType::Boxed(to), HostType::Boxed(f)) => f.widens_to(*to),
            (HostType::String, HostType::Primitive(PrimitiveKind::Char)) => true,
            (HostType::String, HostType::Boxed(PrimitiveKind::Char)) => true,
            (HostType::Array(to), HostType::Array(f)) => {
                !to.is_primitive() && !f.is_primitive() && to.is_assignable_from(f)
            }
            (HostType::Iterable(_), HostType::List(_) | HostType::Set(_) | HostType::Iterable(_)) => {
                true
            }
            (HostType::List(_), HostType::List(_))
            | (HostType::Set(_), HostType::Set(_))
            | (HostType::Map(..), HostType::Map(..))
            | (HostType::MapEntry(..), HostType::MapEntry(..))
            | (HostType::Iterator(_), HostType::Iterator(_)) => true,
            (HostType::Class(to), HostType::Class(f)) => f.is_subtype_of(to),
            _ => false,
        }
    }

    /// Runtime check: `value` already is an instance of this type, so it
    /// can be passed without conversion. Null is never accepted here.
    pub fn accepts(&self, value: &HostValue) -> bool {
        match (self, value) {
            (_, HostValue::Null) => false,
            (HostType::Object, _) => true,
            (HostType::Boxed(k), v) => v.primitive_kind() == Some(*k),
            (HostType::String, HostValue::String(_)) => true,
            (HostType::Array(expected), HostValue::Array(array)) => {
                let actual = array.element_type();
                actual == **expected
                    || (!expected.is_primitive()
                        && !actual.is_primitive()
                        && expected.is_assignable_from(&actual))
            }
            (HostType::List(_), HostValue::List(_))
            | (HostType::Set(_), HostValue::Set(_))
            | (HostType::Map(..), HostValue::Map(_))
            | (HostType::MapEntry(..), HostValue::MapEntry(_))
            | (HostType::Iterator(_), HostValue::Iterator(_)) => true,
            (
                HostType::Iterable(_),
                HostValue::List(_) | HostValue::Set(_) | HostValue::Iterable(_),
            ) => true,
            (HostType::Class(class), v) => v
                .runtime_class()
                .is_some_and(|runtime| runtime.is_subtype_of(class)),
            _ => false,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening_chain() {
        use PrimitiveKind::*;
        assert!(Byte.widens_to(Double));
        assert!(Char.widens_to(Int));
        assert!(!Char.widens_to(Short));
        assert!(!Short.widens_to(Char));
        assert!(!Double.widens_to(Float));
        assert!(Int.widens_to(Float));
        assert!(!Int.widens_losslessly_to(Float));
        assert!(Int.widens_losslessly_to(Double));
        assert!(!Long.widens_losslessly_to(Double));
        assert_eq!(Char.distance(Int), 1);
        assert_eq!(Byte.distance(Long), 3);
        assert_eq!(Long.distance(Int), 1);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(HostType::array_of(HostType::int()).name(), "int[]");
        assert_eq!(
            HostType::map_of(HostType::String, HostType::Boxed(PrimitiveKind::Int)).name(),
            "Map<String, Integer>"
        );
        assert_eq!(HostType::Boxed(PrimitiveKind::Char).name(), "Character");
    }

    #[test]
    fn test_assignability() {
        let int = HostType::int();
        let integer = HostType::Boxed(PrimitiveKind::Int);
        assert!(integer.is_assignable_from(&int));
        assert!(!int.is_assignable_from(&integer));
        assert!(!int.is_assignable_from(&HostType::Object));
        assert!(HostType::Object.is_assignable_from(&integer));
        assert!(HostType::long().is_assignable_from(&int));
        assert!(!int.is_assignable_from(&HostType::long()));
        assert!(HostType::String.is_assignable_from(&HostType::Primitive(PrimitiveKind::Char)));
        assert!(HostType::iterable_of(HostType::Object)
            .is_assignable_from(&HostType::list_of(HostType::Object)));
        assert!(!HostType::list_of(HostType::Object)
            .is_assignable_from(&HostType::iterable_of(HostType::Object)));
    }

    #[test]
    fn test_accepts_runtime_values() {
        assert!(HostType::Object.accepts(&HostValue::Int(1)));
        assert!(HostType::Boxed(PrimitiveKind::Int).accepts(&HostValue::Int(1)));
        assert!(!HostType::Boxed(PrimitiveKind::Long).accepts(&HostValue::Int(1)));
        assert!(!HostType::int().accepts(&HostValue::Int(1)));
        assert!(!HostType::Object.accepts(&HostValue::Null));
        assert!(HostType::String.accepts(&HostValue::from("x")));
    }
}
