//! Parameter-type specificity
//!
//! Among overloads with equal cost, the one whose parameter types are all
//! at least as specific, and one strictly more specific, wins. A primitive
//! is more specific than its boxed form, which is more specific than
//! `Object`; a narrower primitive beats a wider one; a subclass beats its
//! superclass.

use std::cmp::Ordering;

use crate::host::HostType;

/// Compare two parameter types. `Less` means `a` is more specific.
/// `None` when neither is assignable to the other.
pub fn compare(a: &HostType, b: &HostType) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }
    match (b.is_assignable_from(a), a.is_assignable_from(b)) {
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Whether the parameter list `a` dominates `b`: no position less specific
/// and at least one position strictly more specific
pub fn dominates(a: &[HostType], b: &[HostType]) -> bool {
    let mut strictly = false;
    for (x, y) in a.iter().zip(b) {
        match compare(x, y) {
            Some(Ordering::Less) => strictly = true,
            Some(Ordering::Equal) => {}
            _ => return false,
        }
    }
    strictly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostClass, PrimitiveKind};

    #[test]
    fn test_primitive_boxed_object_chain() {
        let int = HostType::int();
        let integer = HostType::Boxed(PrimitiveKind::Int);
        assert_eq!(compare(&int, &integer), Some(Ordering::Less));
        assert_eq!(compare(&integer, &HostType::Object), Some(Ordering::Less));
        assert_eq!(compare(&HostType::Object, &int), Some(Ordering::Greater));
    }

    #[test]
    fn test_widening_specificity() {
        assert_eq!(compare(&HostType::int(), &HostType::long()), Some(Ordering::Less));
        assert_eq!(compare(&HostType::String, &HostType::int()), None);
    }

    #[test]
    fn test_subclass_is_more_specific() {
        let base = HostClass::builder("Base").build();
        let derived = HostClass::builder("Derived").extends(&base).build();
        assert_eq!(
            compare(&HostType::class(&derived), &HostType::class(&base)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_dominance() {
        let a = [HostType::int(), HostType::long()];
        let b = [HostType::long(), HostType::int()];
        assert!(!dominates(&a, &b));
        assert!(!dominates(&b, &a));
        let c = [HostType::int(), HostType::int()];
        assert!(dominates(&c, &a));
        assert!(!dominates(&c, &c));
    }
}
