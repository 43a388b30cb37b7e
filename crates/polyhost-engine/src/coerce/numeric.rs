//! Numeric conversions
//!
//! A foreign number converts to a primitive kind when
//!
//! - the kinds match (exact),
//! - the source kind widens to the target without possible loss, or
//! - the value itself fits the target (`2147483647` as `long` -> `int`).
//!
//! Anything else is lossy and rejected. Ranks grow with the distance on the
//! widening chain so that the closest kind wins overload resolution.

use polyhost_sdk::Value;

use crate::host::{HostValue, PrimitiveKind};

use super::{rank, Cost, Level};

/// Whether the value fits `kind` exactly
pub fn fits(value: &Value, kind: PrimitiveKind) -> bool {
    match kind {
        PrimitiveKind::Byte => value.fits_in_byte(),
        PrimitiveKind::Short => value.fits_in_short(),
        PrimitiveKind::Int => value.fits_in_int(),
        PrimitiveKind::Long => value.fits_in_long(),
        PrimitiveKind::Float => value.fits_in_float(),
        PrimitiveKind::Double => value.fits_in_double(),
        PrimitiveKind::Boolean | PrimitiveKind::Char => false,
    }
}

/// Read the value as `kind`
pub fn read_as(value: &Value, kind: PrimitiveKind) -> Option<HostValue> {
    match kind {
        PrimitiveKind::Byte => value.as_byte().ok().map(HostValue::Byte),
        PrimitiveKind::Short => value.as_short().ok().map(HostValue::Short),
        PrimitiveKind::Int => value.as_int().ok().map(HostValue::Int),
        PrimitiveKind::Long => value.as_long().ok().map(HostValue::Long),
        PrimitiveKind::Float => value.as_float().ok().map(HostValue::Float),
        PrimitiveKind::Double => value.as_double().ok().map(HostValue::Double),
        PrimitiveKind::Boolean | PrimitiveKind::Char => None,
    }
}

/// Cost of converting a foreign number to `kind`, `None` when lossy
pub fn number_cost(value: &Value, kind: PrimitiveKind) -> Option<Cost> {
    let source = PrimitiveKind::from_number_kind(value.number_kind()?);
    let distance = source.distance(kind);
    if source == kind {
        Some(Cost::new(Level::Strict, rank::EXACT))
    } else if source.widens_losslessly_to(kind) {
        Some(Cost::new(Level::Strict, rank::WIDENING + distance))
    } else if fits(value, kind) {
        Some(Cost::new(Level::Strict, rank::NARROWING + distance))
    } else {
        None
    }
}

/// Natural boxed form of a foreign number
pub fn natural(value: &Value) -> Option<HostValue> {
    let kind = PrimitiveKind::from_number_kind(value.number_kind()?);
    read_as(value, kind)
}
