//! String coercion: number and boolean formatting, strict literal parsing
//!
//! Floating point values print the way the host platform prints them:
//! plain notation for magnitudes in `[1e-3, 1e7)` with at least one
//! fractional digit, computerized scientific notation (`1.0E7`) otherwise.
//! Parsing is strict: no surrounding whitespace, no radix prefixes, no type
//! suffixes.

use polyhost_sdk::{NumberKind, Value};

use crate::host::{HostValue, PrimitiveKind};

/// Format a double
pub fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let magnitude = v.abs();
    if (1e-3..1e7).contains(&magnitude) {
        plain(format!("{}", v))
    } else {
        scientific(format!("{:e}", v))
    }
}

/// Format a float
pub fn format_float(v: f32) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let magnitude = v.abs();
    if (1e-3..1e7).contains(&magnitude) {
        plain(format!("{}", v))
    } else {
        scientific(format!("{:e}", v))
    }
}

fn plain(digits: String) -> String {
    if digits.contains('.') {
        digits
    } else {
        digits + ".0"
    }
}

fn scientific(repr: String) -> String {
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let mantissa = if mantissa.contains('.') {
                mantissa.to_string()
            } else {
                format!("{}.0", mantissa)
            };
            format!("{}E{}", mantissa, exponent)
        }
        None => repr,
    }
}

/// Text of a foreign number or boolean, formatted by its natural width
pub fn format_scalar(value: &Value) -> Option<String> {
    if value.is_boolean() {
        return value.as_boolean().ok().map(|b| b.to_string());
    }
    let text = match value.number_kind()? {
        NumberKind::Byte | NumberKind::Short | NumberKind::Int | NumberKind::Long => {
            value.as_long().ok()?.to_string()
        }
        NumberKind::Float => format_float(value.as_float().ok()?),
        NumberKind::Double => format_double(value.as_double().ok()?),
    };
    Some(text)
}

/// Parse a string literal as a host primitive of `kind`
pub fn parse_primitive(text: &str, kind: PrimitiveKind) -> Option<HostValue> {
    match kind {
        PrimitiveKind::Boolean => match text {
            "true" => Some(HostValue::Boolean(true)),
            "false" => Some(HostValue::Boolean(false)),
            _ => None,
        },
        PrimitiveKind::Char => {
            let mut units = text.encode_utf16();
            match (units.next(), units.next()) {
                (Some(unit), None) => Some(HostValue::Char(unit)),
                _ => None,
            }
        }
        PrimitiveKind::Byte => text.parse().ok().map(HostValue::Byte),
        PrimitiveKind::Short => text.parse().ok().map(HostValue::Short),
        PrimitiveKind::Int => text.parse().ok().map(HostValue::Int),
        PrimitiveKind::Long => text.parse().ok().map(HostValue::Long),
        PrimitiveKind::Float => parse_floating(text).and_then(narrow_to_float).map(HostValue::Float),
        PrimitiveKind::Double => parse_floating(text).map(HostValue::Double),
    }
}

fn parse_floating(text: &str) -> Option<f64> {
    match text {
        "NaN" => return Some(f64::NAN),
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let allowed = |b: u8| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E');
    if text.is_empty() || !text.bytes().all(allowed) || !text.bytes().any(|b| b.is_ascii_digit())
    {
        return None;
    }
    let v: f64 = text.parse().ok()?;
    if v.is_infinite() || (v == 0.0 && has_nonzero_mantissa(text)) {
        return None;
    }
    Some(v)
}

/// Out-of-range literals are rejected; only the named literals map to
/// infinities and NaN.
fn narrow_to_float(v: f64) -> Option<f32> {
    if !v.is_finite() {
        return Some(v as f32);
    }
    let narrowed = v as f32;
    if narrowed.is_infinite() || (narrowed == 0.0 && v != 0.0) {
        None
    } else {
        Some(narrowed)
    }
}

fn has_nonzero_mantissa(text: &str) -> bool {
    let mantissa = text.split(['e', 'E']).next().unwrap_or(text);
    mantissa.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(-2.25), "-2.25");
        assert_eq!(format_double(1234567.0), "1234567.0");
        assert_eq!(format_double(1e7), "1.0E7");
        assert_eq!(format_double(1.5e-4), "1.5E-4");
        assert_eq!(format_double(0.001), "0.001");
        assert_eq!(format_double(-0.0), "-0.0");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(3e10), "3.0E10");
    }

    #[test]
    fn test_format_scalar() {
        assert_eq!(format_scalar(&Value::from(42)).as_deref(), Some("42"));
        assert_eq!(format_scalar(&Value::from(2.0)).as_deref(), Some("2.0"));
        assert_eq!(format_scalar(&Value::from(true)).as_deref(), Some("true"));
        assert_eq!(format_scalar(&Value::from("x")), None);
    }

    #[test]
    fn test_parse_primitive() {
        assert_eq!(parse_primitive("42", PrimitiveKind::Int).and_then(|v| v.as_int()), Some(42));
        assert!(parse_primitive("+7", PrimitiveKind::Long).is_some());
        assert!(parse_primitive(" 42", PrimitiveKind::Int).is_none());
        assert!(parse_primitive("4.2", PrimitiveKind::Int).is_none());
        assert!(parse_primitive("128", PrimitiveKind::Byte).is_none());
        assert!(parse_primitive("0x10", PrimitiveKind::Int).is_none());
        assert_eq!(
            parse_primitive("1.5e3", PrimitiveKind::Double).and_then(|v| v.as_double()),
            Some(1500.0)
        );
        assert!(parse_primitive("inf", PrimitiveKind::Double).is_none());
        assert!(parse_primitive("1.0d", PrimitiveKind::Double).is_none());
        assert!(parse_primitive("TRUE", PrimitiveKind::Boolean).is_none());
        assert!(parse_primitive("true", PrimitiveKind::Boolean).is_some());
        assert!(parse_primitive("ab", PrimitiveKind::Char).is_none());
    }

    #[test]
    fn test_out_of_range_floating_literals_are_rejected() {
        assert!(parse_primitive("1e400", PrimitiveKind::Double).is_none());
        assert!(parse_primitive("-1e400", PrimitiveKind::Double).is_none());
        assert!(parse_primitive("1e-400", PrimitiveKind::Double).is_none());
        assert!(parse_primitive("1e39", PrimitiveKind::Float).is_none());
        assert!(parse_primitive("1e-50", PrimitiveKind::Float).is_none());
        assert!(parse_primitive("0e-50", PrimitiveKind::Float).is_some());
        assert_eq!(
            parse_primitive("1e38", PrimitiveKind::Float).and_then(|v| v.as_float()),
            Some(1e38)
        );
        assert_eq!(
            parse_primitive("Infinity", PrimitiveKind::Float).and_then(|v| v.as_float()),
            Some(f32::INFINITY)
        );
        assert_eq!(
            parse_primitive("-Infinity", PrimitiveKind::Double).and_then(|v| v.as_double()),
            Some(f64::NEG_INFINITY)
        );
    }
}
