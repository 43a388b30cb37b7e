//! Scalar guest values

use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;
use crate::value::{Number, NumberKind};

/// The guest null
#[derive(Debug, Clone, Copy)]
pub struct GuestNull;

impl Interop for GuestNull {
    fn display_string(&self) -> String {
        "null".to_string()
    }

    fn is_null(&self) -> bool {
        true
    }
}

/// A guest boolean
#[derive(Debug, Clone, Copy)]
pub struct GuestBoolean(pub bool);

impl Interop for GuestBoolean {
    fn display_string(&self) -> String {
        self.0.to_string()
    }

    fn meta_name(&self) -> Option<String> {
        Some("boolean".to_string())
    }

    fn is_boolean(&self) -> bool {
        true
    }

    fn as_boolean(&self) -> InteropResult<bool> {
        Ok(self.0)
    }
}

/// A guest string
#[derive(Debug, Clone)]
pub struct GuestString(String);

impl GuestString {
    /// Create from any string-like value
    pub fn new(s: impl Into<String>) -> Self {
        GuestString(s.into())
    }
}

impl Interop for GuestString {
    fn display_string(&self) -> String {
        self.0.clone()
    }

    fn meta_name(&self) -> Option<String> {
        Some("string".to_string())
    }

    fn is_string(&self) -> bool {
        true
    }

    fn as_string(&self) -> InteropResult<String> {
        Ok(self.0.clone())
    }
}

/// A guest number with its natural width
#[derive(Debug, Clone, Copy)]
pub struct GuestNumber(pub Number);

fn lossy(message: &str) -> InteropError {
    InteropError::unsupported(message)
}

impl Interop for GuestNumber {
    fn display_string(&self) -> String {
        self.0.to_string()
    }

    fn meta_name(&self) -> Option<String> {
        Some(
            match self.0.kind() {
                NumberKind::Byte => "byte",
                NumberKind::Short => "short",
                NumberKind::Int => "int",
                NumberKind::Long => "long",
                NumberKind::Float => "float",
                NumberKind::Double => "double",
            }
            .to_string(),
        )
    }

    fn is_number(&self) -> bool {
        true
    }

    fn number_kind(&self) -> Option<NumberKind> {
        Some(self.0.kind())
    }

    fn fits_in_byte(&self) -> bool {
        self.0.fits_in_byte()
    }

    fn fits_in_short(&self) -> bool {
        self.0.fits_in_short()
    }

    fn fits_in_int(&self) -> bool {
        self.0.fits_in_int()
    }

    fn fits_in_long(&self) -> bool {
        self.0.fits_in_long()
    }

    fn fits_in_float(&self) -> bool {
        self.0.fits_in_float()
    }

    fn fits_in_double(&self) -> bool {
        self.0.fits_in_double()
    }

    fn as_byte(&self) -> InteropResult<i8> {
        self.0.to_i8().ok_or_else(|| lossy("asByte"))
    }

    fn as_short(&self) -> InteropResult<i16> {
        self.0.to_i16().ok_or_else(|| lossy("asShort"))
    }

    fn as_int(&self) -> InteropResult<i32> {
        self.0.to_i32().ok_or_else(|| lossy("asInt"))
    }

    fn as_long(&self) -> InteropResult<i64> {
        self.0.to_i64().ok_or_else(|| lossy("asLong"))
    }

    fn as_float(&self) -> InteropResult<f32> {
        self.0.to_f32().ok_or_else(|| lossy("asFloat"))
    }

    fn as_double(&self) -> InteropResult<f64> {
        self.0.to_f64().ok_or_else(|| lossy("asDouble"))
    }
}
