//! Value: the tagged slot every stack entry, local and plug argument is made of.
//!
//! The kind is the enum discriminant, so an integer payload can never be read
//! as a float or the other way around. Operators are defined only between
//! values of the same kind; the one conversion is [`Value::to_float`].
use std::cmp::Ordering;
use std::fmt;

use crate::{InterpreterError, StringHandle};

/// Discriminator of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Byte,
    Int16,
    Int32,
    Int64,
    Float,
    NativeInt,
    Address,
    TransientPointer,
    Object,
    String,
}

impl ValueKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::NativeInt => "native int",
            Self::Address => "address",
            Self::TransientPointer => "transient pointer",
            Self::Object => "object",
            Self::String => "string",
        }
    }

    /// Kinds that support `add`, `div` and `rem`.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float | Self::NativeInt
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-size tagged value.
///
/// `Address` holds a local index produced by `ldloca.s`, not a memory
/// pointer. `Object` and `String` hold table handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f64),
    NativeInt(i64),
    Address(usize),
    TransientPointer(usize),
    Object(usize),
    String(StringHandle),
}

impl Default for Value {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Byte(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Self::Int16(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<StringHandle> for Value {
    fn from(value: StringHandle) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Int32(i32::from(value))
    }
}

macro_rules! integer_div {
    ($variant:ident, $a:expr, $b:expr, $method:ident) => {{
        if $b == 0 {
            return Err(InterpreterError::DivideByZero);
        }
        Ok(Self::$variant($a.$method($b)))
    }};
}

impl Value {
    /// Initial value of every local slot.
    pub const ZERO: Self = Self::Int32(0);

    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Byte(_) => ValueKind::Byte,
            Self::Int16(_) => ValueKind::Int16,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float(_) => ValueKind::Float,
            Self::NativeInt(_) => ValueKind::NativeInt,
            Self::Address(_) => ValueKind::Address,
            Self::TransientPointer(_) => ValueKind::TransientPointer,
            Self::Object(_) => ValueKind::Object,
            Self::String(_) => ValueKind::String,
        }
    }

    /// The 64-bit integer payload, `None` for `Float`.
    pub fn integer_payload(&self) -> Option<i64> {
        let payload = match *self {
            Self::Byte(v) => i64::from(v),
            Self::Int16(v) => i64::from(v),
            Self::Int32(v) => i64::from(v),
            Self::Int64(v) | Self::NativeInt(v) => v,
            Self::Address(v) | Self::TransientPointer(v) | Self::Object(v) => v as i64,
            Self::String(handle) => handle.index() as i64,
            Self::Float(_) => return None,
        };
        Some(payload)
    }

    /// The float payload, `None` for every integer kind.
    pub fn float_payload(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int32(&self) -> Option<i32> {
        match *self {
            Self::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<StringHandle> {
        match *self {
            Self::String(handle) => Some(handle),
            _ => None,
        }
    }

    /// Same-kind addition. Integers wrap at their own width.
    pub fn add(self, rhs: Self) -> Result<Self, InterpreterError> {
        match (self, rhs) {
            (Self::Byte(a), Self::Byte(b)) => Ok(Self::Byte(a.wrapping_add(b))),
            (Self::Int16(a), Self::Int16(b)) => Ok(Self::Int16(a.wrapping_add(b))),
            (Self::Int32(a), Self::Int32(b)) => Ok(Self::Int32(a.wrapping_add(b))),
            (Self::Int64(a), Self::Int64(b)) => Ok(Self::Int64(a.wrapping_add(b))),
            (Self::NativeInt(a), Self::NativeInt(b)) => Ok(Self::NativeInt(a.wrapping_add(b))),
            (Self::Float(a), Self::Float(b)) => Ok(Self::Float(a + b)),
            (a, b) => Err(Self::arithmetic_error("add", a, b)),
        }
    }

    /// Same-kind division. Integer division truncates toward zero and fails
    /// on a zero divisor; float division follows IEEE-754.
    pub fn div(self, rhs: Self) -> Result<Self, InterpreterError> {
        match (self, rhs) {
            (Self::Byte(a), Self::Byte(b)) => integer_div!(Byte, a, b, wrapping_div),
            (Self::Int16(a), Self::Int16(b)) => integer_div!(Int16, a, b, wrapping_div),
            (Self::Int32(a), Self::Int32(b)) => integer_div!(Int32, a, b, wrapping_div),
            (Self::Int64(a), Self::Int64(b)) => integer_div!(Int64, a, b, wrapping_div),
            (Self::NativeInt(a), Self::NativeInt(b)) => integer_div!(NativeInt, a, b, wrapping_div),
            (Self::Float(a), Self::Float(b)) => Ok(Self::Float(a / b)),
            (a, b) => Err(Self::arithmetic_error("div", a, b)),
        }
    }

    /// Same-kind remainder, with the sign of the dividend.
    pub fn rem(self, rhs: Self) -> Result<Self, InterpreterError> {
        match (self, rhs) {
            (Self::Byte(a), Self::Byte(b)) => integer_div!(Byte, a, b, wrapping_rem),
            (Self::Int16(a), Self::Int16(b)) => integer_div!(Int16, a, b, wrapping_rem),
            (Self::Int32(a), Self::Int32(b)) => integer_div!(Int32, a, b, wrapping_rem),
            (Self::Int64(a), Self::Int64(b)) => integer_div!(Int64, a, b, wrapping_rem),
            (Self::NativeInt(a), Self::NativeInt(b)) => integer_div!(NativeInt, a, b, wrapping_rem),
            (Self::Float(a), Self::Float(b)) => Ok(Self::Float(a % b)),
            (a, b) => Err(Self::arithmetic_error("rem", a, b)),
        }
    }

    /// Order two values of the same kind.
    ///
    /// `Ok(None)` means unordered (a NaN operand): every comparison
    /// instruction then yields 0.
    pub fn compare(
        self,
        rhs: Self,
        op: &'static str,
    ) -> Result<Option<Ordering>, InterpreterError> {
        if self.kind() != rhs.kind() {
            return Err(InterpreterError::TypeMismatch {
                op,
                left: self.kind(),
                right: rhs.kind(),
            });
        }
        let ordering = match (self, rhs) {
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
            (a, b) => a.integer_payload().cmp(&b.integer_payload()).into(),
        };
        Ok(ordering)
    }

    /// `conv.r8`: floats pass through, everything else becomes a float of the
    /// same magnitude as its integer payload.
    pub fn to_float(self) -> Self {
        match self {
            Self::Float(_) => self,
            other => Self::Float(other.integer_payload().unwrap_or_default() as f64),
        }
    }

    fn arithmetic_error(op: &'static str, a: Self, b: Self) -> InterpreterError {
        if a.kind() != b.kind() {
            InterpreterError::TypeMismatch {
                op,
                left: a.kind(),
                right: b.kind(),
            }
        } else {
            debug_assert!(!a.kind().is_numeric());
            InterpreterError::InvalidOperand { op, kind: a.kind() }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}u8"),
            Self::Int16(v) => write!(f, "{v}i16"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}i64"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::NativeInt(v) => write!(f, "{v}n"),
            Self::Address(v) => write!(f, "&local{v}"),
            Self::TransientPointer(v) => write!(f, "*0x{v:x}"),
            Self::Object(v) => write!(f, "object#{v}"),
            Self::String(handle) => write!(f, "string#{}", handle.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_matches_kind() {
        assert_eq!(Value::from(1u8).kind(), ValueKind::Byte);
        assert_eq!(Value::from(1i16).kind(), ValueKind::Int16);
        assert_eq!(Value::from(1i32).kind(), ValueKind::Int32);
        assert_eq!(Value::from(1i64).kind(), ValueKind::Int64);
        assert_eq!(Value::from(1.0).kind(), ValueKind::Float);
        assert_eq!(Value::from(true), Value::Int32(1));
        assert_eq!(Value::default(), Value::Int32(0));
    }

    #[test]
    fn payloads_are_exclusive() {
        assert_eq!(Value::Float(2.5).integer_payload(), None);
        assert_eq!(Value::Float(2.5).float_payload(), Some(2.5));
        assert_eq!(Value::Int64(-4).integer_payload(), Some(-4));
        assert_eq!(Value::Int64(-4).float_payload(), None);
        assert_eq!(Value::Address(3).integer_payload(), Some(3));
    }

    #[test]
    fn add_wraps_at_kind_width() {
        assert_eq!(Value::Int32(3).add(Value::Int32(4)), Ok(Value::Int32(7)));
        assert_eq!(Value::Byte(250).add(Value::Byte(10)), Ok(Value::Byte(4)));
        assert_eq!(Value::Int32(i32::MAX).add(Value::Int32(1)), Ok(Value::Int32(i32::MIN)));
        assert_eq!(Value::Float(0.5).add(Value::Float(0.25)), Ok(Value::Float(0.75)));
    }

    #[test]
    fn mixed_kinds_never_coerce() {
        let pairs = [
            (Value::Int32(1), Value::Int64(1)),
            (Value::Int32(1), Value::Float(1.0)),
            (Value::Byte(1), Value::Int16(1)),
            (Value::Int64(1), Value::NativeInt(1)),
        ];
        for (a, b) in pairs {
            for result in [a.add(b), a.div(b), a.rem(b)] {
                let Err(InterpreterError::TypeMismatch { left, right, .. }) = result else {
                    panic!("expected a type mismatch, got {result:?}");
                };
                assert_eq!((left, right), (a.kind(), b.kind()));
            }
            assert!(matches!(a.compare(b, "ceq"), Err(InterpreterError::TypeMismatch { .. })));
        }
    }

    #[test]
    fn handles_are_not_numbers() {
        assert_eq!(
            Value::Address(1).add(Value::Address(2)),
            Err(InterpreterError::InvalidOperand {
                op: "add",
                kind: ValueKind::Address
            })
        );
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(Value::Int32(7).div(Value::Int32(2)), Ok(Value::Int32(3)));
        assert_eq!(Value::Int32(-7).div(Value::Int32(2)), Ok(Value::Int32(-3)));
        assert_eq!(Value::Int32(-7).rem(Value::Int32(2)), Ok(Value::Int32(-1)));
        assert_eq!(Value::Int32(i32::MIN).div(Value::Int32(-1)), Ok(Value::Int32(i32::MIN)));
        assert_eq!(Value::Int32(i32::MIN).rem(Value::Int32(-1)), Ok(Value::Int32(0)));
    }

    #[test]
    fn integer_division_by_zero_is_checked_for_every_kind() {
        let zeros = [
            (Value::Byte(1), Value::Byte(0)),
            (Value::Int16(1), Value::Int16(0)),
            (Value::Int32(1), Value::Int32(0)),
            (Value::Int64(1), Value::Int64(0)),
            (Value::NativeInt(1), Value::NativeInt(0)),
        ];
        for (a, b) in zeros {
            assert_eq!(a.div(b), Err(InterpreterError::DivideByZero));
            assert_eq!(a.rem(b), Err(InterpreterError::DivideByZero));
        }
    }

    #[test]
    fn float_division_by_zero_is_ieee() {
        assert_eq!(Value::Float(1.0).div(Value::Float(0.0)), Ok(Value::Float(f64::INFINITY)));
    }

    #[test]
    fn comparisons() {
        assert_eq!(Value::Int32(1).compare(Value::Int32(2), "clt"), Ok(Some(Ordering::Less)));
        assert_eq!(
            Value::Float(2.0).compare(Value::Float(1.5), "cgt"),
            Ok(Some(Ordering::Greater))
        );
        assert_eq!(Value::Float(f64::NAN).compare(Value::Float(1.0), "ceq"), Ok(None));
    }

    #[test]
    fn conversion_to_float() {
        assert_eq!(Value::Int32(-3).to_float(), Value::Float(-3.0));
        assert_eq!(Value::Byte(200).to_float(), Value::Float(200.0));
        assert_eq!(Value::Float(1.5).to_float(), Value::Float(1.5));
    }
}
