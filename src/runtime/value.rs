//! WebAssembly value representation

use crate::parser::module::ValueType;
use fhex::ToHex;
use std::fmt;

/// Runtime representation of WebAssembly values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Zero value of a type, used for declared locals.
    pub fn default_for(value_type: ValueType) -> Value {
        match value_type {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    /// Get the WebAssembly type of this value
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse a value of the named type from text.
    ///
    /// Integers may be signed or unsigned decimal, or `0x` hex; both parse to
    /// the same bit pattern. Floats accept decimal notation plus `inf` and
    /// `nan`.
    pub fn from_strings(typ: &str, value: &str) -> Result<Self, String> {
        let value_type = ValueType::from_name(typ).ok_or_else(|| format!("unknown value type: {typ}"))?;
        let parsed = match value_type {
            ValueType::I32 => parse_int(value).and_then(|v| {
                if v >= i64::from(i32::MIN) && v <= i64::from(u32::MAX) {
                    Some(Value::I32(v as i32))
                } else {
                    None
                }
            }),
            ValueType::I64 => parse_int(value)
                .map(Value::I64)
                .or_else(|| value.parse::<u64>().ok().map(|v| Value::I64(v as i64))),
            ValueType::F32 => value.parse::<f32>().ok().map(Value::F32),
            ValueType::F64 => value.parse::<f64>().ok().map(Value::F64),
        };
        parsed.ok_or_else(|| format!("invalid {typ} value: {value}"))
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type() {
        assert_eq!(Value::I32(42).typ(), ValueType::I32);
        assert_eq!(Value::I64(42).typ(), ValueType::I64);
        assert_eq!(Value::F32(42.0).typ(), ValueType::F32);
        assert_eq!(Value::F64(42.0).typ(), ValueType::F64);
    }

    #[test]
    fn test_default_for() {
        assert_eq!(Value::default_for(ValueType::I64), Value::I64(0));
        assert_eq!(Value::default_for(ValueType::F32), Value::F32(0.0));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::I32(42).as_i32(), Some(42));
        assert_eq!(Value::I32(42).as_i64(), None);
        assert_eq!(Value::I64(42).as_i64(), Some(42));
        assert_eq!(Value::F64(42.0).as_f64(), Some(42.0));
    }

    #[test]
    fn test_from_strings() {
        assert_eq!(Value::from_strings("i32", "42").unwrap(), Value::I32(42));
        assert_eq!(Value::from_strings("i32", "-1").unwrap(), Value::I32(-1));
        assert_eq!(Value::from_strings("i32", "4294967295").unwrap(), Value::I32(-1));
        assert_eq!(Value::from_strings("i32", "0x10").unwrap(), Value::I32(16));
        assert_eq!(Value::from_strings("i64", "-5").unwrap(), Value::I64(-5));
        assert_eq!(
            Value::from_strings("i64", "18446744073709551615").unwrap(),
            Value::I64(-1)
        );
        assert_eq!(Value::from_strings("f64", "1.5").unwrap(), Value::F64(1.5));
        assert!(Value::from_strings("i32", "4294967296").is_err());
        assert!(Value::from_strings("v128", "0").is_err());
        assert!(Value::from_strings("f32", "abc").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::I32(42).to_string(), "i32:42");
        assert_eq!(Value::I64(-3).to_string(), "i64:-3");
        assert!(Value::F32(42.0).to_string().starts_with("f32:"));
        assert!(Value::F64(42.0).to_string().starts_with("f64:"));
    }
}
