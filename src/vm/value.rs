use std::rc::Rc;

use crate::vm::heap::ObjectRef;

/// Tagged script value.
///
/// `Object` is a strong edge for the collector; `WeakObject` is lookup-only and must be
/// validated against the heap before use.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    WeakObject(ObjectRef),
}

impl Value {
    pub const ZERO: Self = Value::Number(0.0);
    pub const NAN: Self = Value::Number(f64::NAN);

    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// Boolean result of a comparison, honoring the pre-version-5 numeric convention.
    pub fn legacy_bool(b: bool, swf_version: u8) -> Self {
        if swf_version < 5 {
            Value::Number(if b { 1.0 } else { 0.0 })
        } else {
            Value::Bool(b)
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Strong or weak object handle, if any. Weak handles still need heap validation.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(r) | Value::WeakObject(r) => Some(*r),
            _ => None,
        }
    }

    /// Only the strong edge, as seen by the collector.
    pub fn strong_ref(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// Downgrade a strong reference into a lookup-only one.
    pub fn downgrade(&self) -> Self {
        match self {
            Value::Object(r) => Value::WeakObject(*r),
            other => other.clone(),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(n.is_nan() || *n == 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::WeakObject(_) => true,
        }
    }

    /// ToNumber with the modern (version 5+) rules. Objects coerce to `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Object(_) | Value::WeakObject(_) => f64::NAN,
        }
    }

    /// ToNumber for pre-version-5 movies: only numbers and booleans survive, the rest are 0.
    pub fn legacy_to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) => {
                let n = parse_number(s);
                if n.is_nan() { 0.0 } else { n }
            }
            _ => 0.0,
        }
    }

    pub fn to_number_for(&self, swf_version: u8) -> f64 {
        if swf_version < 5 {
            self.legacy_to_number()
        } else {
            self.to_number()
        }
    }

    /// ToInt32 as used by the bitwise operators.
    pub fn to_i32(&self) -> i32 {
        to_int32(self.to_number())
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (a, b) => match (a.as_object(), b.as_object()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Abstract (loose) equality without invoking `valueOf`.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => {
                if self.as_object().is_some() || other.as_object().is_some() {
                    return false;
                }
                self.to_number() == other.to_number()
            }
            _ => self.strict_equals(other),
        }
    }
}

/// String -> number following the dialect: trimmed decimal, `0x` hex, empty is 0, else NaN.
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => {
            // Rust accepts "inf"/"nan" spellings the dialect does not.
            if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return f64::NAN;
            }
            t.parse::<f64>().unwrap_or(f64::NAN)
        }
    }
}

/// Number -> string: integral values print without a fraction, non-finite values by name.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let m = n.trunc().rem_euclid(4_294_967_296.0);
    (m as u32) as i32
}

#[cfg(test)]
#[path = "../../tests/unit/vm/value.rs"]
mod tests;
