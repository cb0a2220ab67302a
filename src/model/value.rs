//! Cell values and their declared types.
//!
//! Snapshot columns only carry integers of 32 or 64 bits and strings. Numeric
//! values of different widths compare and aggregate after widening, so a
//! caller never needs to know the concrete storage type of a column.

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Declared value type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// UTF-8 string.
    #[serde(alias = "string")]
    Str,
}

/// Width and signedness of an integer column.
///
/// Returned by the "what numeric width" probe used by aggregation and
/// formatting code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericWidth {
    /// Number of bits (32 or 64).
    pub bits: u8,
    /// Whether the integer is signed.
    pub signed: bool,
}

impl ValueType {
    /// Integer width of this type, `None` for strings.
    pub fn numeric_width(self) -> Option<NumericWidth> {
        match self {
            ValueType::I32 => Some(NumericWidth { bits: 32, signed: true }),
            ValueType::I64 => Some(NumericWidth { bits: 64, signed: true }),
            ValueType::U32 => Some(NumericWidth { bits: 32, signed: false }),
            ValueType::U64 => Some(NumericWidth { bits: 64, signed: false }),
            ValueType::Str => None,
        }
    }

    /// Whether values of this type are integers.
    pub fn is_numeric(self) -> bool {
        self.numeric_width().is_some()
    }
}

/// A single cell value.
///
/// `Empty` marks a cell without a value, such as a text column of a group
/// header row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// No value.
    #[default]
    Empty,
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Shared string.
    Str(Rc<str>),
}

impl Value {
    /// Build a string value.
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Widen an integer value to `i128`, the lossless common type.
    fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::I32(v) => Some(v as i128),
            Value::I64(v) => Some(v as i128),
            Value::U32(v) => Some(v as i128),
            Value::U64(v) => Some(v as i128),
            Value::Empty | Value::Str(_) => None,
        }
    }

    /// Widen an integer value to a signed 64-bit accumulator value.
    ///
    /// `u64` values above `i64::MAX` saturate. Strings and `Empty` yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128()
            .map(|v| v.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// String content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is the `Empty` value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Total order over values.
    ///
    /// `Empty` sorts first, then integers (compared after widening), then
    /// strings (compared ordinally).
    pub fn cmp_value(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Empty => 0,
                Value::Str(_) => 2,
                _ => 1,
            }
        }
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => match (self, other) {
                (Value::Str(a), Value::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
                _ => rank(self).cmp(&rank(other)),
            },
        }
    }
}

/// Lexicographic comparison of two value sequences with [`Value::cmp_value`].
pub fn cmp_value_slices(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.cmp_value(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_of_different_widths_compare_numerically() {
        assert_eq!(Value::I32(-1).cmp_value(&Value::U64(0)), Ordering::Less);
        assert_eq!(Value::U32(7).cmp_value(&Value::I64(7)), Ordering::Equal);
        assert_eq!(
            Value::U64(u64::MAX).cmp_value(&Value::I64(i64::MAX)),
            Ordering::Greater
        );
    }

    #[test]
    fn empty_sorts_before_numbers_and_numbers_before_strings() {
        assert_eq!(Value::Empty.cmp_value(&Value::I32(i32::MIN)), Ordering::Less);
        assert_eq!(Value::I64(99).cmp_value(&Value::str("0")), Ordering::Less);
    }

    #[test]
    fn strings_compare_ordinally() {
        assert_eq!(Value::str("B").cmp_value(&Value::str("a")), Ordering::Less);
    }

    #[test]
    fn as_i64_saturates_large_unsigned_values() {
        assert_eq!(Value::U64(u64::MAX).as_i64(), Some(i64::MAX));
        assert_eq!(Value::U32(5).as_i64(), Some(5));
        assert_eq!(Value::str("5").as_i64(), None);
    }

    #[test]
    fn numeric_width_probe() {
        assert_eq!(
            ValueType::U32.numeric_width(),
            Some(NumericWidth { bits: 32, signed: false })
        );
        assert_eq!(ValueType::Str.numeric_width(), None);
    }

    #[test]
    fn slices_compare_lexicographically() {
        let a = [Value::str("x"), Value::I32(1)];
        let b = [Value::str("x"), Value::I32(2)];
        assert_eq!(cmp_value_slices(&a, &b), Ordering::Less);
        assert_eq!(cmp_value_slices(&a, &a), Ordering::Equal);
    }
}
