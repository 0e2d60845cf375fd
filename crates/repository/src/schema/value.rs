//! Backend-neutral field values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A scalar value read from an entity field.
///
/// Filters compare against `FieldValue`s and sort rules order by them, so
/// every field that participates in a query is exposed through this type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Integer(i64),
    /// Unsigned integer above `i64::MAX`.
    ///
    /// Smaller unsigned values convert to [`FieldValue::Integer`].
    Unsigned(u64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// 128-bit identifier.
    Uuid(Uuid),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Returns the name of this value's kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Unsigned(_) => "unsigned",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Compares two values of compatible kinds.
    ///
    /// Numbers compare exactly with each other whatever their kind; NaN is
    /// incomparable. Values of unrelated kinds are incomparable and yield
    /// `None`.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Float(a), _) => other
                .as_integer()
                .and_then(|b| int_float_cmp(b, *a))
                .map(Ordering::reverse),
            (_, FieldValue::Float(b)) => self.as_integer().and_then(|a| int_float_cmp(a, *b)),
            _ => match (self.as_integer(), other.as_integer()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }

    fn as_integer(&self) -> Option<i128> {
        match self {
            FieldValue::Integer(n) => Some(i128::from(*n)),
            FieldValue::Unsigned(n) => Some(i128::from(*n)),
            _ => None,
        }
    }

    /// Total ordering used for sorting.
    ///
    /// Nulls sort first and NaN sorts after every other number. Incomparable
    /// kinds fall back to a fixed kind order.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) if other.kind_rank() == NUMERIC_RANK => return Ordering::Greater,
            (false, true) if self.kind_rank() == NUMERIC_RANK => return Ordering::Less,
            _ => {}
        }
        self.compare(other)
            .unwrap_or_else(|| self.kind_rank().cmp(&other.kind_rank()))
    }

    fn is_nan(&self) -> bool {
        matches!(self, FieldValue::Float(n) if n.is_nan())
    }

    fn kind_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Integer(_) | FieldValue::Unsigned(_) | FieldValue::Float(_) => {
                NUMERIC_RANK
            }
            FieldValue::Text(_) => 3,
            FieldValue::Uuid(_) => 4,
            FieldValue::Timestamp(_) => 5,
        }
    }
}

const NUMERIC_RANK: u8 = 2;

/// Compares an integer with a float without rounding the integer.
fn int_float_cmp(int: i128, float: f64) -> Option<Ordering> {
    // Both bounds are exact powers of two; every integer value lies in [LOWER, UPPER).
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 18_446_744_073_709_551_616.0;

    if float.is_nan() {
        return None;
    }
    if float >= UPPER {
        return Some(Ordering::Less);
    }
    if float < LOWER {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    // In range and integral, so the cast is exact.
    match int.cmp(&(whole as i128)) {
        Ordering::Equal => 0.0.partial_cmp(&(float - whole)),
        ordering => Some(ordering),
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Unsigned(n) => write!(f, "{}", n),
            FieldValue::Float(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{:?}", s),
            FieldValue::Uuid(id) => write!(f, "{}", id),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(FieldValue::Unsigned(n), FieldValue::Integer)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Float(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::Text(s.clone())
    }
}

impl From<Uuid> for FieldValue {
    fn from(id: Uuid) -> Self {
        FieldValue::Uuid(id)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
