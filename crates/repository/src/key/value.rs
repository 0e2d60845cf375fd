//! Native key types and loosely-typed key input.

use std::fmt;
use std::hash::Hash;

use uuid::Uuid;

use crate::error::KeyError;
use crate::schema::FieldValue;

/// A key as supplied by an external caller, before coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    /// Textual key, e.g. from a URL segment.
    Text(String),
    /// 128-bit identifier.
    Uuid(Uuid),
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer.
    Unsigned(u64),
}

impl KeyValue {
    /// Returns the name of this key's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            KeyValue::Text(_) => "text",
            KeyValue::Uuid(_) => "uuid",
            KeyValue::Integer(_) => "integer",
            KeyValue::Unsigned(_) => "unsigned",
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Text(s) => write!(f, "{}", s),
            KeyValue::Uuid(id) => write!(f, "{}", id),
            KeyValue::Integer(n) => write!(f, "{}", n),
            KeyValue::Unsigned(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::Text(s)
    }
}

impl From<Uuid> for KeyValue {
    fn from(id: Uuid) -> Self {
        KeyValue::Uuid(id)
    }
}

impl From<i32> for KeyValue {
    fn from(n: i32) -> Self {
        KeyValue::Integer(i64::from(n))
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        KeyValue::Integer(n)
    }
}

impl From<u32> for KeyValue {
    fn from(n: u32) -> Self {
        KeyValue::Unsigned(u64::from(n))
    }
}

impl From<u64> for KeyValue {
    fn from(n: u64) -> Self {
        KeyValue::Unsigned(n)
    }
}

/// A type usable as an entity's identity.
///
/// Keys are ordered so the in-memory engine can keep its entries in key
/// order. Generation hooks return `None` when the key type cannot be produced
/// by that strategy.
pub trait EntityKey:
    Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Name of the key type, used in errors.
    fn key_type() -> &'static str;

    /// Converts the key to a field value for filtering and sorting.
    fn to_field_value(&self) -> FieldValue;

    /// Converts a loosely-typed key into this key type.
    fn coerce(raw: KeyValue) -> Result<Self, KeyError>;

    /// Builds a key from a random 128-bit identifier.
    fn from_random(_id: Uuid) -> Option<Self> {
        None
    }

    /// Builds a key from a sequence number.
    fn from_sequence(_n: u64) -> Option<Self> {
        None
    }
}

impl EntityKey for String {
    fn key_type() -> &'static str {
        "string"
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn coerce(raw: KeyValue) -> Result<Self, KeyError> {
        match raw {
            KeyValue::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    fn from_random(id: Uuid) -> Option<Self> {
        Some(id.hyphenated().to_string())
    }

    fn from_sequence(n: u64) -> Option<Self> {
        Some(n.to_string())
    }
}

impl EntityKey for Uuid {
    fn key_type() -> &'static str {
        "uuid"
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Uuid(*self)
    }

    fn coerce(raw: KeyValue) -> Result<Self, KeyError> {
        match raw {
            KeyValue::Uuid(id) => Ok(id),
            KeyValue::Text(s) => Uuid::parse_str(s.trim()).map_err(|_| KeyError::Unparsable {
                value: s,
                to: Self::key_type(),
            }),
            other => Err(KeyError::Unsupported {
                from: other.kind(),
                to: Self::key_type(),
            }),
        }
    }

    fn from_random(id: Uuid) -> Option<Self> {
        Some(id)
    }
}

macro_rules! integer_key {
    ($($t:ty),*) => {
        $(
            impl EntityKey for $t {
                fn key_type() -> &'static str {
                    stringify!($t)
                }

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::from(*self)
                }

                fn coerce(raw: KeyValue) -> Result<Self, KeyError> {
                    let unparsable = |value: String| KeyError::Unparsable {
                        value,
                        to: Self::key_type(),
                    };
                    match raw {
                        KeyValue::Integer(n) => {
                            <$t>::try_from(n).map_err(|_| unparsable(n.to_string()))
                        }
                        KeyValue::Unsigned(n) => {
                            <$t>::try_from(n).map_err(|_| unparsable(n.to_string()))
                        }
                        KeyValue::Text(s) => s.trim().parse::<$t>().map_err(|_| unparsable(s)),
                        KeyValue::Uuid(_) => Err(KeyError::Unsupported {
                            from: "uuid",
                            to: Self::key_type(),
                        }),
                    }
                }

                fn from_sequence(n: u64) -> Option<Self> {
                    <$t>::try_from(n).ok()
                }
            }
        )*
    };
}

integer_key!(i32, i64, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_key_accepts_everything() {
        assert_eq!(String::coerce("abc".into()).unwrap(), "abc");
        assert_eq!(String::coerce(KeyValue::Integer(42)).unwrap(), "42");
        let id = Uuid::new_v4();
        assert_eq!(String::coerce(id.into()).unwrap(), id.to_string());
    }

    #[test]
    fn test_uuid_key_parses_text() {
        let id = Uuid::new_v4();
        assert_eq!(Uuid::coerce(KeyValue::from(id.to_string())).unwrap(), id);
        assert_eq!(Uuid::coerce(id.into()).unwrap(), id);
    }

    #[test]
    fn test_uuid_key_rejects_integers_and_garbage() {
        assert_eq!(
            Uuid::coerce(KeyValue::Integer(5)).unwrap_err(),
            KeyError::Unsupported {
                from: "integer",
                to: "uuid"
            }
        );
        assert!(matches!(
            Uuid::coerce("not-a-uuid".into()),
            Err(KeyError::Unparsable { .. })
        ));
    }

    #[test]
    fn test_integer_key_coercion() {
        assert_eq!(i64::coerce(" 17 ".into()).unwrap(), 17);
        assert_eq!(u32::coerce(KeyValue::Integer(9)).unwrap(), 9);
        assert!(matches!(
            u32::coerce(KeyValue::Integer(-1)),
            Err(KeyError::Unparsable { .. })
        ));
        assert!(matches!(
            i32::coerce(KeyValue::Uuid(Uuid::nil())),
            Err(KeyError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_generation_hooks() {
        assert!(i64::from_random(Uuid::new_v4()).is_none());
        assert_eq!(i64::from_sequence(3), Some(3));
        assert!(Uuid::from_sequence(3).is_none());
        assert_eq!(String::from_sequence(3).as_deref(), Some("3"));
    }

    #[test]
    fn test_key_field_value() {
        assert_eq!(7u64.to_field_value(), FieldValue::Integer(7));
        assert_eq!(u64::MAX.to_field_value(), FieldValue::Unsigned(u64::MAX));
        assert_eq!(
            u64::MAX
                .to_field_value()
                .sort_cmp(&(1u64 << 63).to_field_value()),
            std::cmp::Ordering::Greater
        );
    }
}
