//! Scalar values carried by ordering columns and continuation tokens.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use bigdecimal::BigDecimal;
use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a Rust enum used as an ordering column.
///
/// Equality and hashing use the [`TypeId`]; the name is only kept for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct EnumType {
    id: TypeId,
    name: &'static str,
}

impl EnumType {
    /// Returns the identity of `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EnumType {}

impl Hash for EnumType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Type of an ordering column, without its nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Boolean.
    Bool,
    /// Signed or unsigned integer up to 64 bits.
    Int,
    /// Floating point number.
    Float,
    /// Arbitrary precision decimal.
    Decimal,
    /// UTF-8 text.
    Text,
    /// Globally unique identifier.
    Uuid,
    /// Instant in time.
    Timestamp,
    /// Civil calendar date.
    Date,
    /// Fieldless enum compared by its discriminant.
    Enum(EnumType),
}

impl ScalarType {
    /// Short name used in token signatures and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Enum(_) => "enum",
        }
    }

    /// Returns whether `value` is an instance of this type.
    ///
    /// `Null` is never accepted here; nullability is a property of the column.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Float, Value::Float(_))
                | (Self::Decimal, Value::Decimal(_))
                | (Self::Text, Value::Text(_))
                | (Self::Uuid, Value::Uuid(_))
                | (Self::Timestamp, Value::Timestamp(_))
                | (Self::Date, Value::Date(_))
                | (Self::Enum(_), Value::Enum(_))
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(ty) => write!(f, "enum<{}>", ty.name()),
            other => f.write_str(other.name()),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum Value {
    /// Absent value of a nullable column.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Decimal value.
    Decimal(BigDecimal),
    /// Text value.
    Text(String),
    /// Unique identifier value.
    Uuid(Uuid),
    /// Timestamp value.
    Timestamp(Timestamp),
    /// Date value.
    Date(Date),
    /// Enum discriminant.
    Enum(i64),
}

impl Value {
    /// Returns whether this value is `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compares two values of the same variant.
    ///
    /// Returns `None` for mismatched variants, `Null` operands and
    /// incomparable floats, mirroring SQL's unknown result.
    pub fn native_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Enum(a), Self::Enum(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) | Self::Enum(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::Uuid(v) => write!(f, "'{v}'"),
            Self::Timestamp(v) => write!(f, "'{v}'"),
            Self::Date(v) => write!(f, "'{v}'"),
        }
    }
}

/// Rust types usable as ordering columns.
///
/// Fieldless enums opt in through [`scalar_enum!`](crate::scalar_enum).
pub trait Scalar {
    /// Whether the Rust type is an optional wrapper around the scalar.
    const NULLABLE: bool = false;

    /// Returns the scalar type of the column.
    fn scalar_type() -> ScalarType;

    /// Converts the Rust value into a column value.
    fn into_value(self) -> Value;
}

macro_rules! impl_scalar {
    ($variant:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                fn scalar_type() -> ScalarType {
                    ScalarType::$variant
                }

                fn into_value(self) -> Value {
                    Value::$variant(self.into())
                }
            }
        )+
    };
}

impl_scalar!(Bool => bool);
impl_scalar!(Int => i8, i16, i32, i64, u8, u16, u32);
impl_scalar!(Float => f32, f64);
impl_scalar!(Decimal => BigDecimal);
impl_scalar!(Text => String);
impl_scalar!(Uuid => Uuid);
impl_scalar!(Timestamp => Timestamp);
impl_scalar!(Date => Date);

impl<T: Scalar> Scalar for Option<T> {
    const NULLABLE: bool = true;

    fn scalar_type() -> ScalarType {
        T::scalar_type()
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, Scalar::into_value)
    }
}

/// Implements [`Scalar`] for fieldless enums, comparing by discriminant.
///
/// ```rust
/// #[derive(Clone, Copy)]
/// enum Priority {
///     Low,
///     High,
/// }
///
/// keypage_core::scalar_enum!(Priority);
/// ```
#[macro_export]
macro_rules! scalar_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Scalar for $ty {
                fn scalar_type() -> $crate::ScalarType {
                    $crate::ScalarType::Enum($crate::EnumType::of::<$ty>())
                }

                fn into_value(self) -> $crate::Value {
                    $crate::Value::Enum(self as i64)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Tier {
        Free,
        Paid = 5,
    }

    crate::scalar_enum!(Tier);

    #[test]
    fn option_maps_to_nullable() {
        assert!(<Option<i32> as Scalar>::NULLABLE);
        assert_eq!(<Option<i32>>::scalar_type(), ScalarType::Int);
        assert_eq!(None::<i32>.into_value(), Value::Null);
        assert_eq!(Some(7_i32).into_value(), Value::Int(7));
    }

    #[test]
    fn enums_compare_by_discriminant() {
        assert_eq!(Tier::Free.into_value(), Value::Enum(0));
        assert_eq!(Tier::Paid.into_value(), Value::Enum(5));
        assert_eq!(Tier::scalar_type(), ScalarType::Enum(EnumType::of::<Tier>()));
        assert_ne!(Tier::scalar_type(), ScalarType::Int);
    }

    #[test]
    fn native_cmp_rejects_mixed_and_null() {
        assert_eq!(Value::Int(1).native_cmp(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(Value::Int(1).native_cmp(&Value::Float(2.0)), None);
        assert_eq!(Value::Null.native_cmp(&Value::Null), None);
    }

    #[test]
    fn text_display_escapes_quotes() {
        assert_eq!(Value::Text("o'neil".into()).to_string(), "'o''neil'");
    }

    #[test]
    fn accepts_matches_variant() {
        assert!(ScalarType::Text.accepts(&Value::Text("a".into())));
        assert!(!ScalarType::Text.accepts(&Value::Int(1)));
        assert!(!ScalarType::Int.accepts(&Value::Null));
    }
}
